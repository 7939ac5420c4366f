//! Environment lookups.
//!
//! # Module Structure
//!
//! - [`hash`]: `HashSpace` - fixed map of solid cells, everything else empty
//! - [`cache`]: `ConcurrentChunkedCache` - lock-striped per-voxel memoization
//! - [`caching`]: `CachingSpace` - any loader memoized through the cache

pub mod cache;
pub mod caching;
pub mod hash;

use std::sync::Arc;

use glam::IVec3;

pub use cache::ConcurrentChunkedCache;
pub use caching::CachingSpace;
pub use hash::HashSpace;

/// Occupancy of one voxel.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Solid {
  #[default]
  Empty,
  Full,
}

impl Solid {
  #[inline]
  pub fn is_solid(self) -> bool {
    self == Solid::Full
  }

  #[inline]
  pub fn is_empty(self) -> bool {
    self == Solid::Empty
  }
}

/// Point queries against the environment.
///
/// Implementations must be safe to query from many searches at once and
/// return the same answer for the same position until the world changes.
pub trait Space: Send + Sync {
  fn solid_at(&self, position: IVec3) -> Solid;
}

impl<S: Space + ?Sized> Space for Arc<S> {
  #[inline]
  fn solid_at(&self, position: IVec3) -> Solid {
    (**self).solid_at(position)
  }
}

impl<S: Space + ?Sized> Space for &S {
  #[inline]
  fn solid_at(&self, position: IVec3) -> Solid {
    (**self).solid_at(position)
  }
}
