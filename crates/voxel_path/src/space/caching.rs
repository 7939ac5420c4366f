//! CachingSpace - memoizes a slow or contended voxel source.

use glam::IVec3;

use super::{ConcurrentChunkedCache, Solid, Space};

/// [`Space`] backed by `load`, with every answer cached per voxel.
///
/// The owner keeps the cache coherent with the world: call
/// [`update`](Self::update) or [`invalidate`](Self::invalidate) when a voxel
/// changes, [`clear`](Self::clear) when a whole region is swapped out.
pub struct CachingSpace<L> {
  load: L,
  cache: ConcurrentChunkedCache<Solid>,
}

impl<L> CachingSpace<L>
where
  L: Fn(IVec3) -> Solid + Send + Sync,
{
  pub fn new(load: L) -> Self {
    Self {
      load,
      cache: ConcurrentChunkedCache::new(),
    }
  }

  /// Record a known change without reloading.
  pub fn update(&self, position: IVec3, solid: Solid) {
    self.cache.put(position, solid);
  }

  /// Forget one voxel; the next lookup reloads it.
  pub fn invalidate(&self, position: IVec3) {
    self.cache.remove(position);
  }

  pub fn clear(&self) {
    self.cache.clear();
  }

  pub fn cache(&self) -> &ConcurrentChunkedCache<Solid> {
    &self.cache
  }
}

impl<L> Space for CachingSpace<L>
where
  L: Fn(IVec3) -> Solid + Send + Sync,
{
  fn solid_at(&self, position: IVec3) -> Solid {
    self.cache.compute_if_absent(position, &self.load)
  }
}
