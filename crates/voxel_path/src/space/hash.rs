//! HashSpace - pre-built environment for fixtures and tests.

use std::collections::HashSet;

use glam::IVec3;

use super::{Solid, Space};

/// Set of solid voxels; every other position is empty.
///
/// Build it up front, then share it read-only.
#[derive(Clone, Debug, Default)]
pub struct HashSpace {
  solids: HashSet<IVec3>,
}

impl HashSpace {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn set(&mut self, position: IVec3, solid: Solid) {
    match solid {
      Solid::Full => {
        self.solids.insert(position);
      }
      Solid::Empty => {
        self.solids.remove(&position);
      }
    }
  }

  /// Builder form of [`set`](Self::set) for a solid voxel.
  pub fn with_solid(mut self, position: IVec3) -> Self {
    self.set(position, Solid::Full);
    self
  }

  /// Set every voxel in the inclusive box `min..=max`.
  pub fn fill(&mut self, min: IVec3, max: IVec3, solid: Solid) {
    for x in min.x..=max.x {
      for y in min.y..=max.y {
        for z in min.z..=max.z {
          self.set(IVec3::new(x, y, z), solid);
        }
      }
    }
  }

  pub fn len(&self) -> usize {
    self.solids.len()
  }

  pub fn is_empty(&self) -> bool {
    self.solids.is_empty()
  }
}

impl Space for HashSpace {
  fn solid_at(&self, position: IVec3) -> Solid {
    if self.solids.contains(&position) {
      Solid::Full
    } else {
      Solid::Empty
    }
  }
}
