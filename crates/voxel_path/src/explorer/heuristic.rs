//! Grid cost models.

use glam::IVec3;

use crate::settings::Heuristic;

/// Taxicab distance. Exact for agents restricted to axis steps.
#[derive(Clone, Copy, Debug, Default)]
pub struct Manhattan;

impl Heuristic for Manhattan {
  #[inline]
  fn heuristic(&self, from: IVec3, to: IVec3) -> f32 {
    (to - from).abs().element_sum() as f32
  }

  #[inline]
  fn distance(&self, from: IVec3, to: IVec3) -> f32 {
    self.heuristic(from, to)
  }
}

/// Straight-line distance. Admissible for any movement model.
#[derive(Clone, Copy, Debug, Default)]
pub struct Euclidean;

impl Heuristic for Euclidean {
  #[inline]
  fn heuristic(&self, from: IVec3, to: IVec3) -> f32 {
    from.as_vec3().distance(to.as_vec3())
  }

  #[inline]
  fn distance(&self, from: IVec3, to: IVec3) -> f32 {
    self.heuristic(from, to)
  }
}
