//! DirectionalExplorer - grid movement along a fixed set of directions.
//!
//! # Walking rules
//!
//! ```text
//!   step        climb (climb = true)     fall (one-way past climb height)
//!   . A → .     . . ↗ .                  A → .
//!   # # # #     . A █ .                  # # ↓
//!               # # # #                  # # . .
//!                                        # # # ↓ lands on the first floor
//! ```
//!
//! Without `require_floor` (flight) every empty neighbour is reachable and
//! every edge is bidirectional.

use glam::{DVec3, IVec3};
use smallvec::SmallVec;

use super::PathLimiter;
use crate::graph::{Node, NodeGraph};
use crate::settings::{Candidate, Explorer, Seed, Seeds};
use crate::space::Space;
use crate::types::{Direction, Movement};

/// Default number of cells a walking agent may drop in one move.
pub const DEFAULT_MAX_FALL: u32 = 3;

pub struct DirectionalExplorer<S> {
  space: S,
  directions: SmallVec<[Direction; 6]>,
  limiter: PathLimiter,
  require_floor: bool,
  climb: bool,
  max_fall: u32,
}

impl<S: Space> DirectionalExplorer<S> {
  /// Free movement along `directions`, no floor needed.
  pub fn new(space: S, directions: &[Direction]) -> Self {
    Self {
      space,
      directions: SmallVec::from_slice(directions),
      limiter: PathLimiter::NoLimit,
      require_floor: false,
      climb: false,
      max_fall: 0,
    }
  }

  /// Flight in all six directions.
  pub fn flying(space: S) -> Self {
    Self::new(space, &Direction::ALL)
  }

  /// Horizontal walking on solid floor, dropping up to
  /// [`DEFAULT_MAX_FALL`] cells.
  pub fn walking(space: S) -> Self {
    Self::new(space, &Direction::HORIZONTAL)
      .with_floor(true)
      .with_max_fall(DEFAULT_MAX_FALL)
  }

  pub fn with_floor(mut self, require_floor: bool) -> Self {
    self.require_floor = require_floor;
    self
  }

  /// Allow stepping up onto a one-cell ledge.
  pub fn with_climb(mut self, climb: bool) -> Self {
    self.climb = climb;
    self
  }

  pub fn with_max_fall(mut self, max_fall: u32) -> Self {
    self.max_fall = max_fall;
    self
  }

  pub fn with_limiter(mut self, limiter: PathLimiter) -> Self {
    self.limiter = limiter;
    self
  }

  pub fn space(&self) -> &S {
    &self.space
  }

  #[inline]
  fn empty(&self, position: IVec3) -> bool {
    self.space.solid_at(position).is_empty()
  }

  /// Whether the agent can stand in `position`.
  fn standable(&self, position: IVec3) -> bool {
    self.empty(position) && (!self.require_floor || !self.empty(position - IVec3::Y))
  }

  /// Where a walking agent entering `target` from `from` ends up, and how far
  /// it dropped. `None` if the move is impossible.
  fn walk(&self, from: IVec3, target: IVec3) -> Option<(IVec3, u32)> {
    if !self.empty(target) {
      let above = target + IVec3::Y;
      let can_climb = self.climb && self.empty(above) && self.empty(from + IVec3::Y);
      return can_climb.then_some((above, 0));
    }

    let mut landing = target;
    let mut fell = 0;
    while self.empty(landing - IVec3::Y) {
      if fell == self.max_fall {
        return None;
      }
      landing -= IVec3::Y;
      fell += 1;
    }
    Some((landing, fell))
  }
}

impl<S: Space> Explorer for DirectionalExplorer<S> {
  fn explore_initial(&self, origin: DVec3, seeds: &mut Seeds) {
    let start = origin.floor().as_ivec3();
    if self.standable(start) {
      seeds.push(Seed::new(start, 0.0));
      return;
    }

    for direction in &self.directions {
      let cell = start + direction.offset();
      let center = cell.as_dvec3() + DVec3::splat(0.5);
      if center.distance_squared(origin) <= 1.0 && self.standable(cell) {
        seeds.push(Seed::new(cell, 0.0));
      }
    }
  }

  fn explore_each(&self, current: &Node, graph: &NodeGraph, out: &mut Vec<Candidate>) {
    if !self.limiter.allows(current) {
      return;
    }

    let position = current.position();
    let parent = current.parent().map(|id| graph.node(id).position());

    for direction in &self.directions {
      let target = position + direction.offset();
      if parent == Some(target) {
        continue;
      }

      if !self.require_floor {
        if self.empty(target) {
          out.push(Candidate::new(target, 0.0, Movement::Bidirectional));
        }
        continue;
      }

      let Some((landing, fell)) = self.walk(position, target) else {
        continue;
      };
      if parent == Some(landing) {
        continue;
      }

      // A drop is reversible only if the agent could climb back up.
      let reversible = fell == 0 || (self.climb && fell == 1);
      let movement = if reversible {
        Movement::Bidirectional
      } else {
        Movement::Unidirectional
      };
      out.push(Candidate::new(landing, 0.0, movement));
    }
  }
}

#[cfg(test)]
#[path = "directional_test.rs"]
mod directional_test;
