//! PathLimiter - decides which nodes may still be expanded.
//!
//! Limiters compose with `!`, `&`, `|` and `^` (or the named
//! [`and`](PathLimiter::and) / [`or`](PathLimiter::or) /
//! [`xor`](PathLimiter::xor) methods).

use std::ops::{BitAnd, BitOr, BitXor, Not};

use glam::{DVec3, IVec3};

use crate::graph::Node;

#[derive(Clone, Debug, Default, PartialEq)]
pub enum PathLimiter {
  /// Expand everything.
  #[default]
  NoLimit,
  /// Expand nodes whose cost so far is below the limit.
  PathLength(f32),
  /// Expand nodes inside `min..max` (max exclusive on every axis).
  InBounds { min: IVec3, max: IVec3 },
  /// Expand nodes strictly closer than `radius` to `center`.
  InRadius { center: DVec3, radius_squared: f64 },
  Not(Box<PathLimiter>),
  And(Box<PathLimiter>, Box<PathLimiter>),
  Or(Box<PathLimiter>, Box<PathLimiter>),
  Xor(Box<PathLimiter>, Box<PathLimiter>),
}

impl PathLimiter {
  pub fn path_length(max_length: f32) -> Self {
    PathLimiter::PathLength(max_length)
  }

  pub fn in_bounds(min: IVec3, max: IVec3) -> Self {
    PathLimiter::InBounds { min, max }
  }

  pub fn in_radius(center: DVec3, radius: f64) -> Self {
    PathLimiter::InRadius {
      center,
      radius_squared: radius * radius,
    }
  }

  pub fn and(self, other: PathLimiter) -> Self {
    PathLimiter::And(Box::new(self), Box::new(other))
  }

  pub fn or(self, other: PathLimiter) -> Self {
    PathLimiter::Or(Box::new(self), Box::new(other))
  }

  pub fn xor(self, other: PathLimiter) -> Self {
    PathLimiter::Xor(Box::new(self), Box::new(other))
  }

  /// Whether `node` may be expanded.
  pub fn allows(&self, node: &Node) -> bool {
    match self {
      PathLimiter::NoLimit => true,
      PathLimiter::PathLength(max) => node.g() < *max,
      PathLimiter::InBounds { min, max } => {
        let p = node.position();
        p.cmpge(*min).all() && p.cmplt(*max).all()
      }
      PathLimiter::InRadius {
        center,
        radius_squared,
      } => node.position().as_dvec3().distance_squared(*center) < *radius_squared,
      PathLimiter::Not(inner) => !inner.allows(node),
      PathLimiter::And(a, b) => a.allows(node) && b.allows(node),
      PathLimiter::Or(a, b) => a.allows(node) || b.allows(node),
      PathLimiter::Xor(a, b) => a.allows(node) ^ b.allows(node),
    }
  }
}

impl Not for PathLimiter {
  type Output = PathLimiter;

  fn not(self) -> PathLimiter {
    PathLimiter::Not(Box::new(self))
  }
}

impl BitAnd for PathLimiter {
  type Output = PathLimiter;

  fn bitand(self, rhs: PathLimiter) -> PathLimiter {
    self.and(rhs)
  }
}

impl BitOr for PathLimiter {
  type Output = PathLimiter;

  fn bitor(self, rhs: PathLimiter) -> PathLimiter {
    self.or(rhs)
  }
}

impl BitXor for PathLimiter {
  type Output = PathLimiter;

  fn bitxor(self, rhs: PathLimiter) -> PathLimiter {
    self.xor(rhs)
  }
}
