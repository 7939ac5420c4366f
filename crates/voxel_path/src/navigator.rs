//! Navigator - one agent's view of the pathfinder.
//!
//! Keeps at most one outstanding request. Navigating again cancels the
//! previous request before submitting the new one, so an agent chasing a
//! moving [`PathTarget`] never piles up stale searches.

use std::sync::Arc;

use glam::{DVec3, IVec3};
use tracing::trace;

use crate::pathfinder::{PathHandle, PathOutcome, Pathfinder};
use crate::settings::PathSettings;

// =============================================================================
// Targets
// =============================================================================

/// Destination that may move between requests.
pub trait PathTarget {
  /// Current destination voxel; `None` when there is nowhere to go.
  fn resolve(&mut self) -> Option<IVec3>;

  /// Whether the destination moved since the last call.
  fn has_changed(&mut self) -> bool;
}

/// A voxel that never moves.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Fixed(pub IVec3);

impl PathTarget for Fixed {
  fn resolve(&mut self) -> Option<IVec3> {
    Some(self.0)
  }

  fn has_changed(&mut self) -> bool {
    false
  }
}

/// Follows a moving position.
///
/// `position` samples where the target is now (`None` if it is gone),
/// `resolver` maps that to the voxel to path to and `changed` decides whether
/// a move is large enough to re-plan.
pub struct Tracking<P, R, C> {
  position: P,
  resolver: R,
  changed: C,
  last: Option<DVec3>,
}

impl<P, R, C> Tracking<P, R, C>
where
  P: FnMut() -> Option<DVec3>,
  R: Fn(DVec3) -> IVec3,
  C: Fn(DVec3, DVec3) -> bool,
{
  pub fn new(position: P, resolver: R, changed: C) -> Self {
    Self {
      position,
      resolver,
      changed,
      last: None,
    }
  }
}

impl<P, R, C> PathTarget for Tracking<P, R, C>
where
  P: FnMut() -> Option<DVec3>,
  R: Fn(DVec3) -> IVec3,
  C: Fn(DVec3, DVec3) -> bool,
{
  fn resolve(&mut self) -> Option<IVec3> {
    (self.position)().map(|p| (self.resolver)(p))
  }

  fn has_changed(&mut self) -> bool {
    let now = (self.position)();
    match (self.last, now) {
      (None, None) => false,
      (Some(_), None) => {
        self.last = None;
        true
      }
      (None, Some(now)) => {
        self.last = Some(now);
        true
      }
      (Some(last), Some(now)) => {
        if (self.changed)(last, now) {
          self.last = Some(now);
          true
        } else {
          false
        }
      }
    }
  }
}

// =============================================================================
// Navigator
// =============================================================================

/// Submits requests for one agent and tracks the latest.
pub struct Navigator {
  pathfinder: Arc<Pathfinder>,
  settings: PathSettings,
  pending: Option<PathHandle>,
}

impl Navigator {
  pub fn new(pathfinder: Arc<Pathfinder>, settings: PathSettings) -> Self {
    Self {
      pathfinder,
      settings,
      pending: None,
    }
  }

  pub fn settings(&self) -> &PathSettings {
    &self.settings
  }

  /// Request a route, cancelling the previous request if it is still running.
  pub fn navigate(&mut self, origin: DVec3, destination: IVec3) {
    self.cancel();
    let handle = self.pathfinder.submit(origin, destination, &self.settings);
    trace!(id = handle.id(), ?destination, "navigating");
    self.pending = Some(handle);
  }

  /// Navigate toward `target` when it moved or nothing is outstanding.
  ///
  /// Returns whether a new request was submitted. A target that resolves to
  /// nothing cancels the outstanding request.
  pub fn navigate_to(&mut self, origin: DVec3, target: &mut impl PathTarget) -> bool {
    let moved = target.has_changed();
    if self.pending.is_some() && !moved {
      return false;
    }
    match target.resolve() {
      Some(destination) => {
        self.navigate(origin, destination);
        true
      }
      None => {
        self.cancel();
        false
      }
    }
  }

  /// Whether the latest request has resolved and its outcome is waiting.
  pub fn is_complete(&self) -> bool {
    self.pending.as_ref().is_some_and(PathHandle::is_done)
  }

  /// Whether a request is outstanding or its outcome not yet taken.
  pub fn is_navigating(&self) -> bool {
    self.pending.is_some()
  }

  /// Take the latest outcome, leaving the navigator idle. `None` while the
  /// request is still running or when nothing was requested.
  pub fn take_result(&mut self) -> Option<PathOutcome> {
    let outcome = self.pending.as_ref()?.try_result()?;
    self.pending = None;
    Some(outcome)
  }

  /// Cancel the outstanding request, if any, and forget it.
  pub fn cancel(&mut self) {
    if let Some(handle) = self.pending.take() {
      if handle.cancel() {
        trace!(id = handle.id(), "navigation cancelled");
      }
    }
  }
}

#[cfg(test)]
#[path = "navigator_test.rs"]
mod navigator_test;
