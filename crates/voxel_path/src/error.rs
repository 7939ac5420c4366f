//! Error type for every fallible engine operation.

use glam::IVec3;

use crate::operation::OperationState;

/// Errors surfaced by the search engine.
///
/// `Clone` so one outcome can be delivered to every request that adopted it.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[non_exhaustive]
pub enum PathError {
  /// Pool capacity must admit at least one search.
  #[error("pool capacity must be positive, got {0}")]
  InvalidCapacity(usize),

  #[error("failed to build worker pool: {0}")]
  PoolBuild(String),

  #[error("failed to start merge coordinator: {0}")]
  CoordinatorSpawn(String),

  /// Lifecycle misuse of a [`PathOperation`](crate::PathOperation).
  #[error("cannot {action} while operation is {state:?}")]
  InvalidState {
    action: &'static str,
    state: OperationState,
  },

  #[error("node at {0} is already queued")]
  AlreadyQueued(IVec3),

  #[error("node at {0} is not queued")]
  NotQueued(IVec3),

  #[error("path request was cancelled")]
  Cancelled,

  /// A collaborator (explorer, heuristic, post-processor) panicked mid-search.
  #[error("search panicked")]
  SearchPanicked,

  #[error("merge target has no attached operation")]
  MissingOperation,

  #[error("merge target finished without completing its search")]
  TargetIncomplete,

  /// The splice walk from the contact point never met the target's route.
  #[error("no common point between contact {0} and the merge target's route")]
  NoContactPoint(IVec3),

  /// Reaching the target's route from the contact would walk a one-way edge
  /// backwards.
  #[error("walk from contact {0} to the merge target's route crosses a one-way edge")]
  OneWayBridge(IVec3),

  #[error("shutdown timed out with {0} searches still running")]
  ShutdownTimedOut(usize),
}

impl PathError {
  /// A splice that could not be completed. The dependent can still finish
  /// the search on its own.
  pub fn is_splice_failure(&self) -> bool {
    matches!(
      self,
      PathError::MissingOperation
        | PathError::TargetIncomplete
        | PathError::NoContactPoint(_)
        | PathError::OneWayBridge(_)
    )
  }
}
