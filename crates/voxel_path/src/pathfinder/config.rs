//! PathfinderConfig - scheduler and merge tunables.

use std::time::Duration;

use crate::constants::{DEFAULT_MERGE_SCAN_INTERVAL, DEFAULT_SHUTDOWN_GRACE};
use crate::error::PathError;

/// Configuration for a [`Pathfinder`](super::Pathfinder).
#[derive(Clone, Debug, PartialEq)]
pub struct PathfinderConfig {
  /// Maximum searches running on the pool at once. Requests beyond this run
  /// on the submitting thread.
  pub capacity: usize,

  /// Let concurrent requests share work (identical requests, and routes that
  /// run into each other's explored region).
  pub merging: bool,

  /// Longest the merge coordinator sleeps between scans while two or more
  /// searches are live. With fewer it sleeps until the next submission.
  pub merge_scan_interval: Duration,

  /// How long shutdown waits for running searches, before and after
  /// cancelling them.
  pub shutdown_grace: Duration,
}

impl PathfinderConfig {
  pub fn with_capacity(capacity: usize) -> Self {
    Self {
      capacity,
      ..Self::default()
    }
  }

  pub fn without_merging(mut self) -> Self {
    self.merging = false;
    self
  }

  pub fn validate(&self) -> Result<(), PathError> {
    if self.capacity == 0 {
      return Err(PathError::InvalidCapacity(self.capacity));
    }
    Ok(())
  }
}

impl Default for PathfinderConfig {
  fn default() -> Self {
    Self {
      capacity: std::thread::available_parallelism().map_or(1, |n| n.get()),
      merging: true,
      merge_scan_interval: DEFAULT_MERGE_SCAN_INTERVAL,
      shutdown_grace: DEFAULT_SHUTDOWN_GRACE,
    }
  }
}
