//! Pathfinder - bounded-concurrency scheduler for path requests.
//!
//! # Admission
//!
//! ```text
//!   submit ──► identical live request? ──yes──► follow it (never scheduled)
//!                     │ no
//!                     ▼
//!              in_flight < capacity ──yes──► worker pool (slot operation)
//!                     │ no (or shut down)
//!                     ▼
//!              run on the calling thread (fresh operation)
//! ```
//!
//! Nothing is queued and nothing is rejected: at capacity the caller pays for
//! its own search.
//!
//! # Module Structure
//!
//! - [`config`]: `PathfinderConfig`
//! - `task`: result cells, handles, merge bookkeeping
//! - `merge`: coordinator thread, eligibility and splicing

pub mod config;
mod merge;
mod task;

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use glam::{DVec3, IVec3};
use parking_lot::{Condvar, Mutex, RwLock};
use tracing::{debug, info, warn};
use web_time::Instant;

pub use config::PathfinderConfig;
pub use task::{PathHandle, PathOutcome};

use self::merge::Coordinator;
use self::task::{DependencyKind, Registry, ResultCell, Task};
use crate::error::PathError;
use crate::metrics::{PathMetrics, Resolution};
use crate::operation::{OperationState, PathOperation};
use crate::settings::PathSettings;
use crate::threading::{Checkout, OperationSlots, WorkerPool};

/// Run `f`, turning a panic into [`PathError::SearchPanicked`].
pub(crate) fn guarded<T>(f: impl FnOnce() -> Result<T, PathError>) -> Result<T, PathError> {
  panic::catch_unwind(AssertUnwindSafe(f)).unwrap_or_else(|_| {
    warn!("search collaborator panicked");
    Err(PathError::SearchPanicked)
  })
}

/// Concurrent path search engine.
///
/// Dropping it shuts it down with the configured grace period.
pub struct Pathfinder {
  inner: Arc<Inner>,
  coordinator: Mutex<Option<Coordinator>>,
}

struct Inner {
  config: PathfinderConfig,
  pool: RwLock<Option<WorkerPool>>,
  slots: Arc<OperationSlots>,
  registry: Arc<Registry>,
  in_flight: Mutex<usize>,
  idle: Condvar,
  closed: AtomicBool,
  next_id: AtomicU64,
  metrics: PathMetrics,
}

/// Holds one unit of pooled capacity until dropped.
struct Permit(Arc<Inner>);

impl Drop for Permit {
  fn drop(&mut self) {
    let mut in_flight = self.0.in_flight.lock();
    *in_flight = in_flight.saturating_sub(1);
    self.0.idle.notify_all();
  }
}

enum RunOutcome {
  Searched,
  Dependent,
}

impl Pathfinder {
  pub fn new(config: PathfinderConfig, pool: WorkerPool) -> Result<Self, PathError> {
    config.validate()?;

    let registry = Arc::new(Registry::default());
    let coordinator = if config.merging {
      Some(Coordinator::spawn(registry.clone(), config.merge_scan_interval)?)
    } else {
      None
    };

    info!(
      capacity = config.capacity,
      merging = config.merging,
      pool = ?pool,
      "pathfinder started"
    );

    let inner = Arc::new(Inner {
      slots: OperationSlots::new(pool.num_threads()),
      pool: RwLock::new(Some(pool)),
      registry,
      in_flight: Mutex::new(0),
      idle: Condvar::new(),
      closed: AtomicBool::new(false),
      next_id: AtomicU64::new(0),
      metrics: PathMetrics::new(),
      config,
    });

    Ok(Self {
      inner,
      coordinator: Mutex::new(coordinator),
    })
  }

  /// Private pool of `threads` workers, capacity to match.
  pub fn with_threads(threads: usize) -> Result<Self, PathError> {
    let pool = WorkerPool::with_threads(threads)?;
    let config = PathfinderConfig::with_capacity(pool.num_threads());
    Self::new(config, pool)
  }

  pub fn config(&self) -> &PathfinderConfig {
    &self.inner.config
  }

  pub fn metrics(&self) -> &PathMetrics {
    &self.inner.metrics
  }

  /// Searches currently holding pooled capacity.
  pub fn in_flight(&self) -> usize {
    *self.inner.in_flight.lock()
  }

  pub fn is_shut_down(&self) -> bool {
    self.inner.closed.load(Ordering::Acquire)
  }

  /// Request a route from `origin` to `destination`.
  ///
  /// Returns once the request is scheduled, or once it has finished if it had
  /// to run on this thread.
  #[tracing::instrument(skip_all, name = "pathfinder::submit")]
  pub fn submit(&self, origin: DVec3, destination: IVec3, settings: &PathSettings) -> PathHandle {
    let inner = &self.inner;
    let id = inner.next_id.fetch_add(1, Ordering::Relaxed);
    let cell = Arc::new(ResultCell::new());

    if inner.config.merging {
      if let Some(leader) = inner
        .registry
        .subscribe_identical(origin, destination, settings, &cell)
      {
        debug!(id, leader = leader.id, "following identical request");
        inner.metrics.record_follower();
        return PathHandle::new(id, cell, leader);
      }
    }

    let task = Arc::new(Task::new(
      id,
      origin,
      destination,
      settings.clone(),
      cell.clone(),
    ));
    inner.registry.register(task.clone());
    if let Some(coordinator) = self.coordinator.lock().as_ref() {
      coordinator.wake();
    }

    let handle = PathHandle::new(id, cell, task.clone());
    if let Err(task) = Inner::try_spawn(inner, task) {
      debug!(id, "at capacity, running inline");
      inner.run_task(&task, Checkout::fresh(), true);
    }
    handle
  }

  /// Stop accepting pooled work and wind down.
  ///
  /// Waits `shutdown_grace` for pooled searches, cancels whatever is left and
  /// waits once more. An owned pool is released; shared and global pools are
  /// left running. Later submissions still complete, on the caller's thread.
  pub fn shutdown(&self) -> Result<(), PathError> {
    let inner = &self.inner;
    if !inner.closed.swap(true, Ordering::AcqRel) {
      info!("pathfinder shutting down");
    }

    let pool = inner.pool.write().take();
    if let Some(coordinator) = self.coordinator.lock().take() {
      coordinator.stop();
    }

    let grace = inner.config.shutdown_grace;
    let mut remaining = inner.wait_idle(grace);
    if remaining > 0 {
      let aborted = inner.registry.abort_all();
      warn!(remaining, aborted, "cancelling searches still running at shutdown");
      remaining = inner.wait_idle(grace);
    }

    match pool {
      Some(WorkerPool::Owned(pool)) => drop(pool),
      Some(other) => debug!(pool = ?other, "leaving non-owned pool running"),
      None => {}
    }

    if remaining > 0 {
      return Err(PathError::ShutdownTimedOut(remaining));
    }
    Ok(())
  }
}

impl std::fmt::Debug for Pathfinder {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Pathfinder")
      .field("capacity", &self.inner.config.capacity)
      .field("merging", &self.inner.config.merging)
      .field("in_flight", &self.in_flight())
      .field("shut_down", &self.is_shut_down())
      .finish_non_exhaustive()
  }
}

impl Drop for Pathfinder {
  fn drop(&mut self) {
    if let Err(e) = self.shutdown() {
      warn!(error = %e, "pathfinder dropped with searches still running");
    }
  }
}

impl Inner {
  /// Queue `task` on the pool if capacity allows; hands it back otherwise.
  fn try_spawn(this: &Arc<Inner>, task: Arc<Task>) -> Result<(), Arc<Task>> {
    let pool = this.pool.read();
    let Some(pool) = pool.as_ref() else {
      return Err(task);
    };
    if this.closed.load(Ordering::Acquire) {
      return Err(task);
    }

    {
      let mut in_flight = this.in_flight.lock();
      if *in_flight >= this.config.capacity {
        return Err(task);
      }
      *in_flight += 1;
    }

    let permit = Permit(this.clone());
    pool.spawn(move || {
      let inner = &permit.0;
      let checkout = inner.slots.checkout();
      inner.run_task(&task, checkout, false);
      drop(permit);
    });
    Ok(())
  }

  /// Block until no pooled search is running or `timeout` passes. Returns the
  /// number still running.
  fn wait_idle(&self, timeout: Duration) -> usize {
    let deadline = Instant::now() + timeout;
    let mut in_flight = self.in_flight.lock();
    while *in_flight > 0 {
      let now = Instant::now();
      if now >= deadline {
        break;
      }
      self.idle.wait_for(&mut in_flight, deadline - now);
    }
    *in_flight
  }

  /// Run `task` on `checkout`'s operation and publish the outcome.
  fn run_task(&self, task: &Arc<Task>, checkout: Checkout, inline: bool) {
    let started = Instant::now();
    let (outcome, resolution) = run(task, checkout.operation());
    // Reset the operation before anyone observes the outcome.
    drop(checkout);

    let elapsed_us = started.elapsed().as_micros() as u64;
    match &outcome {
      Ok(result) => debug!(
        id = task.id,
        success = result.success,
        explored = result.explored,
        elapsed_us,
        inline,
        "path search finished"
      ),
      Err(e) => debug!(id = task.id, error = %e, elapsed_us, inline, "path search failed"),
    }
    self
      .metrics
      .record_run(&outcome, resolution, inline, elapsed_us);

    task.complete(outcome);
    self.registry.remove(task.id);
  }
}

/// Drive one task on one operation through to its outcome.
///
/// Every exit path opens the task's interior-done latch under the operation
/// lock, releases any recorded dependency and waits for dependents before the
/// operation is detached.
fn run(task: &Task, operation: &Arc<Mutex<PathOperation>>) -> (PathOutcome, Resolution) {
  task.attach(operation.clone());

  let executed = guarded(|| execute(task, operation));
  {
    let _op = operation.lock();
    task.interior_done.open();
  }
  let dependency = task.take_dependency();

  let (outcome, resolution) = match (executed, dependency) {
    (Ok(RunOutcome::Searched), dependency) => {
      drop(dependency);
      task.await_dependents();
      let outcome = guarded(|| operation.lock().make_result());
      (outcome, Resolution::Searched)
    }
    (Ok(RunOutcome::Dependent), Some(dependency)) => {
      let kind = dependency.kind;
      let outcome = guarded(|| merge::resolve(task, operation, &dependency));
      // Releases the target before this task possibly searches on.
      drop(dependency);
      let resolved = match (kind, outcome) {
        (DependencyKind::Perfect, outcome) => (outcome, Resolution::PerfectMerge),
        (DependencyKind::Splice { .. }, Err(e)) if e.is_splice_failure() => {
          debug!(id = task.id, error = %e, "splice abandoned, searching alone");
          (search_alone(task, operation), Resolution::Searched)
        }
        (DependencyKind::Splice { .. }, outcome) => (outcome, Resolution::SpliceMerge),
      };
      task.await_dependents();
      resolved
    }
    (Ok(RunOutcome::Dependent), None) => {
      task.await_dependents();
      (Err(PathError::MissingOperation), Resolution::Searched)
    }
    (Err(e), dependency) => {
      drop(dependency);
      task.await_dependents();
      (Err(e), Resolution::Searched)
    }
  };

  task.detach();
  (outcome, resolution)
}

/// Resume a dependent's own search after a failed splice. Its merge state is
/// closed by then, so the search runs to completion or cancellation.
fn search_alone(task: &Task, operation: &Mutex<PathOperation>) -> PathOutcome {
  guarded(|| execute(task, operation))?;
  guarded(|| operation.lock().make_result())
}

/// Step the search until it completes, is cancelled or becomes a dependent.
///
/// Every exit other than becoming a dependent opens interior-done before the
/// operation lock is released, so the coordinator never records a merge onto
/// a search that has already stopped.
fn execute(task: &Task, operation: &Mutex<PathOperation>) -> Result<RunOutcome, PathError> {
  loop {
    let mut op = operation.lock();
    if task.is_cancelled() {
      task.interior_done.open();
      return Err(PathError::Cancelled);
    }
    if task.is_dependent() {
      return Ok(RunOutcome::Dependent);
    }

    let stepped = if op.state() == OperationState::Uninitialized {
      op.init(task.origin, task.destination, &task.settings)
        .map(|()| false)
    } else {
      op.step()
    };
    match stepped {
      Ok(false) => {}
      Ok(true) => {
        task.interior_done.open();
        return Ok(RunOutcome::Searched);
      }
      Err(e) => {
        task.interior_done.open();
        return Err(e);
      }
    }
  }
}
