//! Per-request bookkeeping: result cells, handles, latches and merge state.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use glam::{DVec3, IVec3};
use parking_lot::{Condvar, Mutex};
use web_time::Instant;

use crate::error::PathError;
use crate::operation::PathOperation;
use crate::settings::PathSettings;
use crate::types::PathResult;

/// Outcome delivered to a request.
pub type PathOutcome = Result<PathResult, PathError>;

// =============================================================================
// Latch
// =============================================================================

/// One-shot signal between exactly two parties.
#[derive(Default)]
pub(crate) struct Latch {
  open: Mutex<bool>,
  cv: Condvar,
}

impl Latch {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn open(&self) {
    let mut open = self.open.lock();
    if !*open {
      *open = true;
      self.cv.notify_all();
    }
  }

  pub fn is_open(&self) -> bool {
    *self.open.lock()
  }

  /// Wait up to `timeout`. Returns whether the latch is open.
  pub fn wait_timeout(&self, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    let mut open = self.open.lock();
    while !*open {
      let now = Instant::now();
      if now >= deadline {
        return false;
      }
      self.cv.wait_for(&mut open, deadline - now);
    }
    true
  }

  pub fn wait(&self) {
    let mut open = self.open.lock();
    while !*open {
      self.cv.wait(&mut open);
    }
  }
}

// =============================================================================
// ResultCell
// =============================================================================

/// Write-once slot a request's outcome is published into.
#[derive(Default)]
pub(crate) struct ResultCell {
  slot: Mutex<Option<PathOutcome>>,
  cv: Condvar,
}

impl ResultCell {
  pub fn new() -> Self {
    Self::default()
  }

  /// Store `outcome` unless something was already published. Returns whether
  /// this call won.
  pub fn publish(&self, outcome: PathOutcome) -> bool {
    let mut slot = self.slot.lock();
    if slot.is_some() {
      return false;
    }
    *slot = Some(outcome);
    self.cv.notify_all();
    true
  }

  pub fn get(&self) -> Option<PathOutcome> {
    self.slot.lock().clone()
  }

  pub fn is_set(&self) -> bool {
    self.slot.lock().is_some()
  }

  pub fn wait(&self) -> PathOutcome {
    let mut slot = self.slot.lock();
    loop {
      if let Some(outcome) = slot.as_ref() {
        return outcome.clone();
      }
      self.cv.wait(&mut slot);
    }
  }

  pub fn wait_timeout(&self, timeout: Duration) -> Option<PathOutcome> {
    let deadline = Instant::now() + timeout;
    let mut slot = self.slot.lock();
    loop {
      if let Some(outcome) = slot.as_ref() {
        return Some(outcome.clone());
      }
      let now = Instant::now();
      if now >= deadline {
        return None;
      }
      self.cv.wait_for(&mut slot, deadline - now);
    }
  }
}

// =============================================================================
// PathHandle
// =============================================================================

/// Caller's side of one submitted request.
///
/// Every handle resolves exactly once, to a [`PathResult`] or a
/// [`PathError`]. Dropping a handle does not cancel the search.
pub struct PathHandle {
  id: u64,
  cell: Arc<ResultCell>,
  task: Arc<Task>,
}

impl PathHandle {
  pub(crate) fn new(id: u64, cell: Arc<ResultCell>, task: Arc<Task>) -> Self {
    Self { id, cell, task }
  }

  /// Request id, unique per pathfinder.
  pub fn id(&self) -> u64 {
    self.id
  }

  /// Block until the request resolves.
  pub fn wait(&self) -> PathOutcome {
    self.cell.wait()
  }

  /// Block up to `timeout`; `None` if still running.
  pub fn wait_timeout(&self, timeout: Duration) -> Option<PathOutcome> {
    self.cell.wait_timeout(timeout)
  }

  /// Outcome if already resolved.
  pub fn try_result(&self) -> Option<PathOutcome> {
    self.cell.get()
  }

  pub fn is_done(&self) -> bool {
    self.cell.is_set()
  }

  /// Resolve this handle with [`PathError::Cancelled`].
  ///
  /// The search itself stops at its next step once no handle (and no merged
  /// request) still wants its result. Returns false if the handle had already
  /// resolved.
  pub fn cancel(&self) -> bool {
    if self.cell.publish(Err(PathError::Cancelled)) {
      self.task.release_interest();
      true
    } else {
      false
    }
  }
}

impl std::fmt::Debug for PathHandle {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("PathHandle")
      .field("id", &self.id)
      .field("task", &self.task.id)
      .field("done", &self.is_done())
      .finish()
  }
}

// =============================================================================
// Merge state
// =============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum DependencyKind {
  /// Same request; adopt the target's outcome as is.
  Perfect,
  /// Join the target's route at `contact`.
  Splice { contact: IVec3 },
}

/// A dependent's claim on its target. Dropping it opens the splice latch and
/// releases the dependent's interest in the target, whatever path the
/// dependent exits by.
pub(crate) struct Dependency {
  pub target: Arc<Task>,
  pub operation: Arc<Mutex<PathOperation>>,
  pub kind: DependencyKind,
  pub spliced: Arc<Latch>,
}

impl Drop for Dependency {
  fn drop(&mut self) {
    self.spliced.open();
    self.target.release_interest();
  }
}

pub(crate) enum MergeState {
  Free,
  /// At least one dependent is splicing onto this task.
  Target,
  Dependent(Dependency),
  /// Dependency taken for resolution, or the task finished.
  Closed,
}

impl MergeState {
  fn is_dependent(&self) -> bool {
    matches!(self, MergeState::Dependent(_))
  }
}

struct Subscribers {
  cells: Vec<Arc<ResultCell>>,
  sealed: bool,
}

// =============================================================================
// Task
// =============================================================================

/// One scheduled search and everything other requests may attach to.
pub(crate) struct Task {
  pub id: u64,
  pub origin: DVec3,
  pub start: IVec3,
  pub destination: IVec3,
  pub settings: PathSettings,

  /// What this task's own run produced.
  pub outcome: ResultCell,
  subscribers: Mutex<Subscribers>,
  /// Handles and dependents still wanting the outcome.
  interest: AtomicUsize,
  aborted: AtomicBool,
  done: AtomicBool,

  attached: Mutex<Option<Arc<Mutex<PathOperation>>>>,
  pub merge: Mutex<MergeState>,
  /// Opened (under the operation lock) once the search loop has exited.
  pub interior_done: Latch,
  splice_latches: Mutex<Vec<Arc<Latch>>>,
}

impl Task {
  pub fn new(
    id: u64,
    origin: DVec3,
    destination: IVec3,
    settings: PathSettings,
    cell: Arc<ResultCell>,
  ) -> Self {
    Self {
      id,
      origin,
      start: origin.floor().as_ivec3(),
      destination,
      settings,
      outcome: ResultCell::new(),
      subscribers: Mutex::new(Subscribers {
        cells: vec![cell],
        sealed: false,
      }),
      interest: AtomicUsize::new(1),
      aborted: AtomicBool::new(false),
      done: AtomicBool::new(false),
      attached: Mutex::new(None),
      merge: Mutex::new(MergeState::Free),
      interior_done: Latch::new(),
      splice_latches: Mutex::new(Vec::new()),
    }
  }

  /// Same endpoints and settings; a merge of any kind needs at least the
  /// destination and settings to match.
  pub fn is_identical(&self, origin: DVec3, destination: IVec3, settings: &PathSettings) -> bool {
    self.origin == origin && self.destination == destination && self.settings == *settings
  }

  pub fn is_compatible(&self, other: &Task) -> bool {
    self.destination == other.destination && self.settings == other.settings
  }

  /// Attach another request's cell. Fails once the outcome is being
  /// published.
  pub fn subscribe(&self, cell: Arc<ResultCell>) -> bool {
    let mut subscribers = self.subscribers.lock();
    if subscribers.sealed || self.is_cancelled() || !self.try_add_interest() {
      return false;
    }
    subscribers.cells.push(cell);
    true
  }

  /// Count one more party wanting the outcome. Fails once interest has
  /// dropped to zero: a cancelled task stays cancelled.
  pub fn try_add_interest(&self) -> bool {
    self
      .interest
      .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
        (n > 0).then_some(n + 1)
      })
      .is_ok()
  }

  pub fn release_interest(&self) {
    let _ = self
      .interest
      .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1));
  }

  /// Stop regardless of interest (shutdown).
  pub fn abort(&self) {
    self.aborted.store(true, Ordering::Release);
  }

  pub fn is_cancelled(&self) -> bool {
    self.aborted.load(Ordering::Acquire) || self.interest.load(Ordering::Acquire) == 0
  }

  pub fn is_done(&self) -> bool {
    self.done.load(Ordering::Acquire)
  }

  // ===== Operation attachment =====

  pub fn attach(&self, operation: Arc<Mutex<PathOperation>>) {
    *self.attached.lock() = Some(operation);
  }

  pub fn detach(&self) {
    *self.attached.lock() = None;
  }

  pub fn attached(&self) -> Option<Arc<Mutex<PathOperation>>> {
    self.attached.lock().clone()
  }

  pub fn is_attached_to(&self, operation: &Arc<Mutex<PathOperation>>) -> bool {
    self
      .attached
      .lock()
      .as_ref()
      .is_some_and(|attached| Arc::ptr_eq(attached, operation))
  }

  // ===== Merge bookkeeping =====

  pub fn is_dependent(&self) -> bool {
    self.merge.lock().is_dependent()
  }

  /// Take the recorded dependency, closing the task to further merges.
  pub fn take_dependency(&self) -> Option<Dependency> {
    match std::mem::replace(&mut *self.merge.lock(), MergeState::Closed) {
      MergeState::Dependent(dependency) => Some(dependency),
      _ => None,
    }
  }

  pub fn add_splice_latch(&self, latch: Arc<Latch>) {
    self.splice_latches.lock().push(latch);
  }

  /// Block until every dependent splicing onto this task has finished
  /// reading it.
  pub fn await_dependents(&self) {
    let latches = std::mem::take(&mut *self.splice_latches.lock());
    for latch in latches {
      latch.wait();
    }
  }

  // ===== Completion =====

  /// Publish to this task and everyone subscribed to it.
  pub fn complete(&self, outcome: PathOutcome) {
    let cells = {
      let mut subscribers = self.subscribers.lock();
      subscribers.sealed = true;
      std::mem::take(&mut subscribers.cells)
    };
    self.outcome.publish(outcome.clone());
    for cell in cells {
      cell.publish(outcome.clone());
    }
    self.done.store(true, Ordering::Release);
  }
}

// =============================================================================
// Registry
// =============================================================================

/// Live tasks, in submission order.
#[derive(Default)]
pub(crate) struct Registry {
  tasks: Mutex<Vec<Arc<Task>>>,
}

impl Registry {
  pub fn register(&self, task: Arc<Task>) {
    self.tasks.lock().push(task);
  }

  pub fn remove(&self, id: u64) {
    self.tasks.lock().retain(|t| t.id != id);
  }

  /// Whether at least two unfinished tasks are registered.
  pub fn has_pairs(&self) -> bool {
    self
      .tasks
      .lock()
      .iter()
      .filter(|t| !t.is_done())
      .nth(1)
      .is_some()
  }

  /// Drop finished tasks and return the rest.
  pub fn live(&self) -> Vec<Arc<Task>> {
    let mut tasks = self.tasks.lock();
    tasks.retain(|t| !t.is_done());
    tasks.clone()
  }

  /// Live task with exactly these parameters that still accepts subscribers.
  pub fn subscribe_identical(
    &self,
    origin: DVec3,
    destination: IVec3,
    settings: &PathSettings,
    cell: &Arc<ResultCell>,
  ) -> Option<Arc<Task>> {
    let tasks = self.tasks.lock();
    tasks
      .iter()
      .filter(|t| !t.is_done() && t.is_identical(origin, destination, settings))
      .find(|t| t.subscribe(cell.clone()))
      .cloned()
  }

  pub fn abort_all(&self) -> usize {
    let tasks = self.tasks.lock();
    for task in tasks.iter() {
      task.abort();
    }
    tasks.len()
  }
}
