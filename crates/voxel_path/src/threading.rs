//! Worker pool ownership and per-worker operation reuse.
//!
//! Searches run on a rayon pool. Who owns that pool is explicit:
//!
//! - [`WorkerPool::Owned`]: built for one pathfinder, released at shutdown
//! - [`WorkerPool::Shared`]: handed in by the host, never torn down by us
//! - [`WorkerPool::Global`]: rayon's global pool, never torn down
//!
//! Each worker thread gets one reusable [`PathOperation`] slot, addressed by
//! `rayon::current_thread_index()`, so graph and queue allocations survive
//! from one request to the next on the same thread.
//!
//! ```text
//!   worker 0 ──► slots[0] { busy, Arc<Mutex<PathOperation>> }
//!   worker 1 ──► slots[1] { busy, Arc<Mutex<PathOperation>> }
//!   caller   ──► fresh PathOperation (not pooled)
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::error::PathError;
use crate::operation::PathOperation;

/// Rayon pool a pathfinder schedules onto.
pub enum WorkerPool {
  Owned(ThreadPool),
  Shared(Arc<ThreadPool>),
  Global,
}

impl WorkerPool {
  /// Build a private pool. `threads == 0` lets rayon pick.
  pub fn with_threads(threads: usize) -> Result<Self, PathError> {
    ThreadPoolBuilder::new()
      .num_threads(threads)
      .thread_name(|i| format!("voxel-path-{i}"))
      .build()
      .map(WorkerPool::Owned)
      .map_err(|e| PathError::PoolBuild(e.to_string()))
  }

  pub fn shared(pool: Arc<ThreadPool>) -> Self {
    WorkerPool::Shared(pool)
  }

  /// Whether shutting down the pathfinder releases this pool.
  pub fn is_owned(&self) -> bool {
    matches!(self, WorkerPool::Owned(_))
  }

  /// Queue `work` on the pool (non-blocking).
  pub fn spawn<F>(&self, work: F)
  where
    F: FnOnce() + Send + 'static,
  {
    match self {
      WorkerPool::Owned(pool) => pool.spawn(work),
      WorkerPool::Shared(pool) => pool.spawn(work),
      WorkerPool::Global => rayon::spawn(work),
    }
  }

  pub fn num_threads(&self) -> usize {
    match self {
      WorkerPool::Owned(pool) => pool.current_num_threads(),
      WorkerPool::Shared(pool) => pool.current_num_threads(),
      WorkerPool::Global => rayon::current_num_threads(),
    }
  }
}

impl std::fmt::Debug for WorkerPool {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let kind = match self {
      WorkerPool::Owned(_) => "Owned",
      WorkerPool::Shared(_) => "Shared",
      WorkerPool::Global => "Global",
    };
    f.debug_struct("WorkerPool")
      .field("kind", &kind)
      .field("threads", &self.num_threads())
      .finish()
  }
}

// =============================================================================
// Operation slots
// =============================================================================

struct Slot {
  busy: AtomicBool,
  operation: Arc<Mutex<PathOperation>>,
}

/// One reusable operation per worker thread.
pub(crate) struct OperationSlots {
  slots: Box<[Slot]>,
}

impl OperationSlots {
  pub fn new(workers: usize) -> Arc<Self> {
    let slots = (0..workers)
      .map(|_| Slot {
        busy: AtomicBool::new(false),
        operation: Arc::new(Mutex::new(PathOperation::new())),
      })
      .collect();
    Arc::new(Self { slots })
  }

  /// Check out the calling worker's operation.
  ///
  /// Off-pool callers, or a worker whose slot is already out, get a fresh
  /// operation instead.
  pub fn checkout(self: &Arc<Self>) -> Checkout {
    let index = rayon::current_thread_index().filter(|i| *i < self.slots.len());
    if let Some(index) = index {
      let slot = &self.slots[index];
      if slot
        .busy
        .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
        .is_ok()
      {
        return Checkout {
          operation: slot.operation.clone(),
          slot: Some((self.clone(), index)),
        };
      }
    }
    Checkout::fresh()
  }

  #[cfg(test)]
  pub fn is_busy(&self, index: usize) -> bool {
    self.slots[index].busy.load(Ordering::Acquire)
  }
}

/// Exclusive use of one operation. Resets it and returns the slot on drop.
pub(crate) struct Checkout {
  operation: Arc<Mutex<PathOperation>>,
  slot: Option<(Arc<OperationSlots>, usize)>,
}

impl Checkout {
  /// Unpooled operation for inline runs.
  pub fn fresh() -> Self {
    Self {
      operation: Arc::new(Mutex::new(PathOperation::new())),
      slot: None,
    }
  }

  pub fn operation(&self) -> &Arc<Mutex<PathOperation>> {
    &self.operation
  }

  #[cfg(test)]
  pub fn is_pooled(&self) -> bool {
    self.slot.is_some()
  }
}

impl Drop for Checkout {
  fn drop(&mut self) {
    self.operation.lock().reset();
    if let Some((slots, index)) = self.slot.take() {
      slots.slots[index].busy.store(false, Ordering::Release);
    }
  }
}

// =============================================================================
// Tests
// =============================================================================
