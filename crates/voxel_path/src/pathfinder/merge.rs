//! Merge coordinator - lets concurrent requests share work.
//!
//! A background thread scans live tasks for pairs heading to the same
//! destination with the same settings:
//!
//! - **Perfect**: same origin too. The dependent stops and adopts the
//!   target's outcome.
//! - **Splice**: the dependent's current node already exists in the target's
//!   graph, reachable back to the target's start without one-way edges. The
//!   dependent stops and joins the target's route there.
//!
//! # Splice handshake
//!
//! ```text
//!   coordinator                 target T                  dependent D
//!   lock T.op, D.op (id order)
//!   verify both running,
//!   record D → T, add latch ──► ...steps...               sees dependency,
//!   unlock                                                snapshots prefix
//!                               loop exits:               waits interior_done
//!                               open interior_done ─────► lock T.op, read
//!                               wait splice latches       result + bridge,
//!                                        ◄─────────────── open latch
//!                               build result, detach op
//! ```
//!
//! The target keeps searching after the merge is recorded and may re-parent
//! the contact node, so the walk back to its route is rebuilt and re-checked
//! for one-way edges when the dependent reads it. A splice that cannot be
//! completed hands the dependent back to its own search.
//!
//! Unmatched tasks never notice the coordinator.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, RecvTimeoutError, Sender};
use glam::IVec3;
use parking_lot::{Mutex, MutexGuard};
use tracing::{debug, trace};

use super::task::{Dependency, DependencyKind, Latch, MergeState, PathOutcome, Registry, Task};
use crate::error::PathError;
use crate::operation::PathOperation;
use crate::types::{Movement, PathPoint, PathResult};

/// How often a waiting dependent re-checks its own cancellation.
const DEPENDENT_POLL: Duration = Duration::from_millis(5);

// =============================================================================
// Coordinator thread
// =============================================================================

pub(crate) struct Coordinator {
  wake: Sender<()>,
  thread: JoinHandle<()>,
}

impl Coordinator {
  pub fn spawn(registry: Arc<Registry>, interval: Duration) -> Result<Self, PathError> {
    let (wake, rx) = bounded::<()>(1);
    let thread = thread::Builder::new()
      .name("voxel-path-merge".into())
      .spawn(move || loop {
        // Nothing can merge until a submission adds a second live task.
        let woken = if registry.has_pairs() {
          rx.recv_timeout(interval)
        } else {
          rx.recv().map_err(|_| RecvTimeoutError::Disconnected)
        };
        match woken {
          Ok(()) | Err(RecvTimeoutError::Timeout) => {
            scan(&registry, interval);
          }
          Err(RecvTimeoutError::Disconnected) => break,
        }
      })
      .map_err(|e| PathError::CoordinatorSpawn(e.to_string()))?;
    Ok(Self { wake, thread })
  }

  /// Ask for a scan soon. Never blocks; a pending wake-up is enough.
  pub fn wake(&self) {
    let _ = self.wake.try_send(());
  }

  /// Stop the thread and wait for its current scan to finish.
  pub fn stop(self) {
    let Coordinator { wake, thread } = self;
    drop(wake);
    if thread.join().is_err() {
      tracing::warn!("merge coordinator panicked");
    }
  }
}

// =============================================================================
// Scan
// =============================================================================

/// One pass over the live tasks. Returns the number of merges recorded.
pub(crate) fn scan(registry: &Registry, lock_timeout: Duration) -> usize {
  let tasks = registry.live();
  let mut merged = 0;

  for (i, earlier) in tasks.iter().enumerate() {
    for later in &tasks[i + 1..] {
      if !earlier.is_compatible(later) {
        continue;
      }
      if try_merge(later, earlier, lock_timeout) || try_merge(earlier, later, lock_timeout) {
        merged += 1;
      }
    }
  }

  if merged > 0 {
    debug!(merged, live = tasks.len(), "merge scan");
  }
  merged
}

/// Try to make `dependent` rely on `target`. Both operations are locked in
/// ascending task-id order for the whole check-and-record.
pub(crate) fn try_merge(dependent: &Arc<Task>, target: &Arc<Task>, lock_timeout: Duration) -> bool {
  if dependent.id == target.id || dependent.is_cancelled() || target.is_cancelled() {
    return false;
  }
  let (Some(dep_op), Some(target_op)) = (dependent.attached(), target.attached()) else {
    return false;
  };

  let (dep_guard, target_guard) = if dependent.id < target.id {
    let Some(d) = dep_op.try_lock_for(lock_timeout) else {
      return false;
    };
    let Some(t) = target_op.try_lock_for(lock_timeout) else {
      return false;
    };
    (d, t)
  } else {
    let Some(t) = target_op.try_lock_for(lock_timeout) else {
      return false;
    };
    let Some(d) = dep_op.try_lock_for(lock_timeout) else {
      return false;
    };
    (d, t)
  };

  if !dependent.is_attached_to(&dep_op) || !target.is_attached_to(&target_op) {
    return false;
  }
  if !dep_guard.state().is_running() || !target_guard.state().is_running() {
    return false;
  }
  if dependent.interior_done.is_open() || target.interior_done.is_open() {
    return false;
  }
  if dependent.is_cancelled() || target.is_cancelled() {
    return false;
  }

  let mut dep_merge = dependent.merge.lock();
  let mut target_merge = target.merge.lock();
  if !matches!(*dep_merge, MergeState::Free)
    || !matches!(*target_merge, MergeState::Free | MergeState::Target)
  {
    return false;
  }

  let Some(kind) = prepare(dependent, &dep_guard, target, &target_guard) else {
    return false;
  };

  // Interest that already reached zero stays there, so a target cancelled
  // since the check above is refused here.
  if !target.try_add_interest() {
    return false;
  }

  let spliced = Arc::new(Latch::new());
  if let DependencyKind::Splice { .. } = kind {
    target.add_splice_latch(spliced.clone());
    *target_merge = MergeState::Target;
  }
  *dep_merge = MergeState::Dependent(Dependency {
    target: target.clone(),
    operation: target_op.clone(),
    kind,
    spliced,
  });

  debug!(
    dependent = dependent.id,
    target = target.id,
    ?kind,
    "merged path requests"
  );
  true
}

/// Decide whether (and how) `dependent` can reuse `target`'s search.
///
/// Baseline rules only: same origin, or a contact point whose target chain is
/// fully walkable backwards and rooted at the target's start.
pub(crate) fn prepare(
  dependent: &Task,
  dep_op: &PathOperation,
  target: &Task,
  target_op: &PathOperation,
) -> Option<DependencyKind> {
  if !dependent.is_compatible(target) {
    return None;
  }
  if dependent.origin == target.origin {
    return Some(DependencyKind::Perfect);
  }

  let contact = dep_op.current_position()?;
  let graph = target_op.graph();
  let node = graph.find(contact)?;
  if graph.chain_has_unidirectional(node) {
    trace!(?contact, "contact chain has a one-way edge");
    return None;
  }
  if graph.node(graph.root(node)).position() != target.start {
    return None;
  }
  Some(DependencyKind::Splice { contact })
}

// =============================================================================
// Dependent side
// =============================================================================

/// Produce the dependent's outcome from its target. The caller's operation
/// lock must not be held.
pub(crate) fn resolve(
  task: &Task,
  own: &Arc<Mutex<PathOperation>>,
  dependency: &Dependency,
) -> PathOutcome {
  match dependency.kind {
    DependencyKind::Perfect => loop {
      if let Some(outcome) = dependency.target.outcome.wait_timeout(DEPENDENT_POLL) {
        break outcome;
      }
      if task.is_cancelled() {
        break Err(PathError::Cancelled);
      }
    },
    DependencyKind::Splice { contact } => {
      let (mut prefix, explored) = {
        let op = own.lock();
        let prefix = op
          .chain_to(contact)
          .ok_or(PathError::NoContactPoint(contact))?;
        (prefix, op.graph().len())
      };
      prefix.reverse();

      while !dependency.target.interior_done.wait_timeout(DEPENDENT_POLL) {
        if task.is_cancelled() {
          return Err(PathError::Cancelled);
        }
      }

      let (target_result, bridge) = {
        let target_op = dependency.operation.lock();
        read_target(&dependency.target, &dependency.operation, &target_op, contact)?
      };

      splice(prefix, &bridge, &target_result, contact, explored)
    }
  }
}

/// Read the target's finished route and the walk from `contact` onto it,
/// contact first and ending at the meeting point.
fn read_target(
  target: &Task,
  operation: &Arc<Mutex<PathOperation>>,
  guard: &MutexGuard<'_, PathOperation>,
  contact: IVec3,
) -> Result<(PathResult, Vec<PathPoint>), PathError> {
  if !target.is_attached_to(operation) {
    return Err(PathError::MissingOperation);
  }
  if !guard.state().is_complete() {
    return Err(PathError::TargetIncomplete);
  }
  let result = super::guarded(|| guard.make_result())?;

  let graph = guard.graph();
  let start = graph
    .find(contact)
    .ok_or(PathError::NoContactPoint(contact))?;
  let mut bridge = Vec::new();
  for id in graph.ancestors(start) {
    let node = graph.node(id);
    bridge.push(PathPoint::new(node.position(), node.offset()));
    if result.points.iter().any(|p| p.position == node.position()) {
      break;
    }
    // Moving on to the parent walks this node's edge backwards.
    if node.movement() == Movement::Unidirectional {
      trace!(?contact, at = ?node.position(), "bridge crosses a one-way edge");
      return Err(PathError::OneWayBridge(contact));
    }
  }
  Ok((result, bridge))
}

/// Join a dependent's prefix onto a target's finished route.
///
/// `prefix` runs from the dependent's start to `contact` (inclusive).
/// `bridge` follows the target graph's parent links from `contact` toward
/// the target's root, contact first. The first bridge point found on the target's route is
/// the meeting point; the result is prefix, the bridge points before the
/// meeting point, then the target's route from the meeting point on. Shares
/// exactly one node at `contact` when the contact is itself on the route.
pub(crate) fn splice(
  mut prefix: Vec<PathPoint>,
  bridge: &[PathPoint],
  target: &PathResult,
  contact: IVec3,
  explored: usize,
) -> PathOutcome {
  let meeting = bridge.iter().enumerate().find_map(|(i, b)| {
    target
      .points
      .iter()
      .position(|p| p.position == b.position)
      .map(|j| (i, j))
  });
  let Some((i, j)) = meeting else {
    return Err(PathError::NoContactPoint(contact));
  };

  // The contact itself is already the last prefix point.
  let suffix_from = if i == 0 { j + 1 } else { j };
  prefix.extend(bridge.iter().take(i).skip(1).copied());
  prefix.extend_from_slice(&target.points[suffix_from..]);

  Ok(PathResult::new(prefix, explored, target.success))
}

#[cfg(test)]
#[path = "merge_test.rs"]
mod merge_test;
