//! PathOperation - resumable A* over one graph/queue pair.
//!
//! # Lifecycle
//!
//! ```text
//!   Uninitialized ──init──► Initialized ──step*──► Complete { success }
//!         ▲                                              │
//!         └──────────────────── reset ◄──────────────────┘
//! ```
//!
//! An operation is reused across many requests: `reset` clears its graph and
//! queue but keeps a bounded amount of their storage.

use glam::{DVec3, IVec3};

use crate::constants::{DEFAULT_QUEUE_CAPACITY, RETAINED_GRAPH_CAPACITY};
use crate::error::PathError;
use crate::graph::{NodeGraph, NodeId, NodeQueue};
use crate::settings::{Candidate, PathSettings, Seeds};
use crate::types::{PathPoint, PathResult};

/// Where an operation is in its lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OperationState {
  Uninitialized,
  Initialized,
  Complete { success: bool },
}

impl OperationState {
  /// True between `init` and completion.
  #[inline]
  pub fn is_running(self) -> bool {
    matches!(self, OperationState::Initialized)
  }

  #[inline]
  pub fn is_complete(self) -> bool {
    matches!(self, OperationState::Complete { .. })
  }
}

/// One search, stepped to completion by its owner.
pub struct PathOperation {
  graph: NodeGraph,
  queue: NodeQueue,
  settings: Option<PathSettings>,
  state: OperationState,
  start: IVec3,
  destination: IVec3,
  current: Option<NodeId>,
  best: Option<NodeId>,
  candidates: Vec<Candidate>,
}

impl Default for PathOperation {
  fn default() -> Self {
    Self::new()
  }
}

impl PathOperation {
  pub fn new() -> Self {
    Self {
      graph: NodeGraph::new(),
      queue: NodeQueue::with_capacity(DEFAULT_QUEUE_CAPACITY),
      settings: None,
      state: OperationState::Uninitialized,
      start: IVec3::ZERO,
      destination: IVec3::ZERO,
      current: None,
      best: None,
      candidates: Vec::new(),
    }
  }

  /// Seed the search. Only valid from `Uninitialized`.
  pub fn init(
    &mut self,
    origin: DVec3,
    destination: IVec3,
    settings: &PathSettings,
  ) -> Result<(), PathError> {
    self.expect_state(OperationState::Uninitialized, "init")?;

    let mut seeds = Seeds::new();
    settings.explorer.explore_initial(origin, &mut seeds);

    let start = origin.floor().as_ivec3();
    self.graph.reserve(settings.graph_capacity);

    let heuristic = &settings.heuristic;
    if seeds.is_empty() {
      let id = self
        .graph
        .insert_seed(start, 0.0, heuristic.heuristic(start, destination));
      if let Some(id) = id {
        self.queue.enqueue(&mut self.graph, id)?;
      }
    } else {
      for seed in &seeds {
        let h = heuristic.heuristic(seed.position, destination);
        if let Some(id) = self.graph.insert_seed(seed.position, seed.offset, h) {
          self.queue.enqueue(&mut self.graph, id)?;
        }
      }
    }

    self.start = start;
    self.destination = destination;
    self.best = self.queue.first();
    self.current = None;
    self.settings = Some(settings.clone());
    self.state = OperationState::Initialized;
    Ok(())
  }

  /// Expand one node. Returns `true` once the operation has completed.
  pub fn step(&mut self) -> Result<bool, PathError> {
    self.expect_state(OperationState::Initialized, "step")?;
    let settings = self.settings.as_ref().ok_or(PathError::InvalidState {
      action: "step",
      state: self.state,
    })?;

    let Some(current) = self.queue.dequeue(&mut self.graph) else {
      self.state = OperationState::Complete { success: false };
      return Ok(true);
    };
    self.current = Some(current);

    let node = self.graph.node(current);
    let position = node.position();
    if settings.success.test(position, self.destination) {
      self.best = Some(current);
      self.state = OperationState::Complete { success: true };
      return Ok(true);
    }

    let current_g = node.g();
    let current_h = node.h();

    self.candidates.clear();
    settings
      .explorer
      .explore_each(node, &self.graph, &mut self.candidates);

    let destination = self.destination;
    for candidate in self.candidates.drain(..) {
      let target = self.graph.get_or_insert(candidate.position, candidate.offset, || {
        settings.heuristic.heuristic(candidate.position, destination)
      });
      if target == current {
        continue;
      }

      let g = current_g + settings.heuristic.distance(position, candidate.position);
      if self.graph.relax(target, current, g, candidate.movement) {
        self.queue.enqueue_or_update(&mut self.graph, target);
      }
    }

    let best_h = self
      .best
      .map_or(f32::INFINITY, |best| self.graph.node(best).h());
    if current_h < best_h {
      self.best = Some(current);
    }

    Ok(false)
  }

  /// Package the finished search. Only valid once complete.
  ///
  /// The best chain is snapshotted goal first, handed to the post-processor,
  /// then reversed into travel order.
  pub fn make_result(&self) -> Result<PathResult, PathError> {
    let OperationState::Complete { success } = self.state else {
      return Err(PathError::InvalidState {
        action: "make a result",
        state: self.state,
      });
    };

    let mut chain = match self.best {
      Some(best) => self.graph.chain(best),
      None => Vec::new(),
    };
    if let Some(settings) = &self.settings {
      settings.post_processor.process(&mut chain);
    }
    chain.reverse();

    Ok(PathResult::new(chain, self.graph.len(), success))
  }

  /// Return to `Uninitialized`, keeping a bounded amount of storage.
  pub fn reset(&mut self) {
    self.queue.forget();
    self.queue.trim(DEFAULT_QUEUE_CAPACITY);
    self.graph.clear_and_trim(RETAINED_GRAPH_CAPACITY);
    self.candidates.clear();
    self.settings = None;
    self.current = None;
    self.best = None;
    self.state = OperationState::Uninitialized;
  }

  fn expect_state(&self, expected: OperationState, action: &'static str) -> Result<(), PathError> {
    if self.state == expected {
      Ok(())
    } else {
      Err(PathError::InvalidState {
        action,
        state: self.state,
      })
    }
  }

  // ===== Read access =====

  #[inline]
  pub fn state(&self) -> OperationState {
    self.state
  }

  /// Floored origin of the current request.
  #[inline]
  pub fn start(&self) -> IVec3 {
    self.start
  }

  #[inline]
  pub fn destination(&self) -> IVec3 {
    self.destination
  }

  /// Position of the node most recently dequeued.
  pub fn current_position(&self) -> Option<IVec3> {
    self.current.map(|id| self.graph.node(id).position())
  }

  #[inline]
  pub fn graph(&self) -> &NodeGraph {
    &self.graph
  }

  pub fn queue(&self) -> &NodeQueue {
    &self.queue
  }

  /// Chain from the node at `position` back to its root, goal first.
  pub fn chain_to(&self, position: IVec3) -> Option<Vec<PathPoint>> {
    self.graph.find(position).map(|id| self.graph.chain(id))
  }

  pub fn settings(&self) -> Option<&PathSettings> {
    self.settings.as_ref()
  }
}

#[cfg(test)]
#[path = "operation_test.rs"]
mod operation_test;
