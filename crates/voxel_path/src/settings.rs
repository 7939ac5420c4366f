//! Search collaborators and the settings bundle that carries them.
//!
//! An operation never knows how the agent moves. It asks an [`Explorer`] for
//! seeds and neighbours, a [`Heuristic`] for costs, a [`SuccessPredicate`]
//! whether it has arrived and a [`PathPostProcessor`] to reshape the finished
//! chain. [`PathSettings`] bundles one of each behind `Arc`s so it can be
//! cloned into every task cheaply.

use std::fmt;
use std::sync::Arc;

use glam::{DVec3, IVec3};
use smallvec::SmallVec;

use crate::graph::{Node, NodeGraph};
use crate::types::{Movement, PathPoint};

/// Starting node proposed by an explorer.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Seed {
  pub position: IVec3,
  pub offset: f32,
}

impl Seed {
  pub fn new(position: IVec3, offset: f32) -> Self {
    Self { position, offset }
  }
}

/// Reachable neighbour proposed by an explorer.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Candidate {
  pub position: IVec3,
  pub offset: f32,
  /// Directionality of the edge from the current node to this one.
  pub movement: Movement,
}

impl Candidate {
  pub fn new(position: IVec3, offset: f32, movement: Movement) -> Self {
    Self {
      position,
      offset,
      movement,
    }
  }
}

/// Seed buffer; explorers rarely propose more than a handful.
pub type Seeds = SmallVec<[Seed; 4]>;

/// Movement rules of the agent.
///
/// Must be deterministic for a given environment snapshot and safe to call
/// from many searches at once.
pub trait Explorer: Send + Sync {
  /// Propose starting nodes around `origin`.
  ///
  /// Leaving `seeds` empty makes the search start from `origin.floor()`.
  fn explore_initial(&self, origin: DVec3, seeds: &mut Seeds) {
    let _ = (origin, seeds);
  }

  /// Push every node reachable in one move from `current`.
  ///
  /// `graph` is read-only context (e.g. to look up the parent).
  fn explore_each(&self, current: &Node, graph: &NodeGraph, out: &mut Vec<Candidate>);
}

/// Cost model.
pub trait Heuristic: Send + Sync {
  /// Estimated remaining cost from `from` to `to`. Fixed per node at creation.
  fn heuristic(&self, from: IVec3, to: IVec3) -> f32;

  /// Actual cost of one move between adjacent nodes.
  fn distance(&self, from: IVec3, to: IVec3) -> f32;
}

/// Arrival test, evaluated on every dequeued node.
pub trait SuccessPredicate: Send + Sync {
  fn test(&self, current: IVec3, destination: IVec3) -> bool;
}

impl<F> SuccessPredicate for F
where
  F: Fn(IVec3, IVec3) -> bool + Send + Sync,
{
  fn test(&self, current: IVec3, destination: IVec3) -> bool {
    self(current, destination)
  }
}

/// Succeed only on the destination voxel itself.
#[derive(Clone, Copy, Debug, Default)]
pub struct ExactMatch;

impl SuccessPredicate for ExactMatch {
  fn test(&self, current: IVec3, destination: IVec3) -> bool {
    current == destination
  }
}

/// Reshapes the finished chain before it is published.
///
/// Receives the chain goal first (destination or best node at index 0, the
/// search root last).
pub trait PathPostProcessor: Send + Sync {
  fn process(&self, chain: &mut Vec<PathPoint>);
}

/// Leaves the chain untouched.
#[derive(Clone, Copy, Debug, Default)]
pub struct Identity;

impl PathPostProcessor for Identity {
  fn process(&self, _chain: &mut Vec<PathPoint>) {}
}

/// Everything a search needs besides its endpoints.
///
/// Two settings are equal when they share the very same collaborators and ask
/// for the same graph capacity; only equal settings can merge.
#[derive(Clone)]
pub struct PathSettings {
  pub explorer: Arc<dyn Explorer>,
  pub heuristic: Arc<dyn Heuristic>,
  pub success: Arc<dyn SuccessPredicate>,
  pub post_processor: Arc<dyn PathPostProcessor>,
  /// Nodes reserved in the graph at init.
  pub graph_capacity: usize,
}

impl PathSettings {
  pub fn new(explorer: Arc<dyn Explorer>, heuristic: Arc<dyn Heuristic>) -> Self {
    Self {
      explorer,
      heuristic,
      success: Arc::new(ExactMatch),
      post_processor: Arc::new(Identity),
      graph_capacity: 0,
    }
  }

  pub fn with_success_predicate(mut self, success: Arc<dyn SuccessPredicate>) -> Self {
    self.success = success;
    self
  }

  pub fn with_post_processor(mut self, post_processor: Arc<dyn PathPostProcessor>) -> Self {
    self.post_processor = post_processor;
    self
  }

  pub fn with_graph_capacity(mut self, graph_capacity: usize) -> Self {
    self.graph_capacity = graph_capacity;
    self
  }
}

impl PartialEq for PathSettings {
  fn eq(&self, other: &Self) -> bool {
    Arc::ptr_eq(&self.explorer, &other.explorer)
      && Arc::ptr_eq(&self.heuristic, &other.heuristic)
      && Arc::ptr_eq(&self.success, &other.success)
      && Arc::ptr_eq(&self.post_processor, &other.post_processor)
      && self.graph_capacity == other.graph_capacity
  }
}

impl Eq for PathSettings {}

impl fmt::Debug for PathSettings {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("PathSettings")
      .field("explorer", &Arc::as_ptr(&self.explorer))
      .field("heuristic", &Arc::as_ptr(&self.heuristic))
      .field("graph_capacity", &self.graph_capacity)
      .finish_non_exhaustive()
  }
}
