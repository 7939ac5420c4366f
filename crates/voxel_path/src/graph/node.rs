//! Node - per-search state for one visited voxel.

use glam::IVec3;

use crate::types::Movement;

/// Stable index of a node inside its [`NodeGraph`](super::NodeGraph) arena.
///
/// Only meaningful for the graph that issued it, and only until that graph is
/// cleared.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
  #[inline]
  pub fn index(self) -> usize {
    self.0 as usize
  }
}

/// Search node.
///
/// `g` starts at `+∞` (seeds start at 0) and only ever decreases, through
/// [`NodeGraph::relax`](super::NodeGraph::relax). `h` is fixed at creation.
#[derive(Clone, Debug)]
pub struct Node {
  position: IVec3,
  offset: f32,
  g: f32,
  h: f32,
  parent: Option<NodeId>,
  movement: Movement,
  pub(crate) heap_index: Option<usize>,
}

impl Node {
  /// Undiscovered node: infinite cost, no parent.
  pub fn new(position: IVec3, offset: f32, h: f32) -> Self {
    Self {
      position,
      offset,
      g: f32::INFINITY,
      h,
      parent: None,
      movement: Movement::Unknown,
      heap_index: None,
    }
  }

  /// Search root with zero cost.
  pub fn seed(position: IVec3, offset: f32, h: f32) -> Self {
    Self {
      g: 0.0,
      ..Self::new(position, offset, h)
    }
  }

  #[inline]
  pub fn position(&self) -> IVec3 {
    self.position
  }

  #[inline]
  pub fn offset(&self) -> f32 {
    self.offset
  }

  /// Best known cost from the origin.
  #[inline]
  pub fn g(&self) -> f32 {
    self.g
  }

  /// Heuristic estimate to the destination.
  #[inline]
  pub fn h(&self) -> f32 {
    self.h
  }

  /// Queue priority, `g + h`.
  #[inline]
  pub fn f(&self) -> f32 {
    self.g + self.h
  }

  #[inline]
  pub fn parent(&self) -> Option<NodeId> {
    self.parent
  }

  /// Directionality of the edge to the parent.
  #[inline]
  pub fn movement(&self) -> Movement {
    self.movement
  }

  /// True while the node sits in the open frontier.
  #[inline]
  pub fn on_heap(&self) -> bool {
    self.heap_index.is_some()
  }

  #[inline]
  pub fn heap_index(&self) -> Option<usize> {
    self.heap_index
  }

  /// Apply a cheaper route. Returns false (and changes nothing) unless `g`
  /// is strictly below the current cost.
  pub(super) fn improve(&mut self, g: f32, parent: NodeId, movement: Movement) -> bool {
    if g < self.g {
      self.g = g;
      self.parent = Some(parent);
      self.movement = movement;
      true
    } else {
      false
    }
  }

  #[cfg(test)]
  pub(crate) fn force_g(&mut self, g: f32) {
    self.g = g;
  }
}
