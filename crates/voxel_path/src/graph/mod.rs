//! Search graph: node arena plus the indexed open-frontier queue.
//!
//! Nodes live in a flat arena addressed by [`NodeId`]; a position map finds
//! the node already created for a voxel. Parent links are ids into the same
//! arena, so chains are read without touching any other graph.
//!
//! ```text
//!   positions: HashMap<IVec3, NodeId>      nodes: Vec<Node>
//!   (5,1,0) ──► 0 ───────────────────────► [0] g=0   parent=None
//!   (4,1,0) ──► 1 ───────────────────────► [1] g=1   parent=0
//!   (3,1,0) ──► 2 ───────────────────────► [2] g=2   parent=1
//!
//!   heap: Vec<NodeId>   [2, ...]   (node.heap_index mirrors the slot)
//! ```
//!
//! # Module Structure
//!
//! - [`node`]: `Node`, `NodeId`
//! - `heap`: sift primitives shared by the queue
//! - [`queue`]: `NodeQueue` binary min-heap keyed by `f = g + h`

mod heap;
pub mod node;
pub mod queue;

use std::collections::HashMap;

use glam::IVec3;

pub use node::{Node, NodeId};
pub use queue::NodeQueue;

use crate::types::{Movement, PathPoint};

/// Arena of search nodes owned by one operation.
#[derive(Clone, Debug, Default)]
pub struct NodeGraph {
  nodes: Vec<Node>,
  positions: HashMap<IVec3, NodeId>,
}

impl NodeGraph {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_capacity(capacity: usize) -> Self {
    Self {
      nodes: Vec::with_capacity(capacity),
      positions: HashMap::with_capacity(capacity),
    }
  }

  /// Make room for at least `additional` more nodes.
  pub fn reserve(&mut self, additional: usize) {
    self.nodes.reserve(additional);
    self.positions.reserve(additional);
  }

  /// Number of nodes created so far.
  #[inline]
  pub fn len(&self) -> usize {
    self.nodes.len()
  }

  #[inline]
  pub fn is_empty(&self) -> bool {
    self.nodes.is_empty()
  }

  pub fn capacity(&self) -> usize {
    self.nodes.capacity()
  }

  /// Node by id.
  ///
  /// # Panics
  ///
  /// If `id` was not issued by this graph since its last clear.
  #[inline]
  pub fn node(&self, id: NodeId) -> &Node {
    &self.nodes[id.index()]
  }

  /// Id of the node created for `position`, if any.
  #[inline]
  pub fn find(&self, position: IVec3) -> Option<NodeId> {
    self.positions.get(&position).copied()
  }

  pub fn node_at(&self, position: IVec3) -> Option<&Node> {
    self.find(position).map(|id| self.node(id))
  }

  pub fn contains(&self, position: IVec3) -> bool {
    self.positions.contains_key(&position)
  }

  pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Node)> + '_ {
    self
      .nodes
      .iter()
      .enumerate()
      .map(|(i, n)| (NodeId(i as u32), n))
  }

  /// Return the node for `position`, creating an undiscovered one when absent.
  ///
  /// `h` is only evaluated on creation; an existing node keeps its offset and
  /// heuristic.
  pub fn get_or_insert(&mut self, position: IVec3, offset: f32, h: impl FnOnce() -> f32) -> NodeId {
    if let Some(id) = self.find(position) {
      return id;
    }
    self.push(Node::new(position, offset, h()))
  }

  /// Insert a zero-cost root. Returns `None` if the position already exists.
  pub fn insert_seed(&mut self, position: IVec3, offset: f32, h: f32) -> Option<NodeId> {
    if self.contains(position) {
      return None;
    }
    Some(self.push(Node::seed(position, offset, h)))
  }

  fn push(&mut self, node: Node) -> NodeId {
    let id = NodeId(self.nodes.len() as u32);
    self.positions.insert(node.position(), id);
    self.nodes.push(node);
    id
  }

  /// Record a cheaper route to `id` through `parent`.
  ///
  /// The only way a node's cost changes. Returns false and leaves the node
  /// untouched unless `g` is strictly below its current cost.
  pub fn relax(&mut self, id: NodeId, parent: NodeId, g: f32, movement: Movement) -> bool {
    debug_assert_ne!(id, parent, "node cannot be its own parent");
    self.nodes[id.index()].improve(g, parent, movement)
  }

  /// Walk parent links from `id` up to its root, `id` first.
  pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
    Ancestors {
      graph: self,
      next: Some(id),
      remaining: self.nodes.len(),
    }
  }

  /// Snapshot of the chain from `id` back to its root, goal first.
  pub fn chain(&self, id: NodeId) -> Vec<PathPoint> {
    self
      .ancestors(id)
      .map(|a| {
        let node = self.node(a);
        PathPoint::new(node.position(), node.offset())
      })
      .collect()
  }

  /// Root of the chain through `id`.
  pub fn root(&self, id: NodeId) -> NodeId {
    self.ancestors(id).last().unwrap_or(id)
  }

  /// True if any edge on the chain from `id` back to its root is one-way.
  pub fn chain_has_unidirectional(&self, id: NodeId) -> bool {
    self
      .ancestors(id)
      .any(|a| self.node(a).movement() == Movement::Unidirectional)
  }

  /// Drop every node and shrink storage down to `retain` slots.
  pub fn clear_and_trim(&mut self, retain: usize) {
    self.nodes.clear();
    self.positions.clear();
    self.nodes.shrink_to(retain);
    self.positions.shrink_to(retain);
  }

  #[inline]
  pub(crate) fn nodes_mut(&mut self) -> &mut [Node] {
    &mut self.nodes
  }

  #[cfg(test)]
  pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut Node {
    &mut self.nodes[id.index()]
  }
}

/// Iterator over a parent chain. Bounded by the graph size, so a corrupted
/// link can never loop forever.
pub struct Ancestors<'a> {
  graph: &'a NodeGraph,
  next: Option<NodeId>,
  remaining: usize,
}

impl Iterator for Ancestors<'_> {
  type Item = NodeId;

  fn next(&mut self) -> Option<NodeId> {
    if self.remaining == 0 {
      return None;
    }
    let id = self.next?;
    self.remaining -= 1;
    self.next = self.graph.node(id).parent();
    Some(id)
  }
}
