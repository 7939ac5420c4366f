//! NodeQueue - indexed binary min-heap over graph nodes.
//!
//! The queue stores ids only; priorities are read from the graph on every
//! comparison, so callers must go through [`NodeQueue::changed`] (or
//! [`NodeQueue::enqueue_or_update`]) after lowering a resident node's cost.

use super::heap::{down_heap, up_heap};
use super::{NodeGraph, NodeId};
use crate::error::PathError;

/// Open frontier ordered by `f = g + h`.
#[derive(Clone, Debug, Default)]
pub struct NodeQueue {
  heap: Vec<NodeId>,
}

impl NodeQueue {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_capacity(capacity: usize) -> Self {
    Self {
      heap: Vec::with_capacity(capacity),
    }
  }

  #[inline]
  pub fn len(&self) -> usize {
    self.heap.len()
  }

  #[inline]
  pub fn is_empty(&self) -> bool {
    self.heap.is_empty()
  }

  /// Minimum node without removing it.
  #[inline]
  pub fn first(&self) -> Option<NodeId> {
    self.heap.first().copied()
  }

  /// Add a node that is not yet resident.
  pub fn enqueue(&mut self, graph: &mut NodeGraph, id: NodeId) -> Result<(), PathError> {
    let node = graph.node(id);
    if node.on_heap() {
      return Err(PathError::AlreadyQueued(node.position()));
    }
    self.push(graph, id);
    Ok(())
  }

  fn push(&mut self, graph: &mut NodeGraph, id: NodeId) {
    let slot = self.heap.len();
    self.heap.push(id);
    up_heap(&mut self.heap, graph.nodes_mut(), slot);
  }

  /// Remove and return the node with the smallest `f`.
  pub fn dequeue(&mut self, graph: &mut NodeGraph) -> Option<NodeId> {
    let last = self.heap.pop()?;
    let nodes = graph.nodes_mut();
    if self.heap.is_empty() {
      nodes[last.index()].heap_index = None;
      return Some(last);
    }

    let top = std::mem::replace(&mut self.heap[0], last);
    nodes[top.index()].heap_index = None;
    down_heap(&mut self.heap, nodes, 0);
    Some(top)
  }

  /// Insert `id`, or reposition it if it is already resident.
  pub fn enqueue_or_update(&mut self, graph: &mut NodeGraph, id: NodeId) {
    match graph.node(id).heap_index() {
      Some(slot) => self.reposition(graph, slot),
      None => self.push(graph, id),
    }
  }

  /// Restore heap order after a resident node's cost changed.
  pub fn changed(&mut self, graph: &mut NodeGraph, id: NodeId) -> Result<(), PathError> {
    let node = graph.node(id);
    let slot = node
      .heap_index()
      .ok_or(PathError::NotQueued(node.position()))?;
    self.reposition(graph, slot);
    Ok(())
  }

  fn reposition(&mut self, graph: &mut NodeGraph, slot: usize) {
    let nodes = graph.nodes_mut();
    let slot = up_heap(&mut self.heap, nodes, slot);
    down_heap(&mut self.heap, nodes, slot);
  }

  /// Empty the queue, marking every resident node as not queued.
  pub fn clear(&mut self, graph: &mut NodeGraph) {
    let nodes = graph.nodes_mut();
    for id in self.heap.drain(..) {
      if let Some(node) = nodes.get_mut(id.index()) {
        node.heap_index = None;
      }
    }
  }

  /// Drop every entry without touching nodes. Used when the graph is being
  /// cleared at the same time.
  pub(crate) fn forget(&mut self) {
    self.heap.clear();
  }

  /// Shrink backing storage to at most `capacity` slots.
  pub fn trim(&mut self, capacity: usize) {
    self.heap.shrink_to(capacity);
  }

  pub fn capacity(&self) -> usize {
    self.heap.capacity()
  }

  #[cfg(test)]
  pub(crate) fn ids(&self) -> &[NodeId] {
    &self.heap
  }
}

#[cfg(test)]
#[path = "queue_test.rs"]
mod queue_test;
