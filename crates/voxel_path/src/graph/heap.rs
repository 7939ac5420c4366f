//! Binary min-heap primitives over node ids.
//!
//! Ordering is by `f` only. Sift-up stops at a parent that is `<=` the moving
//! node, sift-down stops when the moving node is `<=` the smaller child, so
//! equal-priority nodes never overtake each other. Every node moved writes its
//! new slot back into the arena.

use std::cmp::Ordering;

use super::node::{Node, NodeId};

#[inline]
fn le(nodes: &[Node], a: NodeId, b: NodeId) -> bool {
  nodes[a.index()].f().total_cmp(&nodes[b.index()].f()) != Ordering::Greater
}

#[inline]
fn lt(nodes: &[Node], a: NodeId, b: NodeId) -> bool {
  nodes[a.index()].f().total_cmp(&nodes[b.index()].f()) == Ordering::Less
}

/// Move the node at `i` towards the root. Returns its final slot.
pub(super) fn up_heap(heap: &mut [NodeId], nodes: &mut [Node], mut i: usize) -> usize {
  let moving = heap[i];
  while i != 0 {
    let parent_slot = (i - 1) >> 1;
    let parent = heap[parent_slot];
    if le(nodes, parent, moving) {
      break;
    }

    heap[i] = parent;
    nodes[parent.index()].heap_index = Some(i);
    i = parent_slot;
  }

  heap[i] = moving;
  nodes[moving.index()].heap_index = Some(i);
  i
}

/// Move the node at `i` towards the leaves. Returns its final slot.
pub(super) fn down_heap(heap: &mut [NodeId], nodes: &mut [Node], mut i: usize) -> usize {
  let size = heap.len();
  let moving = heap[i];
  loop {
    let mut child = (i << 1) + 1;
    if child >= size {
      break;
    }

    let right = child + 1;
    if right < size && lt(nodes, heap[right], heap[child]) {
      child = right;
    }

    let child_id = heap[child];
    if le(nodes, moving, child_id) {
      break;
    }

    heap[i] = child_id;
    nodes[child_id.index()].heap_index = Some(i);
    i = child;
  }

  heap[i] = moving;
  nodes[moving.index()].heap_index = Some(i);
  i
}
