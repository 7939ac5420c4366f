use std::sync::Arc;

use parking_lot::Mutex;

use super::*;
use crate::settings::PathPostProcessor;
use crate::space::{HashSpace, Solid};
use crate::test_utils::*;
use crate::types::Movement;

fn run(op: &mut PathOperation) -> PathResult {
  while !op.step().unwrap() {}
  op.make_result().unwrap()
}

fn line_result() -> PathResult {
  let mut op = PathOperation::new();
  op.init(center(IVec3::new(5, 1, 0)), IVec3::new(0, 1, 0), &walking(floor_line(0, 5)))
    .unwrap();
  run(&mut op)
}

#[test]
fn test_flat_floor_route() {
  let result = line_result();

  assert!(result.success);
  assert_eq!(
    result.positions().collect::<Vec<_>>(),
    (0..=5).rev().map(|x| IVec3::new(x, 1, 0)).collect::<Vec<_>>()
  );
  assert!(result.explored >= 6);
}

#[test]
fn test_enclosed_origin_fails_at_origin() {
  let origin = IVec3::new(0, 5, 0);
  let mut space = HashSpace::new();
  for dir in crate::types::Direction::ALL {
    space.set(origin + dir.offset(), Solid::Full);
  }

  let mut op = PathOperation::new();
  op.init(origin.as_dvec3(), IVec3::new(10, 5, 10), &flying(space))
    .unwrap();
  let result = run(&mut op);

  assert!(!result.success);
  assert_eq!(result.start(), Some(origin));
  assert_eq!(result.len(), 1);
  assert_eq!(op.state(), OperationState::Complete { success: false });
}

#[test]
fn test_unreachable_destination_returns_closest_node() {
  let mut op = PathOperation::new();
  op.init(center(IVec3::new(0, 1, 0)), IVec3::new(20, 1, 0), &walking(floor_line(0, 5)))
    .unwrap();
  let result = run(&mut op);

  assert!(!result.success);
  assert_eq!(result.start(), Some(IVec3::new(0, 1, 0)));
  assert_eq!(result.end(), Some(IVec3::new(5, 1, 0)));
}

#[test]
fn test_step_before_init_is_rejected() {
  let mut op = PathOperation::new();
  assert_eq!(
    op.step(),
    Err(PathError::InvalidState {
      action: "step",
      state: OperationState::Uninitialized,
    })
  );
}

#[test]
fn test_make_result_before_complete_is_rejected() {
  let mut op = PathOperation::new();
  assert!(op.make_result().is_err());

  op.init(center(IVec3::new(5, 1, 0)), IVec3::new(0, 1, 0), &walking(floor_line(0, 5)))
    .unwrap();
  assert!(matches!(
    op.make_result(),
    Err(PathError::InvalidState {
      state: OperationState::Initialized,
      ..
    })
  ));
}

#[test]
fn test_step_after_complete_is_rejected() {
  let mut op = PathOperation::new();
  op.init(center(IVec3::new(5, 1, 0)), IVec3::new(0, 1, 0), &walking(floor_line(0, 5)))
    .unwrap();
  run(&mut op);

  assert!(matches!(
    op.step(),
    Err(PathError::InvalidState {
      state: OperationState::Complete { success: true },
      ..
    })
  ));
}

#[test]
fn test_double_init_is_rejected() {
  let settings = walking(floor_line(0, 5));
  let mut op = PathOperation::new();
  op.init(DVec3::ZERO, IVec3::X, &settings).unwrap();

  assert!(op.init(DVec3::ZERO, IVec3::X, &settings).is_err());
}

#[test]
fn test_reset_allows_reuse() {
  let settings = flying(HashSpace::new());
  let mut op = PathOperation::new();

  op.init(DVec3::ZERO, IVec3::new(30, 30, 30), &settings).unwrap();
  let first = run(&mut op);
  assert!(op.graph().len() > 90);

  op.reset();
  assert_eq!(op.state(), OperationState::Uninitialized);
  assert!(op.graph().is_empty());
  assert!(op.queue().is_empty());
  assert!(op.settings().is_none());

  op.init(DVec3::ZERO, IVec3::new(30, 30, 30), &settings).unwrap();
  assert_eq!(run(&mut op), first);
}

#[test]
fn test_reset_trims_storage() {
  let mut op = PathOperation::new();
  op.init(DVec3::ZERO, IVec3::new(40, 40, 40), &flying(HashSpace::new()))
    .unwrap();
  run(&mut op);
  assert!(op.graph().capacity() > RETAINED_GRAPH_CAPACITY);

  op.reset();

  assert!(op.graph().capacity() <= RETAINED_GRAPH_CAPACITY);
  assert!(op.queue().capacity() <= DEFAULT_QUEUE_CAPACITY);
}

#[test]
fn test_origin_cell_used_without_seeds() {
  struct Line;
  impl crate::settings::Explorer for Line {
    fn explore_each(
      &self,
      current: &crate::graph::Node,
      _graph: &NodeGraph,
      out: &mut Vec<Candidate>,
    ) {
      out.push(Candidate::new(
        current.position() + IVec3::X,
        0.0,
        Movement::Bidirectional,
      ));
    }
  }

  let mut op = PathOperation::new();
  op.init(DVec3::new(-0.5, 2.9, 0.1), IVec3::new(3, 2, 0), &settings_for(Arc::new(Line)))
    .unwrap();

  assert_eq!(op.start(), IVec3::new(-1, 2, 0));
  let result = run(&mut op);
  assert!(result.success);
  assert_eq!(result.start(), Some(IVec3::new(-1, 2, 0)));
  assert_eq!(result.len(), 5);
}

#[test]
fn test_post_processor_sees_goal_first_chain() {
  struct Record(Mutex<Vec<IVec3>>);
  impl PathPostProcessor for Record {
    fn process(&self, chain: &mut Vec<PathPoint>) {
      *self.0.lock() = chain.iter().map(|p| p.position).collect();
      chain.retain(|p| p.position.x % 2 == 0);
    }
  }

  let record = Arc::new(Record(Mutex::new(Vec::new())));
  let settings = walking(floor_line(0, 5)).with_post_processor(record.clone());
  let mut op = PathOperation::new();
  op.init(center(IVec3::new(5, 1, 0)), IVec3::new(0, 1, 0), &settings)
    .unwrap();
  let result = run(&mut op);

  assert_eq!(record.0.lock().first(), Some(&IVec3::new(0, 1, 0)));
  assert_eq!(
    result.positions().map(|p| p.x).collect::<Vec<_>>(),
    vec![4, 2, 0]
  );
}

#[test]
fn test_chains_are_acyclic_and_costs_consistent() {
  let mut space = HashSpace::new();
  space.fill(IVec3::new(2, -3, -3), IVec3::new(2, 3, 3), Solid::Full);
  let mut op = PathOperation::new();
  op.init(DVec3::ZERO, IVec3::new(5, 0, 0), &flying(space)).unwrap();
  let result = run(&mut op);
  assert!(result.success);

  let graph = op.graph();
  for (id, node) in graph.iter() {
    if node.g().is_infinite() {
      continue;
    }
    let chain: Vec<_> = graph.ancestors(id).collect();
    assert!(chain.len() <= graph.len());
    assert_eq!(graph.node(*chain.last().unwrap()).position(), IVec3::ZERO);
    if let Some(parent) = node.parent() {
      assert!(graph.node(parent).g() < node.g());
    }
  }
}

#[test]
fn test_current_position_and_chain_to() {
  let mut op = PathOperation::new();
  op.init(center(IVec3::new(5, 1, 0)), IVec3::new(0, 1, 0), &walking(floor_line(0, 5)))
    .unwrap();
  assert_eq!(op.current_position(), None);

  op.step().unwrap();
  op.step().unwrap();

  assert_eq!(op.current_position(), Some(IVec3::new(4, 1, 0)));
  let chain = op.chain_to(IVec3::new(3, 1, 0)).unwrap();
  assert_eq!(
    chain.iter().map(|p| p.position.x).collect::<Vec<_>>(),
    vec![3, 4, 5]
  );
  assert!(op.chain_to(IVec3::new(9, 9, 9)).is_none());
}
