use std::thread;

use glam::DVec3;

use super::*;
use crate::metrics::Resolution;
use crate::pathfinder::task::ResultCell;
use crate::settings::PathSettings;
use crate::test_utils::*;

const LOCK_TIMEOUT: Duration = Duration::from_millis(100);

fn at(x: i32) -> IVec3 {
  IVec3::new(x, 0, 0)
}

fn points(xs: &[i32]) -> Vec<PathPoint> {
  xs.iter().map(|&x| PathPoint::new(at(x), 0.0)).collect()
}

fn xs(result: &PathResult) -> Vec<i32> {
  result.positions().map(|p| p.x).collect()
}

fn corridor(explorer: Corridor) -> PathSettings {
  settings_for(Arc::new(explorer))
}

fn task(id: u64, from: i32, to: i32, settings: &PathSettings) -> Arc<Task> {
  task_between(id, at(from), at(to), settings)
}

fn task_between(id: u64, from: IVec3, to: IVec3, settings: &PathSettings) -> Arc<Task> {
  Arc::new(Task::new(
    id,
    from.as_dvec3(),
    to,
    settings.clone(),
    Arc::new(ResultCell::new()),
  ))
}

/// Attach a fresh operation to `task` and expand `steps` nodes by hand.
fn start(task: &Task, steps: usize) -> Arc<Mutex<PathOperation>> {
  let op = Arc::new(Mutex::new(PathOperation::new()));
  task.attach(op.clone());
  {
    let mut guard = op.lock();
    guard
      .init(task.origin, task.destination, &task.settings)
      .unwrap();
    for _ in 0..steps {
      assert!(!guard.step().unwrap());
    }
  }
  op
}

fn registry(tasks: &[&Arc<Task>]) -> Registry {
  let registry = Registry::default();
  for task in tasks {
    registry.register(Arc::clone(task));
  }
  registry
}

fn solo(from: i32, to: i32, settings: &PathSettings) -> PathResult {
  solo_between(at(from), at(to), settings)
}

fn solo_between(from: IVec3, to: IVec3, settings: &PathSettings) -> PathResult {
  let mut op = PathOperation::new();
  op.init(from.as_dvec3(), to, settings).unwrap();
  while !op.step().unwrap() {}
  op.make_result().unwrap()
}

// Side node C first joins the target's graph through Y over two-way edges,
// then is re-parented through the one-way edge X -> C. The target's route
// S, X, Z never touches C.
const S: IVec3 = IVec3::new(0, 0, 0);
const Y: IVec3 = IVec3::new(0, 0, 1);
const X: IVec3 = IVec3::new(1, 0, 0);
const C: IVec3 = IVec3::new(1, 0, 1);
const Z: IVec3 = IVec3::new(2, 0, 0);
const D: IVec3 = IVec3::new(1, 0, 2);

fn side_door() -> Arc<EdgeTable> {
  Arc::new(
    EdgeTable::new()
      .two_way(S, Y, 1.0)
      .two_way(Y, C, 10.0)
      .two_way(S, X, 2.0)
      .one_way(X, C, 1.0)
      .two_way(X, Z, 5.0)
      .two_way(C, D, 1.0),
  )
}

/// Target S -> Z and dependent D -> Z, merged at C while C's chain in the
/// target's graph is still C, Y, S.
fn merged_at_side_door(
  settings: &PathSettings,
) -> (Arc<Task>, Arc<Mutex<PathOperation>>, Arc<Task>, Arc<Mutex<PathOperation>>) {
  let target = task_between(0, S, Z, settings);
  let dependent = task_between(1, D, Z, settings);
  let t_op = start(&target, 2);
  let d_op = start(&dependent, 2);
  assert_eq!(d_op.lock().current_position(), Some(C));
  assert_eq!(
    prepare(&dependent, &d_op.lock(), &target, &t_op.lock()),
    Some(DependencyKind::Splice { contact: C })
  );

  assert!(try_merge(&dependent, &target, LOCK_TIMEOUT));
  (target, t_op, dependent, d_op)
}

// =============================================================================
// Splice arithmetic
// =============================================================================

#[test]
fn test_splice_contact_on_target_route() {
  let target = PathResult::new(points(&[9, 8, 5, 2, 1]), 40, true);
  let bridge = points(&[5, 8, 9]);

  let result = splice(points(&[7, 6, 5]), &bridge, &target, at(5), 12).unwrap();

  assert_eq!(xs(&result), vec![7, 6, 5, 2, 1]);
  assert_eq!(result.explored, 12);
  assert!(result.success);
}

#[test]
fn test_splice_walks_bridge_to_route() {
  let target = PathResult::new(points(&[9, 8, 1]), 40, true);
  let bridge = points(&[5, 4, 8, 9]);

  let result = splice(points(&[7, 6, 5]), &bridge, &target, at(5), 3).unwrap();

  assert_eq!(xs(&result), vec![7, 6, 5, 4, 8, 1]);
}

#[test]
fn test_splice_keeps_target_failure() {
  let target = PathResult::new(points(&[9, 8, 7]), 40, false);
  let result = splice(points(&[6, 7]), &points(&[7, 8, 9]), &target, at(7), 2).unwrap();

  assert_eq!(xs(&result), vec![6, 7]);
  assert!(!result.success);
}

#[test]
fn test_splice_fails_closed_without_meeting_point() {
  let target = PathResult::new(points(&[1, 2]), 40, true);
  let err = splice(points(&[7, 6, 5]), &points(&[5, 4]), &target, at(5), 3).unwrap_err();

  assert_eq!(err, PathError::NoContactPoint(at(5)));
}

// =============================================================================
// Eligibility
// =============================================================================

#[test]
fn test_identical_origin_is_perfect() {
  let settings = corridor(Corridor::default());
  let target = task(0, 10, 0, &settings);
  let dependent = task(1, 10, 0, &settings);
  let t_op = start(&target, 1);
  let d_op = start(&dependent, 1);

  let kind = prepare(&dependent, &d_op.lock(), &target, &t_op.lock());

  assert_eq!(kind, Some(DependencyKind::Perfect));
}

#[test]
fn test_contact_in_target_graph_is_splice() {
  let settings = corridor(Corridor::default());
  let target = task(0, 10, 0, &settings);
  let dependent = task(1, 20, 0, &settings);
  let t_op = start(&target, 3);
  let d_op = start(&dependent, 10);
  assert_eq!(d_op.lock().current_position(), Some(at(11)));

  let kind = prepare(&dependent, &d_op.lock(), &target, &t_op.lock());

  assert_eq!(kind, Some(DependencyKind::Splice { contact: at(11) }));
}

#[test]
fn test_contact_outside_target_graph_is_rejected() {
  let settings = corridor(Corridor::default());
  let target = task(0, 10, 0, &settings);
  let dependent = task(1, 20, 0, &settings);
  let t_op = start(&target, 3);
  let d_op = start(&dependent, 5);

  assert_eq!(prepare(&dependent, &d_op.lock(), &target, &t_op.lock()), None);
}

#[test]
fn test_one_way_chain_is_rejected() {
  let settings = corridor(Corridor {
    one_way_at: Some(11),
    ..Corridor::default()
  });
  let target = task(0, 10, 0, &settings);
  let dependent = task(1, 20, 0, &settings);
  let t_op = start(&target, 3);
  let d_op = start(&dependent, 10);

  assert_eq!(prepare(&dependent, &d_op.lock(), &target, &t_op.lock()), None);
  assert_eq!(scan(&registry(&[&target, &dependent]), LOCK_TIMEOUT), 0);
  assert!(!dependent.is_dependent());
}

#[test]
fn test_chain_rooted_off_target_start_is_rejected() {
  let settings = corridor(Corridor {
    seed_shift: 1,
    ..Corridor::default()
  });
  let target = task(0, 10, 0, &settings);
  let dependent = task(1, 20, 0, &settings);
  let t_op = start(&target, 3);
  let d_op = start(&dependent, 10);
  // Seeded at 21, so ten expansions end on 12, which the target (seeded at
  // 11) has created.
  assert_eq!(d_op.lock().current_position(), Some(at(12)));
  assert!(t_op.lock().graph().find(at(12)).is_some());

  assert_eq!(prepare(&dependent, &d_op.lock(), &target, &t_op.lock()), None);
}

#[test]
fn test_mismatched_requests_are_rejected() {
  let settings = corridor(Corridor::default());
  let other_settings = corridor(Corridor::default());
  let target = task(0, 10, 0, &settings);
  let elsewhere = task(1, 10, 3, &settings);
  let different = task(2, 10, 0, &other_settings);
  let t_op = start(&target, 1);
  let e_op = start(&elsewhere, 1);
  let d_op = start(&different, 1);

  assert_eq!(prepare(&elsewhere, &e_op.lock(), &target, &t_op.lock()), None);
  assert_eq!(prepare(&different, &d_op.lock(), &target, &t_op.lock()), None);
}

// =============================================================================
// Recording
// =============================================================================

#[test]
fn test_scan_makes_later_task_dependent() {
  let settings = corridor(Corridor::default());
  let target = task(0, 10, 0, &settings);
  let dependent = task(1, 20, 0, &settings);
  let _t_op = start(&target, 3);
  let _d_op = start(&dependent, 10);

  assert_eq!(scan(&registry(&[&target, &dependent]), LOCK_TIMEOUT), 1);
  assert!(dependent.is_dependent());
  assert!(!target.is_dependent());

  // A dependent is never matched twice.
  assert_eq!(scan(&registry(&[&target, &dependent]), LOCK_TIMEOUT), 0);
}

#[test]
fn test_finished_search_is_not_a_target() {
  let settings = corridor(Corridor::default());
  let target = task(0, 10, 0, &settings);
  let dependent = task(1, 10, 0, &settings);
  let _t_op = start(&target, 1);
  let _d_op = start(&dependent, 1);
  target.interior_done.open();

  assert!(!try_merge(&dependent, &target, LOCK_TIMEOUT));
}

#[test]
fn test_detached_task_is_not_merged() {
  let settings = corridor(Corridor::default());
  let target = task(0, 10, 0, &settings);
  let dependent = task(1, 10, 0, &settings);
  let _t_op = start(&target, 1);
  let _d_op = start(&dependent, 1);
  target.detach();

  assert!(!try_merge(&dependent, &target, LOCK_TIMEOUT));
}

#[test]
fn test_busy_operation_times_out() {
  let settings = corridor(Corridor::default());
  let target = task(0, 10, 0, &settings);
  let dependent = task(1, 10, 0, &settings);
  let t_op = start(&target, 1);
  let _d_op = start(&dependent, 1);

  let _held = t_op.lock();
  assert!(!try_merge(&dependent, &target, Duration::from_millis(5)));
  assert!(!dependent.is_dependent());
}

#[test]
fn test_dependency_drop_releases_target() {
  let settings = corridor(Corridor::default());
  let target = task(0, 10, 0, &settings);
  let dependent = task(1, 20, 0, &settings);
  let _t_op = start(&target, 3);
  let _d_op = start(&dependent, 10);
  assert!(try_merge(&dependent, &target, LOCK_TIMEOUT));

  // The only handle on the target goes away; the dependent keeps it alive.
  target.release_interest();
  assert!(!target.is_cancelled());

  let dependency = dependent.take_dependency().unwrap();
  let latch = dependency.spliced.clone();
  drop(dependency);

  assert!(latch.is_open());
  assert!(target.is_cancelled());
}

// =============================================================================
// Full handshake
// =============================================================================

#[test]
fn test_splice_handshake_matches_solo_route() {
  let settings = corridor(Corridor::default());
  let target = task(0, 10, 0, &settings);
  let dependent = task(1, 20, 0, &settings);
  let t_op = start(&target, 3);
  let d_op = start(&dependent, 10);
  assert_eq!(scan(&registry(&[&target, &dependent]), LOCK_TIMEOUT), 1);

  let (t_out, d_out) = thread::scope(|s| {
    let t = s.spawn(|| super::super::run(&target, &t_op));
    let d = s.spawn(|| super::super::run(&dependent, &d_op));
    (t.join().unwrap(), d.join().unwrap())
  });

  let (t_result, t_resolution) = t_out;
  let (d_result, d_resolution) = d_out;
  assert_eq!(t_resolution, Resolution::Searched);
  assert_eq!(d_resolution, Resolution::SpliceMerge);

  let t_result = t_result.unwrap();
  let d_result = d_result.unwrap();
  assert_eq!(xs(&t_result), (0..=10).rev().collect::<Vec<_>>());
  assert_eq!(xs(&d_result), (0..=20).rev().collect::<Vec<_>>());
  assert!(d_result.success);
  assert_eq!(d_result.points, solo(20, 0, &settings).points);

  // Both operations have been released.
  assert!(target.attached().is_none());
  assert!(dependent.attached().is_none());
}

#[test]
fn test_perfect_handshake_adopts_target_outcome() {
  let settings = corridor(Corridor::default());
  let target = task(0, 10, 0, &settings);
  let dependent = task(1, 10, 0, &settings);
  let t_op = start(&target, 1);
  let d_op = start(&dependent, 1);
  assert_eq!(scan(&registry(&[&target, &dependent]), LOCK_TIMEOUT), 1);

  let (t_out, d_out) = thread::scope(|s| {
    let t = s.spawn(|| {
      let (outcome, _) = super::super::run(&target, &t_op);
      target.complete(outcome.clone());
      outcome
    });
    let d = s.spawn(|| super::super::run(&dependent, &d_op));
    (t.join().unwrap(), d.join().unwrap())
  });

  let (d_result, d_resolution) = d_out;
  assert_eq!(d_resolution, Resolution::PerfectMerge);
  assert_eq!(d_result.unwrap(), t_out.unwrap());
}

#[test]
fn test_cancelled_dependent_stops_waiting() {
  let settings = corridor(Corridor::default());
  let target = task(0, 10, 0, &settings);
  let dependent = task(1, 10, 0, &settings);
  let _t_op = start(&target, 1);
  let d_op = start(&dependent, 1);
  assert!(try_merge(&dependent, &target, LOCK_TIMEOUT));

  // The target never finishes; cancelling the dependent must still return.
  dependent.release_interest();
  let (outcome, _) = super::super::run(&dependent, &d_op);

  assert_eq!(outcome, Err(PathError::Cancelled));
  assert!(dependent.attached().is_none());
}

// =============================================================================
// Re-parented contact
// =============================================================================

#[test]
fn test_bridge_rechecked_after_contact_reparented() {
  let table = side_door();
  let settings = table_settings(table);
  let (target, t_op, _dependent, _d_op) = merged_at_side_door(&settings);

  // Left alone, the target reaches C more cheaply through the one-way edge.
  {
    let mut op = t_op.lock();
    while !op.step().unwrap() {}
    assert_eq!(op.make_result().unwrap().positions().collect::<Vec<_>>(), vec![S, X, Z]);
    let c = op.graph().find(C).unwrap();
    assert_eq!(op.graph().node(c).movement(), Movement::Unidirectional);
  }

  let err = read_target(&target, &t_op, &t_op.lock(), C).unwrap_err();
  assert_eq!(err, PathError::OneWayBridge(C));
}

#[test]
fn test_bridge_stops_at_meeting_point() {
  let settings = corridor(Corridor::default());
  let target = task(0, 10, 0, &settings);
  let t_op = start(&target, 0);
  {
    let mut op = t_op.lock();
    while !op.step().unwrap() {}
  }

  let (result, bridge) = read_target(&target, &t_op, &t_op.lock(), at(11)).unwrap();

  assert_eq!(xs(&result), (0..=10).rev().collect::<Vec<_>>());
  assert_eq!(bridge, points(&[11, 10]));
}

#[test]
fn test_failed_splice_falls_back_to_own_search() {
  let table = side_door();
  let settings = table_settings(table.clone());
  let (target, t_op, dependent, d_op) = merged_at_side_door(&settings);

  let (t_out, d_out) = thread::scope(|s| {
    let t = s.spawn(|| super::super::run(&target, &t_op));
    let d = s.spawn(|| super::super::run(&dependent, &d_op));
    (t.join().unwrap(), d.join().unwrap())
  });

  let (t_result, _) = t_out;
  assert_eq!(t_result.unwrap().positions().collect::<Vec<_>>(), vec![S, X, Z]);

  let (d_result, d_resolution) = d_out;
  let d_result = d_result.unwrap();
  assert_eq!(d_resolution, Resolution::Searched);
  assert!(d_result.success);
  assert_eq!(d_result.points, solo_between(D, Z, &settings).points);
  for pair in d_result.points.windows(2) {
    assert!(
      table.allows(pair[0].position, pair[1].position),
      "route moves {} -> {} without an edge",
      pair[0].position,
      pair[1].position
    );
  }
}

// =============================================================================
// Cancellation against merging
// =============================================================================

#[test]
fn test_cancelled_interest_is_never_revived() {
  let settings = corridor(Corridor::default());
  let target = task(0, 10, 0, &settings);

  assert!(target.try_add_interest());
  target.release_interest();
  target.release_interest();

  assert!(target.is_cancelled());
  assert!(!target.try_add_interest());
  assert!(!target.subscribe(Arc::new(ResultCell::new())));
  assert!(target.is_cancelled());
}

#[test]
fn test_cancelled_search_refuses_dependents() {
  let settings = corridor(Corridor::default());
  let target = task(0, 10, 0, &settings);
  let dependent = task(1, 20, 0, &settings);
  let t_op = start(&target, 3);
  let _d_op = start(&dependent, 10);

  target.release_interest();
  let stopped = super::super::execute(&target, &t_op);

  assert!(matches!(stopped, Err(PathError::Cancelled)));
  assert!(target.interior_done.is_open());
  assert_eq!(scan(&registry(&[&target, &dependent]), LOCK_TIMEOUT), 0);
  assert!(!dependent.is_dependent());
}

// =============================================================================
// Coordinator
// =============================================================================

#[test]
fn test_registry_pairs_need_two_live_tasks() {
  let settings = corridor(Corridor::default());
  let first = task(0, 10, 0, &settings);
  let second = task(1, 20, 0, &settings);
  let registry = registry(&[&first]);
  assert!(!registry.has_pairs());

  registry.register(second.clone());
  assert!(registry.has_pairs());

  second.complete(Err(PathError::Cancelled));
  assert!(!registry.has_pairs());
}

#[test]
fn test_idle_coordinator_scans_when_woken() {
  let settings = corridor(Corridor::default());
  let target = task(0, 10, 0, &settings);
  let dependent = task(1, 20, 0, &settings);
  let registry = Arc::new(Registry::default());
  // Far longer than the test: only a wake-up can trigger the scan.
  let coordinator = Coordinator::spawn(registry.clone(), Duration::from_secs(3600)).unwrap();

  let _t_op = start(&target, 3);
  let _d_op = start(&dependent, 10);
  registry.register(target.clone());
  registry.register(dependent.clone());
  coordinator.wake();

  assert!(wait_until(Duration::from_secs(10), || dependent.is_dependent()));
  coordinator.stop();
}
