//! Test utilities shared by the operation, scheduler and merge tests.
//!
//! Provides small fixed worlds, settings builders and instrumented explorers
//! that count or block expansions.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use glam::{DVec3, IVec3};
use parking_lot::{Condvar, Mutex};
use web_time::Instant;

use crate::explorer::{DirectionalExplorer, Manhattan};
use crate::graph::{Node, NodeGraph};
use crate::settings::{Candidate, Explorer, Heuristic, PathSettings, Seeds};
use crate::space::{HashSpace, Solid};
use crate::types::Movement;

// =============================================================================
// Worlds
// =============================================================================

/// One-wide floor at y = 0, z = 0 for x in `from..=to`.
pub fn floor_line(from: i32, to: i32) -> HashSpace {
  let mut space = HashSpace::new();
  space.fill(IVec3::new(from, 0, 0), IVec3::new(to, 0, 0), Solid::Full);
  space
}

/// Walking agent on `space`, Manhattan costs.
pub fn walking(space: HashSpace) -> PathSettings {
  PathSettings::new(
    Arc::new(DirectionalExplorer::walking(space)),
    Arc::new(Manhattan),
  )
}

/// Flying agent on `space`, Manhattan costs.
pub fn flying(space: HashSpace) -> PathSettings {
  PathSettings::new(
    Arc::new(DirectionalExplorer::flying(space)),
    Arc::new(Manhattan),
  )
}

/// Voxel-centre origin for an integer cell.
pub fn center(p: IVec3) -> DVec3 {
  p.as_dvec3() + DVec3::new(0.5, 0.0, 0.5)
}

// =============================================================================
// Gate
// =============================================================================

/// Latch that holds expanding threads until the test opens it.
#[derive(Default)]
pub struct Gate {
  open: Mutex<bool>,
  cv: Condvar,
  arrivals: AtomicUsize,
}

impl Gate {
  pub fn new() -> Arc<Self> {
    Arc::new(Self::default())
  }

  pub fn open(&self) {
    *self.open.lock() = true;
    self.cv.notify_all();
  }

  pub fn is_open(&self) -> bool {
    *self.open.lock()
  }

  fn pass(&self) {
    self.arrivals.fetch_add(1, Ordering::SeqCst);
    let mut open = self.open.lock();
    while !*open {
      self.cv.wait(&mut open);
    }
  }

  /// Number of expansions that reached the gate.
  pub fn arrivals(&self) -> usize {
    self.arrivals.load(Ordering::SeqCst)
  }

  /// Block until `n` expansions reached the gate. Returns false on timeout.
  pub fn wait_arrivals(&self, n: usize, timeout: Duration) -> bool {
    wait_until(timeout, || self.arrivals() >= n)
  }
}

/// Poll `cond` until it holds or `timeout` elapses.
pub fn wait_until(timeout: Duration, mut cond: impl FnMut() -> bool) -> bool {
  let deadline = Instant::now() + timeout;
  while Instant::now() < deadline {
    if cond() {
      return true;
    }
    std::thread::sleep(Duration::from_millis(1));
  }
  cond()
}

// =============================================================================
// Instrumented explorers
// =============================================================================

/// Wraps an explorer, counting expansions and optionally blocking on a gate
/// or sleeping on each one.
pub struct Instrumented<E> {
  inner: E,
  calls: AtomicUsize,
  gate: Option<Arc<Gate>>,
  delay: Option<Duration>,
}

impl<E: Explorer> Instrumented<E> {
  pub fn new(inner: E) -> Self {
    Self {
      inner,
      calls: AtomicUsize::new(0),
      gate: None,
      delay: None,
    }
  }

  pub fn gated(inner: E, gate: Arc<Gate>) -> Self {
    Self {
      gate: Some(gate),
      ..Self::new(inner)
    }
  }

  pub fn slowed(inner: E, delay: Duration) -> Self {
    Self {
      delay: Some(delay),
      ..Self::new(inner)
    }
  }

  pub fn calls(&self) -> usize {
    self.calls.load(Ordering::SeqCst)
  }
}

impl<E: Explorer> Explorer for Instrumented<E> {
  fn explore_initial(&self, origin: DVec3, seeds: &mut Seeds) {
    self.inner.explore_initial(origin, seeds);
  }

  fn explore_each(&self, current: &Node, graph: &NodeGraph, out: &mut Vec<Candidate>) {
    self.calls.fetch_add(1, Ordering::SeqCst);
    if let Some(gate) = &self.gate {
      gate.pass();
    }
    if let Some(delay) = self.delay {
      std::thread::sleep(delay);
    }
    self.inner.explore_each(current, graph, out);
  }
}

/// Explorer whose expansion always panics.
pub struct Panicking;

impl Explorer for Panicking {
  fn explore_each(&self, _current: &Node, _graph: &NodeGraph, _out: &mut Vec<Candidate>) {
    panic!("explorer blew up");
  }
}

/// Settings that share `explorer` and use Manhattan costs.
pub fn settings_for(explorer: Arc<dyn Explorer>) -> PathSettings {
  PathSettings::new(explorer, Arc::new(Manhattan))
}

/// Agent confined to the x axis, one cell per step in either direction.
///
/// `one_way_at` marks every edge entering that x as one-way; `seed_shift`
/// moves the seed that many cells along x from the floored origin.
#[derive(Default)]
pub struct Corridor {
  pub one_way_at: Option<i32>,
  pub seed_shift: i32,
}

impl Explorer for Corridor {
  fn explore_initial(&self, origin: DVec3, seeds: &mut Seeds) {
    if self.seed_shift != 0 {
      let start = origin.floor().as_ivec3();
      seeds.push(crate::settings::Seed::new(start + IVec3::X * self.seed_shift, 0.0));
    }
  }

  fn explore_each(&self, current: &Node, _graph: &NodeGraph, out: &mut Vec<Candidate>) {
    for dx in [-1, 1] {
      let next = current.position() + IVec3::X * dx;
      let movement = if self.one_way_at == Some(next.x) {
        Movement::Unidirectional
      } else {
        Movement::Bidirectional
      };
      out.push(Candidate::new(next, 0.0, movement));
    }
  }
}

/// Hand-built directed graph with a cost per edge and a zero heuristic, so
/// expansion order follows path cost alone.
#[derive(Default)]
pub struct EdgeTable {
  edges: HashMap<IVec3, Vec<(IVec3, f32, Movement)>>,
}

impl EdgeTable {
  pub fn new() -> Self {
    Self::default()
  }

  /// Walkable in both directions at `cost`.
  pub fn two_way(mut self, a: IVec3, b: IVec3, cost: f32) -> Self {
    self.link(a, b, cost, Movement::Bidirectional);
    self.link(b, a, cost, Movement::Bidirectional);
    self
  }

  /// Walkable from `from` to `to` only.
  pub fn one_way(mut self, from: IVec3, to: IVec3, cost: f32) -> Self {
    self.link(from, to, cost, Movement::Unidirectional);
    self
  }

  fn link(&mut self, from: IVec3, to: IVec3, cost: f32, movement: Movement) {
    self.edges.entry(from).or_default().push((to, cost, movement));
  }

  fn edge(&self, from: IVec3, to: IVec3) -> Option<f32> {
    self
      .edges
      .get(&from)?
      .iter()
      .find(|(next, _, _)| *next == to)
      .map(|(_, cost, _)| *cost)
  }

  /// Whether an agent may move from `from` straight to `to`.
  pub fn allows(&self, from: IVec3, to: IVec3) -> bool {
    self.edge(from, to).is_some()
  }
}

impl Explorer for EdgeTable {
  fn explore_each(&self, current: &Node, _graph: &NodeGraph, out: &mut Vec<Candidate>) {
    for &(next, _, movement) in self.edges.get(&current.position()).into_iter().flatten() {
      out.push(Candidate::new(next, 0.0, movement));
    }
  }
}

impl Heuristic for EdgeTable {
  fn heuristic(&self, _from: IVec3, _to: IVec3) -> f32 {
    0.0
  }

  fn distance(&self, from: IVec3, to: IVec3) -> f32 {
    self.edge(from, to).unwrap_or(f32::INFINITY)
  }
}

/// Settings using `table` for both movement and costs.
pub fn table_settings(table: Arc<EdgeTable>) -> PathSettings {
  PathSettings::new(table.clone(), table)
}
