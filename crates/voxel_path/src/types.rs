//! Core value types shared by the search engine and its collaborators.

use glam::IVec3;

/// Axis-aligned unit step through the voxel grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
  North,
  East,
  South,
  West,
  Up,
  Down,
}

impl Direction {
  /// All six face-adjacent directions.
  pub const ALL: [Direction; 6] = [
    Direction::North,
    Direction::East,
    Direction::South,
    Direction::West,
    Direction::Up,
    Direction::Down,
  ];

  /// The four directions that keep the same height.
  pub const HORIZONTAL: [Direction; 4] = [
    Direction::North,
    Direction::East,
    Direction::South,
    Direction::West,
  ];

  /// Grid offset of one step in this direction.
  #[inline]
  pub const fn offset(self) -> IVec3 {
    match self {
      Direction::North => IVec3::new(0, 0, -1),
      Direction::East => IVec3::new(1, 0, 0),
      Direction::South => IVec3::new(0, 0, 1),
      Direction::West => IVec3::new(-1, 0, 0),
      Direction::Up => IVec3::new(0, 1, 0),
      Direction::Down => IVec3::new(0, -1, 0),
    }
  }
}

/// Directionality of the edge between a node and its parent.
///
/// Seeds have no parent and keep `Unknown`. A `Unidirectional` edge (a drop,
/// a one-way door) cannot be walked back, which blocks splice merges across it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Movement {
  #[default]
  Unknown,
  Bidirectional,
  Unidirectional,
}

/// One entry of a finished route.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PathPoint {
  /// Voxel the agent occupies.
  pub position: IVec3,
  /// Vertical sub-cell offset inside that voxel (e.g. standing on a slab).
  pub offset: f32,
}

impl PathPoint {
  pub fn new(position: IVec3, offset: f32) -> Self {
    Self { position, offset }
  }
}

/// Immutable outcome of one search.
///
/// `points` runs from the origin to the destination when `success` is set.
/// On failure it runs from the origin to the explored node closest to the
/// destination by heuristic.
#[derive(Clone, Debug, PartialEq)]
pub struct PathResult {
  pub points: Vec<PathPoint>,
  /// Number of nodes the search created (its graph size).
  pub explored: usize,
  pub success: bool,
}

impl PathResult {
  pub fn new(points: Vec<PathPoint>, explored: usize, success: bool) -> Self {
    Self {
      points,
      explored,
      success,
    }
  }

  /// Iterate over the voxel positions in travel order.
  pub fn positions(&self) -> impl Iterator<Item = IVec3> + '_ {
    self.points.iter().map(|p| p.position)
  }

  pub fn len(&self) -> usize {
    self.points.len()
  }

  pub fn is_empty(&self) -> bool {
    self.points.is_empty()
  }

  /// First point of the route (the origin node).
  pub fn start(&self) -> Option<IVec3> {
    self.points.first().map(|p| p.position)
  }

  /// Last point of the route.
  pub fn end(&self) -> Option<IVec3> {
    self.points.last().map(|p| p.position)
  }
}

#[cfg(test)]
#[path = "types_test.rs"]
mod types_test;
