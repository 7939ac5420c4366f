//! voxel_path - Concurrent A* pathfinding over voxel worlds
//!
//! This crate provides a grid A* search over integer voxel coordinates and a
//! scheduler that runs many searches at once on a rayon pool. Movement rules,
//! costs, arrival tests and route post-processing are supplied by the caller,
//! so the engine knows nothing about the world it walks.
//!
//! # Features
//!
//! - **Resumable search**: [`PathOperation`] expands one node per step and
//!   can be inspected between steps
//! - **Bounded scheduling**: [`Pathfinder`] keeps at most `capacity` searches
//!   on the pool and runs the rest on the submitting thread
//! - **Work sharing**: identical requests share one search; a request whose
//!   frontier reaches another request's explored region joins that route
//! - **Agent navigation**: [`Navigator`] keeps one outstanding request per
//!   agent and re-plans when its [`PathTarget`] moves
//! - **World caching**: [`ConcurrentChunkedCache`] memoizes voxel lookups
//!   per chunk for [`CachingSpace`]
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use glam::IVec3;
//! use voxel_path::{DirectionalExplorer, HashSpace, Manhattan, PathSettings, Pathfinder, Solid};
//!
//! let mut space = HashSpace::new();
//! space.fill(IVec3::new(0, 0, 0), IVec3::new(15, 0, 15), Solid::Full);
//!
//! let settings = PathSettings::new(
//!     Arc::new(DirectionalExplorer::walking(space)),
//!     Arc::new(Manhattan),
//! );
//!
//! let pathfinder = Pathfinder::with_threads(4)?;
//! let handle = pathfinder.submit(
//!     glam::DVec3::new(0.5, 1.0, 0.5),
//!     IVec3::new(12, 1, 9),
//!     &settings,
//! );
//! let route = handle.wait()?;
//! println!("{} points, {} nodes explored", route.len(), route.explored);
//! ```

pub mod constants;
pub mod error;
pub mod types;

pub use error::PathError;
pub use types::{Direction, Movement, PathPoint, PathResult};

// A* core: node arena and open set
pub mod graph;
pub use graph::{Node, NodeGraph, NodeId, NodeQueue};

// Caller-supplied search behaviour
pub mod settings;
pub use settings::{
  Candidate, ExactMatch, Explorer, Heuristic, Identity, PathPostProcessor, PathSettings, Seed,
  Seeds, SuccessPredicate,
};

// Single search state machine
pub mod operation;
pub use operation::{OperationState, PathOperation};

// Reference explorers and cost models
pub mod explorer;
pub use explorer::{DirectionalExplorer, Euclidean, Manhattan, PathLimiter};

// World lookups and the voxel cache
pub mod space;
pub use space::{CachingSpace, ConcurrentChunkedCache, HashSpace, Solid, Space};

// Rayon pool wrapper and per-worker operation reuse
pub mod threading;
pub use threading::WorkerPool;

// Engine-agnostic search statistics
pub mod metrics;
pub use metrics::{MetricsSnapshot, PathMetrics};

// Scheduler, request handles and merging
pub mod pathfinder;
pub use pathfinder::{PathHandle, PathOutcome, Pathfinder, PathfinderConfig};

// Per-agent request tracking
pub mod navigator;
pub use navigator::{Fixed, Navigator, PathTarget, Tracking};

#[cfg(test)]
pub mod test_utils;
