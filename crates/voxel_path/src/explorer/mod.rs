//! Reference movement rules and cost models.
//!
//! # Module Structure
//!
//! - [`directional`]: `DirectionalExplorer` - walking / flying over a [`Space`](crate::space::Space)
//! - [`heuristic`]: `Manhattan`, `Euclidean`
//! - [`limiter`]: `PathLimiter` - prunes expansion outside a region or budget

pub mod directional;
pub mod heuristic;
pub mod limiter;

pub use directional::{DirectionalExplorer, DEFAULT_MAX_FALL};
pub use heuristic::{Euclidean, Manhattan};
pub use limiter::PathLimiter;
