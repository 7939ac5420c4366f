//! Search statistics for a running pathfinder.
//!
//! Feature-gated and runtime-toggled so a build without `metrics` pays nothing
//! beyond a branch.
//!
//! # Usage
//!
//! ```ignore
//! use voxel_path::metrics::COLLECT_METRICS;
//!
//! // Compile with --features metrics
//! // Runtime toggle:
//! COLLECT_METRICS.store(false, Ordering::Relaxed);
//!
//! let snapshot = pathfinder.metrics().snapshot();
//! println!("{} searches, avg {:.1}us", snapshot.searches, snapshot.avg_search_us);
//! ```

use std::collections::VecDeque;
use std::sync::atomic::AtomicBool;
#[cfg(feature = "metrics")]
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use crate::error::PathError;
use crate::types::PathResult;

/// Runtime toggle for metrics collection.
pub static COLLECT_METRICS: AtomicBool = AtomicBool::new(true);

/// Check if metrics collection is enabled (both compile-time and runtime).
#[inline]
pub fn is_enabled() -> bool {
    #[cfg(feature = "metrics")]
    {
        COLLECT_METRICS.load(Ordering::Relaxed)
    }
    #[cfg(not(feature = "metrics"))]
    {
        false
    }
}

/// Fixed-size window over the most recent samples.
#[derive(Debug, Clone)]
pub struct RollingWindow<T> {
    buffer: VecDeque<T>,
    capacity: usize,
}

impl<T> RollingWindow<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Push a new value, evicting the oldest if at capacity.
    pub fn push(&mut self, value: T) {
        if self.buffer.len() >= self.capacity {
            self.buffer.pop_front();
        }
        self.buffer.push_back(value);
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    pub fn last(&self) -> Option<&T> {
        self.buffer.back()
    }
}

impl RollingWindow<u64> {
    pub fn average(&self) -> f64 {
        if self.buffer.is_empty() {
            0.0
        } else {
            self.buffer.iter().sum::<u64>() as f64 / self.buffer.len() as f64
        }
    }

    pub fn max(&self) -> Option<u64> {
        self.buffer.iter().copied().max()
    }
}

impl Default for RollingWindow<u64> {
    fn default() -> Self {
        Self::new(256)
    }
}

/// How a request was resolved, for bookkeeping.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Resolution {
    /// Ran its own search to completion.
    Searched,
    /// Adopted an identical request's result.
    PerfectMerge,
    /// Spliced onto another request's route.
    SpliceMerge,
}

/// Point-in-time copy of the counters.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MetricsSnapshot {
    pub searches: u64,
    pub successes: u64,
    pub failures: u64,
    pub cancelled: u64,
    pub errors: u64,
    pub inline_runs: u64,
    pub perfect_merges: u64,
    pub splice_merges: u64,
    pub nodes_explored: u64,
    pub avg_search_us: f64,
    pub max_search_us: u64,
}

/// Thread-safe counters shared by every run of one pathfinder.
#[derive(Debug, Default)]
pub struct PathMetrics {
    #[cfg(feature = "metrics")]
    counters: Counters,
    timings: Mutex<RollingWindow<u64>>,
}

#[cfg(feature = "metrics")]
#[derive(Debug, Default)]
struct Counters {
    searches: AtomicU64,
    successes: AtomicU64,
    failures: AtomicU64,
    cancelled: AtomicU64,
    errors: AtomicU64,
    inline_runs: AtomicU64,
    perfect_merges: AtomicU64,
    splice_merges: AtomicU64,
    nodes_explored: AtomicU64,
}

impl PathMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one finished run.
    #[cfg_attr(not(feature = "metrics"), allow(unused_variables))]
    pub fn record_run(
        &self,
        outcome: &Result<PathResult, PathError>,
        resolution: Resolution,
        inline: bool,
        elapsed_us: u64,
    ) {
        if !is_enabled() {
            return;
        }

        #[cfg(feature = "metrics")]
        {
            let c = &self.counters;
            c.searches.fetch_add(1, Ordering::Relaxed);
            if inline {
                c.inline_runs.fetch_add(1, Ordering::Relaxed);
            }
            match resolution {
                Resolution::Searched => {}
                Resolution::PerfectMerge => {
                    c.perfect_merges.fetch_add(1, Ordering::Relaxed);
                }
                Resolution::SpliceMerge => {
                    c.splice_merges.fetch_add(1, Ordering::Relaxed);
                }
            }
            match outcome {
                Ok(result) => {
                    let counter = if result.success { &c.successes } else { &c.failures };
                    counter.fetch_add(1, Ordering::Relaxed);
                    c.nodes_explored
                        .fetch_add(result.explored as u64, Ordering::Relaxed);
                }
                Err(PathError::Cancelled) => {
                    c.cancelled.fetch_add(1, Ordering::Relaxed);
                }
                Err(_) => {
                    c.errors.fetch_add(1, Ordering::Relaxed);
                }
            }
            self.timings.lock().push(elapsed_us);
        }
    }

    /// Record a request answered at submission by an identical live request.
    pub fn record_follower(&self) {
        if !is_enabled() {
            return;
        }
        #[cfg(feature = "metrics")]
        self.counters.perfect_merges.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let timings = self.timings.lock();
        #[cfg(feature = "metrics")]
        {
            let c = &self.counters;
            MetricsSnapshot {
                searches: c.searches.load(Ordering::Relaxed),
                successes: c.successes.load(Ordering::Relaxed),
                failures: c.failures.load(Ordering::Relaxed),
                cancelled: c.cancelled.load(Ordering::Relaxed),
                errors: c.errors.load(Ordering::Relaxed),
                inline_runs: c.inline_runs.load(Ordering::Relaxed),
                perfect_merges: c.perfect_merges.load(Ordering::Relaxed),
                splice_merges: c.splice_merges.load(Ordering::Relaxed),
                nodes_explored: c.nodes_explored.load(Ordering::Relaxed),
                avg_search_us: timings.average(),
                max_search_us: timings.max().unwrap_or(0),
            }
        }
        #[cfg(not(feature = "metrics"))]
        {
            MetricsSnapshot {
                avg_search_us: timings.average(),
                max_search_us: timings.max().unwrap_or(0),
                ..MetricsSnapshot::default()
            }
        }
    }
}
