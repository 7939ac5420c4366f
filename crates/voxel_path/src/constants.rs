//! Tunables and key-packing layout shared by the search engine and the
//! spatial cache.
//!
//! # Cache key layout
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────────────┐
//! │                      CHUNK KEY (u64, directory)                       │
//! ├───────────────────────────────────┬───────────────────────────────────┤
//! │  bits 63..32: x >> 4 (as u32)     │  bits 31..0: z >> 4 (as u32)      │
//! └───────────────────────────────────┴───────────────────────────────────┘
//!
//! ┌───────────────────────────────────────────────────────────────────────┐
//! │                      LOCAL KEY (u64, per chunk)                       │
//! ├──────────────────────────────┬──────────────────┬─────────────────────┤
//! │  bits 39..8: y (as u32)      │  bits 7..4: x&15 │  bits 3..0: z&15    │
//! └──────────────────────────────┴──────────────────┴─────────────────────┘
//! ```
//!
//! A chunk is a 16×16 column spanning every height. Vertical coordinates keep
//! all 32 bits so distant heights never alias inside one chunk.

use std::time::Duration;

use glam::IVec3;

/// Capacity the open-frontier heap is trimmed back to on reset.
pub const DEFAULT_QUEUE_CAPACITY: usize = 32;

/// Capacity the node graph is trimmed back to on reset.
pub const RETAINED_GRAPH_CAPACITY: usize = 256;

/// How long shutdown waits for in-flight searches before cancelling them.
pub const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

/// Upper bound between two merge scans while at least two searches are live.
pub const DEFAULT_MERGE_SCAN_INTERVAL: Duration = Duration::from_millis(2);

/// log2 of the chunk width along X and Z.
pub const CHUNK_SHIFT: u32 = 4;

/// Chunk width along X and Z (16).
pub const CHUNK_SIZE: i32 = 1 << CHUNK_SHIFT;

/// Mask selecting the chunk-local part of an X or Z coordinate.
pub const CHUNK_MASK: i32 = CHUNK_SIZE - 1;

/// Directory key for the chunk containing `pos`.
#[inline]
pub fn chunk_key(pos: IVec3) -> u64 {
  let cx = (pos.x >> CHUNK_SHIFT) as u32 as u64;
  let cz = (pos.z >> CHUNK_SHIFT) as u32 as u64;
  (cx << 32) | cz
}

/// Key of `pos` inside its chunk's local table.
#[inline]
pub fn local_key(pos: IVec3) -> u64 {
  let lx = (pos.x & CHUNK_MASK) as u64;
  let lz = (pos.z & CHUNK_MASK) as u64;
  ((pos.y as u32 as u64) << (2 * CHUNK_SHIFT)) | (lx << CHUNK_SHIFT) | lz
}

#[cfg(test)]
#[path = "constants_test.rs"]
mod constants_test;
