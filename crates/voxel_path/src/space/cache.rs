//! ConcurrentChunkedCache - lock-striped memoization of per-voxel values.
//!
//! # Layout
//!
//! ```text
//!   directory: RwLock<HashMap<chunk_key, Arc<Chunk>>>
//!        │        (touched on chunk create / retire / clear only)
//!        ▼
//!   Chunk (16 x 16 column, every height)
//!     RwLock<{ cells: HashMap<local_key, T>, retired }>
//! ```
//!
//! Reads take the directory read lock just long enough to clone the chunk
//! `Arc`, then the chunk read lock. Writers only ever contend inside one
//! column.
//!
//! # Lock order
//!
//! chunk → directory. Nothing acquires a chunk lock while holding the
//! directory write lock, so the two never deadlock.
//!
//! # Retirement
//!
//! When `remove` empties a chunk, the chunk is unlinked from the directory and
//! marked retired under its own write lock. A writer that fetched the chunk
//! before it was unlinked sees the flag and retries against the directory, so
//! no write lands in a chunk nobody can reach.

use std::collections::HashMap;
use std::sync::Arc;

use glam::IVec3;
use parking_lot::RwLock;

use crate::constants::{chunk_key, local_key};

struct ChunkCells<T> {
  cells: HashMap<u64, T>,
  retired: bool,
}

struct Chunk<T> {
  inner: RwLock<ChunkCells<T>>,
}

impl<T> Chunk<T> {
  fn new() -> Self {
    Self {
      inner: RwLock::new(ChunkCells {
        cells: HashMap::new(),
        retired: false,
      }),
    }
  }
}

/// Thread-safe map from voxel position to `T`, sharded by 16x16 column.
pub struct ConcurrentChunkedCache<T> {
  directory: RwLock<HashMap<u64, Arc<Chunk<T>>>>,
}

impl<T> Default for ConcurrentChunkedCache<T> {
  fn default() -> Self {
    Self {
      directory: RwLock::new(HashMap::new()),
    }
  }
}

impl<T: Clone> ConcurrentChunkedCache<T> {
  pub fn new() -> Self {
    Self::default()
  }

  fn chunk(&self, key: u64) -> Option<Arc<Chunk<T>>> {
    self.directory.read().get(&key).cloned()
  }

  fn chunk_or_create(&self, key: u64) -> Arc<Chunk<T>> {
    if let Some(chunk) = self.chunk(key) {
      return chunk;
    }
    self
      .directory
      .write()
      .entry(key)
      .or_insert_with(|| Arc::new(Chunk::new()))
      .clone()
  }

  /// Cached value at `position`, if any.
  pub fn get(&self, position: IVec3) -> Option<T> {
    let chunk = self.chunk(chunk_key(position))?;
    let cells = chunk.inner.read();
    cells.cells.get(&local_key(position)).cloned()
  }

  /// Store `value` at `position`, replacing any previous value.
  pub fn put(&self, position: IVec3, value: T) {
    let key = chunk_key(position);
    let local = local_key(position);
    let mut value = Some(value);

    loop {
      let chunk = self.chunk_or_create(key);
      let mut cells = chunk.inner.write();
      if cells.retired {
        continue;
      }
      if let Some(value) = value.take() {
        cells.cells.insert(local, value);
      }
      return;
    }
  }

  /// Cached value at `position`, loading and storing it on a miss.
  ///
  /// `load` runs with no lock held. Two racing misses may both load; the later
  /// store wins, so `load` must be deterministic per position.
  pub fn compute_if_absent(&self, position: IVec3, load: impl FnOnce(IVec3) -> T) -> T {
    if let Some(value) = self.get(position) {
      return value;
    }
    let value = load(position);
    self.put(position, value.clone());
    value
  }

  /// Fallible [`compute_if_absent`](Self::compute_if_absent). A failed load
  /// stores nothing and hands the error back.
  pub fn try_compute_if_absent<E>(
    &self,
    position: IVec3,
    load: impl FnOnce(IVec3) -> Result<T, E>,
  ) -> Result<T, E> {
    if let Some(value) = self.get(position) {
      return Ok(value);
    }
    let value = load(position)?;
    self.put(position, value.clone());
    Ok(value)
  }

  /// Drop the value at `position`, returning it. Empty chunks are retired.
  pub fn remove(&self, position: IVec3) -> Option<T> {
    let key = chunk_key(position);
    let chunk = self.chunk(key)?;

    let mut cells = chunk.inner.write();
    let removed = cells.cells.remove(&local_key(position));
    if removed.is_some() && cells.cells.is_empty() && !cells.retired {
      let mut directory = self.directory.write();
      if directory
        .get(&key)
        .is_some_and(|current| Arc::ptr_eq(current, &chunk))
      {
        directory.remove(&key);
      }
      cells.retired = true;
    }
    removed
  }

  /// Drop everything.
  pub fn clear(&self) {
    let old = std::mem::take(&mut *self.directory.write());
    for chunk in old.into_values() {
      let mut cells = chunk.inner.write();
      cells.cells.clear();
      cells.retired = true;
    }
  }

  /// Number of live chunks.
  pub fn chunk_count(&self) -> usize {
    self.directory.read().len()
  }
}

#[cfg(test)]
#[path = "cache_test.rs"]
mod cache_test;
