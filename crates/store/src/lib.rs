//! # Store - silt index store
//!
//! The composition layer that ties the [`memtable`] and [`sstable`] crates
//! into a usable secondary-index store.
//!
//! ## Architecture
//!
//! ```text
//! Client
//!   |
//!   v
//! ┌─────────────────────────────────────────────┐
//! │                  STORE                      │
//! │                                             │
//! │ write.rs → MemTable append                  │
//! │              |                              │
//! │              |  (record ceiling reached?)   │
//! │              |            yes               │
//! │              v                              │
//! │           flush() → new segment file        │
//! │                                             │
//! │ read.rs → MemTable → segments, newest first │
//! │            (first match wins)               │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Module Responsibilities
//!
//! | Module     | Purpose                                            |
//! |-----------|----------------------------------------------------|
//! | `lib.rs`  | `Store` struct, open/recovery, accessors, `Drop`   |
//! | `write`   | `append()`, `flush()`                              |
//! | `read`    | `get()`                                            |
//!
//! ## Freshness order
//!
//! ```text
//! ┌────────────────────────────┐  ← freshest, checked first
//! │ MEMTABLE                   │
//! ├────────────────────────────┤  ← flushed segments, newest first
//! │ {ts:016x}.silt files       │
//! └────────────────────────────┘
//! ```
//!
//! Segments are never merged or rewritten; the store accumulates them over
//! time and point lookups simply try the newest first. Anything fancier
//! (compaction, manifests, cross-segment transactions) is deliberately
//! outside this layer.

mod read;
mod write;

use anyhow::{Context, Result};
use config::StoreConfig;
use memtable::{MemTable, Schema};
use sstable::Segment;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// File extension for flushed segments.
pub const SEGMENT_EXT: &str = "silt";

pub use config::StoreConfig as Config;
pub use memtable::{AppendOutcome, FieldValue, Key, MemtableError, ToFieldMap};
pub use sstable::{Posting, RangeCmp, SegmentError};

/// A single-writer index store: one mutable memtable in front of an
/// append-only pile of immutable segment files.
///
/// The store assumes one exclusive owner; callers that share it across
/// threads are responsible for their own mutual exclusion around
/// `append` + `flush`. Flushed segments are immutable and would be safe
/// for unbounded concurrent readers.
pub struct Store {
    pub(crate) mem: MemTable,
    /// Flushed segments, newest first.
    pub(crate) segments: Vec<Segment>,
    pub(crate) data_dir: PathBuf,
    pub(crate) bloom_fpr: f64,
    /// Timestamp of the most recent flush; nudged forward to keep segment
    /// filenames unique even if the clock stalls.
    pub(crate) last_flush_ns: u64,
}

impl Store {
    /// Opens a store over `schema`, creating the data directory if needed
    /// and loading any segments a previous run left there.
    ///
    /// # Recovery steps
    ///
    /// 1. Create the data directory if it does not exist.
    /// 2. Remove leftover `*.tmp` files from interrupted flushes.
    /// 3. Load every `*.silt` file, newest first (filenames are
    ///    hex-encoded flush timestamps, so lexicographic order is
    ///    chronological).
    pub fn open(schema: Arc<Schema>, cfg: &StoreConfig) -> Result<Self> {
        std::fs::create_dir_all(&cfg.data_dir)
            .with_context(|| format!("creating data dir {}", cfg.data_dir.display()))?;

        Self::cleanup_tmp_files(&cfg.data_dir);

        let mut paths: Vec<PathBuf> = std::fs::read_dir(&cfg.data_dir)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.extension().map(|ext| ext == SEGMENT_EXT).unwrap_or(false))
            .collect();
        paths.sort();
        paths.reverse(); // newest first

        let mut segments = Vec::with_capacity(paths.len());
        let mut last_flush_ns = 0u64;
        for path in &paths {
            let segment = Segment::open(path)
                .with_context(|| format!("opening segment {}", path.display()))?;
            last_flush_ns = last_flush_ns.max(segment.created_at());
            segments.push(segment);
        }

        Ok(Self {
            mem: MemTable::new(schema, cfg.max_records),
            segments,
            data_dir: cfg.data_dir.clone(),
            bloom_fpr: cfg.bloom_fpr,
            last_flush_ns,
        })
    }

    /// Removes stale `*.tmp` files left behind by flushes that died before
    /// their atomic rename. Best-effort: failures are ignored, the files
    /// are merely garbage.
    fn cleanup_tmp_files(dir: &Path) {
        if let Ok(entries) = std::fs::read_dir(dir) {
            for entry in entries.filter_map(|e| e.ok()) {
                let path = entry.path();
                if path.extension().map(|ext| ext == "tmp").unwrap_or(false) {
                    let _ = std::fs::remove_file(&path);
                }
            }
        }
    }

    /// Number of records currently buffered in the memtable.
    #[must_use]
    pub fn buffered_records(&self) -> usize {
        self.mem.len()
    }

    /// Bytes of payload currently buffered in the memtable.
    #[must_use]
    pub fn buffered_bytes(&self) -> usize {
        self.mem.buffer_size()
    }

    /// Number of flushed segments on disk.
    #[must_use]
    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// The directory segment files are written to.
    #[must_use]
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// The schema this store indexes.
    #[must_use]
    pub fn schema(&self) -> &Arc<Schema> {
        self.mem.schema()
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("data_dir", &self.data_dir)
            .field("buffered_records", &self.mem.len())
            .field("buffered_bytes", &self.mem.buffer_size())
            .field("max_records", &self.mem.max_records())
            .field("segment_count", &self.segments.len())
            .finish()
    }
}

/// Best-effort flush on drop.
///
/// Anything still buffered is flushed to a segment so it is not lost when
/// the store goes away. Errors are swallowed because `Drop` cannot
/// propagate them; callers that need certainty call `flush` themselves.
impl Drop for Store {
    fn drop(&mut self) {
        if !self.mem.is_empty() {
            let _ = self.flush();
        }
    }
}

#[cfg(test)]
mod tests;
