//! Write path: `append()` and `flush()`.
//!
//! Appends flow into the memtable until it signals that the record ceiling
//! is reached, at which point the store flushes the buffer into a fresh
//! segment file. Flush timing therefore stays observable: every segment on
//! disk corresponds to one capacity signal (or an explicit `flush` call).

use anyhow::{Context, Result};
use memtable::{AppendOutcome, ToFieldMap};
use sstable::{Segment, SegmentWriter, WriteOptions};
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::Store;

impl Store {
    /// Appends a record to the index.
    ///
    /// The record must carry the schema's primary-key field. When this
    /// append fills the memtable, the buffer is flushed to a new segment
    /// before returning, so the next append starts into an empty buffer.
    pub fn append(&mut self, record: &impl ToFieldMap) -> Result<()> {
        match self.mem.append(record)? {
            AppendOutcome::Inserted => Ok(()),
            AppendOutcome::AtCapacity => {
                self.flush().context("flushing full memtable")?;
                Ok(())
            }
        }
    }

    /// Flushes the memtable to a new segment file.
    ///
    /// Returns the new segment's path, or `None` if the buffer was empty.
    /// All-or-nothing: if segment construction or the file write fails, the
    /// buffer is left untouched so no acknowledged append is lost.
    ///
    /// Segment files are named by hex-encoded flush timestamp
    /// (`{ts:016x}.silt`), zero-padded so lexicographic order matches
    /// chronological order.
    pub fn flush(&mut self) -> Result<Option<PathBuf>> {
        if self.mem.is_empty() {
            return Ok(None);
        }

        let ts = self.next_flush_timestamp();
        let path = self.data_dir.join(format!("{:016x}.{}", ts, crate::SEGMENT_EXT));

        let opts = WriteOptions {
            created_at_ns: ts,
            bloom_fpr: self.bloom_fpr,
            ..WriteOptions::default()
        };
        SegmentWriter::write_from_memtable(&path, &self.mem, &opts)
            .with_context(|| format!("writing segment {}", path.display()))?;

        // The segment is durable; only now is it safe to drop the buffer.
        self.mem.clear();

        let segment = Segment::open(&path)
            .with_context(|| format!("reopening segment {}", path.display()))?;
        self.segments.insert(0, segment);

        Ok(Some(path))
    }

    /// Nanosecond timestamp for the next flush, strictly greater than any
    /// previous one so filenames never collide.
    fn next_flush_timestamp(&mut self) -> u64 {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0);
        self.last_flush_ns = now.max(self.last_flush_ns + 1);
        self.last_flush_ns
    }
}
