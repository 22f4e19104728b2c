//! Read path: `get()`.
//!
//! Freshest data wins: the memtable is consulted first, then each flushed
//! segment from newest to oldest. Each segment probe goes through that
//! segment's bloom filter, so lookups for keys that were never written
//! usually touch no record bytes at all.

use anyhow::{Context, Result};
use memtable::Key;

use crate::Store;

impl Store {
    /// Point lookup across the memtable and all flushed segments.
    ///
    /// Returns the freshest `(version, payload)` for the key, or `None` if
    /// no generation of the store has seen it. A structurally corrupt
    /// segment surfaces as an error rather than being silently skipped —
    /// fabricating a "not found" from a damaged file would be worse than
    /// failing loudly.
    pub fn get(&self, key: &Key) -> Result<Option<(u64, Vec<u8>)>> {
        if let Some((version, payload)) = self.mem.get(key) {
            return Ok(Some((*version, payload.clone())));
        }

        for segment in &self.segments {
            let hit = segment
                .get_version(key)
                .context("reading segment during lookup")?;
            if let Some((version, payload)) = hit {
                return Ok(Some((version, payload.to_vec())));
            }
        }

        Ok(None)
    }

    /// Returns `true` if any generation of the store holds the key.
    pub fn contains(&self, key: &Key) -> Result<bool> {
        Ok(self.get(key)?.is_some())
    }
}
