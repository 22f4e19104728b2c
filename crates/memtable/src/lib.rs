//! # MemTable - bounded in-memory write buffer
//!
//! Mutable, capacity-bounded buffer of records keyed by primary key, the
//! stage every record passes through before it is flushed into an immutable
//! segment. Each append replaces any prior value for the same key (last
//! write wins) and maintains a running total of buffered payload bytes.
//!
//! When the buffer reaches its configured record ceiling, `append` reports
//! [`AppendOutcome::AtCapacity`] instead of flushing behind the caller's
//! back. The triggering record IS stored; the outcome is a signal that the
//! owner should flush now, keeping flush timing caller-controlled and
//! observable.
//!
//! One exclusive writer owns a memtable for its lifetime; there is no
//! internal locking. Callers that share one across threads wrap it in their
//! own mutex.

mod clock;
mod key;
mod record;

use std::collections::BTreeMap;
use std::sync::Arc;

use thiserror::Error;

pub use clock::VersionClock;
pub use key::Key;
pub use record::{encode_record, FieldValue, Schema, ToFieldMap};

/// Errors surfaced by [`MemTable::append`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MemtableError {
    /// The configured primary-key field is absent from the record or null.
    #[error("primary key cannot be missing or null")]
    MissingPrimaryKey,

    /// The primary-key field is present but not an int, string, or byte
    /// string.
    #[error("primary key must be an int, string, or byte string")]
    InvalidPrimaryKey,
}

/// Result of a successful append.
///
/// `AtCapacity` means the record was stored AND the buffer has reached its
/// record ceiling: the owner should flush before appending more. It is a
/// status, not an error — no data was lost.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendOutcome {
    /// Stored; the buffer still has headroom.
    Inserted,
    /// Stored; the buffer is now at (or beyond) its record ceiling.
    AtCapacity,
}

/// Bounded in-memory write buffer keyed by primary key.
pub struct MemTable {
    schema: Arc<Schema>,
    buffer: BTreeMap<Key, (u64, Vec<u8>)>,
    buffer_size: usize,
    max_records: usize,
    clock: VersionClock,
}

impl MemTable {
    /// Creates an empty memtable over `schema` holding at most `max_records`
    /// distinct keys before signalling overflow.
    pub fn new(schema: Arc<Schema>, max_records: usize) -> Self {
        Self {
            schema,
            buffer: BTreeMap::new(),
            buffer_size: 0,
            max_records: max_records.max(1),
            clock: VersionClock::new(),
        }
    }

    /// Appends a record, replacing any buffered entry with the same primary
    /// key.
    ///
    /// The record's fields are encoded deterministically (sorted column
    /// order, canonical value forms) and stored together with a fresh
    /// monotonic version.
    ///
    /// # Errors
    ///
    /// [`MemtableError::MissingPrimaryKey`] if the configured key field is
    /// absent or null, [`MemtableError::InvalidPrimaryKey`] if it is not a
    /// scalar key type. The buffer is untouched in both cases.
    pub fn append(&mut self, record: &impl ToFieldMap) -> Result<AppendOutcome, MemtableError> {
        let fields = record.to_field_map();

        let pk_value = match fields.get(self.schema.primary_key()) {
            None | Some(FieldValue::Null) => return Err(MemtableError::MissingPrimaryKey),
            Some(value) => value,
        };
        let key = pk_value.as_key().ok_or(MemtableError::InvalidPrimaryKey)?;

        let payload = encode_record(&self.schema, &fields);

        // Adjust the running size for overwritten entries before inserting.
        if let Some((_, old_payload)) = self.buffer.get(&key) {
            self.buffer_size -= old_payload.len();
        }
        self.buffer_size += payload.len();
        let version = self.clock.next();
        self.buffer.insert(key, (version, payload));

        if self.buffer.len() >= self.max_records {
            Ok(AppendOutcome::AtCapacity)
        } else {
            Ok(AppendOutcome::Inserted)
        }
    }

    /// Returns the buffered `(version, payload)` for `key`, if present.
    ///
    /// This looks only at the buffer; flushed segments are the segment
    /// reader's concern.
    #[must_use]
    pub fn get(&self, key: &Key) -> Option<&(u64, Vec<u8>)> {
        self.buffer.get(key)
    }

    /// Number of distinct buffered keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Returns `true` if nothing is buffered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Total bytes of buffered payloads. Always equals the sum of the
    /// current entries' payload lengths.
    #[must_use]
    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    /// The configured record ceiling.
    #[must_use]
    pub fn max_records(&self) -> usize {
        self.max_records
    }

    /// The schema this memtable was created with.
    #[must_use]
    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Iterates buffered entries in ascending key order.
    pub fn iter(&self) -> impl Iterator<Item = (&Key, &(u64, Vec<u8>))> {
        self.buffer.iter()
    }

    /// Empties the buffer and resets the size counter.
    ///
    /// Called by the owner after a successful flush; never called on a
    /// failed one, so a flush that dies leaves the buffer intact.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.buffer_size = 0;
    }
}

impl std::fmt::Debug for MemTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemTable")
            .field("rows", &self.buffer.len())
            .field("buffer_size", &self.buffer_size)
            .field("max_records", &self.max_records)
            .finish()
    }
}
