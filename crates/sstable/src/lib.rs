//! # sstable - immutable sorted segments
//!
//! Encodes a sorted collection of `(key, payload)` entries into one
//! immutable, self-describing binary blob, and answers equality, batch,
//! and range lookups over it. When the in-memory [`memtable::MemTable`]
//! signals overflow, the owning store flushes it through the writer here.
//! Segments are *write-once, read-many* — once created they are never
//! modified.
//!
//! ## Blob layout
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │ HEADER (fixed 64 bytes)                                       │
//! │                                                               │
//! │ magic (u32 "SIL1") | format_version (u16) | reserved (u16)    │
//! │ record_count (u32) | created_at (u64)                         │
//! │ meta_off | data_off | index_off | bloom_off | total_len (u64) │
//! │ header_crc (u32)                                              │
//! ├───────────────────────────────────────────────────────────────┤
//! │ META SECTION (auxiliary string pairs)                         │
//! │                                                               │
//! │ pair_count (u32)                                              │
//! │ key_len (u16) | key | val_len (u32) | val  ... repeated ...   │
//! ├───────────────────────────────────────────────────────────────┤
//! │ DATA SECTION (records sorted ascending by key)                │
//! │                                                               │
//! │ crc32 (u32) | key | version (u64)                             │
//! │ payload_len (u32) | payload          ... repeated ...         │
//! │                                                               │
//! │ The CRC32 covers everything after itself in the record        │
//! │ (key through end of payload), catching silent corruption.     │
//! ├───────────────────────────────────────────────────────────────┤
//! │ INDEX SECTION (key -> record offset, binary-searchable)       │
//! │                                                               │
//! │ entry_count (u32)                                             │
//! │ key | record_off (u64)               ... repeated ...         │
//! ├───────────────────────────────────────────────────────────────┤
//! │ BLOOM SECTION (membership filter over all key hashes)         │
//! │                                                               │
//! │ num_bits (u64) | num_hashes (u32)                             │
//! │ bits_len (u32) | bits (bytes)                                 │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! All integers are little-endian. Offsets are absolute blob positions.
//!
//! ## Lookup path
//!
//! A point lookup probes the embedded bloom filter first; a negative
//! answer short-circuits to "not found" without touching the index. A
//! positive answer binary-searches the index and reads (and checksums) the
//! one record it lands on. Range lookups skip the filter — it only answers
//! single-key membership.
//!
//! ## Functional API
//!
//! For the secondary-index use case (term -> posting list), the crate
//! exposes a functional surface over raw blobs:
//! [`create_sstable`], [`lookup_eq`], [`lookup_in_list`], [`lookup_range`].

mod format;
mod postings;
mod reader;
mod writer;

use std::collections::BTreeMap;
use std::io;

use thiserror::Error;

pub use format::{Header, FORMAT_VERSION, HEADER_BYTES, SEGMENT_MAGIC};
pub use memtable::Key;
pub use postings::{decode_postings, encode_postings, Posting};
pub use reader::{RangeCmp, Segment, MAX_KEY_BYTES, MAX_VALUE_BYTES};
pub use writer::{SegmentWriter, WriteOptions, DEFAULT_BLOOM_FPR};

/// Errors surfaced by segment construction and reading.
#[derive(Debug, Error)]
pub enum SegmentError {
    /// A blob failed structural validation: bad magic, checksum mismatch,
    /// offsets pointing outside the buffer, truncated or unsorted sections.
    /// Fatal for that segment; no partial recovery is attempted.
    #[error("corrupt segment: {0}")]
    Corrupt(String),

    /// The writer was handed input it cannot encode.
    #[error("invalid segment input: {0}")]
    InvalidInput(String),

    /// An underlying I/O error.
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Builds a segment blob from term -> posting-list entries.
///
/// Entry versions are 0 and the creation timestamp is left unset so the
/// output is byte-identical for identical input (callers that care about
/// wall-clock provenance use [`SegmentWriter::build`] with explicit
/// [`WriteOptions`]).
pub fn create_sstable(
    entries: &BTreeMap<Key, Vec<Posting>>,
    metadata: &BTreeMap<String, String>,
    format_version: u16,
) -> Result<Vec<u8>, SegmentError> {
    let opts = WriteOptions {
        format_version,
        ..WriteOptions::default()
    };
    SegmentWriter::build(
        entries
            .iter()
            .map(|(key, postings)| (key.clone(), 0, encode_postings(postings))),
        metadata,
        &opts,
    )
}

/// Equality lookup over a raw segment blob; `Ok(None)` when the key is
/// absent.
pub fn lookup_eq(blob: &[u8], key: &Key) -> Result<Option<Vec<Posting>>, SegmentError> {
    let segment = Segment::from_bytes(blob.to_vec())?;
    match segment.get(key)? {
        Some(payload) => Ok(Some(decode_postings(payload)?)),
        None => Ok(None),
    }
}

/// Batched equality lookup over a raw segment blob. Keys that are not in
/// the segment are omitted from the result.
pub fn lookup_in_list(
    blob: &[u8],
    keys: &[Key],
) -> Result<BTreeMap<Key, Vec<Posting>>, SegmentError> {
    let segment = Segment::from_bytes(blob.to_vec())?;
    let found = segment.get_many(keys.iter())?;
    decode_map(found)
}

/// Range lookup over a raw segment blob: all entries on the `cmp` side of
/// `boundary`, in ascending key order.
pub fn lookup_range(
    blob: &[u8],
    boundary: &Key,
    cmp: RangeCmp,
) -> Result<BTreeMap<Key, Vec<Posting>>, SegmentError> {
    let segment = Segment::from_bytes(blob.to_vec())?;
    let found = segment.range(boundary, cmp)?;
    decode_map(found)
}

fn decode_map(
    raw: BTreeMap<Key, &[u8]>,
) -> Result<BTreeMap<Key, Vec<Posting>>, SegmentError> {
    let mut out = BTreeMap::new();
    for (key, payload) in raw {
        out.insert(key, decode_postings(payload)?);
    }
    Ok(out)
}

#[cfg(test)]
mod tests;
