//! Posting-list payload codec.
//!
//! In the index use case a segment maps a term to its posting list: the
//! places the term occurs, each as a `(source, position)` pair. Postings
//! are an application-level payload — the segment format itself only sees
//! opaque bytes.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Cursor, Read};

use crate::SegmentError;

/// One occurrence of a term: where it was seen and at which position.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Posting {
    /// Identifier of the containing source (file, relation, document...).
    pub source: String,
    /// Position of the occurrence within the source.
    pub position: u64,
}

impl Posting {
    pub fn new(source: impl Into<String>, position: u64) -> Self {
        Self {
            source: source.into(),
            position,
        }
    }
}

/// Encodes a posting list.
///
/// Layout: `count(u32)` then per posting `source_len(u16) | source |
/// position(u64)`, all little-endian.
#[must_use]
pub fn encode_postings(postings: &[Posting]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(4 + postings.len() * 16);
    // Writes to a Vec cannot fail.
    let _ = buf.write_u32::<LittleEndian>(postings.len() as u32);
    for posting in postings {
        let _ = buf.write_u16::<LittleEndian>(posting.source.len() as u16);
        buf.extend_from_slice(posting.source.as_bytes());
        let _ = buf.write_u64::<LittleEndian>(posting.position);
    }
    buf
}

/// Decodes a posting list previously produced by [`encode_postings`].
pub fn decode_postings(bytes: &[u8]) -> Result<Vec<Posting>, SegmentError> {
    let mut cursor = Cursor::new(bytes);
    let count = cursor
        .read_u32::<LittleEndian>()
        .map_err(|_| SegmentError::Corrupt("posting list truncated".to_string()))?;
    // Each posting carries at least 10 bytes of framing.
    if count as usize > bytes.len() / 10 {
        return Err(SegmentError::Corrupt(format!(
            "posting count {} impossible for a {}-byte payload",
            count,
            bytes.len()
        )));
    }

    let mut postings = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let source_len = cursor
            .read_u16::<LittleEndian>()
            .map_err(|_| SegmentError::Corrupt("posting list truncated".to_string()))?
            as usize;
        let mut source = vec![0u8; source_len];
        cursor
            .read_exact(&mut source)
            .map_err(|_| SegmentError::Corrupt("posting list truncated".to_string()))?;
        let source = String::from_utf8(source)
            .map_err(|_| SegmentError::Corrupt("posting source not UTF-8".to_string()))?;
        let position = cursor
            .read_u64::<LittleEndian>()
            .map_err(|_| SegmentError::Corrupt("posting list truncated".to_string()))?;
        postings.push(Posting { source, position });
    }

    if cursor.position() != bytes.len() as u64 {
        return Err(SegmentError::Corrupt(
            "trailing bytes after posting list".to_string(),
        ));
    }
    Ok(postings)
}
