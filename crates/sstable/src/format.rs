//! Segment binary format constants and header read/write helpers.
//!
//! ## Header (64 bytes, all integers little-endian)
//!
//! ```text
//! [magic: u32 "SIL1"][format_version: u16][reserved: u16]
//! [record_count: u32][created_at: u64]
//! [meta_off: u64][data_off: u64][index_off: u64][bloom_off: u64]
//! [total_len: u64][header_crc: u32]
//! ```
//!
//! `header_crc` is the CRC32 of the preceding 60 bytes, so a damaged header
//! is caught before any offset is trusted. Section offsets are absolute
//! positions in the blob and must be non-decreasing; `total_len` must equal
//! the blob length exactly.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use crc32fast::Hasher as Crc32;
use std::io::Cursor;

use crate::SegmentError;

/// Magic number identifying silt segments (ASCII "SIL1").
pub const SEGMENT_MAGIC: u32 = 0x5349_4C31;

/// Current (highest known) format version. Version 0 blobs are identical in
/// layout and remain readable.
pub const FORMAT_VERSION: u16 = 1;

/// Size of the fixed header in bytes.
pub const HEADER_BYTES: usize = 64;

/// Parsed segment header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub format_version: u16,
    pub record_count: u32,
    pub created_at: u64,
    pub meta_off: u64,
    pub data_off: u64,
    pub index_off: u64,
    pub bloom_off: u64,
    pub total_len: u64,
}

impl Header {
    /// Appends the 64-byte header (including its CRC) to `buf`.
    pub fn write_to(&self, buf: &mut Vec<u8>) -> Result<(), SegmentError> {
        let start = buf.len();
        buf.write_u32::<LittleEndian>(SEGMENT_MAGIC)?;
        buf.write_u16::<LittleEndian>(self.format_version)?;
        buf.write_u16::<LittleEndian>(0)?; // reserved
        buf.write_u32::<LittleEndian>(self.record_count)?;
        buf.write_u64::<LittleEndian>(self.created_at)?;
        buf.write_u64::<LittleEndian>(self.meta_off)?;
        buf.write_u64::<LittleEndian>(self.data_off)?;
        buf.write_u64::<LittleEndian>(self.index_off)?;
        buf.write_u64::<LittleEndian>(self.bloom_off)?;
        buf.write_u64::<LittleEndian>(self.total_len)?;

        let mut hasher = Crc32::new();
        hasher.update(&buf[start..]);
        buf.write_u32::<LittleEndian>(hasher.finalize())?;
        Ok(())
    }

    /// Parses and checksums the header at the front of `bytes`.
    pub fn read_from(bytes: &[u8]) -> Result<Self, SegmentError> {
        if bytes.len() < HEADER_BYTES {
            return Err(SegmentError::Corrupt(format!(
                "blob too small for header: {} bytes",
                bytes.len()
            )));
        }

        let mut cursor = Cursor::new(&bytes[..HEADER_BYTES]);
        let magic = cursor.read_u32::<LittleEndian>()?;
        if magic != SEGMENT_MAGIC {
            return Err(SegmentError::Corrupt(format!(
                "bad magic: {:#010x}",
                magic
            )));
        }

        let format_version = cursor.read_u16::<LittleEndian>()?;
        if format_version > FORMAT_VERSION {
            return Err(SegmentError::Corrupt(format!(
                "unsupported format version: {}",
                format_version
            )));
        }
        let _reserved = cursor.read_u16::<LittleEndian>()?;
        let record_count = cursor.read_u32::<LittleEndian>()?;
        let created_at = cursor.read_u64::<LittleEndian>()?;
        let meta_off = cursor.read_u64::<LittleEndian>()?;
        let data_off = cursor.read_u64::<LittleEndian>()?;
        let index_off = cursor.read_u64::<LittleEndian>()?;
        let bloom_off = cursor.read_u64::<LittleEndian>()?;
        let total_len = cursor.read_u64::<LittleEndian>()?;
        let stored_crc = cursor.read_u32::<LittleEndian>()?;

        let mut hasher = Crc32::new();
        hasher.update(&bytes[..HEADER_BYTES - 4]);
        let actual_crc = hasher.finalize();
        if actual_crc != stored_crc {
            return Err(SegmentError::Corrupt(format!(
                "header checksum mismatch: expected {:#010x}, got {:#010x}",
                stored_crc, actual_crc
            )));
        }

        Ok(Self {
            format_version,
            record_count,
            created_at,
            meta_off,
            data_off,
            index_off,
            bloom_off,
            total_len,
        })
    }

    /// Checks that the section offsets describe a well-formed blob of
    /// `blob_len` bytes.
    pub fn validate(&self, blob_len: u64) -> Result<(), SegmentError> {
        if self.total_len != blob_len {
            return Err(SegmentError::Corrupt(format!(
                "header claims {} bytes, blob has {}",
                self.total_len, blob_len
            )));
        }
        if self.meta_off != HEADER_BYTES as u64 {
            return Err(SegmentError::Corrupt(format!(
                "metadata section must start at {}, found {}",
                HEADER_BYTES, self.meta_off
            )));
        }
        let ordered = self.meta_off <= self.data_off
            && self.data_off <= self.index_off
            && self.index_off <= self.bloom_off
            && self.bloom_off <= self.total_len;
        if !ordered {
            return Err(SegmentError::Corrupt(format!(
                "section offsets out of order: meta={} data={} index={} bloom={} total={}",
                self.meta_off, self.data_off, self.index_off, self.bloom_off, self.total_len
            )));
        }
        Ok(())
    }
}
