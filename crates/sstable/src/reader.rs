use bloom::BloomFilter;
use byteorder::{LittleEndian, ReadBytesExt};
use crc32fast::Hasher as Crc32;
use hash32::hash32;
use memtable::Key;
use std::collections::BTreeMap;
use std::io::Cursor;
use std::path::Path;

use crate::format::Header;
use crate::SegmentError;

/// Maximum key size accepted during reads (64 KiB). Prevents OOM on corrupt blobs.
pub const MAX_KEY_BYTES: usize = 64 * 1024;
/// Maximum payload size accepted during reads (10 MiB). Prevents OOM on corrupt blobs.
pub const MAX_VALUE_BYTES: usize = 10 * 1024 * 1024;

/// Range comparator for [`Segment::range`]: which side of the boundary key
/// to return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeCmp {
    /// Keys strictly greater than the boundary.
    Gt,
    /// Keys greater than or equal to the boundary.
    Ge,
    /// Keys strictly less than the boundary.
    Lt,
    /// Keys less than or equal to the boundary.
    Le,
}

/// An immutable segment, parsed and validated from its byte blob.
///
/// Parsing loads the index (key -> record offset) and the bloom filter into
/// memory; record payloads stay in the blob and are borrowed out on lookup.
/// The blob is never mutated, so a parsed segment is safe for unbounded
/// concurrent read-only access.
///
/// All structural problems — bad magic, checksum mismatches, offsets
/// pointing outside the blob, an unsorted index — surface as
/// [`SegmentError::Corrupt`] rather than partial results.
pub struct Segment {
    bytes: Vec<u8>,
    header: Header,
    metadata: BTreeMap<String, String>,
    /// Dense index: one `(key, absolute record offset)` per record,
    /// ascending by key.
    index: Vec<(Key, u64)>,
    bloom: BloomFilter,
}

impl Segment {
    /// Parses and fully validates a segment blob, taking ownership of it.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, SegmentError> {
        let header = Header::read_from(&bytes)?;
        header.validate(bytes.len() as u64)?;

        let metadata = parse_metadata(&bytes[header.meta_off as usize..header.data_off as usize])?;
        let index = parse_index(&bytes, &header)?;

        let mut bloom_cursor = Cursor::new(&bytes[header.bloom_off as usize..]);
        let bloom = BloomFilter::read_from(&mut bloom_cursor)
            .map_err(|e| SegmentError::Corrupt(format!("bad bloom section: {}", e)))?;

        Ok(Self {
            bytes,
            header,
            metadata,
            index,
            bloom,
        })
    }

    /// Reads and parses a segment file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, SegmentError> {
        Self::from_bytes(std::fs::read(path)?)
    }

    /// Point lookup for a single key.
    ///
    /// The bloom filter is probed first; a negative answer means the key is
    /// definitely absent and the index is never searched. An absent key is
    /// `Ok(None)`, never an error.
    pub fn get(&self, key: &Key) -> Result<Option<&[u8]>, SegmentError> {
        Ok(self.get_version(key)?.map(|(_, payload)| payload))
    }

    /// Point lookup returning the record's version alongside its payload.
    pub fn get_version(&self, key: &Key) -> Result<Option<(u64, &[u8])>, SegmentError> {
        // Fast path: bloom filter says "definitely not here"
        if !self.bloom.possibly_contains(hash32(&key.encoded())) {
            return Ok(None);
        }

        let slot = match self.index.binary_search_by(|(k, _)| k.cmp(key)) {
            Ok(i) => i,
            Err(_) => return Ok(None),
        };
        let (version, payload) = self.read_record(self.index[slot].1, key)?;
        Ok(Some((version, payload)))
    }

    /// Batched equality lookup: each key independently goes through the
    /// filter-then-search path. Absent keys are omitted from the result,
    /// not mapped to a sentinel.
    pub fn get_many<'k, I>(&self, keys: I) -> Result<BTreeMap<Key, &[u8]>, SegmentError>
    where
        I: IntoIterator<Item = &'k Key>,
    {
        let mut found = BTreeMap::new();
        for key in keys {
            if let Some(payload) = self.get(key)? {
                found.insert(key.clone(), payload);
            }
        }
        Ok(found)
    }

    /// Returns all entries on one side of `boundary`, ascending by key.
    ///
    /// The boundary position is located by binary search; the bloom filter
    /// is not consulted (it only answers single-key membership).
    pub fn range(&self, boundary: &Key, cmp: RangeCmp) -> Result<BTreeMap<Key, &[u8]>, SegmentError> {
        let below_or_eq = self.index.partition_point(|(k, _)| k <= boundary);
        let below = self.index.partition_point(|(k, _)| k < boundary);
        let slice = match cmp {
            RangeCmp::Gt => &self.index[below_or_eq..],
            RangeCmp::Ge => &self.index[below..],
            RangeCmp::Lt => &self.index[..below],
            RangeCmp::Le => &self.index[..below_or_eq],
        };
        self.collect_entries(slice)
    }

    /// Returns all entries with `lo <= key <= hi` (closed interval),
    /// ascending by key. An inverted interval is simply empty.
    pub fn between(&self, lo: &Key, hi: &Key) -> Result<BTreeMap<Key, &[u8]>, SegmentError> {
        let start = self.index.partition_point(|(k, _)| k < lo);
        let end = self.index.partition_point(|(k, _)| k <= hi);
        let slice = &self.index[start..end.max(start)];
        self.collect_entries(slice)
    }

    /// Number of records in the segment.
    #[must_use]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Returns `true` if the segment contains zero records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Keys in ascending order.
    pub fn keys(&self) -> impl Iterator<Item = &Key> {
        self.index.iter().map(|(k, _)| k)
    }

    /// Auxiliary metadata the writer embedded.
    #[must_use]
    pub fn metadata(&self) -> &BTreeMap<String, String> {
        &self.metadata
    }

    /// Creation timestamp (nanoseconds since epoch) from the header.
    #[must_use]
    pub fn created_at(&self) -> u64 {
        self.header.created_at
    }

    /// Format version tag from the header.
    #[must_use]
    pub fn format_version(&self) -> u16 {
        self.header.format_version
    }

    // ---- Internal helpers ----

    fn collect_entries(&self, slice: &[(Key, u64)]) -> Result<BTreeMap<Key, &[u8]>, SegmentError> {
        let mut out = BTreeMap::new();
        for (key, offset) in slice {
            let (_, payload) = self.read_record(*offset, key)?;
            out.insert(key.clone(), payload);
        }
        Ok(out)
    }

    /// Reads and checksums the record at `offset`, verifying that its key
    /// is the one the index promised.
    fn read_record(&self, offset: u64, expect: &Key) -> Result<(u64, &[u8]), SegmentError> {
        let data_end = self.header.index_off as usize;
        let offset = offset as usize;
        if offset < self.header.data_off as usize || offset + 4 > data_end {
            return Err(SegmentError::Corrupt(format!(
                "record offset {} outside data section",
                offset
            )));
        }

        let mut cursor = Cursor::new(&self.bytes[offset..data_end]);
        let stored_crc = cursor
            .read_u32::<LittleEndian>()
            .map_err(|_| SegmentError::Corrupt("record truncated".to_string()))?;
        let body_start = offset + 4;

        let key = Key::read_from(&mut cursor, MAX_KEY_BYTES)
            .map_err(|e| SegmentError::Corrupt(format!("bad record key: {}", e)))?;
        let version = cursor
            .read_u64::<LittleEndian>()
            .map_err(|_| SegmentError::Corrupt("record truncated".to_string()))?;
        let payload_len = cursor
            .read_u32::<LittleEndian>()
            .map_err(|_| SegmentError::Corrupt("record truncated".to_string()))?
            as usize;
        if payload_len > MAX_VALUE_BYTES {
            return Err(SegmentError::Corrupt(format!(
                "payload length {} exceeds maximum {}",
                payload_len, MAX_VALUE_BYTES
            )));
        }

        let payload_start = offset + cursor.position() as usize;
        let payload_end = payload_start
            .checked_add(payload_len)
            .ok_or_else(|| SegmentError::Corrupt("payload length overflow".to_string()))?;
        if payload_end > data_end {
            return Err(SegmentError::Corrupt(
                "payload extends past data section".to_string(),
            ));
        }
        let payload = &self.bytes[payload_start..payload_end];

        let mut hasher = Crc32::new();
        hasher.update(&self.bytes[body_start..payload_end]);
        let actual_crc = hasher.finalize();
        if actual_crc != stored_crc {
            return Err(SegmentError::Corrupt(format!(
                "record checksum mismatch at offset {}: expected {:#010x}, got {:#010x}",
                offset, stored_crc, actual_crc
            )));
        }

        if &key != expect {
            return Err(SegmentError::Corrupt(format!(
                "index pointed at mismatching key at offset {}",
                offset
            )));
        }

        Ok((version, payload))
    }
}

impl std::fmt::Debug for Segment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Segment")
            .field("records", &self.index.len())
            .field("created_at", &self.header.created_at)
            .field("format_version", &self.header.format_version)
            .field("bytes", &self.bytes.len())
            .finish()
    }
}

/// Parses the metadata section.
fn parse_metadata(section: &[u8]) -> Result<BTreeMap<String, String>, SegmentError> {
    let mut cursor = Cursor::new(section);
    let count = cursor.read_u32::<LittleEndian>().map_err(|_| {
        SegmentError::Corrupt("metadata section truncated".to_string())
    })?;
    // One pair needs at least 6 bytes of framing; a count beyond that is a
    // corrupt length field, not real data.
    if count as usize > section.len() / 6 {
        return Err(SegmentError::Corrupt(format!(
            "metadata pair count {} impossible for a {}-byte section",
            count,
            section.len()
        )));
    }

    let mut metadata = BTreeMap::new();
    for _ in 0..count {
        let key_len = cursor
            .read_u16::<LittleEndian>()
            .map_err(|_| SegmentError::Corrupt("metadata section truncated".to_string()))?
            as usize;
        let mut key = vec![0u8; key_len];
        std::io::Read::read_exact(&mut cursor, &mut key)
            .map_err(|_| SegmentError::Corrupt("metadata section truncated".to_string()))?;

        let val_len = cursor
            .read_u32::<LittleEndian>()
            .map_err(|_| SegmentError::Corrupt("metadata section truncated".to_string()))?
            as usize;
        if val_len > MAX_VALUE_BYTES {
            return Err(SegmentError::Corrupt(format!(
                "metadata value length {} exceeds maximum",
                val_len
            )));
        }
        let mut val = vec![0u8; val_len];
        std::io::Read::read_exact(&mut cursor, &mut val)
            .map_err(|_| SegmentError::Corrupt("metadata section truncated".to_string()))?;

        let key = String::from_utf8(key)
            .map_err(|_| SegmentError::Corrupt("metadata key not UTF-8".to_string()))?;
        let val = String::from_utf8(val)
            .map_err(|_| SegmentError::Corrupt("metadata value not UTF-8".to_string()))?;
        metadata.insert(key, val);
    }

    if cursor.position() != section.len() as u64 {
        return Err(SegmentError::Corrupt(
            "trailing bytes in metadata section".to_string(),
        ));
    }
    Ok(metadata)
}

/// Parses the index section, checking count, ordering, and offset bounds.
fn parse_index(bytes: &[u8], header: &Header) -> Result<Vec<(Key, u64)>, SegmentError> {
    let section = &bytes[header.index_off as usize..header.bloom_off as usize];
    let mut cursor = Cursor::new(section);

    let count = cursor
        .read_u32::<LittleEndian>()
        .map_err(|_| SegmentError::Corrupt("index section truncated".to_string()))?;
    if count != header.record_count {
        return Err(SegmentError::Corrupt(format!(
            "index holds {} entries but header claims {}",
            count, header.record_count
        )));
    }
    // Each entry is at least a 1-byte key tag plus an 8-byte offset.
    if count as usize > section.len() / 9 {
        return Err(SegmentError::Corrupt(format!(
            "index entry count {} impossible for a {}-byte section",
            count,
            section.len()
        )));
    }

    let mut index: Vec<(Key, u64)> = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let key = Key::read_from(&mut cursor, MAX_KEY_BYTES)
            .map_err(|e| SegmentError::Corrupt(format!("bad index key: {}", e)))?;
        let offset = cursor
            .read_u64::<LittleEndian>()
            .map_err(|_| SegmentError::Corrupt("index section truncated".to_string()))?;

        if offset < header.data_off || offset >= header.index_off {
            return Err(SegmentError::Corrupt(format!(
                "index offset {} outside data section",
                offset
            )));
        }
        if let Some((prev_key, _)) = index.last() {
            if prev_key >= &key {
                return Err(SegmentError::Corrupt(
                    "index keys not strictly ascending".to_string(),
                ));
            }
        }
        index.push((key, offset));
    }

    if cursor.position() != section.len() as u64 {
        return Err(SegmentError::Corrupt(
            "trailing bytes in index section".to_string(),
        ));
    }
    Ok(index)
}
