use bloom::BloomFilter;
use byteorder::{LittleEndian, WriteBytesExt};
use crc32fast::Hasher as Crc32;
use hash32::hash32;
use memtable::{Key, MemTable};
use std::collections::BTreeMap;
use std::fs::{rename, File, OpenOptions};
use std::io::Write;
use std::path::Path;

use crate::format::{Header, FORMAT_VERSION, HEADER_BYTES};
use crate::SegmentError;

/// Default bloom filter false positive rate (1%).
pub const DEFAULT_BLOOM_FPR: f64 = 0.01;

/// Knobs for segment construction.
///
/// `created_at_ns` is an explicit input rather than sampled inside the
/// writer, so identical entries always produce a byte-identical blob. The
/// functional `create_sstable` API leaves it at 0; the flush path stamps
/// the flush timestamp.
#[derive(Debug, Clone)]
pub struct WriteOptions {
    /// Format version tag written into the header.
    pub format_version: u16,
    /// Creation timestamp (nanoseconds since epoch) written into the header.
    pub created_at_ns: u64,
    /// Target false positive rate for the embedded bloom filter.
    pub bloom_fpr: f64,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            format_version: FORMAT_VERSION,
            created_at_ns: 0,
            bloom_fpr: DEFAULT_BLOOM_FPR,
        }
    }
}

/// Builds immutable segment blobs.
///
/// The writer is stateless — all work happens inside [`build`]
/// (in-memory blob) and [`write_from_memtable`] (crash-safe file write:
/// temp file, fsync, atomic rename).
///
/// [`build`]: SegmentWriter::build
/// [`write_from_memtable`]: SegmentWriter::write_from_memtable
pub struct SegmentWriter {}

impl SegmentWriter {
    /// Serializes `entries` into one contiguous segment blob.
    ///
    /// Entries may arrive in any order and with duplicate keys; they are
    /// sorted ascending by key and deduplicated (last one wins) before
    /// encoding. Output is reproducible: the same entries, metadata, and
    /// options always produce byte-identical blobs.
    ///
    /// # Blob layout
    ///
    /// ```text
    /// [HEADER] fixed 64 bytes, see format.rs
    /// [META]   pair_count(u32) | repeated: key_len(u16) | key | val_len(u32) | val
    /// [DATA]   repeated: crc32(u32) | key | version(u64) | payload_len(u32) | payload
    /// [INDEX]  entry_count(u32) | repeated: key | record_off(u64)
    /// [BLOOM]  serialized BloomFilter (num_bits + num_hashes + bits)
    /// ```
    ///
    /// The CRC32 covers everything after itself in the record (key through
    /// end of payload). Record offsets are absolute blob positions.
    pub fn build<I>(
        entries: I,
        metadata: &BTreeMap<String, String>,
        opts: &WriteOptions,
    ) -> Result<Vec<u8>, SegmentError>
    where
        I: IntoIterator<Item = (Key, u64, Vec<u8>)>,
    {
        if opts.format_version > FORMAT_VERSION {
            return Err(SegmentError::InvalidInput(format!(
                "unknown format version: {}",
                opts.format_version
            )));
        }
        if !(opts.bloom_fpr > 0.0 && opts.bloom_fpr < 1.0) {
            return Err(SegmentError::InvalidInput(format!(
                "bloom false-positive rate must be in (0, 1), got {}",
                opts.bloom_fpr
            )));
        }

        // BTreeMap sorts ascending by key and collapses duplicates.
        let entries: BTreeMap<Key, (u64, Vec<u8>)> = entries
            .into_iter()
            .map(|(key, version, payload)| (key, (version, payload)))
            .collect();

        // META section
        let mut meta = Vec::new();
        meta.write_u32::<LittleEndian>(metadata.len() as u32)?;
        for (mkey, mval) in metadata {
            if mkey.len() > u16::MAX as usize {
                return Err(SegmentError::InvalidInput(format!(
                    "metadata key too long: {} bytes",
                    mkey.len()
                )));
            }
            meta.write_u16::<LittleEndian>(mkey.len() as u16)?;
            meta.extend_from_slice(mkey.as_bytes());
            meta.write_u32::<LittleEndian>(mval.len() as u32)?;
            meta.extend_from_slice(mval.as_bytes());
        }
        let data_off = HEADER_BYTES + meta.len();

        // DATA section, collecting the index and bloom filter as we go
        let mut bloom = BloomFilter::new(entries.len().max(1), opts.bloom_fpr);
        let mut data = Vec::new();
        let mut index_entries: Vec<(&Key, u64)> = Vec::with_capacity(entries.len());
        let mut record_buf: Vec<u8> = Vec::with_capacity(256);

        for (key, (version, payload)) in &entries {
            record_buf.clear();
            key.encode_into(&mut record_buf);
            let key_bytes = record_buf.len();
            record_buf.write_u64::<LittleEndian>(*version)?;
            record_buf.write_u32::<LittleEndian>(payload.len() as u32)?;
            record_buf.extend_from_slice(payload);

            let mut hasher = Crc32::new();
            hasher.update(&record_buf);
            let crc = hasher.finalize();

            let offset = (data_off + data.len()) as u64;
            data.write_u32::<LittleEndian>(crc)?;
            data.extend_from_slice(&record_buf);

            bloom.add(hash32(&record_buf[..key_bytes]));
            index_entries.push((key, offset));
        }

        // INDEX section
        let index_off = data_off + data.len();
        let mut index = Vec::new();
        index.write_u32::<LittleEndian>(index_entries.len() as u32)?;
        for (key, offset) in &index_entries {
            key.encode_into(&mut index);
            index.write_u64::<LittleEndian>(*offset)?;
        }

        // BLOOM section
        let bloom_off = index_off + index.len();
        let mut bloom_bytes = Vec::with_capacity(bloom.serialized_size());
        bloom.write_to(&mut bloom_bytes)?;
        let total_len = bloom_off + bloom_bytes.len();

        let header = Header {
            format_version: opts.format_version,
            record_count: index_entries.len() as u32,
            created_at: opts.created_at_ns,
            meta_off: HEADER_BYTES as u64,
            data_off: data_off as u64,
            index_off: index_off as u64,
            bloom_off: bloom_off as u64,
            total_len: total_len as u64,
        };

        let mut blob = Vec::with_capacity(total_len);
        header.write_to(&mut blob)?;
        blob.extend_from_slice(&meta);
        blob.extend_from_slice(&data);
        blob.extend_from_slice(&index);
        blob.extend_from_slice(&bloom_bytes);
        Ok(blob)
    }

    /// Flushes `mem` to a new segment file at `path`.
    ///
    /// Buffered versions survive into the segment records, and the schema's
    /// primary-key field name is recorded in the segment metadata.
    ///
    /// # Crash Safety
    ///
    /// Writes to `path.silt.tmp`, calls `sync_all()`, then atomically
    /// renames. If the process crashes mid-write the temp file is left
    /// behind and cleaned up on the next store open.
    ///
    /// # Errors
    ///
    /// Refuses an empty memtable (writing an empty segment likely indicates
    /// a logic bug upstream); fails on any I/O error.
    pub fn write_from_memtable(
        path: &Path,
        mem: &MemTable,
        opts: &WriteOptions,
    ) -> Result<(), SegmentError> {
        if mem.is_empty() {
            return Err(SegmentError::InvalidInput(
                "refusing to write an empty segment (empty memtable)".to_string(),
            ));
        }

        let mut metadata = BTreeMap::new();
        metadata.insert(
            "primary_key".to_string(),
            mem.schema().primary_key().to_string(),
        );

        let entries = mem
            .iter()
            .map(|(key, (version, payload))| (key.clone(), *version, payload.clone()));
        let blob = Self::build(entries, &metadata, opts)?;

        let tmp_path = path.with_extension("silt.tmp");
        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&tmp_path)?;
        file.write_all(&blob)?;
        file.sync_all()?;

        rename(&tmp_path, path)?;

        // Fsync the parent directory so the rename itself is durable; a
        // crash after rename but before dir sync can lose the entry on
        // ext4/XFS.
        if let Some(parent) = path.parent() {
            if let Ok(dir) = File::open(parent) {
                let _ = dir.sync_all();
            }
        }

        Ok(())
    }
}
