///! # Bloom Filter
///!
///! Probabilistic set-membership testing in a fixed number of bits.
///!
///! The filter answers "definitely absent" with certainty (no false
///! negatives) and "possibly present" with a tunable error rate: an item
///! that was never added may still probe positive. How often that happens
///! is governed by the bit-array size and hash count chosen at
///! construction.
///!
///! ## Usage in silt
///!
///! Each segment embeds a bloom filter built from the 32-bit hashes of its
///! keys. During point lookups the reader checks the filter first -- if it
///! says "not present", the segment's index is never searched.
///!
///! Items enter the filter as precomputed [`hash32`] digests rather than raw
///! bytes, so a caller hashes a key once and can probe any number of filters
///! with it.
///!
///! ## Example
///!
///! ```rust
///! use bloom::BloomFilter;
///!
///! let mut bf = BloomFilter::new(1000, 0.01);
///! bf.add(hash32::hash32(b"hello"));
///! assert!(bf.possibly_contains(hash32::hash32(b"hello")));
///! ```
use std::io::{self, Read, Write};

use hash32::hash32_seeded;

/// Seed for the first probe-position hash family.
const SEED_H1: u32 = 0x9747_b28c;
/// Seed for the second probe-position hash family.
const SEED_H2: u32 = 0x8542_97a9;

/// A bloom filter backed by a bit vector with `k` derived probe positions.
///
/// Uses double hashing: `position(i) = h1 + i * h2` where `h1` and `h2` are
/// obtained by re-mixing the caller's item hash with two fixed seeds.
pub struct BloomFilter {
    /// The bit vector storing the filter state.
    bits: Vec<u8>,
    /// Number of bits in the filter.
    num_bits: u64,
    /// Number of hash functions (k).
    num_hashes: u32,
}

impl BloomFilter {
    /// Creates a new bloom filter sized for `expected_items` with the given
    /// target `false_positive_rate`.
    ///
    /// # Panics
    ///
    /// Panics if `expected_items` is 0 or `false_positive_rate` is not in `(0, 1)`.
    pub fn new(expected_items: usize, false_positive_rate: f64) -> Self {
        assert!(expected_items > 0, "expected_items must be > 0");
        assert!(
            false_positive_rate > 0.0 && false_positive_rate < 1.0,
            "false_positive_rate must be in (0, 1)"
        );

        // Optimal number of bits: m = -n * ln(p) / (ln(2)^2)
        let n = expected_items as f64;
        let m = (-n * false_positive_rate.ln() / (std::f64::consts::LN_2.powi(2))).ceil() as u64;
        let m = m.max(8);

        // Optimal number of hashes: k = (m/n) * ln(2)
        let k = ((m as f64 / n) * std::f64::consts::LN_2).ceil() as u32;
        let k = k.max(1);

        let byte_len = ((m + 7) / 8) as usize;

        Self {
            bits: vec![0u8; byte_len],
            num_bits: m,
            num_hashes: k,
        }
    }

    /// Creates a bloom filter from raw parts (used during deserialization).
    fn from_raw(bits: Vec<u8>, num_bits: u64, num_hashes: u32) -> Self {
        Self {
            bits,
            num_bits,
            num_hashes,
        }
    }

    /// Adds an item (by its 32-bit hash) to the filter.
    pub fn add(&mut self, item_hash: u32) {
        let (h1, h2) = self.probe_pair(item_hash);
        for i in 0..self.num_hashes {
            let bit_idx = self.probe_position(h1, h2, i);
            self.set_bit(bit_idx);
        }
    }

    /// Returns `true` if the item **might** have been added, `false` if it
    /// is **definitely not** in the set.
    #[must_use]
    pub fn possibly_contains(&self, item_hash: u32) -> bool {
        let (h1, h2) = self.probe_pair(item_hash);
        for i in 0..self.num_hashes {
            let bit_idx = self.probe_position(h1, h2, i);
            if !self.get_bit(bit_idx) {
                return false;
            }
        }
        true
    }

    /// Returns the number of bits in the filter.
    #[must_use]
    pub fn num_bits(&self) -> u64 {
        self.num_bits
    }

    /// Returns the number of hash functions.
    #[must_use]
    pub fn num_hashes(&self) -> u32 {
        self.num_hashes
    }

    /// Returns the size of the serialized bloom filter in bytes.
    ///
    /// Layout: `num_bits(u64) + num_hashes(u32) + bits_len(u32) + bits`.
    #[must_use]
    pub fn serialized_size(&self) -> usize {
        8 + 4 + 4 + self.bits.len()
    }

    /// Serializes the bloom filter to a writer.
    ///
    /// Wire format (all little-endian):
    /// ```text
    /// [num_bits: u64][num_hashes: u32][bits_len: u32][bits: bytes]
    /// ```
    pub fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_all(&self.num_bits.to_le_bytes())?;
        w.write_all(&self.num_hashes.to_le_bytes())?;
        w.write_all(&(self.bits.len() as u32).to_le_bytes())?;
        w.write_all(&self.bits)?;
        Ok(())
    }

    /// Deserializes a bloom filter from a reader.
    ///
    /// Round-tripping through `write_to`/`read_from` preserves the exact bit
    /// state, so every prior `possibly_contains` answer is preserved.
    pub fn read_from<R: Read>(r: &mut R) -> io::Result<Self> {
        let mut buf8 = [0u8; 8];
        let mut buf4 = [0u8; 4];

        r.read_exact(&mut buf8)?;
        let num_bits = u64::from_le_bytes(buf8);

        r.read_exact(&mut buf4)?;
        let num_hashes = u32::from_le_bytes(buf4);

        r.read_exact(&mut buf4)?;
        let bits_len = u32::from_le_bytes(buf4) as usize;

        // Refuse absurd bit arrays before allocating (128 MiB cap).
        const MAX_BLOOM_BYTES: usize = 128 * 1024 * 1024;
        if bits_len > MAX_BLOOM_BYTES {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("bloom filter too large: {} bytes", bits_len),
            ));
        }
        if num_bits == 0 || num_hashes == 0 || num_bits > (bits_len as u64) * 8 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "bloom filter parameters inconsistent with bit array",
            ));
        }

        let mut bits = vec![0u8; bits_len];
        r.read_exact(&mut bits)?;

        Ok(Self::from_raw(bits, num_bits, num_hashes))
    }

    // ---- Internal helpers ----

    /// Derives two independent 64-bit probe bases by re-mixing the item hash
    /// with two fixed seeds.
    fn probe_pair(&self, item_hash: u32) -> (u64, u64) {
        let bytes = item_hash.to_le_bytes();
        let h1 = hash32_seeded(&bytes, SEED_H1) as u64;
        let h2 = hash32_seeded(&bytes, SEED_H2) as u64;
        (h1, h2)
    }

    /// Double hashing: position(i) = (h1 + i * h2) mod num_bits.
    fn probe_position(&self, h1: u64, h2: u64, i: u32) -> u64 {
        h1.wrapping_add((i as u64).wrapping_mul(h2)) % self.num_bits
    }

    fn set_bit(&mut self, idx: u64) {
        let byte_idx = (idx / 8) as usize;
        let bit_offset = (idx % 8) as u8;
        self.bits[byte_idx] |= 1 << bit_offset;
    }

    fn get_bit(&self, idx: u64) -> bool {
        let byte_idx = (idx / 8) as usize;
        let bit_offset = (idx % 8) as u8;
        (self.bits[byte_idx] >> bit_offset) & 1 == 1
    }
}

impl std::fmt::Debug for BloomFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BloomFilter")
            .field("num_bits", &self.num_bits)
            .field("num_hashes", &self.num_hashes)
            .field("bytes", &self.bits.len())
            .finish()
    }
}

#[cfg(test)]
mod tests;
