///! # hash32 - 32-bit non-cryptographic hashing
///!
///! MurmurHash3 (x86, 32-bit variant) over arbitrary byte strings. This is
///! the digest that backs the bloom filter's bit selection and key bucketing
///! throughout silt.
///!
///! The output for a given `(input, seed)` pair is fixed by the algorithm
///! and does not depend on platform endianness or pointer width, which is
///! what lets persisted segments remain readable by later builds.
///!
///! Not suitable for anything adversarial -- there is no cryptographic
///! resistance, only good dispersion and speed.
///!
///! ## Example
///!
///! ```rust
///! assert_eq!(hash32::hash32(b"test"), 0xBA6B_D213);
///! ```

const C1: u32 = 0xcc9e_2d51;
const C2: u32 = 0x1b87_3593;

/// Hashes `data` with the default seed of 0.
#[must_use]
pub fn hash32(data: &[u8]) -> u32 {
    hash32_seeded(data, 0)
}

/// MurmurHash3 x86_32 with an explicit seed.
///
/// Distinct seeds give independent hash families over the same input,
/// which the bloom filter uses to derive its probe positions.
#[must_use]
pub fn hash32_seeded(data: &[u8], seed: u32) -> u32 {
    let mut h = seed;

    let mut chunks = data.chunks_exact(4);
    for chunk in &mut chunks {
        let k = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        h ^= mix_k(k);
        h = h.rotate_left(13);
        h = h.wrapping_mul(5).wrapping_add(0xe654_6b64);
    }

    let tail = chunks.remainder();
    if !tail.is_empty() {
        let mut k = 0u32;
        for (i, &byte) in tail.iter().enumerate() {
            k |= (byte as u32) << (8 * i);
        }
        h ^= mix_k(k);
    }

    h ^= data.len() as u32;
    fmix32(h)
}

/// Scrambles one 4-byte block.
#[inline]
fn mix_k(mut k: u32) -> u32 {
    k = k.wrapping_mul(C1);
    k = k.rotate_left(15);
    k.wrapping_mul(C2)
}

/// Final avalanche: forces every input bit to affect every output bit.
#[inline]
fn fmix32(mut h: u32) -> u32 {
    h ^= h >> 16;
    h = h.wrapping_mul(0x85eb_ca6b);
    h ^= h >> 13;
    h = h.wrapping_mul(0xc2b2_ae35);
    h ^= h >> 16;
    h
}

#[cfg(test)]
mod tests;
