use super::*;
use hash32::hash32;
use std::io::Cursor;

// -------------------- Construction --------------------

#[test]
fn new_creates_valid_filter() {
    let bf = BloomFilter::new(100, 0.01);
    assert!(bf.num_bits() > 0);
    assert!(bf.num_hashes() > 0);
    assert!(!bf.bits.is_empty());
}

#[test]
#[should_panic(expected = "expected_items must be > 0")]
fn new_panics_on_zero_items() {
    BloomFilter::new(0, 0.01);
}

#[test]
#[should_panic(expected = "false_positive_rate must be in (0, 1)")]
fn new_panics_on_zero_fpr() {
    BloomFilter::new(100, 0.0);
}

#[test]
#[should_panic(expected = "false_positive_rate must be in (0, 1)")]
fn new_panics_on_one_fpr() {
    BloomFilter::new(100, 1.0);
}

// -------------------- Add / Contains --------------------

#[test]
fn added_hash_is_found() {
    let mut bf = BloomFilter::new(100, 0.01);
    bf.add(hash32(b"hello"));
    assert!(bf.possibly_contains(hash32(b"hello")));
}

#[test]
fn missing_hash_is_not_found() {
    let bf = BloomFilter::new(100, 0.01);
    assert!(!bf.possibly_contains(hash32(b"hello")));
}

#[test]
fn no_false_negatives_over_many_items() {
    let mut bf = BloomFilter::new(1000, 0.01);
    for i in 0..1000u64 {
        bf.add(hash32(&i.to_le_bytes()));
    }
    for i in 0..1000u64 {
        assert!(
            bf.possibly_contains(hash32(&i.to_le_bytes())),
            "item {} should be found",
            i
        );
    }
}

#[test]
fn no_false_negatives_with_tiny_filter() {
    // Heavily overloaded filter: FPR goes to pieces but absence of false
    // negatives must hold for any size/parameter choice.
    let mut bf = BloomFilter::new(2, 0.5);
    for i in 0..100u64 {
        bf.add(hash32(&i.to_le_bytes()));
    }
    for i in 0..100u64 {
        assert!(bf.possibly_contains(hash32(&i.to_le_bytes())));
    }
}

#[test]
fn false_positive_rate_is_reasonable() {
    let n = 10_000;
    let fpr = 0.01;
    let mut bf = BloomFilter::new(n, fpr);

    for i in 0..n as u64 {
        bf.add(hash32(&i.to_le_bytes()));
    }

    // Test n items that were NOT added
    let mut false_positives = 0;
    let test_count = 10_000;
    for i in (n as u64)..(n as u64 + test_count) {
        if bf.possibly_contains(hash32(&i.to_le_bytes())) {
            false_positives += 1;
        }
    }

    let actual_fpr = false_positives as f64 / test_count as f64;
    // Allow up to 3x the target FPR (statistical variance)
    assert!(
        actual_fpr < fpr * 3.0,
        "FPR too high: {:.4} (target {:.4})",
        actual_fpr,
        fpr
    );
}

#[test]
fn zero_hash_is_a_valid_item() {
    let mut bf = BloomFilter::new(10, 0.01);
    bf.add(0);
    assert!(bf.possibly_contains(0));
}

// -------------------- Serialization --------------------

#[test]
fn roundtrip_serialize_deserialize() {
    let mut bf = BloomFilter::new(500, 0.01);
    for i in 0..500u64 {
        bf.add(hash32(&i.to_le_bytes()));
    }

    // Serialize
    let mut buf = Vec::new();
    bf.write_to(&mut buf).unwrap();
    assert_eq!(buf.len(), bf.serialized_size());

    // Deserialize
    let mut cursor = Cursor::new(&buf);
    let bf2 = BloomFilter::read_from(&mut cursor).unwrap();

    assert_eq!(bf2.num_bits(), bf.num_bits());
    assert_eq!(bf2.num_hashes(), bf.num_hashes());
    assert_eq!(bf2.bits, bf.bits);

    // Every positive answer is preserved, added or not: probe a mix of
    // present items and arbitrary others and compare verdicts.
    for i in 0..1000u64 {
        let h = hash32(&i.to_le_bytes());
        assert_eq!(
            bf.possibly_contains(h),
            bf2.possibly_contains(h),
            "verdict changed after roundtrip for item {}",
            i
        );
    }
}

#[test]
fn serialized_size_is_correct() {
    let bf = BloomFilter::new(100, 0.05);
    // 8 (num_bits) + 4 (num_hashes) + 4 (bits_len) + bits.len()
    assert_eq!(bf.serialized_size(), 16 + bf.bits.len());
}

#[test]
fn deserialize_rejects_oversized_bloom() {
    // Craft a bloom with bits_len = 256 MiB (exceeds 128 MiB cap)
    let mut buf = Vec::new();
    buf.extend_from_slice(&64u64.to_le_bytes()); // num_bits
    buf.extend_from_slice(&3u32.to_le_bytes()); // num_hashes
    buf.extend_from_slice(&(256 * 1024 * 1024u32).to_le_bytes()); // bits_len = 256 MiB

    let mut cursor = Cursor::new(&buf);
    let result = BloomFilter::read_from(&mut cursor);
    assert!(result.is_err());
}

#[test]
fn deserialize_rejects_inconsistent_params() {
    // num_bits larger than the bit array can hold
    let mut buf = Vec::new();
    buf.extend_from_slice(&1024u64.to_le_bytes()); // num_bits = 1024
    buf.extend_from_slice(&3u32.to_le_bytes()); // num_hashes
    buf.extend_from_slice(&4u32.to_le_bytes()); // bits_len = 4 bytes = 32 bits
    buf.extend_from_slice(&[0u8; 4]);

    let mut cursor = Cursor::new(&buf);
    assert!(BloomFilter::read_from(&mut cursor).is_err());
}

#[test]
fn deserialize_rejects_truncated_input() {
    let mut bf = BloomFilter::new(100, 0.01);
    bf.add(hash32(b"x"));
    let mut buf = Vec::new();
    bf.write_to(&mut buf).unwrap();

    let mut cursor = Cursor::new(&buf[..buf.len() - 1]);
    assert!(BloomFilter::read_from(&mut cursor).is_err());
}

// -------------------- Debug --------------------

#[test]
fn debug_impl_works() {
    let bf = BloomFilter::new(100, 0.01);
    let debug = format!("{:?}", bf);
    assert!(debug.contains("BloomFilter"));
    assert!(debug.contains("num_bits"));
    assert!(debug.contains("num_hashes"));
}

// -------------------- Edge cases --------------------

#[test]
fn single_item_filter() {
    let mut bf = BloomFilter::new(1, 0.01);
    bf.add(hash32(b"only"));
    assert!(bf.possibly_contains(hash32(b"only")));
}

#[test]
fn very_low_fpr() {
    let bf = BloomFilter::new(100, 0.0001);
    // Should have many bits and hashes
    assert!(bf.num_bits() > 1000);
    assert!(bf.num_hashes() > 5);
}

#[test]
fn high_fpr_still_works() {
    let mut bf = BloomFilter::new(100, 0.5);
    bf.add(hash32(b"test"));
    assert!(bf.possibly_contains(hash32(b"test")));
}
