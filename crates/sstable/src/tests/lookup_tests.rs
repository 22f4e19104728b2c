//! Tests for the functional posting-list API over raw blobs.

use crate::*;
use std::collections::BTreeMap;

fn sample_index() -> BTreeMap<Key, Vec<Posting>> {
    let mut entries = BTreeMap::new();
    entries.insert(Key::from("term1"), vec![Posting::new("docA", 1)]);
    entries.insert(Key::from("term2"), vec![Posting::new("docB", 2)]);
    entries
}

// -------------------- The canonical scenario --------------------

#[test]
fn lookup_eq_finds_postings() {
    let blob = create_sstable(&sample_index(), &BTreeMap::new(), 0).unwrap();
    let postings = lookup_eq(&blob, &Key::from("term1")).unwrap().unwrap();
    assert_eq!(postings, vec![Posting::new("docA", 1)]);
}

#[test]
fn lookup_eq_missing_is_none() {
    let blob = create_sstable(&sample_index(), &BTreeMap::new(), 0).unwrap();
    assert!(lookup_eq(&blob, &Key::from("missing")).unwrap().is_none());
}

#[test]
fn lookup_in_list_omits_absent_terms() {
    let blob = create_sstable(&sample_index(), &BTreeMap::new(), 0).unwrap();
    let keys = vec![Key::from("term1"), Key::from("term3")];
    let found = lookup_in_list(&blob, &keys).unwrap();

    assert_eq!(found.len(), 1);
    assert_eq!(
        found.get(&Key::from("term1")),
        Some(&vec![Posting::new("docA", 1)])
    );
    assert!(!found.contains_key(&Key::from("term3")));
}

#[test]
fn lookup_range_gt() {
    let blob = create_sstable(&sample_index(), &BTreeMap::new(), 0).unwrap();
    let found = lookup_range(&blob, &Key::from("term1"), RangeCmp::Gt).unwrap();

    assert_eq!(found.len(), 1);
    assert_eq!(
        found.get(&Key::from("term2")),
        Some(&vec![Posting::new("docB", 2)])
    );
}

// -------------------- Larger posting lists --------------------

#[test]
fn multi_posting_terms_roundtrip() {
    let mut entries = BTreeMap::new();
    entries.insert(
        Key::from("common"),
        vec![
            Posting::new("docA", 3),
            Posting::new("docB", 7),
            Posting::new("docC", 11),
        ],
    );
    entries.insert(Key::from("rare"), vec![Posting::new("docZ", 1)]);

    let blob = create_sstable(&entries, &BTreeMap::new(), 0).unwrap();
    let postings = lookup_eq(&blob, &Key::from("common")).unwrap().unwrap();
    assert_eq!(postings.len(), 3);
    assert_eq!(postings[1], Posting::new("docB", 7));
}

#[test]
fn empty_posting_list_is_preserved() {
    let mut entries = BTreeMap::new();
    entries.insert(Key::from("ghost"), Vec::new());

    let blob = create_sstable(&entries, &BTreeMap::new(), 0).unwrap();
    let postings = lookup_eq(&blob, &Key::from("ghost")).unwrap().unwrap();
    assert!(postings.is_empty());
}

#[test]
fn lookup_range_results_ascend() {
    let mut entries = BTreeMap::new();
    for term in ["delta", "alpha", "echo", "bravo", "charlie"] {
        entries.insert(Key::from(term), vec![Posting::new("d", 1)]);
    }
    let blob = create_sstable(&entries, &BTreeMap::new(), 0).unwrap();

    let found = lookup_range(&blob, &Key::from("bravo"), RangeCmp::Ge).unwrap();
    let keys: Vec<&Key> = found.keys().collect();
    assert_eq!(
        keys,
        vec![
            &Key::from("bravo"),
            &Key::from("charlie"),
            &Key::from("delta"),
            &Key::from("echo"),
        ]
    );
}

// -------------------- Versioning of the blob --------------------

#[test]
fn version_zero_blobs_read_back() {
    // Index-building callers tag their segments with version 0.
    let blob = create_sstable(&sample_index(), &BTreeMap::new(), 0).unwrap();
    let segment = Segment::from_bytes(blob).unwrap();
    assert_eq!(segment.format_version(), 0);
}

#[test]
fn metadata_is_carried() {
    let mut metadata = BTreeMap::new();
    metadata.insert("collection".to_string(), "astronauts".to_string());
    let blob = create_sstable(&sample_index(), &metadata, 0).unwrap();

    let segment = Segment::from_bytes(blob).unwrap();
    assert_eq!(
        segment.metadata().get("collection").map(String::as_str),
        Some("astronauts")
    );
}

// -------------------- Corrupt blobs --------------------

#[test]
fn lookups_reject_corrupt_blob() {
    let mut blob = create_sstable(&sample_index(), &BTreeMap::new(), 0).unwrap();
    blob.truncate(blob.len() / 2);

    assert!(matches!(
        lookup_eq(&blob, &Key::from("term1")),
        Err(SegmentError::Corrupt(_))
    ));
    assert!(matches!(
        lookup_in_list(&blob, &[Key::from("term1")]),
        Err(SegmentError::Corrupt(_))
    ));
    assert!(matches!(
        lookup_range(&blob, &Key::from("term1"), RangeCmp::Gt),
        Err(SegmentError::Corrupt(_))
    ));
}

// -------------------- Posting codec --------------------

#[test]
fn postings_roundtrip() {
    let postings = vec![
        Posting::new("a", 0),
        Posting::new("some/longer/source-name", u64::MAX),
        Posting::new("", 17),
    ];
    let bytes = encode_postings(&postings);
    assert_eq!(decode_postings(&bytes).unwrap(), postings);
}

#[test]
fn decode_rejects_truncated_postings() {
    let bytes = encode_postings(&[Posting::new("doc", 5)]);
    assert!(decode_postings(&bytes[..bytes.len() - 1]).is_err());
}

#[test]
fn decode_rejects_trailing_bytes() {
    let mut bytes = encode_postings(&[Posting::new("doc", 5)]);
    bytes.push(0);
    assert!(decode_postings(&bytes).is_err());
}

#[test]
fn decode_rejects_absurd_count() {
    let mut bytes = Vec::new();
    bytes.extend_from_slice(&u32::MAX.to_le_bytes());
    assert!(decode_postings(&bytes).is_err());
}
