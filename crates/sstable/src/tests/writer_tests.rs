use crate::*;
use memtable::{FieldValue, MemTable, Schema};
use std::collections::BTreeMap;
use std::sync::Arc;
use tempfile::tempdir;

fn entries(n: u64) -> Vec<(Key, u64, Vec<u8>)> {
    (0..n)
        .map(|i| {
            (
                Key::Str(format!("key{:04}", i)),
                i + 1,
                format!("payload-{}", i).into_bytes(),
            )
        })
        .collect()
}

// -------------------- Reproducibility --------------------

#[test]
fn identical_input_produces_identical_bytes() {
    let metadata = BTreeMap::new();
    let opts = WriteOptions::default();

    let a = SegmentWriter::build(entries(100), &metadata, &opts).unwrap();
    let b = SegmentWriter::build(entries(100), &metadata, &opts).unwrap();
    assert_eq!(a, b);
}

#[test]
fn input_order_does_not_affect_bytes() {
    let metadata = BTreeMap::new();
    let opts = WriteOptions::default();

    let forward = entries(50);
    let mut backward = entries(50);
    backward.reverse();

    let a = SegmentWriter::build(forward, &metadata, &opts).unwrap();
    let b = SegmentWriter::build(backward, &metadata, &opts).unwrap();
    assert_eq!(a, b);
}

#[test]
fn duplicate_keys_collapse_last_wins() {
    let opts = WriteOptions::default();
    let input = vec![
        (Key::from("dup"), 1, b"old".to_vec()),
        (Key::from("dup"), 2, b"new".to_vec()),
    ];
    let blob = SegmentWriter::build(input, &BTreeMap::new(), &opts).unwrap();

    let segment = Segment::from_bytes(blob).unwrap();
    assert_eq!(segment.len(), 1);
    let (version, payload) = segment.get_version(&Key::from("dup")).unwrap().unwrap();
    assert_eq!(version, 2);
    assert_eq!(payload, b"new");
}

// -------------------- Structure --------------------

#[test]
fn records_sorted_ascending_regardless_of_input() {
    let opts = WriteOptions::default();
    let input = vec![
        (Key::from("zebra"), 1, b"z".to_vec()),
        (Key::from("apple"), 2, b"a".to_vec()),
        (Key::from("mango"), 3, b"m".to_vec()),
    ];
    let blob = SegmentWriter::build(input, &BTreeMap::new(), &opts).unwrap();

    let segment = Segment::from_bytes(blob).unwrap();
    let keys: Vec<&Key> = segment.keys().collect();
    assert_eq!(
        keys,
        vec![&Key::from("apple"), &Key::from("mango"), &Key::from("zebra")]
    );
}

#[test]
fn header_reflects_options() {
    let opts = WriteOptions {
        format_version: 1,
        created_at_ns: 123_456_789,
        bloom_fpr: 0.01,
    };
    let blob = SegmentWriter::build(entries(10), &BTreeMap::new(), &opts).unwrap();

    let segment = Segment::from_bytes(blob).unwrap();
    assert_eq!(segment.format_version(), 1);
    assert_eq!(segment.created_at(), 123_456_789);
    assert_eq!(segment.len(), 10);
}

#[test]
fn metadata_roundtrips() {
    let mut metadata = BTreeMap::new();
    metadata.insert("primary_key".to_string(), "id".to_string());
    metadata.insert("note".to_string(), "built by tests".to_string());

    let blob = SegmentWriter::build(entries(5), &metadata, &WriteOptions::default()).unwrap();
    let segment = Segment::from_bytes(blob).unwrap();
    assert_eq!(segment.metadata(), &metadata);
}

#[test]
fn empty_entry_set_builds_searchable_blob() {
    let blob =
        SegmentWriter::build(Vec::new(), &BTreeMap::new(), &WriteOptions::default()).unwrap();
    let segment = Segment::from_bytes(blob).unwrap();
    assert!(segment.is_empty());
    assert!(segment.get(&Key::from("anything")).unwrap().is_none());
}

#[test]
fn unknown_format_version_rejected() {
    let opts = WriteOptions {
        format_version: FORMAT_VERSION + 1,
        ..WriteOptions::default()
    };
    let result = SegmentWriter::build(entries(1), &BTreeMap::new(), &opts);
    assert!(matches!(result, Err(SegmentError::InvalidInput(_))));
}

// -------------------- Memtable flush path --------------------

fn sample_memtable() -> MemTable {
    let schema = Arc::new(Schema::new(["id", "name"], "id"));
    let mut mem = MemTable::new(schema, 1000);
    for i in 0..20i64 {
        let record = vec![
            ("id", FieldValue::Int(i)),
            ("name", FieldValue::Str(format!("row-{}", i))),
        ];
        mem.append(&record).unwrap();
    }
    mem
}

#[test]
fn write_from_memtable_roundtrip() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("flush.silt");

    let mem = sample_memtable();
    let opts = WriteOptions {
        created_at_ns: 42,
        ..WriteOptions::default()
    };
    SegmentWriter::write_from_memtable(&path, &mem, &opts).unwrap();

    let segment = Segment::open(&path).unwrap();
    assert_eq!(segment.len(), mem.len());
    assert_eq!(segment.created_at(), 42);
    assert_eq!(
        segment.metadata().get("primary_key").map(String::as_str),
        Some("id")
    );

    // Every buffered entry must be readable back, byte-for-byte, with its
    // version intact.
    for (key, (version, payload)) in mem.iter() {
        let (seg_version, seg_payload) = segment.get_version(key).unwrap().unwrap();
        assert_eq!(seg_version, *version);
        assert_eq!(seg_payload, payload.as_slice());
    }
}

#[test]
fn write_from_memtable_refuses_empty() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("empty.silt");

    let schema = Arc::new(Schema::new(["id"], "id"));
    let mem = MemTable::new(schema, 10);
    let result = SegmentWriter::write_from_memtable(&path, &mem, &WriteOptions::default());
    assert!(matches!(result, Err(SegmentError::InvalidInput(_))));
    assert!(!path.exists());
}

#[test]
fn write_leaves_no_temp_file_behind() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("clean.silt");

    let mem = sample_memtable();
    SegmentWriter::write_from_memtable(&path, &mem, &WriteOptions::default()).unwrap();

    let leftovers: Vec<_> = std::fs::read_dir(dir.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.path().extension().map(|x| x == "tmp").unwrap_or(false))
        .collect();
    assert!(leftovers.is_empty());
    assert!(path.exists());
}
