use config::StoreConfig;
use memtable::{FieldValue, Schema};
use std::path::Path;
use std::sync::Arc;

use crate::Store;

/// Opens a store over a two-column test schema in `dir`.
pub fn test_store(dir: &Path, max_records: usize) -> Store {
    let schema = Arc::new(Schema::new(["id", "name"], "id"));
    let cfg = StoreConfig {
        data_dir: dir.to_path_buf(),
        max_records,
        ..StoreConfig::default()
    };
    Store::open(schema, &cfg).unwrap()
}

/// A minimal record for the test schema.
pub fn rec(id: i64, name: &str) -> Vec<(&'static str, FieldValue)> {
    vec![
        ("id", FieldValue::Int(id)),
        ("name", FieldValue::Str(name.to_string())),
    ]
}
