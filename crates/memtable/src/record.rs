//! Field values, record input, and the deterministic payload encoding.
//!
//! A record's payload is its field values encoded in ascending order of the
//! schema's sorted column names, each canonicalized first, so two records
//! with identical field values always serialize to identical bytes no
//! matter which order the caller supplied the fields in.

use byteorder::{LittleEndian, WriteBytesExt};
use std::collections::BTreeMap;

use crate::Key;

/// Field encoding tags. Part of the payload format; never renumber.
const TAG_NULL: u8 = 0;
const TAG_INT: u8 = 1;
const TAG_FLOAT: u8 = 2;
const TAG_STR: u8 = 3;
const TAG_BYTES: u8 = 4;
const TAG_ARRAY: u8 = 5;

/// A single field value within a record.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Absent / unknown value.
    Null,
    /// Signed 64-bit integer.
    Int(i64),
    /// 64-bit float.
    Float(f64),
    /// UTF-8 string.
    Str(String),
    /// Raw bytes.
    Bytes(Vec<u8>),
    /// Date/time as nanoseconds since the Unix epoch.
    Timestamp(i64),
    /// Array of values.
    Array(Vec<FieldValue>),
}

impl FieldValue {
    /// Reduces the value to its canonical primitive representation.
    ///
    /// Timestamps become integer epoch seconds and arrays canonicalize
    /// elementwise, so a value encodes to the same bytes regardless of
    /// which richer type it arrived as.
    #[must_use]
    pub fn canonicalize(&self) -> FieldValue {
        match self {
            FieldValue::Timestamp(ns) => FieldValue::Int(ns.div_euclid(1_000_000_000)),
            FieldValue::Array(items) => {
                FieldValue::Array(items.iter().map(FieldValue::canonicalize).collect())
            }
            other => other.clone(),
        }
    }

    /// Appends the canonical binary encoding of this value to `buf`.
    ///
    /// Callers are expected to [`canonicalize`](FieldValue::canonicalize)
    /// first; a raw `Timestamp` never reaches the wire.
    fn encode_into(&self, buf: &mut Vec<u8>) {
        match self {
            FieldValue::Null => buf.push(TAG_NULL),
            FieldValue::Int(v) => {
                buf.push(TAG_INT);
                buf.extend_from_slice(&v.to_le_bytes());
            }
            FieldValue::Float(v) => {
                buf.push(TAG_FLOAT);
                buf.extend_from_slice(&v.to_le_bytes());
            }
            FieldValue::Str(s) => {
                buf.push(TAG_STR);
                // write_u32 on a Vec cannot fail
                let _ = buf.write_u32::<LittleEndian>(s.len() as u32);
                buf.extend_from_slice(s.as_bytes());
            }
            FieldValue::Bytes(b) => {
                buf.push(TAG_BYTES);
                let _ = buf.write_u32::<LittleEndian>(b.len() as u32);
                buf.extend_from_slice(b);
            }
            FieldValue::Timestamp(_) => {
                self.canonicalize().encode_into(buf);
            }
            FieldValue::Array(items) => {
                buf.push(TAG_ARRAY);
                let _ = buf.write_u32::<LittleEndian>(items.len() as u32);
                for item in items {
                    item.canonicalize().encode_into(buf);
                }
            }
        }
    }

    /// Converts a scalar field value into a [`Key`], if its type can be one.
    #[must_use]
    pub fn as_key(&self) -> Option<Key> {
        match self {
            FieldValue::Int(v) => Some(Key::Int(*v)),
            FieldValue::Str(s) => Some(Key::Str(s.clone())),
            FieldValue::Bytes(b) => Some(Key::Bytes(b.clone())),
            _ => None,
        }
    }
}

/// Capability for anything that can present itself as a name -> value map.
///
/// `append` accepts any implementor; this replaces runtime attribute
/// probing with an explicit conversion the type opts into.
pub trait ToFieldMap {
    /// Returns the record's fields as a name -> value map.
    fn to_field_map(&self) -> BTreeMap<String, FieldValue>;
}

impl ToFieldMap for BTreeMap<String, FieldValue> {
    fn to_field_map(&self) -> BTreeMap<String, FieldValue> {
        self.clone()
    }
}

impl ToFieldMap for Vec<(String, FieldValue)> {
    fn to_field_map(&self) -> BTreeMap<String, FieldValue> {
        self.iter()
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect()
    }
}

impl<'a> ToFieldMap for Vec<(&'a str, FieldValue)> {
    fn to_field_map(&self) -> BTreeMap<String, FieldValue> {
        self.iter()
            .map(|(name, value)| (name.to_string(), value.clone()))
            .collect()
    }
}

impl<'a> ToFieldMap for [(&'a str, FieldValue)] {
    fn to_field_map(&self) -> BTreeMap<String, FieldValue> {
        self.iter()
            .map(|(name, value)| (name.to_string(), value.clone()))
            .collect()
    }
}

/// Schema shared by a memtable and its flushed segments: the column set and
/// the name of the primary-key field. Column names are stored sorted so the
/// payload encoding order is fixed at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    columns: Vec<String>,
    primary_key: String,
}

impl Schema {
    /// Builds a schema from a column list and the primary-key field name.
    /// Column order does not matter; names are sorted and deduplicated.
    pub fn new<I, S>(columns: I, primary_key: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut columns: Vec<String> = columns.into_iter().map(Into::into).collect();
        columns.sort();
        columns.dedup();
        Self {
            columns,
            primary_key: primary_key.into(),
        }
    }

    /// Column names in their fixed (sorted) encoding order.
    #[must_use]
    pub fn column_names(&self) -> &[String] {
        &self.columns
    }

    /// Name of the primary-key field.
    #[must_use]
    pub fn primary_key(&self) -> &str {
        &self.primary_key
    }
}

/// Encodes a record's fields into the deterministic payload form.
///
/// Fields are taken in the schema's sorted column order; a column missing
/// from the record encodes as `Null`. Fields in the record that are not in
/// the schema are ignored.
#[must_use]
pub fn encode_record(schema: &Schema, fields: &BTreeMap<String, FieldValue>) -> Vec<u8> {
    let mut buf = Vec::with_capacity(16 * schema.columns.len());
    for column in &schema.columns {
        let value = fields.get(column).cloned().unwrap_or(FieldValue::Null);
        value.canonicalize().encode_into(&mut buf);
    }
    buf
}
