//! Store configuration: defaults and environment-variable overrides.
//!
//! All settings can be overridden via `SILT_*` environment variables;
//! malformed values fall back to the defaults rather than failing startup.

use std::path::PathBuf;

/// Default directory for flushed segment files.
pub const DEFAULT_DATA_DIR: &str = "data";

/// Default memtable record ceiling before a flush is signalled.
pub const DEFAULT_MAX_RECORDS: usize = 50_000;

/// Default bloom filter false-positive rate for flushed segments.
pub const DEFAULT_BLOOM_FPR: f64 = 0.01;

/// Tunables for a store instance.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreConfig {
    /// Directory where segment files are written.
    pub data_dir: PathBuf,
    /// Memtable record ceiling; reaching it signals a flush.
    pub max_records: usize,
    /// Target false-positive rate for segment bloom filters.
    pub bloom_fpr: f64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            max_records: DEFAULT_MAX_RECORDS,
            bloom_fpr: DEFAULT_BLOOM_FPR,
        }
    }
}

impl StoreConfig {
    /// Builds a config from the environment:
    ///
    /// ```text
    /// SILT_DATA_DIR     segment directory          (default: "data")
    /// SILT_MAX_RECORDS  memtable record ceiling    (default: 50000)
    /// SILT_BLOOM_FPR    bloom false-positive rate  (default: 0.01)
    /// ```
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            data_dir: PathBuf::from(env_or("SILT_DATA_DIR", DEFAULT_DATA_DIR)),
            max_records: env_or("SILT_MAX_RECORDS", "")
                .parse()
                .unwrap_or(defaults.max_records),
            bloom_fpr: parse_fpr(&env_or("SILT_BLOOM_FPR", "")).unwrap_or(defaults.bloom_fpr),
        }
    }
}

/// Reads an environment variable, falling back to `default`.
#[must_use]
pub fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parses a false-positive rate, accepting only values in (0, 1).
fn parse_fpr(raw: &str) -> Option<f64> {
    let value: f64 = raw.parse().ok()?;
    if value > 0.0 && value < 1.0 {
        Some(value)
    } else {
        None
    }
}
