///! # CLI - silt interactive shell
///!
///! A REPL-style command-line interface for the silt index store. Reads
///! commands from stdin, executes them against the store, and prints
///! results to stdout. Designed for both interactive use and scripted
///! testing (pipe commands via stdin).
///!
///! ## Commands
///!
///! ```text
///! APPEND f=v [f=v ...]  Append a record (must include the primary key)
///! GET key               Look up a key (prints version or "(nil)")
///! FLUSH                 Force flush the memtable to a segment
///! STATS                 Print store debug info
///! HELP                  Show the command list
///! EXIT / QUIT           Shut down gracefully (flushes the buffer)
///! ```
///!
///! ## Configuration
///!
///! All settings are controlled via environment variables:
///!
///! ```text
///! SILT_DATA_DIR     Segment directory          (default: "data")
///! SILT_MAX_RECORDS  Memtable record ceiling    (default: 50000)
///! SILT_BLOOM_FPR    Bloom false-positive rate  (default: 0.01)
///! SILT_COLUMNS      Schema columns, comma-sep  (default: "id,name,value")
///! SILT_PK           Primary-key field          (default: "id")
///! ```
///!
///! ## Example
///!
///! ```text
///! $ cargo run -p cli
///! silt started (data_dir=data, max_records=50000, pk=id)
///! > APPEND id=1 name=Alice value=3.5
///! OK
///! > GET 1
///! version=1754… (41 payload bytes)
///! > FLUSH
///! flushed to data/00182b4c….silt
///! > EXIT
///! bye
///! ```

use anyhow::Result;
use config::{env_or, StoreConfig};
use memtable::{FieldValue, Key, Schema};
use std::io::{self, BufRead, Write};
use std::sync::Arc;
use store::Store;

fn main() -> Result<()> {
    let cfg = StoreConfig::from_env();
    let columns: Vec<String> = env_or("SILT_COLUMNS", "id,name,value")
        .split(',')
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .collect();
    let pk = env_or("SILT_PK", "id");
    let schema = Arc::new(Schema::new(columns, pk.clone()));

    let mut store = Store::open(schema, &cfg)?;

    println!(
        "silt started (data_dir={}, max_records={}, pk={}, segments={})",
        cfg.data_dir.display(),
        cfg.max_records,
        pk,
        store.segment_count()
    );
    println!("Commands: APPEND f=v [f=v ...] | GET key | FLUSH | STATS | EXIT");
    print!("> ");
    io::stdout().flush().ok();

    let stdin = io::stdin();

    for line in stdin.lock().lines() {
        let line = line?;
        let mut parts = line.split_whitespace();
        if let Some(cmd) = parts.next() {
            match cmd.to_uppercase().as_str() {
                "APPEND" => {
                    let fields: Vec<&str> = parts.collect();
                    if fields.is_empty() {
                        println!("ERR usage: APPEND field=value [field=value ...]");
                    } else {
                        match parse_record(&fields) {
                            Ok(record) => match store.append(&record) {
                                Ok(()) => println!("OK"),
                                Err(e) => println!("ERR {}", e),
                            },
                            Err(msg) => println!("ERR {}", msg),
                        }
                    }
                }
                "GET" => {
                    if let Some(raw) = parts.next() {
                        match store.get(&parse_key(raw)) {
                            Ok(Some((version, payload))) => {
                                println!("version={} ({} payload bytes)", version, payload.len());
                            }
                            Ok(None) => println!("(nil)"),
                            Err(e) => println!("ERR {}", e),
                        }
                    } else {
                        println!("ERR usage: GET key");
                    }
                }
                "FLUSH" => match store.flush() {
                    Ok(Some(path)) => println!("flushed to {}", path.display()),
                    Ok(None) => println!("(empty buffer, nothing to flush)"),
                    Err(e) => println!("ERR {}", e),
                },
                "STATS" => {
                    println!("{:?}", store);
                }
                "HELP" => {
                    println!("APPEND f=v [f=v ...] | GET key | FLUSH | STATS | EXIT");
                }
                "EXIT" | "QUIT" => {
                    println!("bye");
                    break;
                }
                other => {
                    println!("ERR unknown command: {}", other);
                }
            }
        }
        print!("> ");
        io::stdout().flush().ok();
    }

    Ok(())
}

/// Parses `field=value` pairs into a record.
fn parse_record(fields: &[&str]) -> Result<Vec<(String, FieldValue)>, String> {
    let mut record = Vec::with_capacity(fields.len());
    for field in fields {
        let (name, raw) = field
            .split_once('=')
            .ok_or_else(|| format!("expected field=value, got '{}'", field))?;
        if name.is_empty() {
            return Err(format!("empty field name in '{}'", field));
        }
        record.push((name.to_string(), parse_value(raw)));
    }
    Ok(record)
}

/// Value literals: integers, floats, `null`, everything else is a string.
fn parse_value(raw: &str) -> FieldValue {
    if raw.eq_ignore_ascii_case("null") {
        return FieldValue::Null;
    }
    if let Ok(i) = raw.parse::<i64>() {
        return FieldValue::Int(i);
    }
    if let Ok(f) = raw.parse::<f64>() {
        return FieldValue::Float(f);
    }
    FieldValue::Str(raw.to_string())
}

/// Keys typed at the prompt: integer if it parses, string otherwise.
fn parse_key(raw: &str) -> Key {
    match raw.parse::<i64>() {
        Ok(i) => Key::Int(i),
        Err(_) => Key::Str(raw.to_string()),
    }
}
