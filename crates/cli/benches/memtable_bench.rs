use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use memtable::{FieldValue, MemTable, Schema};
use std::sync::Arc;

const N_RECORDS: usize = 10_000;

fn schema() -> Arc<Schema> {
    Arc::new(Schema::new(["id", "name", "score"], "id"))
}

fn record(i: i64) -> Vec<(&'static str, FieldValue)> {
    vec![
        ("id", FieldValue::Int(i)),
        ("name", FieldValue::Str(format!("row-{}", i))),
        ("score", FieldValue::Float(i as f64 * 0.5)),
    ]
}

fn memtable_append_benchmark(c: &mut Criterion) {
    c.bench_function("memtable_append_10k", |b| {
        b.iter_batched(
            || MemTable::new(schema(), N_RECORDS + 1),
            |mut mem| {
                for i in 0..N_RECORDS as i64 {
                    mem.append(&record(i)).unwrap();
                }
                mem
            },
            BatchSize::SmallInput,
        );
    });
}

fn memtable_overwrite_benchmark(c: &mut Criterion) {
    c.bench_function("memtable_overwrite_same_key_10k", |b| {
        b.iter_batched(
            || MemTable::new(schema(), N_RECORDS + 1),
            |mut mem| {
                for i in 0..N_RECORDS as i64 {
                    let mut rec = record(i);
                    rec[0] = ("id", FieldValue::Int(1));
                    mem.append(&rec).unwrap();
                }
                mem
            },
            BatchSize::SmallInput,
        );
    });
}

fn memtable_get_benchmark(c: &mut Criterion) {
    c.bench_function("memtable_get_10k", |b| {
        b.iter_batched(
            || {
                let mut mem = MemTable::new(schema(), N_RECORDS + 1);
                for i in 0..N_RECORDS as i64 {
                    mem.append(&record(i)).unwrap();
                }
                mem
            },
            |mem| {
                for i in 0..N_RECORDS as i64 {
                    assert!(mem.get(&memtable::Key::Int(i)).is_some());
                }
            },
            BatchSize::LargeInput,
        );
    });
}

criterion_group!(
    benches,
    memtable_append_benchmark,
    memtable_overwrite_benchmark,
    memtable_get_benchmark
);
criterion_main!(benches);
