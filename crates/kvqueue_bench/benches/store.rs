//! In-memory engine and signature benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use kvqueue_bench::utils::{random_data, BENCH_TABLE};
use kvqueue_core::Signature;
use kvqueue_store::{InMemoryEngine, StoreCursor, StoreEngine, StoreSession};

/// Benchmark a transactional insert through a cursor.
fn bench_cursor_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("cursor_insert");

    for size in [64, 256, 1024, 4096].iter() {
        group.throughput(Throughput::Bytes(*size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            let engine = InMemoryEngine::new();
            engine.create_table(BENCH_TABLE).unwrap();
            let mut session = engine.open_session().unwrap();
            let mut cursor = session.open_cursor(BENCH_TABLE, "").unwrap();
            let data = random_data(size);
            let mut i = 0u64;

            b.iter(|| {
                let txn = session.begin().unwrap();
                cursor.set_key(&i.to_be_bytes());
                cursor.set_value(black_box(&data));
                cursor.insert().unwrap();
                session.commit(txn).unwrap();
                cursor.reset().unwrap();
                i += 1;
            });
        });
    }
    group.finish();
}

/// Benchmark a committed read through a cursor.
fn bench_cursor_search(c: &mut Criterion) {
    c.bench_function("cursor_search", |b| {
        let engine = InMemoryEngine::new();
        engine.create_table(BENCH_TABLE).unwrap();
        let mut session = engine.open_session().unwrap();
        let mut cursor = session.open_cursor(BENCH_TABLE, "").unwrap();
        cursor.set_key(b"key");
        cursor.set_value(b"value");
        cursor.insert().unwrap();

        b.iter(|| {
            cursor.set_key(black_box(b"key"));
            cursor.search().unwrap();
            black_box(cursor.get_value().unwrap());
            cursor.reset().unwrap();
        });
    });
}

/// Benchmark resource signature hashing.
fn bench_signature(c: &mut Criterion) {
    c.bench_function("signature_compute", |b| {
        b.iter(|| Signature::compute(black_box("table:bench"), black_box("overwrite=false")));
    });
}

criterion_group!(benches, bench_cursor_insert, bench_cursor_search, bench_signature);
criterion_main!(benches);
