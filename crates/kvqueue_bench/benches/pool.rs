//! Async pool benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use kvqueue_bench::utils::{bench_pool, generate_entries, generate_keys, BENCH_TABLE};
use kvqueue_core::{AsyncCallback, AsyncOp, AsyncResult, OpOutcome};
use std::sync::Arc;

/// Benchmark a batch of inserts followed by a flush, across worker counts.
fn bench_insert_batch(c: &mut Criterion) {
    let mut group = c.benchmark_group("insert_batch");
    let entries = generate_entries(1000, 64);
    group.throughput(Throughput::Elements(entries.len() as u64));

    for workers in [1, 2, 4, 8].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(workers), workers, |b, &workers| {
            let (_engine, pool) = bench_pool(workers);
            let target = pool.target(BENCH_TABLE, "").unwrap();

            b.iter(|| {
                for (key, value) in &entries {
                    pool.insert(&target, key, black_box(value), None).unwrap();
                }
                pool.flush().unwrap();
            });
        });
    }
    group.finish();
}

/// Benchmark searches over a populated table.
fn bench_search_batch(c: &mut Criterion) {
    let mut group = c.benchmark_group("search_batch");
    let keys = generate_keys(1000);
    group.throughput(Throughput::Elements(keys.len() as u64));

    for workers in [1, 4].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(workers), workers, |b, &workers| {
            let (_engine, pool) = bench_pool(workers);
            let target = pool.target(BENCH_TABLE, "").unwrap();
            for key in &keys {
                pool.insert(&target, key, b"value", None).unwrap();
            }
            pool.flush().unwrap();

            b.iter(|| {
                for key in &keys {
                    pool.search(&target, black_box(key), None).unwrap();
                }
                pool.flush().unwrap();
            });
        });
    }
    group.finish();
}

/// Benchmark the callback path.
fn bench_with_callback(c: &mut Criterion) {
    let mut group = c.benchmark_group("insert_with_callback");
    let entries = generate_entries(1000, 64);
    group.throughput(Throughput::Elements(entries.len() as u64));

    group.bench_function("noop_callback", |b| {
        let (_engine, pool) = bench_pool(4);
        let target = pool.target(BENCH_TABLE, "").unwrap();
        let callback: Arc<dyn AsyncCallback> =
            Arc::new(|op: &AsyncOp, outcome: &OpOutcome, _: u32| -> AsyncResult<()> {
                black_box((op.id(), outcome.is_success()));
                Ok(())
            });

        b.iter(|| {
            for (key, value) in &entries {
                pool.insert(&target, key, value, Some(Arc::clone(&callback)))
                    .unwrap();
            }
            pool.flush().unwrap();
        });
    });
    group.finish();
}

/// Benchmark an empty flush (barrier round trip only).
fn bench_empty_flush(c: &mut Criterion) {
    let mut group = c.benchmark_group("empty_flush");

    for workers in [1, 2, 4, 8, 16].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(workers), workers, |b, &workers| {
            let (_engine, pool) = bench_pool(workers);
            b.iter(|| pool.flush().unwrap());
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_insert_batch,
    bench_search_batch,
    bench_with_callback,
    bench_empty_flush,
);
criterion_main!(benches);
