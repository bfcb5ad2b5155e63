//! Benchmark utilities.

use kvqueue_core::{AsyncConfig, AsyncPool};
use kvqueue_store::InMemoryEngine;
use rand::Rng;
use std::sync::Arc;

/// Table created by [`bench_pool`].
pub const BENCH_TABLE: &str = "bench";

/// Generate random data of the specified size.
pub fn random_data(size: usize) -> Vec<u8> {
    let mut rng = rand::thread_rng();
    (0..size).map(|_| rng.gen()).collect()
}

/// Generate `count` distinct keys.
pub fn generate_keys(count: usize) -> Vec<Vec<u8>> {
    (0..count as u64).map(|i| i.to_be_bytes().to_vec()).collect()
}

/// Generate key/value pairs with the specified payload size.
pub fn generate_entries(count: usize, payload_size: usize) -> Vec<(Vec<u8>, Vec<u8>)> {
    generate_keys(count)
        .into_iter()
        .map(|key| (key, random_data(payload_size)))
        .collect()
}

/// Starts a pool with `workers` threads over an engine holding [`BENCH_TABLE`].
pub fn bench_pool(workers: usize) -> (Arc<InMemoryEngine>, AsyncPool<InMemoryEngine>) {
    let engine = Arc::new(InMemoryEngine::new());
    engine.create_table(BENCH_TABLE).unwrap();
    let config = AsyncConfig::new()
        .workers(workers)
        .ops_max(kvqueue_core::MAX_OPS);
    let pool = AsyncPool::new(Arc::clone(&engine), config).unwrap();
    (engine, pool)
}
