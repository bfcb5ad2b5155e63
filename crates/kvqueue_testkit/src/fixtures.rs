//! Test fixtures and pool helpers.
//!
//! Provides convenience functions for setting up a pool over the in-memory
//! engine and common test scenarios.

use kvqueue_core::{AsyncConfig, AsyncPool, OpTarget};
use kvqueue_store::InMemoryEngine;
use std::sync::Arc;

/// Table created by every fixture.
pub const DEFAULT_TABLE: &str = "test";

/// A pool over a fresh in-memory engine, shut down on drop.
pub struct TestPool {
    /// The engine the pool runs against.
    pub engine: Arc<InMemoryEngine>,
    /// The pool instance.
    pub pool: AsyncPool<InMemoryEngine>,
}

impl TestPool {
    /// Creates a pool with `workers` threads and default settings.
    pub fn new(workers: usize) -> Self {
        Self::with_config(AsyncConfig::new().workers(workers))
    }

    /// Creates a pool with the given configuration.
    pub fn with_config(config: AsyncConfig) -> Self {
        Self::with_tables(config, &[DEFAULT_TABLE])
    }

    /// Creates a pool whose engine holds the named tables.
    pub fn with_tables(config: AsyncConfig, tables: &[&str]) -> Self {
        let engine = Arc::new(InMemoryEngine::new());
        for table in tables {
            engine
                .create_table(table)
                .expect("Failed to create test table");
        }
        let pool =
            AsyncPool::new(Arc::clone(&engine), config).expect("Failed to start test pool");
        Self { engine, pool }
    }

    /// Returns a target for the default table.
    pub fn table(&self) -> OpTarget {
        self.target(DEFAULT_TABLE)
    }

    /// Returns a target for `uri` with an empty config.
    pub fn target(&self, uri: &str) -> OpTarget {
        self.pool.target(uri, "").expect("Invalid test target")
    }

    /// Reads a committed value from the default table.
    pub fn committed(&self, key: &[u8]) -> Option<Vec<u8>> {
        self.engine
            .get(DEFAULT_TABLE, key)
            .expect("Default table missing")
    }
}

impl std::ops::Deref for TestPool {
    type Target = AsyncPool<InMemoryEngine>;

    fn deref(&self) -> &Self::Target {
        &self.pool
    }
}

/// Runs a test with a temporary pool of `workers` threads.
///
/// # Example
///
/// ```rust
/// use kvqueue_testkit::{with_pool, DEFAULT_TABLE};
///
/// let executed = with_pool(1, |pool| {
///     let t = pool.target(DEFAULT_TABLE, "").unwrap();
///     pool.insert(&t, b"a", b"1", None).unwrap();
///     pool.flush().unwrap();
///     pool.stats().executed
/// });
/// assert_eq!(executed, 1);
/// ```
pub fn with_pool<F, R>(workers: usize, f: F) -> R
where
    F: FnOnce(&AsyncPool<InMemoryEngine>) -> R,
{
    let test_pool = TestPool::new(workers);
    f(&test_pool.pool)
}

/// Test scenario helpers.
pub mod scenarios {
    use super::*;

    /// Creates a pool whose default table holds `count` committed keys.
    ///
    /// Keys are `key-{i}` and values `value-{i}`.
    pub fn populated_pool(workers: usize, count: usize) -> TestPool {
        let test_pool = TestPool::new(workers);
        let t = test_pool.table();
        for i in 0..count {
            test_pool
                .insert(&t, &key(i), &value(i), None)
                .expect("Failed to queue insert");
        }
        test_pool.flush().expect("Failed to flush");
        test_pool
    }

    /// Key used by [`populated_pool`] for index `i`.
    pub fn key(i: usize) -> Vec<u8> {
        format!("key-{i}").into_bytes()
    }

    /// Value used by [`populated_pool`] for index `i`.
    pub fn value(i: usize) -> Vec<u8> {
        format!("value-{i}").into_bytes()
    }
}
