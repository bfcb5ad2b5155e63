//! Stress tests for the async pool.
//!
//! These helpers drive a pool under heavy load and concurrent submitters.

use crate::fixtures::{TestPool, DEFAULT_TABLE};
use kvqueue_core::{AsyncConfig, AsyncError, OpKind};
use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Result of a stress test run.
#[derive(Debug, Clone, Serialize)]
pub struct StressTestResult {
    /// Total operations submitted.
    pub total_ops: usize,
    /// Operations accepted by the pool.
    pub successful_ops: usize,
    /// Operations rejected at submission.
    pub failed_ops: usize,
    /// Total duration.
    #[serde(serialize_with = "serialize_duration")]
    pub duration: Duration,
    /// Operations per second.
    pub ops_per_second: f64,
}

fn serialize_duration<S: serde::Serializer>(
    duration: &Duration,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(duration.as_secs_f64())
}

impl StressTestResult {
    /// Creates a new result.
    pub fn new(successful: usize, failed: usize, duration: Duration) -> Self {
        let total = successful + failed;
        let ops_per_second = if duration.as_secs_f64() > 0.0 {
            total as f64 / duration.as_secs_f64()
        } else {
            0.0
        };

        Self {
            total_ops: total,
            successful_ops: successful,
            failed_ops: failed,
            duration,
            ops_per_second,
        }
    }

    /// Returns the result as a JSON string.
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }

    /// Prints a summary of the test.
    pub fn print_summary(&self, name: &str) {
        println!("\n=== {} ===", name);
        println!("Total operations: {}", self.total_ops);
        println!("Accepted: {}", self.successful_ops);
        println!("Rejected: {}", self.failed_ops);
        println!("Duration: {:?}", self.duration);
        println!("Throughput: {:.2} ops/sec", self.ops_per_second);
    }
}

/// Configuration for stress tests.
#[derive(Debug, Clone)]
pub struct StressConfig {
    /// Number of operations to submit.
    pub operations: usize,
    /// Number of worker threads in the pool.
    pub workers: usize,
    /// Number of concurrent submitter threads.
    pub submitters: usize,
    /// Size of values in bytes.
    pub value_size: usize,
    /// Number of distinct keys.
    pub key_count: usize,
    /// Submissions between flushes (0 to flush only at the end).
    pub flush_every: usize,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            operations: 10_000,
            workers: 4,
            submitters: 4,
            value_size: 64,
            key_count: 1_000,
            flush_every: 0,
        }
    }
}

impl StressConfig {
    fn pool(&self) -> TestPool {
        TestPool::new(self.workers)
    }

    fn key(&self, i: usize) -> Vec<u8> {
        ((i % self.key_count.max(1)) as u64).to_be_bytes().to_vec()
    }
}

/// Submits with retry while the queue is full. Returns false on any other
/// rejection.
fn submit_with_retry(
    test_pool: &TestPool,
    kind: OpKind,
    key: &[u8],
    value: Option<&[u8]>,
) -> bool {
    let t = test_pool.table();
    loop {
        match test_pool.submit(&t, kind, key, value, None) {
            Ok(_) => return true,
            Err(AsyncError::Busy { .. }) => thread::yield_now(),
            Err(_) => return false,
        }
    }
}

/// Run a sequential insert stress test from one submitter.
pub fn stress_sequential_inserts(config: &StressConfig) -> StressTestResult {
    let test_pool = config.pool();
    let value = vec![0xABu8; config.value_size];

    let start = Instant::now();
    let mut successful = 0usize;
    let mut failed = 0usize;

    for i in 0..config.operations {
        if submit_with_retry(&test_pool, OpKind::Insert, &config.key(i), Some(&value)) {
            successful += 1;
        } else {
            failed += 1;
        }
        if config.flush_every > 0 && (i + 1) % config.flush_every == 0 {
            test_pool.flush().expect("Flush failed");
        }
    }
    test_pool.flush().expect("Flush failed");

    StressTestResult::new(successful, failed, start.elapsed())
}

/// Run a mixed insert/search/remove stress test.
pub fn stress_mixed_operations(config: &StressConfig) -> StressTestResult {
    let test_pool = config.pool();
    let value = vec![0xABu8; config.value_size];

    let start = Instant::now();
    let mut successful = 0usize;
    let mut failed = 0usize;

    for i in 0..config.operations {
        let key = config.key(i);
        let accepted = match i % 3 {
            // Write (33%)
            0 => submit_with_retry(&test_pool, OpKind::Insert, &key, Some(&value)),
            // Read (33%)
            1 => submit_with_retry(&test_pool, OpKind::Search, &key, None),
            // Delete (33%)
            _ => submit_with_retry(&test_pool, OpKind::Remove, &key, None),
        };
        if accepted {
            successful += 1;
        } else {
            failed += 1;
        }
    }
    test_pool.flush().expect("Flush failed");

    StressTestResult::new(successful, failed, start.elapsed())
}

/// Run a stress test with several threads submitting and flushing at once.
pub fn stress_concurrent_submitters(config: &StressConfig) -> StressTestResult {
    let test_pool = Arc::new(config.pool());
    let successful = Arc::new(AtomicUsize::new(0));
    let failed = Arc::new(AtomicUsize::new(0));
    let submitters = config.submitters.max(1);
    let ops_per_thread = config.operations / submitters;

    let start = Instant::now();

    let handles: Vec<_> = (0..submitters)
        .map(|s| {
            let test_pool = Arc::clone(&test_pool);
            let successful = Arc::clone(&successful);
            let failed = Arc::clone(&failed);
            let config = config.clone();

            thread::spawn(move || {
                let value = vec![s as u8; config.value_size];
                for i in 0..ops_per_thread {
                    let key = config.key(s * ops_per_thread + i);
                    if submit_with_retry(&test_pool, OpKind::Insert, &key, Some(&value)) {
                        successful.fetch_add(1, Ordering::Relaxed);
                    } else {
                        failed.fetch_add(1, Ordering::Relaxed);
                    }
                    if config.flush_every > 0 && (i + 1) % config.flush_every == 0 {
                        test_pool.flush().expect("Flush failed");
                    }
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("Thread panicked");
    }
    test_pool.flush().expect("Flush failed");

    StressTestResult::new(
        successful.load(Ordering::Relaxed),
        failed.load(Ordering::Relaxed),
        start.elapsed(),
    )
}

/// Run a stress test that saturates a small queue, counting `Busy` rejections
/// as failures instead of retrying.
pub fn stress_backpressure(config: &StressConfig) -> StressTestResult {
    let test_pool = TestPool::with_config(
        AsyncConfig::new()
            .workers(config.workers)
            .ops_max(kvqueue_core::MIN_OPS),
    );
    let t = test_pool.pool.target(DEFAULT_TABLE, "").expect("Invalid target");
    let value = vec![0xABu8; config.value_size];

    let start = Instant::now();
    let mut successful = 0usize;
    let mut failed = 0usize;

    for i in 0..config.operations {
        match test_pool.insert(&t, &config.key(i), &value, None) {
            Ok(_) => successful += 1,
            Err(_) => failed += 1,
        }
    }
    test_pool.flush().expect("Flush failed");

    StressTestResult::new(successful, failed, start.elapsed())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequential_inserts() {
        let config = StressConfig {
            operations: 1_000,
            flush_every: 100,
            ..Default::default()
        };

        let result = stress_sequential_inserts(&config);
        assert_eq!(result.failed_ops, 0);
        assert_eq!(result.successful_ops, 1_000);
    }

    #[test]
    fn test_mixed_operations() {
        let config = StressConfig {
            operations: 1_000,
            key_count: 50,
            ..Default::default()
        };

        let result = stress_mixed_operations(&config);
        assert_eq!(result.failed_ops, 0);
    }

    #[test]
    fn test_concurrent_submitters() {
        let config = StressConfig {
            operations: 2_000,
            workers: 3,
            submitters: 4,
            flush_every: 50,
            ..Default::default()
        };

        let result = stress_concurrent_submitters(&config);
        assert_eq!(result.failed_ops, 0);
        assert_eq!(result.total_ops, 2_000);
    }

    #[test]
    fn test_backpressure_accounts_every_submission() {
        let config = StressConfig {
            operations: 500,
            workers: 1,
            ..Default::default()
        };

        let result = stress_backpressure(&config);
        assert_eq!(result.successful_ops + result.failed_ops, 500);
        assert!(result.successful_ops >= kvqueue_core::MIN_OPS);
    }

    #[test]
    fn test_result_json() {
        let result = StressTestResult::new(3, 1, Duration::from_secs(2));
        let json: serde_json::Value = serde_json::from_str(&result.to_json()).unwrap();
        assert_eq!(json["total_ops"], 4);
        assert_eq!(json["ops_per_second"], 2.0);
    }
}
