//! Flush demo command implementation.

use super::CommandError;
use kvqueue_core::{AsyncCallback, AsyncConfig, AsyncOp, AsyncPool, AsyncResult, OpOutcome};
use kvqueue_store::InMemoryEngine;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

const TABLE: &str = "demo";

/// One flushed batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchReport {
    /// Batch number, starting at 1.
    pub batch: usize,
    /// Operations queued when the flush was requested.
    pub queued: usize,
    /// Operations completed when the flush returned.
    pub completed: usize,
    /// Workers that met at the barrier.
    pub rendezvous: usize,
}

/// Queues `batches` batches of inserts and flushes after each one.
pub fn execute(
    workers: usize,
    batches: usize,
    ops: usize,
) -> Result<Vec<BatchReport>, CommandError> {
    let engine = Arc::new(InMemoryEngine::new());
    engine.create_table(TABLE)?;
    let pool = AsyncPool::new(Arc::clone(&engine), AsyncConfig::new().workers(workers))?;
    let target = pool.target(TABLE, "")?;

    let completed = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&completed);
    let callback: Arc<dyn AsyncCallback> =
        Arc::new(move |_: &AsyncOp, _: &OpOutcome, _: u32| -> AsyncResult<()> {
            seen.fetch_add(1, Ordering::Relaxed);
            Ok(())
        });

    let mut reports = Vec::with_capacity(batches);
    for batch in 1..=batches {
        for i in 0..ops {
            let key = format!("batch-{batch}-{i}");
            pool.insert(&target, key.as_bytes(), b"v", Some(Arc::clone(&callback)))?;
        }
        let queued = pool.queue_len();
        pool.flush()?;
        reports.push(BatchReport {
            batch,
            queued,
            completed: completed.load(Ordering::Relaxed),
            rendezvous: pool.stats().last_rendezvous,
        });
    }
    pool.shutdown();
    Ok(reports)
}

/// Runs the demo and prints one line per batch.
pub fn run(workers: usize, batches: usize, ops: usize) -> Result<(), CommandError> {
    let start = Instant::now();
    let reports = execute(workers, batches, ops)?;
    info!(batches = reports.len(), "flush demo finished");

    println!("{:<8}{:>10}{:>12}{:>12}", "batch", "queued", "completed", "rendezvous");
    for report in &reports {
        println!(
            "{:<8}{:>10}{:>12}{:>12}",
            report.batch, report.queued, report.completed, report.rendezvous
        );
    }
    println!("Elapsed: {:?}", start.elapsed());
    Ok(())
}
