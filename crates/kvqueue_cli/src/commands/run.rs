//! Run command implementation.

use super::{CommandError, OutputFormat};
use kvqueue_core::{
    AsyncCallback, AsyncConfig, AsyncError, AsyncOp, AsyncPool, AsyncResult, OpKind, OpOutcome,
    OpTarget, StatsSnapshot, MAX_WORKERS, MIN_WORKERS,
};
use kvqueue_store::InMemoryEngine;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Instant;
use tracing::{debug, info};

/// Parameters of a generated workload.
#[derive(Debug, Clone)]
pub struct Workload {
    /// Pool worker threads.
    pub workers: usize,
    /// Operations to submit.
    pub operations: usize,
    /// Distinct keys per table.
    pub keys: usize,
    /// Number of tables.
    pub tables: usize,
    /// Generator seed.
    pub seed: u64,
}

impl Workload {
    fn validate(&self) -> Result<(), CommandError> {
        if !(MIN_WORKERS..=MAX_WORKERS).contains(&self.workers) {
            return Err(CommandError::InvalidWorkload(format!(
                "workers must be between {MIN_WORKERS} and {MAX_WORKERS}"
            )));
        }
        if self.keys == 0 || self.tables == 0 {
            return Err(CommandError::InvalidWorkload(
                "keys and tables must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Workload execution report.
#[derive(Debug, Serialize)]
pub struct RunReport {
    /// Pool worker threads.
    pub workers: usize,
    /// Operations submitted.
    pub operations: usize,
    /// Wall-clock time in milliseconds.
    pub elapsed_ms: u128,
    /// Operations per second.
    pub ops_per_second: f64,
    /// Times a full queue forced an early flush.
    pub busy_retries: u64,
    /// Callback-observed outcome counts.
    pub outcomes: OutcomeCounts,
    /// Pool counters.
    pub pool: PoolCounters,
    /// Committed rows per table.
    pub tables: Vec<TableRows>,
}

/// Outcomes seen by the workload callback.
#[derive(Debug, Default, Serialize)]
pub struct OutcomeCounts {
    /// Successful operations.
    pub success: u64,
    /// Removes and searches that found no key.
    pub not_found: u64,
    /// Failed operations.
    pub failed: u64,
}

/// Serializable view of the pool statistics.
#[derive(Debug, Serialize)]
pub struct PoolCounters {
    /// Operations executed.
    pub executed: u64,
    /// Transactions committed.
    pub commits: u64,
    /// Transactions rolled back.
    pub rollbacks: u64,
    /// Cursor cache hits.
    pub cursor_hits: u64,
    /// Cursor cache misses.
    pub cursor_misses: u64,
    /// Completed flushes.
    pub flushes: u64,
    /// Workers at the last barrier.
    pub last_rendezvous: usize,
    /// Largest queue depth observed.
    pub max_queue_depth: usize,
}

impl From<StatsSnapshot> for PoolCounters {
    fn from(stats: StatsSnapshot) -> Self {
        Self {
            executed: stats.executed,
            commits: stats.commits,
            rollbacks: stats.rollbacks,
            cursor_hits: stats.cursor_hits,
            cursor_misses: stats.cursor_misses,
            flushes: stats.flushes,
            last_rendezvous: stats.last_rendezvous,
            max_queue_depth: stats.max_queue_depth,
        }
    }
}

/// Committed row count of one table.
#[derive(Debug, Serialize)]
pub struct TableRows {
    /// Table name.
    pub name: String,
    /// Committed rows.
    pub rows: usize,
}

#[derive(Default)]
struct OutcomeCounter {
    success: AtomicU64,
    not_found: AtomicU64,
    failed: AtomicU64,
}

impl AsyncCallback for OutcomeCounter {
    fn notify(&self, _op: &AsyncOp, outcome: &OpOutcome, _flags: u32) -> AsyncResult<()> {
        let counter = match outcome {
            OpOutcome::Success => &self.success,
            OpOutcome::NotFound => &self.not_found,
            OpOutcome::Failed(_) => &self.failed,
        };
        counter.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

impl OutcomeCounter {
    fn counts(&self) -> OutcomeCounts {
        OutcomeCounts {
            success: self.success.load(Ordering::Relaxed),
            not_found: self.not_found.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}

/// Picks an operation kind: 40% insert, 20% update, 30% search, 10% remove.
fn pick_kind(rng: &mut StdRng) -> OpKind {
    match rng.gen_range(0..10) {
        0..=3 => OpKind::Insert,
        4..=5 => OpKind::Update,
        6..=8 => OpKind::Search,
        _ => OpKind::Remove,
    }
}

fn table_name(index: usize) -> String {
    format!("table_{index}")
}

/// Executes the workload and returns the report.
pub fn execute(workload: &Workload) -> Result<RunReport, CommandError> {
    workload.validate()?;

    let engine = Arc::new(InMemoryEngine::new());
    for index in 0..workload.tables {
        engine.create_table(&table_name(index))?;
    }
    let pool = AsyncPool::new(
        Arc::clone(&engine),
        AsyncConfig::new().workers(workload.workers),
    )?;
    let targets = (0..workload.tables)
        .map(|index| pool.target(&table_name(index), ""))
        .collect::<Result<Vec<OpTarget>, _>>()?;

    let counter = Arc::new(OutcomeCounter::default());
    let callback: Arc<dyn AsyncCallback> = counter.clone();
    let mut rng = StdRng::seed_from_u64(workload.seed);
    let mut busy_retries = 0u64;

    info!(
        workers = workload.workers,
        operations = workload.operations,
        "running workload"
    );
    let start = Instant::now();
    for _ in 0..workload.operations {
        let target = &targets[rng.gen_range(0..targets.len())];
        let kind = pick_kind(&mut rng);
        let key = format!("key-{:08}", rng.gen_range(0..workload.keys));
        let value = rng.gen::<u64>().to_le_bytes();

        loop {
            match pool.submit(
                target,
                kind,
                key.as_bytes(),
                Some(&value[..]),
                Some(Arc::clone(&callback)),
            ) {
                Ok(_) => break,
                Err(AsyncError::Busy { capacity }) => {
                    debug!(capacity, "queue full, flushing");
                    busy_retries += 1;
                    pool.flush()?;
                    thread::yield_now();
                }
                Err(err) => return Err(err.into()),
            }
        }
    }
    pool.flush()?;
    let elapsed = start.elapsed();

    let stats = pool.stats();
    pool.shutdown();

    let tables = (0..workload.tables)
        .map(|index| -> Result<TableRows, CommandError> {
            let name = table_name(index);
            let rows = engine.len(&name)?;
            Ok(TableRows { name, rows })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let secs = elapsed.as_secs_f64();
    Ok(RunReport {
        workers: workload.workers,
        operations: workload.operations,
        elapsed_ms: elapsed.as_millis(),
        ops_per_second: if secs > 0.0 {
            workload.operations as f64 / secs
        } else {
            0.0
        },
        busy_retries,
        outcomes: counter.counts(),
        pool: stats.into(),
        tables,
    })
}

/// Runs the workload and prints the report.
pub fn run(workload: &Workload, format: OutputFormat) -> Result<(), CommandError> {
    let report = execute(workload)?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Text => print_text_output(&report),
    }
    Ok(())
}

fn print_text_output(report: &RunReport) {
    println!("=== Workload ===");
    println!("Workers:          {}", report.workers);
    println!("Operations:       {}", report.operations);
    println!("Elapsed:          {} ms", report.elapsed_ms);
    println!("Throughput:       {:.2} ops/sec", report.ops_per_second);
    println!("Busy retries:     {}", report.busy_retries);
    println!();
    println!("=== Outcomes ===");
    println!("Success:          {}", report.outcomes.success);
    println!("Not found:        {}", report.outcomes.not_found);
    println!("Failed:           {}", report.outcomes.failed);
    println!();
    println!("=== Pool ===");
    println!("Executed:         {}", report.pool.executed);
    println!("Commits:          {}", report.pool.commits);
    println!("Rollbacks:        {}", report.pool.rollbacks);
    println!(
        "Cursor cache:     {} hits / {} misses",
        report.pool.cursor_hits, report.pool.cursor_misses
    );
    println!("Flushes:          {}", report.pool.flushes);
    println!("Last rendezvous:  {}", report.pool.last_rendezvous);
    println!("Max queue depth:  {}", report.pool.max_queue_depth);
    println!();
    println!("=== Tables ===");
    for table in &report.tables {
        println!("{:<18}{} rows", table.name, table.rows);
    }
}
