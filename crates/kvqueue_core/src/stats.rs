//! Async pool statistics.
//!
//! Provides counters for monitoring queue pressure, cache efficiency and
//! transaction outcomes.
//!
//! # Usage
//!
//! ```rust,ignore
//! let stats = pool.stats();
//! println!("executed: {}", stats.executed);
//! println!("cursor cache hits: {}", stats.cursor_hits);
//! println!("max queue depth: {}", stats.max_queue_depth);
//! ```

use crate::cache::CacheLookup;
use crate::callback::OpOutcome;
use crate::op::OpKind;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Pool statistics.
///
/// All counters are atomic and can be read while workers are running.
/// Values are monotonically increasing except the gauges (`queue_depth`,
/// `last_rendezvous`).
#[derive(Debug, Default)]
pub struct AsyncStats {
    // Submission counters
    submitted: AtomicU64,
    inserts: AtomicU64,
    updates: AtomicU64,
    removes: AtomicU64,
    searches: AtomicU64,
    busy_rejections: AtomicU64,

    // Execution counters
    executed: AtomicU64,
    succeeded: AtomicU64,
    not_found: AtomicU64,
    failed: AtomicU64,
    callback_errors: AtomicU64,
    commits: AtomicU64,
    rollbacks: AtomicU64,
    resolve_errors: AtomicU64,

    // Cursor cache counters
    cursor_hits: AtomicU64,
    cursor_misses: AtomicU64,

    // Barrier counters
    flushes: AtomicU64,
    last_rendezvous: AtomicUsize,

    // Queue gauges
    queue_depth: AtomicUsize,
    max_queue_depth: AtomicUsize,

    // Errors
    fatal_errors: AtomicU64,
}

/// A point-in-time copy of [`AsyncStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Operations accepted by submit/resubmit.
    pub submitted: u64,
    /// Insert submissions.
    pub inserts: u64,
    /// Update submissions.
    pub updates: u64,
    /// Remove submissions.
    pub removes: u64,
    /// Search submissions.
    pub searches: u64,
    /// Submissions refused because the queue was full.
    pub busy_rejections: u64,
    /// Operations run by the executor.
    pub executed: u64,
    /// Executions whose store call succeeded.
    pub succeeded: u64,
    /// Executions that found no such key.
    pub not_found: u64,
    /// Executions that failed.
    pub failed: u64,
    /// Callbacks that returned an error or panicked.
    pub callback_errors: u64,
    /// Transactions committed.
    pub commits: u64,
    /// Transactions rolled back.
    pub rollbacks: u64,
    /// Commit or rollback calls that themselves failed.
    pub resolve_errors: u64,
    /// Cursor cache hits.
    pub cursor_hits: u64,
    /// Cursor cache misses (cursor opens attempted).
    pub cursor_misses: u64,
    /// Completed flush barriers.
    pub flushes: u64,
    /// Workers that joined the most recent barrier.
    pub last_rendezvous: usize,
    /// Entries currently queued.
    pub queue_depth: usize,
    /// Highest queue depth observed.
    pub max_queue_depth: usize,
    /// Broken invariants and abandoned claims.
    pub fatal_errors: u64,
}

impl AsyncStats {
    /// Creates a new stats instance.
    pub fn new() -> Self {
        Self::default()
    }

    // === Increment methods (internal use) ===

    pub(crate) fn record_submit(&self, kind: OpKind) {
        self.submitted.fetch_add(1, Ordering::Relaxed);
        let counter = match kind {
            OpKind::Insert => &self.inserts,
            OpKind::Update => &self.updates,
            OpKind::Remove => &self.removes,
            OpKind::Search => &self.searches,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_busy(&self) {
        self.busy_rejections.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_outcome(&self, outcome: &OpOutcome) {
        self.executed.fetch_add(1, Ordering::Relaxed);
        let counter = match outcome {
            OpOutcome::Success => &self.succeeded,
            OpOutcome::NotFound => &self.not_found,
            OpOutcome::Failed(_) => &self.failed,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_callback_error(&self) {
        self.callback_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_commit(&self) {
        self.commits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_rollback(&self) {
        self.rollbacks.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_resolve_error(&self) {
        self.resolve_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_lookup(&self, lookup: CacheLookup) {
        let counter = match lookup {
            CacheLookup::Hit => &self.cursor_hits,
            CacheLookup::Miss => &self.cursor_misses,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_flush(&self, rendezvous: usize) {
        self.flushes.fetch_add(1, Ordering::Relaxed);
        self.last_rendezvous.store(rendezvous, Ordering::Relaxed);
    }

    pub(crate) fn set_queue_depth(&self, depth: usize) {
        self.queue_depth.store(depth, Ordering::Relaxed);
        self.max_queue_depth.fetch_max(depth, Ordering::Relaxed);
    }

    pub(crate) fn record_fatal(&self) {
        self.fatal_errors.fetch_add(1, Ordering::Relaxed);
    }

    // === Snapshot ===

    /// Returns a snapshot of all counters.
    #[must_use]
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            submitted: self.submitted.load(Ordering::Relaxed),
            inserts: self.inserts.load(Ordering::Relaxed),
            updates: self.updates.load(Ordering::Relaxed),
            removes: self.removes.load(Ordering::Relaxed),
            searches: self.searches.load(Ordering::Relaxed),
            busy_rejections: self.busy_rejections.load(Ordering::Relaxed),
            executed: self.executed.load(Ordering::Relaxed),
            succeeded: self.succeeded.load(Ordering::Relaxed),
            not_found: self.not_found.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            callback_errors: self.callback_errors.load(Ordering::Relaxed),
            commits: self.commits.load(Ordering::Relaxed),
            rollbacks: self.rollbacks.load(Ordering::Relaxed),
            resolve_errors: self.resolve_errors.load(Ordering::Relaxed),
            cursor_hits: self.cursor_hits.load(Ordering::Relaxed),
            cursor_misses: self.cursor_misses.load(Ordering::Relaxed),
            flushes: self.flushes.load(Ordering::Relaxed),
            last_rendezvous: self.last_rendezvous.load(Ordering::Relaxed),
            queue_depth: self.queue_depth.load(Ordering::Relaxed),
            max_queue_depth: self.max_queue_depth.load(Ordering::Relaxed),
            fatal_errors: self.fatal_errors.load(Ordering::Relaxed),
        }
    }
}

impl StatsSnapshot {
    /// Returns the cursor cache hit ratio (0.0 to 1.0).
    #[must_use]
    pub fn cursor_hit_ratio(&self) -> f64 {
        let total = self.cursor_hits + self.cursor_misses;
        if total == 0 {
            0.0
        } else {
            self.cursor_hits as f64 / total as f64
        }
    }
}
