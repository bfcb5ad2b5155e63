//! Engine statistics.

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters kept by [`crate::InMemoryEngine`].
///
/// All counters are atomic and can be read while operations are in progress.
#[derive(Debug, Default)]
pub struct EngineStats {
    sessions_opened: AtomicU64,
    cursors_opened: AtomicU64,
    cursors_closed: AtomicU64,
    transactions_begun: AtomicU64,
    transactions_committed: AtomicU64,
    transactions_rolled_back: AtomicU64,
    autocommits: AtomicU64,
}

/// A point-in-time copy of [`EngineStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineStatsSnapshot {
    /// Sessions handed out.
    pub sessions_opened: u64,
    /// Cursors successfully opened.
    pub cursors_opened: u64,
    /// Cursors closed.
    pub cursors_closed: u64,
    /// Transactions begun.
    pub transactions_begun: u64,
    /// Transactions committed.
    pub transactions_committed: u64,
    /// Transactions rolled back.
    pub transactions_rolled_back: u64,
    /// Cursor writes applied outside any transaction.
    pub autocommits: u64,
}

impl EngineStats {
    /// Creates a new stats instance.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_session(&self) {
        self.sessions_opened.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_cursor_open(&self) {
        self.cursors_opened.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_cursor_close(&self) {
        self.cursors_closed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_begin(&self) {
        self.transactions_begun.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_commit(&self) {
        self.transactions_committed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_rollback(&self) {
        self.transactions_rolled_back.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_autocommit(&self) {
        self.autocommits.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns a snapshot of all counters.
    #[must_use]
    pub fn snapshot(&self) -> EngineStatsSnapshot {
        EngineStatsSnapshot {
            sessions_opened: self.sessions_opened.load(Ordering::Relaxed),
            cursors_opened: self.cursors_opened.load(Ordering::Relaxed),
            cursors_closed: self.cursors_closed.load(Ordering::Relaxed),
            transactions_begun: self.transactions_begun.load(Ordering::Relaxed),
            transactions_committed: self.transactions_committed.load(Ordering::Relaxed),
            transactions_rolled_back: self.transactions_rolled_back.load(Ordering::Relaxed),
            autocommits: self.autocommits.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_start_at_zero() {
        assert_eq!(EngineStats::new().snapshot(), EngineStatsSnapshot::default());
    }

    #[test]
    fn record_methods_increment() {
        let stats = EngineStats::new();
        stats.record_begin();
        stats.record_begin();
        stats.record_commit();
        stats.record_rollback();
        stats.record_cursor_open();

        let snap = stats.snapshot();
        assert_eq!(snap.transactions_begun, 2);
        assert_eq!(snap.transactions_committed, 1);
        assert_eq!(snap.transactions_rolled_back, 1);
        assert_eq!(snap.cursors_opened, 1);
        assert_eq!(snap.cursors_closed, 0);
    }
}
