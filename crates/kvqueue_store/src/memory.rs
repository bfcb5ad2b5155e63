//! In-memory storage engine.

use crate::error::{StoreError, StoreResult};
use crate::session::MemorySession;
use crate::stats::{EngineStats, EngineStatsSnapshot};
use crate::traits::StoreEngine;
use crate::transaction::{PendingWrite, Transaction};
use crate::types::TransactionId;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

type Table = BTreeMap<Vec<u8>, Vec<u8>>;

/// An in-memory storage engine made of named, ordered tables.
///
/// This engine is suitable for:
/// - Unit and integration tests of the async pool
/// - Benchmarks that should not measure I/O
/// - The CLI workload runner
///
/// # Thread Safety
///
/// The engine is cheap to clone and every clone shares the same tables.
/// Sessions buffer writes in a [`Transaction`] and apply them under a single
/// write lock on commit, so a committed transaction is visible all at once.
///
/// # Example
///
/// ```rust
/// use kvqueue_store::InMemoryEngine;
///
/// let engine = InMemoryEngine::new();
/// engine.create_table("t").unwrap();
/// assert!(engine.has_table("t"));
/// assert_eq!(engine.get("t", b"missing").unwrap(), None);
/// ```
#[derive(Debug, Clone, Default)]
pub struct InMemoryEngine {
    inner: Arc<EngineInner>,
}

#[derive(Debug, Default)]
pub(crate) struct EngineInner {
    tables: RwLock<HashMap<String, Table>>,
    next_txid: AtomicU64,
    stats: EngineStats,
}

impl InMemoryEngine {
    /// Creates a new engine with no tables.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty table.
    ///
    /// # Errors
    ///
    /// Returns `TableExists` if a table with this name already exists.
    pub fn create_table(&self, name: &str) -> StoreResult<()> {
        let mut tables = self.inner.tables.write();
        if tables.contains_key(name) {
            return Err(StoreError::TableExists {
                name: name.to_string(),
            });
        }
        tables.insert(name.to_string(), Table::new());
        Ok(())
    }

    /// Returns true if the table exists.
    #[must_use]
    pub fn has_table(&self, name: &str) -> bool {
        self.inner.tables.read().contains_key(name)
    }

    /// Reads the committed value of a key.
    ///
    /// # Errors
    ///
    /// Returns `ResourceUnavailable` if the table does not exist.
    pub fn get(&self, table: &str, key: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        let tables = self.inner.tables.read();
        let t = tables
            .get(table)
            .ok_or_else(|| StoreError::resource_unavailable(table, "no such table"))?;
        Ok(t.get(key).cloned())
    }

    /// Returns the number of committed keys in a table.
    ///
    /// # Errors
    ///
    /// Returns `ResourceUnavailable` if the table does not exist.
    pub fn len(&self, table: &str) -> StoreResult<usize> {
        let tables = self.inner.tables.read();
        tables
            .get(table)
            .map(BTreeMap::len)
            .ok_or_else(|| StoreError::resource_unavailable(table, "no such table"))
    }

    /// Returns a snapshot of the engine counters.
    #[must_use]
    pub fn stats(&self) -> EngineStatsSnapshot {
        self.inner.stats.snapshot()
    }
}

impl StoreEngine for InMemoryEngine {
    type Session = MemorySession;

    fn open_session(&self) -> StoreResult<MemorySession> {
        self.inner.stats.record_session();
        Ok(MemorySession::new(Arc::clone(&self.inner)))
    }
}

impl EngineInner {
    pub(crate) fn stats(&self) -> &EngineStats {
        &self.stats
    }

    pub(crate) fn next_transaction_id(&self) -> TransactionId {
        TransactionId::new(self.next_txid.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub(crate) fn has_table(&self, name: &str) -> bool {
        self.tables.read().contains_key(name)
    }

    pub(crate) fn read_committed(&self, table: &str, key: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        let tables = self.tables.read();
        let t = tables
            .get(table)
            .ok_or_else(|| StoreError::resource_unavailable(table, "no such table"))?;
        Ok(t.get(key).cloned())
    }

    /// Applies every pending write of a transaction under one write lock.
    pub(crate) fn apply(&self, txn: &Transaction) -> StoreResult<()> {
        let mut tables = self.tables.write();
        // Validate first so a missing table never leaves a half-applied commit.
        for ((table, _), _) in txn.pending_writes() {
            if !tables.contains_key(table.as_str()) {
                return Err(StoreError::resource_unavailable(table.as_str(), "no such table"));
            }
        }
        for ((table, key), write) in txn.pending_writes() {
            if let Some(t) = tables.get_mut(table.as_str()) {
                apply_write(t, key, write);
            }
        }
        Ok(())
    }

    /// Applies a single write outside any transaction.
    pub(crate) fn apply_one(&self, table: &str, key: &[u8], write: &PendingWrite) -> StoreResult<()> {
        let mut tables = self.tables.write();
        let t = tables
            .get_mut(table)
            .ok_or_else(|| StoreError::resource_unavailable(table, "no such table"))?;
        apply_write(t, key, write);
        self.stats.record_autocommit();
        Ok(())
    }
}

fn apply_write(table: &mut Table, key: &[u8], write: &PendingWrite) {
    match write {
        PendingWrite::Put { value } => {
            table.insert(key.to_vec(), value.clone());
        }
        PendingWrite::Delete => {
            table.remove(key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::{StoreCursor, StoreSession};

    #[test]
    fn create_table_twice_fails() {
        let engine = InMemoryEngine::new();
        engine.create_table("t").unwrap();
        assert!(matches!(
            engine.create_table("t"),
            Err(StoreError::TableExists { .. })
        ));
    }

    #[test]
    fn get_on_missing_table_fails() {
        let engine = InMemoryEngine::new();
        assert!(matches!(
            engine.get("nope", b"k"),
            Err(StoreError::ResourceUnavailable { .. })
        ));
    }

    #[test]
    fn clones_share_tables() {
        let engine = InMemoryEngine::new();
        let other = engine.clone();
        engine.create_table("t").unwrap();
        assert!(other.has_table("t"));
    }

    #[test]
    fn commit_makes_writes_visible() {
        let engine = InMemoryEngine::new();
        engine.create_table("t").unwrap();

        let mut session = engine.open_session().unwrap();
        let txn = session.begin().unwrap();
        let mut cursor = session.open_cursor("t", "").unwrap();
        cursor.set_key(b"a");
        cursor.set_value(b"1");
        cursor.insert().unwrap();

        assert_eq!(engine.get("t", b"a").unwrap(), None);
        session.commit(txn).unwrap();
        assert_eq!(engine.get("t", b"a").unwrap(), Some(b"1".to_vec()));
        assert_eq!(engine.len("t").unwrap(), 1);
    }

    #[test]
    fn rollback_discards_writes() {
        let engine = InMemoryEngine::new();
        engine.create_table("t").unwrap();

        let mut session = engine.open_session().unwrap();
        let txn = session.begin().unwrap();
        let mut cursor = session.open_cursor("t", "").unwrap();
        cursor.set_key(b"a");
        cursor.set_value(b"1");
        cursor.insert().unwrap();
        session.rollback(txn).unwrap();

        assert_eq!(engine.get("t", b"a").unwrap(), None);
        let stats = engine.stats();
        assert_eq!(stats.transactions_begun, 1);
        assert_eq!(stats.transactions_rolled_back, 1);
        assert_eq!(stats.transactions_committed, 0);
    }

    #[test]
    fn write_outside_transaction_autocommits() {
        let engine = InMemoryEngine::new();
        engine.create_table("t").unwrap();

        let mut session = engine.open_session().unwrap();
        let mut cursor = session.open_cursor("t", "").unwrap();
        cursor.set_key(b"a");
        cursor.set_value(b"1");
        cursor.insert().unwrap();

        assert_eq!(engine.get("t", b"a").unwrap(), Some(b"1".to_vec()));
        assert_eq!(engine.stats().autocommits, 1);
    }

    #[test]
    fn transaction_ids_increase() {
        let inner = EngineInner::default();
        let a = inner.next_transaction_id();
        let b = inner.next_transaction_id();
        assert!(b > a);
    }
}
