//! Transaction state.

use crate::error::{StoreError, StoreResult};
use crate::types::TransactionId;
use std::collections::BTreeMap;

/// State of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    /// Transaction is active and can perform operations.
    Active,
    /// Transaction has been committed.
    Committed,
    /// Transaction has been aborted.
    Aborted,
}

/// Represents a pending write in a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingWrite {
    /// Insert or overwrite a key.
    Put {
        /// The new value.
        value: Vec<u8>,
    },
    /// Remove a key.
    Delete,
}

/// A running session transaction.
///
/// Writes are buffered here and become visible to other sessions only when
/// the engine applies them on commit.
#[derive(Debug)]
pub struct Transaction {
    /// Transaction ID.
    id: TransactionId,
    /// Current state.
    state: TransactionState,
    /// Pending writes: (table, key) -> write operation.
    writes: BTreeMap<(String, Vec<u8>), PendingWrite>,
}

impl Transaction {
    /// Creates a new transaction.
    pub(crate) fn new(id: TransactionId) -> Self {
        Self {
            id,
            state: TransactionState::Active,
            writes: BTreeMap::new(),
        }
    }

    /// Returns the transaction ID.
    #[must_use]
    pub fn id(&self) -> TransactionId {
        self.id
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> TransactionState {
        self.state
    }

    /// Checks if the transaction is still active.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.state == TransactionState::Active
    }

    /// Records a put operation.
    pub fn put(&mut self, table: &str, key: Vec<u8>, value: Vec<u8>) -> StoreResult<()> {
        self.ensure_active()?;
        self.writes
            .insert((table.to_string(), key), PendingWrite::Put { value });
        Ok(())
    }

    /// Records a delete operation.
    pub fn delete(&mut self, table: &str, key: Vec<u8>) -> StoreResult<()> {
        self.ensure_active()?;
        self.writes
            .insert((table.to_string(), key), PendingWrite::Delete);
        Ok(())
    }

    /// Gets a pending write for a key.
    #[must_use]
    pub fn get_pending_write(&self, table: &str, key: &[u8]) -> Option<&PendingWrite> {
        self.writes.get(&(table.to_string(), key.to_vec()))
    }

    /// Returns all pending writes in key order.
    pub fn pending_writes(&self) -> impl Iterator<Item = (&(String, Vec<u8>), &PendingWrite)> {
        self.writes.iter()
    }

    /// Returns the number of pending writes.
    #[must_use]
    pub fn write_count(&self) -> usize {
        self.writes.len()
    }

    /// Marks the transaction as committed.
    pub(crate) fn mark_committed(&mut self) {
        self.state = TransactionState::Committed;
    }

    /// Marks the transaction as aborted.
    pub(crate) fn mark_aborted(&mut self) {
        self.state = TransactionState::Aborted;
    }

    /// Ensures the transaction is active.
    fn ensure_active(&self) -> StoreResult<()> {
        match self.state {
            TransactionState::Active => Ok(()),
            TransactionState::Committed => Err(StoreError::invalid_transaction(
                "transaction already committed",
            )),
            TransactionState::Aborted => {
                Err(StoreError::invalid_transaction("transaction already aborted"))
            }
        }
    }
}
