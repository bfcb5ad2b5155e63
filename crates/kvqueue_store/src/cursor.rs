//! Cursors of the in-memory engine.

use crate::config::CursorConfig;
use crate::error::{StoreError, StoreResult};
use crate::memory::EngineInner;
use crate::session::TxnSlot;
use crate::traits::StoreCursor;
use crate::transaction::{PendingWrite, Transaction};
use std::sync::Arc;

/// A cursor on one table of an [`crate::InMemoryEngine`].
///
/// Reads see the session's own pending writes first, then committed data.
#[derive(Debug)]
pub struct MemoryCursor {
    engine: Arc<EngineInner>,
    txn: TxnSlot,
    table: String,
    config: CursorConfig,
    key: Option<Vec<u8>>,
    value: Option<Vec<u8>>,
}

impl MemoryCursor {
    pub(crate) fn new(
        engine: Arc<EngineInner>,
        txn: TxnSlot,
        table: String,
        config: CursorConfig,
    ) -> Self {
        Self {
            engine,
            txn,
            table,
            config,
            key: None,
            value: None,
        }
    }

    /// Returns the table this cursor is open on.
    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Returns the parsed cursor configuration.
    #[must_use]
    pub fn config(&self) -> CursorConfig {
        self.config
    }

    fn current_key(&self) -> StoreResult<Vec<u8>> {
        self.key.clone().ok_or(StoreError::KeyNotSet)
    }

    fn lookup(&self, txn: Option<&Transaction>, key: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        if let Some(write) = txn.and_then(|t| t.get_pending_write(&self.table, key)) {
            return Ok(match write {
                PendingWrite::Put { value } => Some(value.clone()),
                PendingWrite::Delete => None,
            });
        }
        self.engine.read_committed(&self.table, key)
    }

    fn write(&self, txn: Option<&mut Transaction>, key: Vec<u8>, write: PendingWrite) -> StoreResult<()> {
        match (txn, write) {
            (Some(txn), PendingWrite::Put { value }) => txn.put(&self.table, key, value),
            (Some(txn), PendingWrite::Delete) => txn.delete(&self.table, key),
            (None, write) => self.engine.apply_one(&self.table, &key, &write),
        }
    }
}

impl StoreCursor for MemoryCursor {
    fn set_key(&mut self, key: &[u8]) {
        self.key = Some(key.to_vec());
    }

    fn set_value(&mut self, value: &[u8]) {
        self.value = Some(value.to_vec());
    }

    fn insert(&mut self) -> StoreResult<()> {
        let key = self.current_key()?;
        let value = self.value.clone().ok_or(StoreError::ValueNotSet)?;
        let txn = Arc::clone(&self.txn);
        let mut slot = txn.lock();
        if !self.config.overwrite && self.lookup(slot.as_ref(), &key)?.is_some() {
            return Err(StoreError::DuplicateKey);
        }
        self.write(slot.as_mut(), key, PendingWrite::Put { value })
    }

    fn remove(&mut self) -> StoreResult<()> {
        let key = self.current_key()?;
        let txn = Arc::clone(&self.txn);
        let mut slot = txn.lock();
        if self.lookup(slot.as_ref(), &key)?.is_none() {
            return Err(StoreError::NotFound);
        }
        self.write(slot.as_mut(), key, PendingWrite::Delete)
    }

    fn search(&mut self) -> StoreResult<()> {
        let key = self.current_key()?;
        let found = {
            let slot = self.txn.lock();
            self.lookup(slot.as_ref(), &key)?
        };
        match found {
            Some(value) => {
                self.value = Some(value);
                Ok(())
            }
            None => {
                self.value = None;
                Err(StoreError::NotFound)
            }
        }
    }

    fn get_value(&self) -> StoreResult<Vec<u8>> {
        self.value.clone().ok_or(StoreError::ValueNotSet)
    }

    fn reset(&mut self) -> StoreResult<()> {
        self.key = None;
        self.value = None;
        Ok(())
    }

    fn close(self) -> StoreResult<()> {
        self.engine.stats().record_cursor_close();
        Ok(())
    }
}
