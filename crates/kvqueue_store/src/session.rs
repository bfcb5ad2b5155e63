//! Sessions of the in-memory engine.

use crate::config::CursorConfig;
use crate::cursor::MemoryCursor;
use crate::error::{StoreError, StoreResult};
use crate::memory::EngineInner;
use crate::traits::StoreSession;
use crate::transaction::Transaction;
use crate::types::TxnHandle;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::debug;

/// Slot holding the session's running transaction, shared with its cursors.
pub(crate) type TxnSlot = Arc<Mutex<Option<Transaction>>>;

/// A session on an [`crate::InMemoryEngine`].
///
/// Cursors opened by the session share its transaction slot: while a
/// transaction is running their writes are buffered in it, otherwise each
/// write is applied immediately.
#[derive(Debug)]
pub struct MemorySession {
    engine: Arc<EngineInner>,
    txn: TxnSlot,
}

impl MemorySession {
    pub(crate) fn new(engine: Arc<EngineInner>) -> Self {
        Self {
            engine,
            txn: Arc::new(Mutex::new(None)),
        }
    }

    /// Returns true while a transaction is running.
    #[must_use]
    pub fn in_transaction(&self) -> bool {
        self.txn.lock().is_some()
    }

    /// Removes the running transaction if the handle matches it.
    fn take_matching(&self, handle: &TxnHandle) -> StoreResult<Transaction> {
        let mut slot = self.txn.lock();
        let running = slot
            .as_ref()
            .ok_or_else(|| StoreError::invalid_transaction("no transaction running"))?;
        if running.id() != handle.id() {
            return Err(StoreError::TransactionMismatch {
                expected: running.id().as_u64(),
                actual: handle.id().as_u64(),
            });
        }
        slot.take()
            .ok_or_else(|| StoreError::invalid_transaction("no transaction running"))
    }
}

impl StoreSession for MemorySession {
    type Cursor = MemoryCursor;

    fn begin(&mut self) -> StoreResult<TxnHandle> {
        let mut slot = self.txn.lock();
        if let Some(running) = slot.as_ref() {
            return Err(StoreError::invalid_transaction(format!(
                "{} already running",
                running.id()
            )));
        }
        let id = self.engine.next_transaction_id();
        *slot = Some(Transaction::new(id));
        self.engine.stats().record_begin();
        Ok(TxnHandle::new(id))
    }

    fn commit(&mut self, txn: TxnHandle) -> StoreResult<()> {
        let mut running = self.take_matching(&txn)?;
        self.engine.apply(&running)?;
        running.mark_committed();
        self.engine.stats().record_commit();
        Ok(())
    }

    fn rollback(&mut self, txn: TxnHandle) -> StoreResult<()> {
        let mut running = self.take_matching(&txn)?;
        running.mark_aborted();
        self.engine.stats().record_rollback();
        Ok(())
    }

    fn open_cursor(&mut self, uri: &str, config: &str) -> StoreResult<MemoryCursor> {
        if uri.is_empty() {
            return Err(StoreError::resource_unavailable(uri, "empty resource name"));
        }
        if !self.engine.has_table(uri) {
            return Err(StoreError::resource_unavailable(uri, "no such table"));
        }
        self.engine.stats().record_cursor_open();
        Ok(MemoryCursor::new(
            Arc::clone(&self.engine),
            Arc::clone(&self.txn),
            uri.to_string(),
            CursorConfig::parse(config),
        ))
    }
}

impl Drop for MemorySession {
    fn drop(&mut self) {
        if let Some(txn) = self.txn.lock().take() {
            debug!(txn = %txn.id(), writes = txn.write_count(), "discarding open transaction on session close");
        }
    }
}
