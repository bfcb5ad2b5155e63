//! Storage seam traits.

use crate::error::StoreResult;
use crate::types::TxnHandle;

/// A storage engine that can hand out sessions.
///
/// Engines are shared by every worker of a pool, so they must be
/// `Send + Sync`. Each worker opens exactly one session and keeps it for its
/// whole life.
///
/// # Implementors
///
/// - [`super::InMemoryEngine`] - ordered in-memory tables
pub trait StoreEngine: Send + Sync + 'static {
    /// Session type produced by this engine.
    type Session: StoreSession + 'static;

    /// Opens a new session.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine cannot create another session.
    fn open_session(&self) -> StoreResult<Self::Session>;
}

/// A single-threaded context for transactions and cursors.
///
/// Sessions are moved into their worker thread and never shared.
///
/// # Invariants
///
/// - At most one transaction is running on a session at a time
/// - Cursors opened by a session take part in its running transaction
/// - A handle returned by `begin` is resolved by exactly one of `commit` or
///   `rollback`
pub trait StoreSession: Send {
    /// Cursor type produced by this session.
    type Cursor: StoreCursor;

    /// Begins a transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if a transaction is already running.
    fn begin(&mut self) -> StoreResult<TxnHandle>;

    /// Commits the running transaction, making its writes visible.
    ///
    /// # Errors
    ///
    /// Returns an error if the handle does not match the running transaction.
    fn commit(&mut self, txn: TxnHandle) -> StoreResult<()>;

    /// Rolls back the running transaction, discarding its writes.
    ///
    /// # Errors
    ///
    /// Returns an error if the handle does not match the running transaction.
    fn rollback(&mut self, txn: TxnHandle) -> StoreResult<()>;

    /// Opens a cursor on the named resource.
    ///
    /// # Errors
    ///
    /// Returns [`crate::StoreError::ResourceUnavailable`] if the resource does
    /// not exist or cannot be opened with `config`.
    fn open_cursor(&mut self, uri: &str, config: &str) -> StoreResult<Self::Cursor>;
}

/// A positioned handle on one resource.
pub trait StoreCursor: Send {
    /// Sets the key for the next operation.
    fn set_key(&mut self, key: &[u8]);

    /// Sets the value for the next insert.
    fn set_value(&mut self, value: &[u8]);

    /// Inserts or overwrites the current key with the current value.
    ///
    /// # Errors
    ///
    /// Returns `KeyNotSet`/`ValueNotSet` if the cursor is not loaded and
    /// `DuplicateKey` if overwrite is disabled and the key exists.
    fn insert(&mut self) -> StoreResult<()>;

    /// Removes the current key.
    ///
    /// # Errors
    ///
    /// Returns [`crate::StoreError::NotFound`] if the key does not exist.
    fn remove(&mut self) -> StoreResult<()>;

    /// Looks up the current key and loads its value into the cursor.
    ///
    /// # Errors
    ///
    /// Returns [`crate::StoreError::NotFound`] if the key does not exist.
    fn search(&mut self) -> StoreResult<()>;

    /// Returns the value loaded by the last successful `search`.
    ///
    /// # Errors
    ///
    /// Returns `ValueNotSet` if no value is loaded.
    fn get_value(&self) -> StoreResult<Vec<u8>>;

    /// Clears key and value so the cursor can be reused.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine cannot release the cursor position.
    fn reset(&mut self) -> StoreResult<()>;

    /// Closes the cursor.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine fails to release the cursor.
    fn close(self) -> StoreResult<()>;
}
