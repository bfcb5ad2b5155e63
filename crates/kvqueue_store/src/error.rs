//! Error types for storage operations.

use thiserror::Error;

/// Result type for storage operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur during storage operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The key does not exist.
    ///
    /// This is a terminal outcome for `remove` and `search`, not a failure.
    #[error("key not found")]
    NotFound,

    /// A cursor could not be opened on the named resource.
    #[error("resource unavailable: {uri}: {reason}")]
    ResourceUnavailable {
        /// The resource that was requested.
        uri: String,
        /// Why the open failed.
        reason: String,
    },

    /// Insert without overwrite found an existing key.
    #[error("duplicate key")]
    DuplicateKey,

    /// A table with this name already exists.
    #[error("table already exists: {name}")]
    TableExists {
        /// Name of the table.
        name: String,
    },

    /// The cursor operation needs a key and none was set.
    #[error("cursor key not set")]
    KeyNotSet,

    /// The cursor operation needs a value and none was set.
    #[error("cursor value not set")]
    ValueNotSet,

    /// The session's transaction is not in a state that allows the operation.
    #[error("invalid transaction state: {message}")]
    InvalidTransaction {
        /// Description of the transaction state.
        message: String,
    },

    /// The handle passed to commit/rollback does not belong to the running transaction.
    #[error("transaction handle mismatch: expected {expected}, got {actual}")]
    TransactionMismatch {
        /// ID of the transaction currently running on the session.
        expected: u64,
        /// ID carried by the handle.
        actual: u64,
    },
}

impl StoreError {
    /// Creates a resource unavailable error.
    pub fn resource_unavailable(uri: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ResourceUnavailable {
            uri: uri.into(),
            reason: reason.into(),
        }
    }

    /// Creates an invalid transaction state error.
    pub fn invalid_transaction(message: impl Into<String>) -> Self {
        Self::InvalidTransaction {
            message: message.into(),
        }
    }

    /// Returns true for the terminal "no such key" outcome.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_is_distinguished() {
        assert!(StoreError::NotFound.is_not_found());
        assert!(!StoreError::DuplicateKey.is_not_found());
    }

    #[test]
    fn resource_unavailable_message() {
        let err = StoreError::resource_unavailable("orders", "no such table");
        assert_eq!(err.to_string(), "resource unavailable: orders: no such table");
    }
}
