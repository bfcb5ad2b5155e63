//! Core type definitions for the store seams.

use std::fmt;

/// Unique identifier for a transaction.
///
/// Transaction IDs are monotonically increasing and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TransactionId(pub u64);

impl TransactionId {
    /// Creates a new transaction ID.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw ID value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "txn:{}", self.0)
    }
}

/// Proof that a transaction was begun on a session.
///
/// The handle is not `Clone`: `commit` and `rollback` consume it, so each
/// transaction is resolved exactly once.
#[derive(Debug, PartialEq, Eq)]
#[must_use = "a transaction must be committed or rolled back"]
pub struct TxnHandle {
    id: TransactionId,
}

impl TxnHandle {
    /// Creates a handle for the given transaction.
    pub const fn new(id: TransactionId) -> Self {
        Self { id }
    }

    /// Returns the transaction ID.
    #[must_use]
    pub const fn id(&self) -> TransactionId {
        self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transaction_id_display() {
        assert_eq!(TransactionId::new(7).to_string(), "txn:7");
    }

    #[test]
    fn handle_carries_id() {
        let handle = TxnHandle::new(TransactionId::new(3));
        assert_eq!(handle.id().as_u64(), 3);
    }
}
