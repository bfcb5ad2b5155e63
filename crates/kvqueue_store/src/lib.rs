//! # KVQueue Store
//!
//! The storage seams consumed by the KVQueue asynchronous operation pool.
//!
//! The pool never touches data directly. It talks to three traits:
//!
//! - [`StoreEngine`] hands out one [`StoreSession`] per worker thread
//! - [`StoreSession`] owns transactions and opens cursors on named tables
//! - [`StoreCursor`] performs single-key insert/remove/search
//!
//! [`InMemoryEngine`] implements all three over ordered in-memory tables and
//! is used by tests, benches and the CLI.
//!
//! ## Example
//!
//! ```rust
//! use kvqueue_store::{InMemoryEngine, StoreCursor, StoreEngine, StoreSession};
//!
//! let engine = InMemoryEngine::new();
//! engine.create_table("users").unwrap();
//!
//! let mut session = engine.open_session().unwrap();
//! let txn = session.begin().unwrap();
//! let mut cursor = session.open_cursor("users", "").unwrap();
//! cursor.set_key(b"alice");
//! cursor.set_value(b"42");
//! cursor.insert().unwrap();
//! session.commit(txn).unwrap();
//!
//! assert_eq!(engine.get("users", b"alice").unwrap(), Some(b"42".to_vec()));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod cursor;
mod error;
mod memory;
mod session;
mod stats;
mod traits;
mod transaction;
mod types;

pub use config::CursorConfig;
pub use cursor::MemoryCursor;
pub use error::{StoreError, StoreResult};
pub use memory::InMemoryEngine;
pub use session::MemorySession;
pub use stats::{EngineStats, EngineStatsSnapshot};
pub use traits::{StoreCursor, StoreEngine, StoreSession};
pub use transaction::{PendingWrite, Transaction, TransactionState};
pub use types::{TransactionId, TxnHandle};
