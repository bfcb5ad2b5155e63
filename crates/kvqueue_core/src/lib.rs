//! # KVQueue Core
//!
//! Asynchronous single-key operations for an embedded key/value store.
//!
//! Callers submit insert, update, remove and search operations to an
//! [`AsyncPool`] without blocking. A fixed set of worker threads executes
//! them against a [`kvqueue_store::StoreEngine`], each in its own
//! transaction, and reports every completion through an [`AsyncCallback`].
//!
//! This crate provides:
//! - Operation descriptors with a checked FREE → ENQUEUED → WORKING → FREE lifecycle
//! - A per-worker cursor cache keyed by resource signature
//! - A transactional executor (begin, operate, notify, commit or roll back)
//! - A FIFO dispatch queue shared by all workers
//! - A flush barrier that drains queued work and rendezvous every worker
//!
//! ## Example
//!
//! ```rust
//! use kvqueue_core::{AsyncConfig, AsyncPool, OpState};
//! use kvqueue_store::InMemoryEngine;
//! use std::sync::Arc;
//!
//! let engine = Arc::new(InMemoryEngine::new());
//! engine.create_table("t").unwrap();
//!
//! let pool = AsyncPool::new(Arc::clone(&engine), AsyncConfig::new().workers(2)).unwrap();
//! let target = pool.target("t", "").unwrap();
//!
//! // Workers may finish out of order, so flush before reading back.
//! pool.insert(&target, b"a", b"1", None).unwrap();
//! pool.flush().unwrap();
//! let search = pool.search(&target, b"a", None).unwrap();
//! pool.flush().unwrap();
//!
//! assert_eq!(search.state(), OpState::Free);
//! assert_eq!(search.get_value().unwrap(), b"1".to_vec());
//! pool.shutdown();
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod barrier;
mod cache;
mod callback;
mod config;
mod error;
mod executor;
mod op;
mod pool;
mod queue;
mod stats;
mod target;
mod worker;

pub use callback::{AsyncCallback, OpOutcome};
pub use config::{AsyncConfig, MAX_OPS, MAX_WORKERS, MIN_OPS, MIN_WORKERS};
pub use error::{AsyncError, AsyncResult};
pub use op::{AsyncOp, OpKind, OpState};
pub use pool::AsyncPool;
pub use stats::{AsyncStats, StatsSnapshot};
pub use target::{OpTarget, Signature};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
