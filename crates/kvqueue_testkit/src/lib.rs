//! # KVQueue Testkit
//!
//! Test utilities for KVQueue.
//!
//! This crate provides:
//! - Pool fixtures backed by the in-memory engine
//! - A recording callback that captures every completion
//! - Property-based test generators and a sequential reference model
//! - Stress testing utilities
//!
//! ## Usage
//!
//! ```rust
//! use kvqueue_testkit::prelude::*;
//!
//! with_pool(2, |pool| {
//!     let t = pool.target(DEFAULT_TABLE, "").unwrap();
//!     pool.insert(&t, b"k", b"v", None).unwrap();
//!     pool.flush().unwrap();
//! });
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod callbacks;
pub mod fixtures;
pub mod generators;
pub mod stress;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::callbacks::*;
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::stress::*;
}

pub use callbacks::*;
pub use fixtures::*;
pub use generators::*;
pub use stress::*;
