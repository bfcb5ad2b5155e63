//! Benchmarks for KVQueue.
//!
//! The benchmarks live under `benches/`; this library holds the shared
//! data generators.

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod utils;
