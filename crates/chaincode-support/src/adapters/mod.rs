//! # Adapters
//!
//! In-memory implementations of the outbound ports: the single-process
//! ledger and handler directory used for local wiring and tests.

pub mod memory;

pub use memory::{InMemoryDirectory, InMemoryLedger};
