//! # Ledgermesh Test Suite
//!
//! Unified test crate for flows that span more than one crate.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! └── integration/
//!     ├── chaincode_flows.rs   # Full chaincode sessions over a stream pair
//!     └── discovery_flows.rs   # Peer handshake and peer sharing
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! # All tests
//! cargo test -p ledgermesh-tests
//!
//! # By category
//! cargo test -p ledgermesh-tests integration::chaincode_flows
//! cargo test -p ledgermesh-tests integration::discovery_flows
//! ```

#![allow(unused_imports)]
#![allow(dead_code)]

pub mod integration;

/// Install a log subscriber honoring `RUST_LOG`. Safe to call from every
/// test; only the first call wins.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
