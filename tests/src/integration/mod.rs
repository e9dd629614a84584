//! # Integration Tests
//!
//! Cross-crate choreography: a scripted chaincode instance or peer sits on
//! the far end of an in-memory stream pair while the real handler runs its
//! receive loop.

pub mod chaincode_flows;
pub mod discovery_flows;
