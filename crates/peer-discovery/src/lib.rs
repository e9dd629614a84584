//! # Peer Discovery
//!
//! The peer-to-peer discovery protocol: a mutual DISC_HELLO endpoint
//! exchange, DISC_GET_PEERS/DISC_PEERS peer sharing, and a periodic
//! re-announcement task.
//!
//! Structurally this is the chaincode support engine's little sibling: the
//! same handler-per-stream shape driven by a (much smaller) state machine
//! with guard actions, minus the correlation registry and concurrent side
//! effects — discovery has no request/response pairs to track.

// Crate-level lints
#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod adapters;
pub mod config;
pub mod domain;
pub mod errors;
pub mod ports;
pub mod service;

/// Convenient re-exports for common usage.
pub mod prelude {
    pub use crate::adapters::InMemoryCoordinator;
    pub use crate::config::DiscoveryConfig;
    pub use crate::domain::fsm::{transition, DiscoveryEvent, DiscoveryState};
    pub use crate::errors::{ConfigError, DiscoveryError};
    pub use crate::ports::PeerCoordinator;
    pub use crate::service::handler::PeerHandler;
    pub use shared_types::{Envelope, MessageType, PeerEndpoint, PeersList};
}
