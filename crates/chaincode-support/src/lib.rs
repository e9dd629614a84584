//! # Chaincode Support - Peer-Side Lifecycle Engine
//!
//! ## Purpose
//!
//! Drives the interaction between a peer process and an externally running
//! chaincode instance over a bidirectional message stream:
//!
//! - a finite-state lifecycle per chaincode instance (registration,
//!   initialization, ready, executing a transaction);
//! - request/response correlation across the stream via opaque correlation
//!   identifiers;
//! - dispatch of chaincode-originated state access (get/put/delete of a
//!   key) to the ledger without blocking the stream's receive loop.
//!
//! ## Architecture
//!
//! | Component | Location | Purpose |
//! |-----------|----------|---------|
//! | Lifecycle FSM | `domain/fsm.rs` | Pure transition table, no side effects |
//! | Correlation registry | `service/registry.rs` | Single-use reply slots by correlation id |
//! | In-flight dedup | `service/registry.rs` | Claim-or-reject set for state requests |
//! | Stream handler | `service/handler.rs` | Receive loop, guards, ledger dispatch |
//! | Ports | `ports/` | `LedgerStore`, `HandlerDirectory`, inbound API |
//! | In-memory adapters | `adapters/` | Single-process ledger and directory |
//!
//! Each handler owns its state machine, registry, and dedup set outright.
//! The ledger and the handler directory are shared across handlers and are
//! injected at construction.
//!
//! ## Usage Example
//!
//! ```ignore
//! use chaincode_support::prelude::*;
//!
//! let handler = ChaincodeHandler::new(stream, ledger, directory, Some(startup_tx));
//! tokio::spawn(handler.clone().process_stream());
//!
//! // Block until the chaincode has registered (or failed to).
//! if startup_rx.await.unwrap_or(false) {
//!     let waiter = handler.init_or_ready("init-1", Some(input))?.unwrap();
//!     let completed = waiter.wait().await?;
//! }
//! ```

// Crate-level lints
#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod adapters;
pub mod domain;
pub mod errors;
pub mod ports;
pub mod service;

/// Convenient re-exports for common usage.
pub mod prelude {
    pub use crate::adapters::{InMemoryDirectory, InMemoryLedger};
    pub use crate::domain::fsm::{transition, LifecycleEvent, State, TransitionError};
    pub use crate::errors::{DirectoryError, HandlerError, LedgerError};
    pub use crate::ports::inbound::ChaincodeMessageHandler;
    pub use crate::ports::outbound::{HandlerDirectory, LedgerStore};
    pub use crate::service::handler::{handle_chaincode_stream, ChaincodeHandler};
    pub use crate::service::registry::{CorrelationRegistry, InFlightSet, ReplyWaiter};
    pub use shared_types::{ChaincodeId, ChaincodeInput, Envelope, MessageType, PutStatePayload};
}
