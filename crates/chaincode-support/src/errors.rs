//! # Error Types
//!
//! All error types for the chaincode support engine.
//!
//! The protocol distinguishes stream-fatal failures (illegal protocol
//! event, registration failures) from recoverable ones (ledger failures,
//! which become ERROR reply envelopes and keep the lifecycle moving).

use crate::domain::fsm::TransitionError;
use shared_types::{ChaincodeId, CodecError, StreamError};
use thiserror::Error;

// =============================================================================
// LEDGER ERRORS
// =============================================================================

/// Errors from the ledger access collaborator.
///
/// Always recoverable from the stream's point of view: they are reported
/// to the chaincode as an ERROR envelope and drive the ERROR lifecycle
/// event, never terminating the stream.
#[derive(Debug, Clone, Error)]
pub enum LedgerError {
    /// No value stored under the key in this namespace.
    #[error("key not found: {namespace}/{key}")]
    NotFound {
        /// Namespace that was queried.
        namespace: String,
        /// Key that was queried.
        key: String,
    },

    /// The storage backend failed.
    #[error("ledger backend failure: {0}")]
    Backend(String),
}

// =============================================================================
// DIRECTORY ERRORS
// =============================================================================

/// Errors from the peer's handler registration directory.
#[derive(Debug, Clone, Error)]
pub enum DirectoryError {
    /// Another live handler already holds this identity.
    #[error("duplicate chaincode identity: {0}")]
    Duplicate(ChaincodeId),
}

// =============================================================================
// HANDLER ERRORS
// =============================================================================

/// Errors surfaced by a stream handler.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// The event is not legal in the current protocol state. Fatal to
    /// the stream.
    #[error("chaincode handler {0}")]
    Protocol(#[from] TransitionError),

    /// The envelope's type tag has no lifecycle meaning on the peer side.
    #[error("message type {0} is not a lifecycle event")]
    NotALifecycleEvent(shared_types::MessageType),

    /// A correlated request was started with an id that is already
    /// outstanding.
    #[error("duplicate correlation id: {0}")]
    DuplicateCorrelation(String),

    /// The registration directory rejected this handler.
    #[error("registration failed: {0}")]
    Registration(#[from] DirectoryError),

    /// A payload could not be decoded (or a reply encoded).
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// A ledger call failed. Only ever surfaced as an ERROR reply
    /// envelope, never out of the receive loop.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// A state request arrived before the handler had an identity to
    /// derive its ledger namespace from.
    #[error("handler has no registered chaincode identity")]
    NotRegistered,

    /// The transport failed.
    #[error(transparent)]
    Stream(#[from] StreamError),

    /// A reply waiter was dropped without ever being delivered to.
    #[error("reply waiter abandoned before delivery")]
    Abandoned,
}

impl HandlerError {
    /// Whether this failure must terminate the stream.
    ///
    /// Everything surfaced from `handle_message` is stream-fatal by the
    /// time it propagates; recoverable conditions (ledger failures,
    /// duplicate in-flight requests) are absorbed before reaching it.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::Abandoned)
    }
}
