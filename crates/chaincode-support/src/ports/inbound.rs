//! # Inbound Port
//!
//! The message dispatch surface a handler exposes to the receive loop's
//! owner and to any component forwarding envelopes into it.

use crate::errors::HandlerError;
use async_trait::async_trait;
use shared_types::Envelope;

/// Dispatch surface of a chaincode stream handler.
#[async_trait]
pub trait ChaincodeMessageHandler: Send + Sync {
    /// Feed one inbound envelope through the protocol state machine.
    ///
    /// An `Err` means the event was illegal in the current state (or a
    /// registration-class guard failed with cause) and the stream must be
    /// torn down. Recoverable conditions are absorbed internally.
    async fn handle_message(&self, envelope: Envelope) -> Result<(), HandlerError>;

    /// Send an envelope to the chaincode without driving the state
    /// machine.
    async fn send_message(&self, envelope: Envelope) -> Result<(), HandlerError>;
}
