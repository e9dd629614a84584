//! # Error Types
//!
//! All error types for peer discovery.

use crate::domain::fsm::TransitionError;
use shared_types::{CodecError, MessageType, PeerEndpoint, StreamError};
use thiserror::Error;

/// Errors surfaced by a peer discovery handler.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// The event is not legal in the current protocol state. Fatal to
    /// the stream.
    #[error("peer handler {0}")]
    Protocol(#[from] TransitionError),

    /// The envelope's type tag is not a discovery message.
    #[error("message type {0} is not a discovery event")]
    NotADiscoveryEvent(MessageType),

    /// The coordinator already tracks a live handler for this endpoint.
    #[error("peer already registered: {}", .0.id)]
    AlreadyRegistered(PeerEndpoint),

    /// A payload could not be decoded (or an outbound one encoded).
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// The transport failed.
    #[error(transparent)]
    Stream(#[from] StreamError),
}

/// Errors from loading a discovery configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The TOML text did not parse.
    #[error("invalid discovery config: {0}")]
    Parse(#[from] toml::de::Error),

    /// The re-announcement period must be positive.
    #[error("discovery period must be greater than zero")]
    ZeroPeriod,
}
