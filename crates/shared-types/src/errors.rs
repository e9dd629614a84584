//! # Error Types
//!
//! Errors shared by every consumer of the wire types.

use thiserror::Error;

/// Errors from encoding or decoding an envelope payload.
#[derive(Debug, Error)]
pub enum CodecError {
    /// Payload bytes could not be decoded into the expected type.
    #[error("could not decode {expected} payload: {source}")]
    Decode {
        /// Name of the payload type that was expected.
        expected: &'static str,
        /// Underlying bincode failure.
        source: bincode::Error,
    },

    /// Value could not be encoded into payload bytes.
    #[error("could not encode {type_name} payload: {source}")]
    Encode {
        /// Name of the payload type being encoded.
        type_name: &'static str,
        /// Underlying bincode failure.
        source: bincode::Error,
    },
}

/// Errors from the transport boundary.
///
/// A clean end-of-stream is NOT an error; [`MessageStream::recv`] signals it
/// with `Ok(None)`.
///
/// [`MessageStream::recv`]: crate::stream::MessageStream::recv
#[derive(Debug, Clone, Error)]
pub enum StreamError {
    /// The remote side is gone and the envelope could not be sent.
    #[error("stream closed: {0}")]
    Closed(String),

    /// The transport failed while receiving.
    #[error("transport failure: {0}")]
    Transport(String),
}
