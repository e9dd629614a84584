//! # Message Envelope
//!
//! The wire unit exchanged over a bidirectional stream between the peer and
//! a chaincode instance (or another peer, for discovery).
//!
//! ## Correlation
//!
//! Request/response flows reuse the request's `correlation_id` on the reply.
//! Fire-and-forget messages (REGISTER, REGISTERED, the discovery messages)
//! leave it empty.

use serde::{Deserialize, Serialize};

/// Enumerated type tag of an [`Envelope`].
///
/// The tag decides how the opaque payload is interpreted and which lifecycle
/// event the message drives in the receiving handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageType {
    /// Chaincode introduces itself; payload is an encoded
    /// [`ChaincodeId`](crate::payloads::ChaincodeId).
    Register,
    /// Peer acknowledges a successful registration. No payload.
    Registered,
    /// Peer asks the chaincode to run its initialization function; payload
    /// is an encoded [`ChaincodeInput`](crate::payloads::ChaincodeInput).
    Init,
    /// Peer moves a chaincode with no init work straight to ready. Internal
    /// event, never sent on the wire.
    Ready,
    /// Peer pushes a transaction into the chaincode; payload is an encoded
    /// [`ChaincodeInput`](crate::payloads::ChaincodeInput).
    Transaction,
    /// Chaincode reads a key; payload is the raw key bytes.
    GetState,
    /// Chaincode writes a key; payload is an encoded
    /// [`PutStatePayload`](crate::payloads::PutStatePayload).
    PutState,
    /// Chaincode deletes a key; payload is the raw key bytes.
    DelState,
    /// Chaincode invokes another chaincode.
    InvokeChaincode,
    /// Successful reply to a correlated request; payload is the result.
    Response,
    /// Failed reply to a correlated request; payload is a human-readable
    /// description of the failure.
    Error,
    /// Chaincode reports that an init or transaction envelope has finished.
    Completed,
    /// Discovery: a peer announces its endpoint; payload is an encoded
    /// [`PeerEndpoint`](crate::payloads::PeerEndpoint).
    DiscHello,
    /// Discovery: ask the remote peer for its known peers. No payload.
    DiscGetPeers,
    /// Discovery: list of known peers; payload is an encoded
    /// [`PeersList`](crate::payloads::PeersList).
    DiscPeers,
}

impl std::fmt::Display for MessageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Register => "REGISTER",
            Self::Registered => "REGISTERED",
            Self::Init => "INIT",
            Self::Ready => "READY",
            Self::Transaction => "TRANSACTION",
            Self::GetState => "GET_STATE",
            Self::PutState => "PUT_STATE",
            Self::DelState => "DEL_STATE",
            Self::InvokeChaincode => "INVOKE_CHAINCODE",
            Self::Response => "RESPONSE",
            Self::Error => "ERROR",
            Self::Completed => "COMPLETED",
            Self::DiscHello => "DISC_HELLO",
            Self::DiscGetPeers => "DISC_GET_PEERS",
            Self::DiscPeers => "DISC_PEERS",
        };
        f.write_str(name)
    }
}

/// The wire unit exchanged over a stream.
///
/// At most one in-flight envelope is associated with a given
/// `correlation_id` at any time from the receiving handler's perspective;
/// that invariant is enforced by the handler's registry and dedup set, not
/// by the transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    /// Type tag deciding payload interpretation and lifecycle event.
    pub message_type: MessageType,
    /// Correlation identifier, unique per outstanding request/response
    /// pair. Empty for fire-and-forget messages.
    pub correlation_id: String,
    /// Opaque payload, interpreted per `message_type`.
    pub payload: Vec<u8>,
}

impl Envelope {
    /// Create an envelope with a correlation id and payload.
    pub fn new(
        message_type: MessageType,
        correlation_id: impl Into<String>,
        payload: Vec<u8>,
    ) -> Self {
        Self {
            message_type,
            correlation_id: correlation_id.into(),
            payload,
        }
    }

    /// Create a fire-and-forget envelope (no correlation id, no payload).
    #[must_use]
    pub fn signal(message_type: MessageType) -> Self {
        Self::new(message_type, "", Vec::new())
    }

    /// Create a RESPONSE reply carrying `payload` for `correlation_id`.
    #[must_use]
    pub fn response(correlation_id: impl Into<String>, payload: Vec<u8>) -> Self {
        Self::new(MessageType::Response, correlation_id, payload)
    }

    /// Create an ERROR reply whose payload is a failure description.
    #[must_use]
    pub fn failure(correlation_id: impl Into<String>, description: impl AsRef<str>) -> Self {
        Self::new(
            MessageType::Error,
            correlation_id,
            description.as_ref().as_bytes().to_vec(),
        )
    }

    /// Interpret the payload as a UTF-8 failure description.
    ///
    /// Lossy on purpose: error descriptions are for humans and logs.
    #[must_use]
    pub fn description(&self) -> String {
        String::from_utf8_lossy(&self.payload).into_owned()
    }
}
