//! # Shared Types Crate
//!
//! This crate contains the wire envelope exchanged between a peer and its
//! collaborators, the typed payloads that travel inside it, and the
//! bidirectional stream port both protocol engines are written against.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: All cross-crate wire types are defined here.
//! - **Opaque Payloads**: The envelope carries raw bytes; each payload type
//!   owns its own encode/decode pair and interpretation is driven by the
//!   envelope's type tag.
//! - **Transport Neutrality**: The `MessageStream` port abstracts the
//!   transport; production streams (gRPC or equivalent) and the in-memory
//!   duplex pair used in tests are interchangeable behind it.

pub mod envelope;
pub mod errors;
pub mod payloads;
pub mod stream;

pub use envelope::{Envelope, MessageType};
pub use errors::{CodecError, StreamError};
pub use payloads::{ChaincodeId, ChaincodeInput, PeerEndpoint, PeersList, PutStatePayload};
pub use stream::{stream_pair, ChannelStream, MessageStream};
