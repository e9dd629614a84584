//! # Typed Envelope Payloads
//!
//! Each payload type owns its encode/decode pair; the envelope itself only
//! ever sees opaque bytes. Which type applies is decided by the envelope's
//! [`MessageType`](crate::envelope::MessageType) tag.

use crate::errors::CodecError;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

fn encode<T: Serialize>(value: &T, type_name: &'static str) -> Result<Vec<u8>, CodecError> {
    bincode::serialize(value).map_err(|source| CodecError::Encode { type_name, source })
}

fn decode<T: DeserializeOwned>(bytes: &[u8], expected: &'static str) -> Result<T, CodecError> {
    bincode::deserialize(bytes).map_err(|source| CodecError::Decode { expected, source })
}

/// Identity of a chaincode instance, set once at registration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChaincodeId {
    /// Chaincode name.
    pub name: String,
    /// Chaincode version.
    pub version: String,
}

impl ChaincodeId {
    /// Create a new identity.
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }

    /// Ledger namespace derived deterministically from the identity.
    #[must_use]
    pub fn namespace(&self) -> String {
        format!("{}:{}", self.name, self.version)
    }

    /// Encode into envelope payload bytes.
    pub fn encode(&self) -> Result<Vec<u8>, CodecError> {
        encode(self, "ChaincodeId")
    }

    /// Decode from envelope payload bytes.
    pub fn decode(bytes: &[u8]) -> Result<Self, CodecError> {
        decode(bytes, "ChaincodeId")
    }
}

impl std::fmt::Display for ChaincodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.name, self.version)
    }
}

/// Function and arguments for an INIT or TRANSACTION envelope.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChaincodeInput {
    /// Function to invoke; empty means the chaincode's default entry point.
    pub function: String,
    /// Positional arguments.
    pub args: Vec<String>,
}

impl ChaincodeInput {
    /// Create a new input.
    pub fn new(function: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            function: function.into(),
            args,
        }
    }

    /// Encode into envelope payload bytes.
    pub fn encode(&self) -> Result<Vec<u8>, CodecError> {
        encode(self, "ChaincodeInput")
    }

    /// Decode from envelope payload bytes.
    pub fn decode(bytes: &[u8]) -> Result<Self, CodecError> {
        decode(bytes, "ChaincodeInput")
    }
}

/// Key and value for a PUT_STATE envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PutStatePayload {
    /// Key to write.
    pub key: String,
    /// Value bytes to store under the key.
    pub value: Vec<u8>,
}

impl PutStatePayload {
    /// Create a new put-state payload.
    pub fn new(key: impl Into<String>, value: Vec<u8>) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }

    /// Encode into envelope payload bytes.
    pub fn encode(&self) -> Result<Vec<u8>, CodecError> {
        encode(self, "PutStatePayload")
    }

    /// Decode from envelope payload bytes.
    pub fn decode(bytes: &[u8]) -> Result<Self, CodecError> {
        decode(bytes, "PutStatePayload")
    }
}

/// A peer's network identity, announced in a DISC_HELLO.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PeerEndpoint {
    /// Stable peer identifier.
    pub id: String,
    /// Reachable address, `host:port`.
    pub address: String,
}

impl PeerEndpoint {
    /// Create a new endpoint.
    pub fn new(id: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            address: address.into(),
        }
    }

    /// Encode into envelope payload bytes.
    pub fn encode(&self) -> Result<Vec<u8>, CodecError> {
        encode(self, "PeerEndpoint")
    }

    /// Decode from envelope payload bytes.
    pub fn decode(bytes: &[u8]) -> Result<Self, CodecError> {
        decode(bytes, "PeerEndpoint")
    }
}

/// The peers a node is willing to share, carried in a DISC_PEERS.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeersList {
    /// Known peer endpoints.
    pub peers: Vec<PeerEndpoint>,
}

impl PeersList {
    /// Encode into envelope payload bytes.
    pub fn encode(&self) -> Result<Vec<u8>, CodecError> {
        encode(self, "PeersList")
    }

    /// Decode from envelope payload bytes.
    pub fn decode(bytes: &[u8]) -> Result<Self, CodecError> {
        decode(bytes, "PeersList")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chaincode_id_namespace() {
        let id = ChaincodeId::new("asset-transfer", "1.2");
        assert_eq!(id.namespace(), "asset-transfer:1.2");
    }

    #[test]
    fn test_chaincode_id_codec() {
        let id = ChaincodeId::new("kv", "0.1");
        let bytes = id.encode().unwrap();
        assert_eq!(ChaincodeId::decode(&bytes).unwrap(), id);
    }

    #[test]
    fn test_put_state_codec() {
        let put = PutStatePayload::new("balance", b"100".to_vec());
        let bytes = put.encode().unwrap();
        assert_eq!(PutStatePayload::decode(&bytes).unwrap(), put);
    }

    #[test]
    fn test_decode_garbage_fails() {
        // Truncated length prefix can never be a valid PutStatePayload.
        let err = PutStatePayload::decode(&[0xff]).unwrap_err();
        assert!(err.to_string().contains("PutStatePayload"));
    }

    #[test]
    fn test_peers_list_codec() {
        let list = PeersList {
            peers: vec![
                PeerEndpoint::new("vp0", "127.0.0.1:7051"),
                PeerEndpoint::new("vp1", "127.0.0.1:7052"),
            ],
        };
        let bytes = list.encode().unwrap();
        assert_eq!(PeersList::decode(&bytes).unwrap(), list);
    }
}
