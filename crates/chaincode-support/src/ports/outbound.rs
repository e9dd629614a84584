//! # Outbound Ports
//!
//! Collaborators the engine consumes. Both are shared across all handler
//! instances and must be safe under concurrent use; the engine treats
//! each call as atomic and does not coordinate across calls.

use crate::errors::{DirectoryError, LedgerError};
use async_trait::async_trait;
use shared_types::ChaincodeId;

/// Ledger access collaborator.
///
/// `namespace` is derived deterministically from the chaincode identity
/// (see [`ChaincodeId::namespace`]); the engine never mixes namespaces
/// across chaincodes.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Read the value stored under `key`.
    async fn get(&self, namespace: &str, key: &str) -> Result<Vec<u8>, LedgerError>;

    /// Store `value` under `key`.
    async fn set(&self, namespace: &str, key: &str, value: Vec<u8>) -> Result<(), LedgerError>;

    /// Remove the value stored under `key`.
    async fn delete(&self, namespace: &str, key: &str) -> Result<(), LedgerError>;
}

/// Peer-side registry of live chaincode handlers, keyed by identity.
///
/// Registration fails on a duplicate or conflicting identity; a handler
/// that registered must deregister on teardown, unconditionally.
pub trait HandlerDirectory: Send + Sync {
    /// Claim `id` for a live handler.
    fn register(&self, id: &ChaincodeId) -> Result<(), DirectoryError>;

    /// Release `id`. Releasing an unknown identity is a no-op.
    fn deregister(&self, id: &ChaincodeId);
}
