//! # In-Memory Adapters
//!
//! Shared across all handler instances, internally synchronized. The
//! ledger keeps values per `(namespace, key)`; the directory is a
//! duplicate-rejecting identity set.

use crate::errors::{DirectoryError, LedgerError};
use crate::ports::outbound::{HandlerDirectory, LedgerStore};
use async_trait::async_trait;
use shared_types::ChaincodeId;
use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

/// In-memory ledger store.
#[derive(Default)]
pub struct InMemoryLedger {
    entries: RwLock<HashMap<(String, String), Vec<u8>>>,
}

impl InMemoryLedger {
    /// Create an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries across all namespaces.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().expect("ledger lock poisoned").len()
    }

    /// Whether the ledger holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedger {
    async fn get(&self, namespace: &str, key: &str) -> Result<Vec<u8>, LedgerError> {
        self.entries
            .read()
            .expect("ledger lock poisoned")
            .get(&(namespace.to_owned(), key.to_owned()))
            .cloned()
            .ok_or_else(|| LedgerError::NotFound {
                namespace: namespace.to_owned(),
                key: key.to_owned(),
            })
    }

    async fn set(&self, namespace: &str, key: &str, value: Vec<u8>) -> Result<(), LedgerError> {
        self.entries
            .write()
            .expect("ledger lock poisoned")
            .insert((namespace.to_owned(), key.to_owned()), value);
        Ok(())
    }

    async fn delete(&self, namespace: &str, key: &str) -> Result<(), LedgerError> {
        self.entries
            .write()
            .expect("ledger lock poisoned")
            .remove(&(namespace.to_owned(), key.to_owned()));
        Ok(())
    }
}

/// In-memory handler directory.
#[derive(Default)]
pub struct InMemoryDirectory {
    identities: RwLock<HashSet<ChaincodeId>>,
}

impl InMemoryDirectory {
    /// Create an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered handlers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.identities.read().expect("directory lock poisoned").len()
    }

    /// Whether no handler is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl HandlerDirectory for InMemoryDirectory {
    fn register(&self, id: &ChaincodeId) -> Result<(), DirectoryError> {
        let mut identities = self.identities.write().expect("directory lock poisoned");
        if !identities.insert(id.clone()) {
            return Err(DirectoryError::Duplicate(id.clone()));
        }
        Ok(())
    }

    fn deregister(&self, id: &ChaincodeId) {
        self.identities
            .write()
            .expect("directory lock poisoned")
            .remove(id);
    }
}
