//! # Adapters
//!
//! In-memory coordinator for single-process wiring and tests.

use crate::errors::DiscoveryError;
use crate::ports::PeerCoordinator;
use shared_types::{PeerEndpoint, PeersList};
use std::collections::HashMap;
use std::sync::RwLock;

/// In-memory peer coordinator.
///
/// Tracks live handlers and everything the network has shared with us,
/// keyed by peer id.
pub struct InMemoryCoordinator {
    local: PeerEndpoint,
    live: RwLock<HashMap<String, PeerEndpoint>>,
    discovered: RwLock<HashMap<String, PeerEndpoint>>,
}

impl InMemoryCoordinator {
    /// Create a coordinator announcing `local` as our endpoint.
    #[must_use]
    pub fn new(local: PeerEndpoint) -> Self {
        Self {
            local,
            live: RwLock::new(HashMap::new()),
            discovered: RwLock::new(HashMap::new()),
        }
    }

    /// Endpoints learned from DISC_PEERS exchanges.
    #[must_use]
    pub fn discovered_peers(&self) -> Vec<PeerEndpoint> {
        let mut peers: Vec<_> = self
            .discovered
            .read()
            .expect("coordinator lock poisoned")
            .values()
            .cloned()
            .collect();
        peers.sort_by(|a, b| a.id.cmp(&b.id));
        peers
    }
}

impl PeerCoordinator for InMemoryCoordinator {
    fn local_endpoint(&self) -> PeerEndpoint {
        self.local.clone()
    }

    fn register(&self, endpoint: &PeerEndpoint) -> Result<(), DiscoveryError> {
        let mut live = self.live.write().expect("coordinator lock poisoned");
        if live.contains_key(&endpoint.id) {
            return Err(DiscoveryError::AlreadyRegistered(endpoint.clone()));
        }
        live.insert(endpoint.id.clone(), endpoint.clone());
        Ok(())
    }

    fn deregister(&self, endpoint: &PeerEndpoint) {
        self.live
            .write()
            .expect("coordinator lock poisoned")
            .remove(&endpoint.id);
    }

    fn known_peers(&self) -> PeersList {
        let mut peers: Vec<_> = self
            .live
            .read()
            .expect("coordinator lock poisoned")
            .values()
            .cloned()
            .collect();
        peers.sort_by(|a, b| a.id.cmp(&b.id));
        PeersList { peers }
    }

    fn peers_discovered(&self, peers: PeersList) {
        let mut discovered = self.discovered.write().expect("coordinator lock poisoned");
        for peer in peers.peers {
            // Our own endpoint keeps echoing back; not a discovery.
            if peer.id != self.local.id {
                discovered.insert(peer.id.clone(), peer);
            }
        }
    }
}
