//! # Ports
//!
//! The coordinator is the peer process's view of its neighborhood: who we
//! are, which handlers are live, and what the network has told us. One
//! coordinator is shared by every discovery handler.

use crate::errors::DiscoveryError;
use shared_types::{PeerEndpoint, PeersList};

/// Peer-side coordinator consumed by discovery handlers.
pub trait PeerCoordinator: Send + Sync {
    /// Our own announced endpoint.
    fn local_endpoint(&self) -> PeerEndpoint;

    /// Track a live handler for `endpoint`; fails if one already exists.
    fn register(&self, endpoint: &PeerEndpoint) -> Result<(), DiscoveryError>;

    /// Stop tracking `endpoint`. Unknown endpoints are a no-op.
    fn deregister(&self, endpoint: &PeerEndpoint);

    /// The peers we are willing to share in a DISC_PEERS reply.
    fn known_peers(&self) -> PeersList;

    /// Fold a received DISC_PEERS list into what we know.
    fn peers_discovered(&self, peers: PeersList);
}
