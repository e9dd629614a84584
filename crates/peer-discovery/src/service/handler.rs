//! # Peer Stream Handler
//!
//! One handler per peer-to-peer stream. The side that dialed out sends
//! the opening DISC_HELLO; the accepting side answers with its own. Once
//! endpoints are exchanged the handler registers with the coordinator and
//! keeps the stream warm by probing for peers at the configured period.

use crate::config::DiscoveryConfig;
use crate::domain::fsm::{transition, DiscoveryEvent, DiscoveryState};
use crate::errors::DiscoveryError;
use crate::ports::PeerCoordinator;
use shared_types::{Envelope, MessageStream, MessageType, PeerEndpoint, PeersList};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tracing::{debug, error, warn};

/// Handler for one bidirectional peer stream.
pub struct PeerHandler {
    stream: Arc<dyn MessageStream>,
    coordinator: Arc<dyn PeerCoordinator>,
    config: DiscoveryConfig,
    state: Mutex<DiscoveryState>,
    remote: Mutex<Option<PeerEndpoint>>,
    initiated_stream: bool,
    registered: AtomicBool,
    shutdown: watch::Sender<bool>,
}

impl PeerHandler {
    /// Create a handler and, when this side initiated the stream, send
    /// the opening DISC_HELLO.
    pub async fn connect(
        stream: Arc<dyn MessageStream>,
        coordinator: Arc<dyn PeerCoordinator>,
        config: DiscoveryConfig,
        initiated_stream: bool,
    ) -> Result<Arc<Self>, DiscoveryError> {
        let (shutdown, _) = watch::channel(false);
        let handler = Arc::new(Self {
            stream,
            coordinator,
            config,
            state: Mutex::new(DiscoveryState::Created),
            remote: Mutex::new(None),
            initiated_stream,
            registered: AtomicBool::new(false),
            shutdown,
        });

        if initiated_stream {
            handler.send_hello().await?;
        }
        Ok(handler)
    }

    /// Current protocol state.
    pub fn current_state(&self) -> DiscoveryState {
        *self.state.lock().expect("state lock poisoned")
    }

    /// Endpoint of the remote peer, once a HELLO arrived.
    pub fn remote_endpoint(&self) -> Option<PeerEndpoint> {
        self.remote.lock().expect("remote lock poisoned").clone()
    }

    async fn send_hello(&self) -> Result<(), DiscoveryError> {
        let payload = self.coordinator.local_endpoint().encode()?;
        self.stream
            .send(Envelope::new(MessageType::DiscHello, "", payload))
            .await?;
        Ok(())
    }

    // =========================================================================
    // RECEIVE LOOP
    // =========================================================================

    /// Main loop for the associated peer stream.
    pub async fn process_stream(self: Arc<Self>) -> Result<(), DiscoveryError> {
        let result = loop {
            match self.stream.recv().await {
                Ok(None) => {
                    debug!("end of stream, ending peer stream");
                    break Ok(());
                }
                Err(e) => {
                    error!(error = %e, "error receiving on peer stream");
                    break Err(e.into());
                }
                Ok(Some(envelope)) => {
                    if let Err(e) = self.handle_message(envelope).await {
                        error!(error = %e, "error handling peer message, ending stream");
                        break Err(e);
                    }
                }
            }
        };
        self.stop();
        result
    }

    /// Stop this handler: end the announcement task and deregister from
    /// the coordinator. Idempotent.
    pub fn stop(&self) {
        let _ = self.shutdown.send(true);
        if self.registered.swap(false, Ordering::SeqCst) {
            if let Some(remote) = self.remote_endpoint() {
                self.coordinator.deregister(&remote);
            }
        }
    }

    // =========================================================================
    // MESSAGE DISPATCH
    // =========================================================================

    /// Feed one envelope through the discovery table.
    pub async fn handle_message(self: &Arc<Self>, envelope: Envelope) -> Result<(), DiscoveryError> {
        let Some(event) = DiscoveryEvent::from_message(envelope.message_type) else {
            return Err(DiscoveryError::NotADiscoveryEvent(envelope.message_type));
        };
        let current = self.current_state();
        debug!(%event, state = %current, "handling peer message");

        let next = transition(current, event)?;

        match event {
            DiscoveryEvent::Hello => self.guard_hello(&envelope).await?,
            DiscoveryEvent::GetPeers => self.guard_get_peers().await?,
            DiscoveryEvent::Peers => self.guard_peers(&envelope)?,
        }

        *self.state.lock().expect("state lock poisoned") = next;
        Ok(())
    }

    // =========================================================================
    // GUARDS
    // =========================================================================

    /// Guard on DISC_HELLO: learn the remote endpoint, answer with our
    /// own when we did not initiate, register, and start announcing.
    async fn guard_hello(self: &Arc<Self>, envelope: &Envelope) -> Result<(), DiscoveryError> {
        let remote = PeerEndpoint::decode(&envelope.payload)?;
        debug!(peer = %remote.id, address = %remote.address, "received DISC_HELLO");
        *self.remote.lock().expect("remote lock poisoned") = Some(remote.clone());

        if !self.initiated_stream {
            // We were dialed; the remote still needs our endpoint.
            self.send_hello().await?;
        }

        self.coordinator.register(&remote)?;
        self.registered.store(true, Ordering::SeqCst);
        self.start_announcing();
        Ok(())
    }

    /// Guard on DISC_GET_PEERS: share what the coordinator knows.
    async fn guard_get_peers(&self) -> Result<(), DiscoveryError> {
        let payload = self.coordinator.known_peers().encode()?;
        self.stream
            .send(Envelope::new(MessageType::DiscPeers, "", payload))
            .await?;
        Ok(())
    }

    /// Guard on DISC_PEERS: fold the shared list into the coordinator.
    fn guard_peers(&self, envelope: &Envelope) -> Result<(), DiscoveryError> {
        let peers = PeersList::decode(&envelope.payload)?;
        debug!(count = peers.peers.len(), "received DISC_PEERS");
        self.coordinator.peers_discovered(peers);
        Ok(())
    }

    // =========================================================================
    // PERIODIC RE-ANNOUNCEMENT
    // =========================================================================

    /// Probe the remote side for peers every configured period until
    /// [`stop`](Self::stop) is called.
    fn start_announcing(self: &Arc<Self>) {
        let handler = Arc::clone(self);
        let mut shutdown = self.shutdown.subscribe();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(handler.config.period());
            // The first tick fires immediately; probing starts one period in.
            ticker.tick().await;
            debug!("starting peer discovery announcements");
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let probe = Envelope::signal(MessageType::DiscGetPeers);
                        if let Err(e) = handler.stream.send(probe).await {
                            warn!(error = %e, "could not send discovery probe");
                        }
                    }
                    _ = shutdown.changed() => {
                        debug!("stopping peer discovery announcements");
                        return;
                    }
                }
            }
        });
    }
}

// =============================================================================
// TESTS
// =============================================================================
