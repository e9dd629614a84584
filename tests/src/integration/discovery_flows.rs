//! # Peer Discovery Flows
//!
//! Two real peers on the ends of one stream pair: the mutual HELLO
//! handshake, periodic peer sharing, and handler teardown.

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::time::timeout;

    use peer_discovery::prelude::*;
    use shared_types::stream_pair;
    use shared_types::MessageStream;

    fn endpoint(id: &str) -> PeerEndpoint {
        PeerEndpoint::new(id, format!("{id}.example:7051"))
    }

    fn fast_config() -> DiscoveryConfig {
        DiscoveryConfig { period_secs: 1 }
    }

    struct Peer {
        handler: Arc<PeerHandler>,
        coordinator: Arc<InMemoryCoordinator>,
        loop_task: tokio::task::JoinHandle<Result<(), DiscoveryError>>,
    }

    /// Wire two peers together; `a` dials, `b` accepts.
    async fn connect_pair(a_id: &str, b_id: &str) -> (Peer, Peer) {
        let (a_end, b_end) = stream_pair(32);
        let a_coordinator = Arc::new(InMemoryCoordinator::new(endpoint(a_id)));
        let b_coordinator = Arc::new(InMemoryCoordinator::new(endpoint(b_id)));

        let b_handler = PeerHandler::connect(
            Arc::new(b_end),
            b_coordinator.clone(),
            fast_config(),
            false,
        )
        .await
        .unwrap();
        let b_task = tokio::spawn(b_handler.clone().process_stream());

        let a_handler = PeerHandler::connect(
            Arc::new(a_end),
            a_coordinator.clone(),
            fast_config(),
            true,
        )
        .await
        .unwrap();
        let a_task = tokio::spawn(a_handler.clone().process_stream());

        (
            Peer {
                handler: a_handler,
                coordinator: a_coordinator,
                loop_task: a_task,
            },
            Peer {
                handler: b_handler,
                coordinator: b_coordinator,
                loop_task: b_task,
            },
        )
    }

    /// Poll until `predicate` holds or five seconds pass.
    async fn eventually(mut predicate: impl FnMut() -> bool) {
        timeout(Duration::from_secs(5), async {
            while !predicate() {
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
        })
        .await
        .expect("condition not reached in time");
    }

    #[tokio::test]
    async fn test_mutual_hello_registers_both_sides() {
        let (a, b) = connect_pair("vp0", "vp1").await;

        eventually(|| {
            a.coordinator.known_peers().peers.len() == 1
                && b.coordinator.known_peers().peers.len() == 1
        })
        .await;

        assert_eq!(a.coordinator.known_peers().peers[0].id, "vp1");
        assert_eq!(b.coordinator.known_peers().peers[0].id, "vp0");
        assert_eq!(a.handler.current_state(), DiscoveryState::Established);
        assert_eq!(b.handler.current_state(), DiscoveryState::Established);

        a.handler.stop();
        b.handler.stop();
    }

    #[tokio::test]
    async fn test_periodic_probing_spreads_peer_knowledge() {
        let (a, b) = connect_pair("vp0", "vp1").await;

        // vp1 has another live stream we simulate by registering directly.
        b.coordinator.register(&endpoint("vp2")).unwrap();

        // vp0's next probe makes vp1 share both vp0 and vp2; vp0 keeps
        // only the ones that are not itself.
        eventually(|| {
            a.coordinator
                .discovered_peers()
                .iter()
                .any(|p| p.id == "vp2")
        })
        .await;

        let discovered = a.coordinator.discovered_peers();
        assert!(discovered.iter().all(|p| p.id != "vp0"));

        a.handler.stop();
        b.handler.stop();
    }

    #[tokio::test]
    async fn test_duplicate_peer_identity_ends_stream() {
        let (remote_end, peer_end) = stream_pair(8);
        let coordinator = Arc::new(InMemoryCoordinator::new(endpoint("vp1")));
        // A live handler for vp0 already exists.
        coordinator.register(&endpoint("vp0")).unwrap();

        let handler = PeerHandler::connect(
            Arc::new(peer_end),
            coordinator,
            fast_config(),
            false,
        )
        .await
        .unwrap();
        let loop_task = tokio::spawn(handler.process_stream());

        remote_end
            .send(Envelope::new(
                MessageType::DiscHello,
                "",
                endpoint("vp0").encode().unwrap(),
            ))
            .await
            .unwrap();

        let err = loop_task.await.unwrap().unwrap_err();
        assert!(matches!(err, DiscoveryError::AlreadyRegistered(_)));
    }

    #[tokio::test]
    async fn test_stream_death_deregisters_remote() {
        let (a, b) = connect_pair("vp0", "vp1").await;
        eventually(|| b.coordinator.known_peers().peers.len() == 1).await;

        // vp0 goes away: its handler drops both its stream ends.
        a.handler.stop();
        drop(a.handler);
        a.loop_task.abort();

        eventually(|| b.coordinator.known_peers().peers.is_empty()).await;
        b.handler.stop();
        let _ = b.loop_task.await;
    }
}
