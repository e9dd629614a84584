//! # Correlation Registry & In-Flight Dedup Set
//!
//! Two small, internally synchronized maps owned by each handler:
//!
//! - [`CorrelationRegistry`] implements request/response over the
//!   asynchronous stream: one single-use reply slot per correlation id,
//!   delivered to exactly once.
//! - [`InFlightSet`] makes state-request handling idempotent against
//!   duplicate delivery: claim-or-reject on entry, unconditional release
//!   on completion.
//!
//! Both are mutated only under their own lock, so concurrent ledger-task
//! completions and new inbound requests never race on the maps.

use crate::errors::HandlerError;
use shared_types::Envelope;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use tokio::sync::oneshot;
use tracing::debug;

/// Single-use handle on which a caller awaits the one reply for its
/// correlation id.
#[derive(Debug)]
pub struct ReplyWaiter {
    rx: oneshot::Receiver<Envelope>,
}

impl ReplyWaiter {
    /// Block until the reply envelope arrives.
    ///
    /// Fails with [`HandlerError::Abandoned`] only if the registry was
    /// dropped without draining, which teardown prevents.
    pub async fn wait(self) -> Result<Envelope, HandlerError> {
        self.rx.await.map_err(|_| HandlerError::Abandoned)
    }
}

/// Maps correlation ids to single-slot reply waiters.
#[derive(Default)]
pub struct CorrelationRegistry {
    slots: Mutex<HashMap<String, oneshot::Sender<Envelope>>>,
}

impl CorrelationRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a waiter for `correlation_id`.
    ///
    /// Fails if the id already has an outstanding waiter; a removed id
    /// may be reused safely.
    pub fn create(&self, correlation_id: &str) -> Result<ReplyWaiter, HandlerError> {
        let mut slots = self.slots.lock().expect("correlation registry poisoned");
        if slots.contains_key(correlation_id) {
            return Err(HandlerError::DuplicateCorrelation(correlation_id.to_owned()));
        }
        let (tx, rx) = oneshot::channel();
        slots.insert(correlation_id.to_owned(), tx);
        Ok(ReplyWaiter { rx })
    }

    /// Deliver a reply to the waiter registered under its correlation id.
    ///
    /// Exactly-once: the slot is removed before sending. Delivery to an
    /// absent id is a logged no-op — this happens legitimately when the
    /// caller already gave up or the id is stale, and must not fail the
    /// stream. Returns whether a waiter was present.
    pub fn deliver(&self, envelope: Envelope) -> bool {
        let slot = self
            .slots
            .lock()
            .expect("correlation registry poisoned")
            .remove(&envelope.correlation_id);
        match slot {
            Some(tx) => {
                let correlation_id = envelope.correlation_id.clone();
                if tx.send(envelope).is_err() {
                    // Caller dropped its waiter after a timeout; dead-letter.
                    debug!(correlation_id, "reply dropped, waiter already gone");
                }
                true
            }
            None => {
                debug!(
                    correlation_id = envelope.correlation_id,
                    "no waiter for correlation id, dropping reply"
                );
                false
            }
        }
    }

    /// Remove a waiter the caller is giving up on (e.g., send failure).
    pub fn abandon(&self, correlation_id: &str) {
        self.slots
            .lock()
            .expect("correlation registry poisoned")
            .remove(correlation_id);
    }

    /// Release every pending waiter with an ERROR envelope.
    ///
    /// Called on handler teardown so no caller blocks forever on a
    /// stream that no longer exists.
    pub fn drain_with_error(&self, reason: &str) {
        let slots = std::mem::take(
            &mut *self.slots.lock().expect("correlation registry poisoned"),
        );
        for (correlation_id, tx) in slots {
            let _ = tx.send(Envelope::failure(correlation_id, reason));
        }
    }

    /// Number of outstanding waiters.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.slots.lock().expect("correlation registry poisoned").len()
    }
}

/// Correlation ids of all in-progress state requests.
#[derive(Default)]
pub struct InFlightSet {
    ids: Mutex<HashSet<String>>,
}

impl InFlightSet {
    /// Create an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically claim `correlation_id`; `false` means a request for
    /// this id is already in progress and the duplicate must be dropped.
    pub fn claim(&self, correlation_id: &str) -> bool {
        self.ids
            .lock()
            .expect("in-flight set poisoned")
            .insert(correlation_id.to_owned())
    }

    /// Release a claim. Unconditional; releasing an unclaimed id is a
    /// no-op.
    pub fn release(&self, correlation_id: &str) {
        self.ids
            .lock()
            .expect("in-flight set poisoned")
            .remove(correlation_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::MessageType;

    #[test]
    fn test_duplicate_waiter_rejected() {
        let registry = CorrelationRegistry::new();
        let _waiter = registry.create("tx-1").unwrap();
        assert!(matches!(
            registry.create("tx-1"),
            Err(HandlerError::DuplicateCorrelation(_))
        ));
    }

    #[tokio::test]
    async fn test_deliver_exactly_once_and_remove() {
        let registry = CorrelationRegistry::new();
        let waiter = registry.create("tx-1").unwrap();

        assert!(registry.deliver(Envelope::response("tx-1", vec![7])));
        // Entry removed: a second delivery is a no-op.
        assert!(!registry.deliver(Envelope::response("tx-1", vec![8])));

        let reply = waiter.wait().await.unwrap();
        assert_eq!(reply.payload, vec![7]);
        assert_eq!(registry.pending(), 0);
    }

    #[test]
    fn test_deliver_to_absent_id_is_noop() {
        let registry = CorrelationRegistry::new();
        assert!(!registry.deliver(Envelope::response("ghost", vec![])));
    }

    #[test]
    fn test_removed_id_is_reusable() {
        let registry = CorrelationRegistry::new();
        let _w = registry.create("tx-1").unwrap();
        registry.abandon("tx-1");
        assert!(registry.create("tx-1").is_ok());
    }

    #[tokio::test]
    async fn test_drain_releases_waiters_with_error() {
        let registry = CorrelationRegistry::new();
        let waiter = registry.create("tx-1").unwrap();

        registry.drain_with_error("stream torn down");

        let reply = waiter.wait().await.unwrap();
        assert_eq!(reply.message_type, MessageType::Error);
        assert_eq!(reply.description(), "stream torn down");
    }

    #[test]
    fn test_claim_and_release() {
        let set = InFlightSet::new();
        assert!(set.claim("g1"));
        assert!(!set.claim("g1"));
        set.release("g1");
        assert!(set.claim("g1"));
    }
}
