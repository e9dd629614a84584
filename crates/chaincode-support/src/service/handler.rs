//! # Chaincode Stream Handler
//!
//! One handler per accepted chaincode stream. The receive loop feeds every
//! inbound envelope through the lifecycle table; guard actions run the
//! protocol's side effects; state-access requests are claimed in the
//! in-flight set and dispatched to the ledger on background tasks so a
//! slow ledger call never stalls the stream.
//!
//! ## Error policy
//!
//! - illegal event in the current state: fatal, the loop terminates;
//! - REGISTER guard failure (bad payload, duplicate identity, send
//!   failure): fatal, and the startup signal fires `false`;
//! - ledger failures and malformed state-request payloads: recoverable —
//!   an ERROR reply goes back to the chaincode and the ERROR lifecycle
//!   event moves the machine out of its busy state;
//! - duplicate in-flight state request: silently dropped;
//! - reply for a correlation id nobody waits on: logged, ignored.
//!
//! On loop exit for any reason the handler deregisters from the directory
//! (if it had registered) and releases every pending waiter with an ERROR
//! envelope.

use crate::domain::fsm::{transition, LifecycleEvent, State};
use crate::errors::HandlerError;
use crate::ports::inbound::ChaincodeMessageHandler;
use crate::ports::outbound::{HandlerDirectory, LedgerStore};
use crate::service::registry::{CorrelationRegistry, InFlightSet, ReplyWaiter};
use async_trait::async_trait;
use shared_types::{
    ChaincodeId, ChaincodeInput, Envelope, MessageStream, MessageType, PutStatePayload,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use tokio::sync::oneshot;
use tracing::{debug, error, warn};

/// Peer-side handler for one chaincode stream.
///
/// Exclusively owns its state machine, correlation registry, and in-flight
/// set. The ledger and the directory are shared collaborators injected at
/// construction.
pub struct ChaincodeHandler {
    stream: Arc<dyn MessageStream>,
    ledger: Arc<dyn LedgerStore>,
    directory: Arc<dyn HandlerDirectory>,
    state: Mutex<State>,
    chaincode_id: OnceLock<ChaincodeId>,
    registry: CorrelationRegistry,
    in_flight: InFlightSet,
    registered: AtomicBool,
    startup: Mutex<Option<oneshot::Sender<bool>>>,
}

impl ChaincodeHandler {
    /// Create a handler for a freshly accepted stream.
    ///
    /// `startup` is fired exactly once: `true` when the chaincode is
    /// confirmed live (REGISTER succeeded, or INIT is about to go out),
    /// `false` when registration fails or the stream dies first.
    pub fn new(
        stream: Arc<dyn MessageStream>,
        ledger: Arc<dyn LedgerStore>,
        directory: Arc<dyn HandlerDirectory>,
        startup: Option<oneshot::Sender<bool>>,
    ) -> Arc<Self> {
        Arc::new(Self {
            stream,
            ledger,
            directory,
            state: Mutex::new(State::Created),
            chaincode_id: OnceLock::new(),
            registry: CorrelationRegistry::new(),
            in_flight: InFlightSet::new(),
            registered: AtomicBool::new(false),
            startup: Mutex::new(startup),
        })
    }

    /// Current protocol state.
    pub fn current_state(&self) -> State {
        *self.state.lock().expect("state lock poisoned")
    }

    /// Identity of the chaincode, once registered.
    pub fn chaincode_id(&self) -> Option<&ChaincodeId> {
        self.chaincode_id.get()
    }

    /// Fire the startup signal. At most once; later calls are no-ops.
    fn notify_startup(&self, live: bool) {
        if let Some(tx) = self.startup.lock().expect("startup lock poisoned").take() {
            let _ = tx.send(live);
        }
    }

    // =========================================================================
    // RECEIVE LOOP
    // =========================================================================

    /// Main loop for the associated chaincode stream.
    ///
    /// Returns `Ok(())` on clean end-of-stream; any other termination
    /// propagates its cause. Deregistration and waiter release run
    /// unconditionally on the way out.
    pub async fn process_stream(self: Arc<Self>) -> Result<(), HandlerError> {
        let result = loop {
            match self.stream.recv().await {
                Ok(None) => {
                    debug!("end of stream, ending chaincode support stream");
                    break Ok(());
                }
                Err(e) => {
                    error!(error = %e, "error receiving on chaincode support stream");
                    break Err(e.into());
                }
                Ok(Some(envelope)) => {
                    if let Err(e) = self.handle_message(envelope).await {
                        error!(error = %e, "error handling message, ending stream");
                        break Err(e);
                    }
                }
            }
        };
        self.teardown("chaincode stream ended");
        result
    }

    fn teardown(&self, reason: &str) {
        if self.registered.swap(false, Ordering::SeqCst) {
            if let Some(id) = self.chaincode_id.get() {
                self.directory.deregister(id);
            }
        }
        self.registry.drain_with_error(reason);
        // Unblock a spawner still waiting on a chaincode that never came up.
        self.notify_startup(false);
    }

    // =========================================================================
    // MESSAGE DISPATCH
    // =========================================================================

    /// Feed one envelope through the lifecycle table.
    ///
    /// Guards run between the legality check and the commit; a guard that
    /// fails with cause cancels the transition and the state is not
    /// touched.
    pub async fn handle_message(self: &Arc<Self>, envelope: Envelope) -> Result<(), HandlerError> {
        let Some(event) = LifecycleEvent::from_message(envelope.message_type) else {
            return Err(HandlerError::NotALifecycleEvent(envelope.message_type));
        };
        let current = self.current_state();
        debug!(%event, state = %current, "handling chaincode message");

        // Legality check first; an undefined pair is fatal and the
        // triggering message is not applied.
        transition(current, event)?;

        match envelope.message_type {
            MessageType::Register => self.guard_register(&envelope).await?,
            MessageType::Completed => {
                self.registry.deliver(envelope.clone());
            }
            _ => {}
        }

        self.apply_event(event);

        // State-access side effects run after the commit so their
        // completion events always observe the busy state.
        match envelope.message_type {
            MessageType::GetState => self.dispatch_get_state(envelope),
            MessageType::PutState | MessageType::DelState => self.dispatch_mutation(envelope),
            _ => {}
        }
        Ok(())
    }

    /// Re-check and commit `event` atomically.
    ///
    /// Background mutation tasks drive RESPONSE/ERROR events concurrently
    /// with the receive loop, so the commit re-runs the table under the
    /// state lock; an event the current state no longer accepts is logged
    /// and dropped rather than clobbering the newer state.
    fn apply_event(&self, event: LifecycleEvent) {
        let mut state = self.state.lock().expect("state lock poisoned");
        match transition(*state, event) {
            Ok(next) => {
                if next != *state {
                    debug!(from = %*state, to = %next, %event, "lifecycle transition");
                    *state = next;
                }
            }
            Err(e) => warn!(error = %e, "event no longer applicable, ignoring"),
        }
    }

    // =========================================================================
    // GUARDS
    // =========================================================================

    /// Guard on REGISTER: decode the identity, claim it in the directory,
    /// acknowledge on the stream, and fire the startup signal.
    async fn guard_register(&self, envelope: &Envelope) -> Result<(), HandlerError> {
        let id = match ChaincodeId::decode(&envelope.payload) {
            Ok(id) => id,
            Err(e) => {
                self.notify_startup(false);
                return Err(e.into());
            }
        };
        if let Err(e) = self.directory.register(&id) {
            self.notify_startup(false);
            return Err(e.into());
        }
        self.registered.store(true, Ordering::SeqCst);
        let _ = self.chaincode_id.set(id.clone());

        debug!(chaincode_id = %id, "registered, sending back REGISTERED");
        if let Err(e) = self.stream.send(Envelope::signal(MessageType::Registered)).await {
            // Teardown will release the directory claim.
            self.notify_startup(false);
            return Err(e.into());
        }
        self.notify_startup(true);
        Ok(())
    }

    // =========================================================================
    // LEDGER DISPATCH (GET_STATE / PUT_STATE / DEL_STATE)
    // =========================================================================

    fn namespace(&self) -> Result<String, HandlerError> {
        self.chaincode_id
            .get()
            .map(ChaincodeId::namespace)
            .ok_or(HandlerError::NotRegistered)
    }

    /// Run a GET_STATE against the ledger on a background task.
    ///
    /// A read never changed the lifecycle on entry, so its completion
    /// drives no event; success and failure alike produce exactly one
    /// reply envelope.
    fn dispatch_get_state(self: &Arc<Self>, envelope: Envelope) {
        let handler = Arc::clone(self);
        tokio::spawn(async move {
            let correlation_id = envelope.correlation_id.clone();
            if !handler.in_flight.claim(&correlation_id) {
                debug!(correlation_id, "state request already in flight, dropping duplicate");
                return;
            }

            let reply = match handler.read_state(&envelope).await {
                Ok(value) => Envelope::response(&correlation_id, value),
                Err(e) => {
                    debug!(correlation_id, error = %e, "get state failed, sending ERROR");
                    Envelope::failure(&correlation_id, e.to_string())
                }
            };
            if let Err(e) = handler.stream.send(reply).await {
                warn!(correlation_id, error = %e, "could not send state reply");
            }

            handler.in_flight.release(&correlation_id);
        });
    }

    /// Run a PUT_STATE or DEL_STATE against the ledger on a background
    /// task.
    ///
    /// These entered a BUSY_* state, so their completion additionally
    /// drives RESPONSE (success) or ERROR (failure, including a payload
    /// that would not decode) to move the lifecycle back out of it.
    fn dispatch_mutation(self: &Arc<Self>, envelope: Envelope) {
        let handler = Arc::clone(self);
        tokio::spawn(async move {
            let correlation_id = envelope.correlation_id.clone();
            if !handler.in_flight.claim(&correlation_id) {
                debug!(correlation_id, "state request already in flight, dropping duplicate");
                return;
            }

            let outcome = match envelope.message_type {
                MessageType::PutState => handler.write_state(&envelope).await,
                _ => handler.delete_state(&envelope).await,
            };
            let (reply, event) = match outcome {
                Ok(()) => (
                    Envelope::response(&correlation_id, Vec::new()),
                    LifecycleEvent::Response,
                ),
                Err(e) => {
                    debug!(correlation_id, error = %e, "state mutation failed, sending ERROR");
                    (
                        Envelope::failure(&correlation_id, e.to_string()),
                        LifecycleEvent::Error,
                    )
                }
            };
            if let Err(e) = handler.stream.send(reply).await {
                warn!(correlation_id, error = %e, "could not send state reply");
            }
            handler.apply_event(event);

            handler.in_flight.release(&correlation_id);
        });
    }

    async fn read_state(&self, envelope: &Envelope) -> Result<Vec<u8>, HandlerError> {
        let namespace = self.namespace()?;
        let key = key_from_payload(&envelope.payload)?;
        Ok(self.ledger.get(&namespace, &key).await?)
    }

    async fn write_state(&self, envelope: &Envelope) -> Result<(), HandlerError> {
        let namespace = self.namespace()?;
        let put = PutStatePayload::decode(&envelope.payload)?;
        Ok(self.ledger.set(&namespace, &put.key, put.value).await?)
    }

    async fn delete_state(&self, envelope: &Envelope) -> Result<(), HandlerError> {
        let namespace = self.namespace()?;
        let key = key_from_payload(&envelope.payload)?;
        Ok(self.ledger.delete(&namespace, &key).await?)
    }

    // =========================================================================
    // LIFECYCLE DRIVER API
    // =========================================================================

    /// Push the chaincode into initialization, or straight to ready.
    ///
    /// With init arguments present this sends INIT and returns a waiter
    /// for the eventual COMPLETED; the startup signal fires before the
    /// INIT goes out so a spawner blocked on "chaincode is up" proceeds
    /// without waiting for init to finish. Without arguments nothing on
    /// the wire expects a reply, so the READY move returns no waiter.
    pub async fn init_or_ready(
        &self,
        correlation_id: &str,
        input: Option<ChaincodeInput>,
    ) -> Result<Option<ReplyWaiter>, HandlerError> {
        match input {
            Some(input) => {
                let payload = input.encode()?;
                let waiter = self.registry.create(correlation_id)?;
                {
                    let mut state = self.state.lock().expect("state lock poisoned");
                    let next = transition(*state, LifecycleEvent::Init)?;
                    // Guard on INIT: the handler is live.
                    self.notify_startup(true);
                    *state = next;
                }
                debug!(correlation_id, "sending INIT");
                let envelope = Envelope::new(MessageType::Init, correlation_id, payload);
                if let Err(e) = self.stream.send(envelope).await {
                    self.registry.abandon(correlation_id);
                    return Err(e.into());
                }
                Ok(Some(waiter))
            }
            None => {
                debug!("no init arguments, moving to ready");
                let mut state = self.state.lock().expect("state lock poisoned");
                let next = transition(*state, LifecycleEvent::Ready)?;
                *state = next;
                Ok(None)
            }
        }
    }

    /// Send a transaction envelope and return the waiter for its
    /// completion reply.
    ///
    /// The waiter is registered before the send; a send failure removes
    /// it again so the correlation id stays reusable.
    pub async fn execute_transaction(
        &self,
        envelope: Envelope,
    ) -> Result<ReplyWaiter, HandlerError> {
        let waiter = self.registry.create(&envelope.correlation_id)?;
        let message_type = envelope.message_type;
        let correlation_id = envelope.correlation_id.clone();

        if let Err(e) = self.stream.send(envelope).await {
            self.registry.abandon(&correlation_id);
            return Err(e.into());
        }
        if message_type == MessageType::Transaction {
            self.apply_event(LifecycleEvent::Transaction);
        }
        Ok(waiter)
    }
}

#[async_trait]
impl ChaincodeMessageHandler for Arc<ChaincodeHandler> {
    async fn handle_message(&self, envelope: Envelope) -> Result<(), HandlerError> {
        ChaincodeHandler::handle_message(self, envelope).await
    }

    async fn send_message(&self, envelope: Envelope) -> Result<(), HandlerError> {
        self.stream.send(envelope).await.map_err(Into::into)
    }
}

/// Convenience wrapper: build a handler for an accepted stream and run
/// its receive loop to completion.
pub async fn handle_chaincode_stream(
    stream: Arc<dyn MessageStream>,
    ledger: Arc<dyn LedgerStore>,
    directory: Arc<dyn HandlerDirectory>,
    startup: Option<oneshot::Sender<bool>>,
) -> Result<(), HandlerError> {
    ChaincodeHandler::new(stream, ledger, directory, startup)
        .process_stream()
        .await
}

fn key_from_payload(payload: &[u8]) -> Result<String, HandlerError> {
    String::from_utf8(payload.to_vec()).map_err(|_| {
        HandlerError::Ledger(crate::errors::LedgerError::Backend(
            "state key is not valid UTF-8".into(),
        ))
    })
}

// =============================================================================
// TESTS
// =============================================================================
