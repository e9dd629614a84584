//! # Chaincode Lifecycle State Machine
//!
//! An explicit, enumerated transition table with a pure
//! [`transition`] function. Guard and entry side effects live in the
//! stream handler; this module only answers "is this event legal here,
//! and where does it lead".
//!
//! ```text
//! CREATED --REGISTER--> ESTABLISHED --INIT--> INIT ----COMPLETED----> READY
//!                            |                 ^  \                  ^   |
//!                            +----READY--------|---\--------------- -+   |
//!                                              |    PUT/DEL/INVOKE       |
//!                                         RESPONSE      |            TRANSACTION
//!                                              |        v                |
//!                                              +---- BUSY_INIT           v
//!                                                              TRANSACTION <--> BUSY_XACT
//! ```
//!
//! `GET_STATE` is a self-loop in every state where it is legal: a read
//! never changes the lifecycle. `END` is terminal.

use shared_types::MessageType;
use thiserror::Error;

/// Externally visible protocol state of one chaincode instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum State {
    /// Initial state; stream accepted, nothing received yet.
    Created,
    /// REGISTER accepted, REGISTERED sent.
    Established,
    /// Initialization envelope outstanding.
    Init,
    /// Idle, able to accept a transaction.
    Ready,
    /// Transaction envelope outstanding.
    Transaction,
    /// A state mutation is in flight during initialization.
    BusyInit,
    /// A state mutation is in flight during a transaction.
    BusyXact,
    /// Terminal; the stream should be torn down.
    End,
}

impl std::fmt::Display for State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Created => "created",
            Self::Established => "established",
            Self::Init => "init",
            Self::Ready => "ready",
            Self::Transaction => "transaction",
            Self::BusyInit => "busyinit",
            Self::BusyXact => "busyxact",
            Self::End => "end",
        };
        f.write_str(name)
    }
}

/// Events that can drive the lifecycle.
///
/// Mostly a subset of [`MessageType`]: the discovery tags and REGISTERED
/// have no lifecycle meaning on the peer side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleEvent {
    /// Chaincode registers its identity.
    Register,
    /// Peer starts chaincode initialization.
    Init,
    /// Peer skips initialization (no init arguments).
    Ready,
    /// Peer pushes a transaction.
    Transaction,
    /// Chaincode reads a key.
    GetState,
    /// Chaincode writes a key.
    PutState,
    /// Chaincode deletes a key.
    DelState,
    /// Chaincode invokes another chaincode.
    InvokeChaincode,
    /// Chaincode finished an init/transaction envelope.
    Completed,
    /// A state mutation finished successfully.
    Response,
    /// A state mutation (or the chaincode itself) failed.
    Error,
}

impl LifecycleEvent {
    /// Map an envelope type tag to its lifecycle event, if it has one.
    #[must_use]
    pub fn from_message(message_type: MessageType) -> Option<Self> {
        match message_type {
            MessageType::Register => Some(Self::Register),
            MessageType::Init => Some(Self::Init),
            MessageType::Ready => Some(Self::Ready),
            MessageType::Transaction => Some(Self::Transaction),
            MessageType::GetState => Some(Self::GetState),
            MessageType::PutState => Some(Self::PutState),
            MessageType::DelState => Some(Self::DelState),
            MessageType::InvokeChaincode => Some(Self::InvokeChaincode),
            MessageType::Completed => Some(Self::Completed),
            MessageType::Response => Some(Self::Response),
            MessageType::Error => Some(Self::Error),
            MessageType::Registered
            | MessageType::DiscHello
            | MessageType::DiscGetPeers
            | MessageType::DiscPeers => None,
        }
    }
}

impl std::fmt::Display for LifecycleEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Register => "REGISTER",
            Self::Init => "INIT",
            Self::Ready => "READY",
            Self::Transaction => "TRANSACTION",
            Self::GetState => "GET_STATE",
            Self::PutState => "PUT_STATE",
            Self::DelState => "DEL_STATE",
            Self::InvokeChaincode => "INVOKE_CHAINCODE",
            Self::Completed => "COMPLETED",
            Self::Response => "RESPONSE",
            Self::Error => "ERROR",
        };
        f.write_str(name)
    }
}

/// A rejected transition attempt.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    /// The event is not defined for the current state. Fatal to the
    /// stream when raised from the receive loop.
    #[error("cannot handle {event} while in state {state}")]
    CannotTransition {
        /// Event that was attempted.
        event: LifecycleEvent,
        /// State the machine was in.
        state: State,
    },
}

/// The pure transition function over the lifecycle table.
///
/// Self-loops (`GET_STATE`) return the source state unchanged; they are
/// legal transitions, not errors. Any pair not in the table is rejected
/// with [`TransitionError::CannotTransition`] and the state must remain
/// untouched by the caller.
pub fn transition(state: State, event: LifecycleEvent) -> Result<State, TransitionError> {
    use LifecycleEvent as E;
    use State as S;

    let next = match (state, event) {
        (S::Created, E::Register) => S::Established,
        (S::Established, E::Init) => S::Init,
        (S::Established, E::Ready) => S::Ready,
        (S::Ready, E::Transaction) => S::Transaction,

        // Reads never change the lifecycle.
        (S::Init | S::BusyInit | S::Transaction | S::BusyXact, E::GetState) => state,

        (S::Init, E::PutState | E::DelState | E::InvokeChaincode) => S::BusyInit,
        (S::Transaction, E::PutState | E::DelState | E::InvokeChaincode) => S::BusyXact,

        (S::Init | S::Transaction, E::Completed) => S::Ready,

        (S::BusyInit, E::Response) => S::Init,
        (S::BusyXact, E::Response) => S::Transaction,

        (S::Init, E::Error) => S::End,
        (S::Transaction, E::Error) => S::Ready,
        (S::BusyInit, E::Error) => S::Init,
        (S::BusyXact, E::Error) => S::Transaction,

        _ => return Err(TransitionError::CannotTransition { event, state }),
    };
    Ok(next)
}
