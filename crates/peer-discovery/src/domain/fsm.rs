//! # Discovery State Machine
//!
//! Two states, three events. A stream starts in `Created`, a HELLO moves
//! it to `Established`, and the peer-sharing messages are self-loops from
//! there on.

use shared_types::MessageType;
use thiserror::Error;

/// Protocol state of one peer stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiscoveryState {
    /// Stream open, no HELLO seen yet.
    Created,
    /// Endpoints exchanged; peer sharing allowed.
    Established,
}

impl std::fmt::Display for DiscoveryState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Created => "created",
            Self::Established => "established",
        })
    }
}

/// Events that drive the discovery lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiscoveryEvent {
    /// A peer announces its endpoint.
    Hello,
    /// A peer asks for our known peers.
    GetPeers,
    /// A peer shares its known peers.
    Peers,
}

impl DiscoveryEvent {
    /// Map an envelope type tag to its discovery event, if it has one.
    #[must_use]
    pub fn from_message(message_type: MessageType) -> Option<Self> {
        match message_type {
            MessageType::DiscHello => Some(Self::Hello),
            MessageType::DiscGetPeers => Some(Self::GetPeers),
            MessageType::DiscPeers => Some(Self::Peers),
            _ => None,
        }
    }
}

impl std::fmt::Display for DiscoveryEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Hello => "DISC_HELLO",
            Self::GetPeers => "DISC_GET_PEERS",
            Self::Peers => "DISC_PEERS",
        })
    }
}

/// A rejected discovery transition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    /// The event is not defined for the current state.
    #[error("cannot handle {event} while in state {state}")]
    CannotTransition {
        /// Event that was attempted.
        event: DiscoveryEvent,
        /// State the machine was in.
        state: DiscoveryState,
    },
}

/// The pure transition function over the discovery table.
pub fn transition(
    state: DiscoveryState,
    event: DiscoveryEvent,
) -> Result<DiscoveryState, TransitionError> {
    use DiscoveryEvent as E;
    use DiscoveryState as S;

    match (state, event) {
        (S::Created, E::Hello) => Ok(S::Established),
        (S::Established, E::GetPeers | E::Peers) => Ok(S::Established),
        _ => Err(TransitionError::CannotTransition { event, state }),
    }
}
