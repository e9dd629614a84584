//! # Ports
//!
//! Trait boundaries of the engine, hexagonal style:
//!
//! - **Inbound** ([`inbound`]): how the peer-side driver and the receive
//!   loop's owner talk to a handler.
//! - **Outbound** ([`outbound`]): what a handler consumes — the ledger
//!   store and the handler registration directory.

pub mod inbound;
pub mod outbound;

pub use inbound::ChaincodeMessageHandler;
pub use outbound::{HandlerDirectory, LedgerStore};
