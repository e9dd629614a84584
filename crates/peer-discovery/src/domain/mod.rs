//! # Domain Layer
//!
//! Pure discovery protocol logic.

pub mod fsm;
