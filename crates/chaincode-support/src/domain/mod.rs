//! # Domain Layer
//!
//! Pure protocol logic with no I/O and no side effects.

pub mod fsm;
