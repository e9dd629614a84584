//! # Service Layer
//!
//! The stream handler and its internally synchronized bookkeeping.

pub mod handler;
pub mod registry;
