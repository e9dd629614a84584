//! # Service Layer
//!
//! The per-stream discovery handler.

pub mod handler;
