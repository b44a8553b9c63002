//! Shared domain types for polychat: errors, canonical messages, stream
//! events, structured trace events, and configuration.

pub mod config;
pub mod error;
pub mod message;
pub mod stream;
pub mod trace;
