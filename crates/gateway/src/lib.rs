//! `pc-gateway` — the HTTP gateway and turn pipeline.
//!
//! One inbound chat turn flows through: message normalization →
//! credential + model capability resolution → retrieval gate → prompt
//! composition → provider streaming → finalization (reasoning
//! extraction, persistence, run trace close).

pub mod api;
pub mod connect;
pub mod persist;
pub mod runtime;
pub mod state;
