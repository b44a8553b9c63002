//! `pc-retrieval` — knowledge retrieval for the chat pipeline.
//!
//! Provides the [`RetrievalBackend`] trait that abstracts over the vector
//! search service, a production REST implementation
//! ([`RestRetrievalClient`]), the [`RetrievalDecision`] gate that picks a
//! retrieval route per turn, and [`fetch_context`], the degradation-aware
//! fetch used on the fallback route.

pub mod chunk;
pub mod client;
pub mod fetch;
pub mod gate;

// ── Re-exports for ergonomic imports ─────────────────────────────────

pub use chunk::RetrievedChunk;
pub use client::{RestRetrievalClient, RetrievalBackend, TwoPassQuery, VectorQuery};
pub use fetch::fetch_context;
pub use gate::{FallbackStrategy, RetrievalDecision};
