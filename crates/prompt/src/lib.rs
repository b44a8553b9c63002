//! `pc-prompt` — system prompt composition.
//!
//! Builds the effective system prompt for a turn: persona overrides,
//! native-tool instruction variants, and budget-constrained injection of
//! retrieved context on the fallback route.

pub mod composer;
pub mod persona;

pub use composer::{compose, estimate_tokens, DEFAULT_SYSTEM_PROMPT};
pub use persona::PersonaRegistry;
