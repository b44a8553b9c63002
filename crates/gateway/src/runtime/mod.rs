//! Turn pipeline: normalization, reasoning extraction, run tracing, and
//! the stream orchestrator itself.

pub mod normalize;
pub mod reasoning;
pub mod tracer;
pub mod turn;

pub use turn::{run_turn, TurnEvent, TurnInput};
