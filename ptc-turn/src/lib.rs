#![deny(missing_docs)]
//! The immutable turn record (C7): what one LLM-call-and-execute
//! cycle produced, and the append-only history a run accumulates.

mod failure;
mod history;
mod turn;

pub use failure::FailureRecord;
pub use history::TurnHistory;
pub use turn::{Terminal, Turn, TurnOutcome, TurnType};
