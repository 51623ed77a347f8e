//! What a run produces, on either path.

use ptc_protocol::TokenUsage;
use ptc_runtime::{Memory, Value};
use ptc_turn::TurnHistory;

use crate::error::AgentError;

/// Aggregate counters carried on both the success and failure path.
#[derive(Debug, Clone, Default)]
pub struct Usage {
    /// Wall-clock time spent in the run, in milliseconds.
    pub duration_ms: u64,
    /// Largest serialized memory size observed across all turns.
    pub memory_bytes_peak: usize,
    /// How many turns were recorded.
    pub turn_count: u32,
    /// Summed token accounting, if the provider ever reported it.
    pub tokens: Option<TokenUsage>,
}

/// A run that reached `completed_ok`.
#[derive(Debug, Clone)]
pub struct AgentOutcome {
    /// The value passed to `(return v)`.
    pub value: Value,
    /// Memory as it stood when the run terminated.
    pub memory: Memory,
    /// The full turn history.
    pub turns: TurnHistory,
    /// Aggregate usage counters.
    pub usage: Usage,
}

/// A run that terminated without a valid `return`.
#[derive(Debug, Clone)]
pub struct AgentFailure {
    /// Why the run terminated.
    pub reason: AgentError,
    /// Memory as it stood when the run terminated.
    pub memory: Memory,
    /// The full turn history, possibly empty (e.g. `max_depth_exceeded`
    /// terminates before any turn runs).
    pub turns: TurnHistory,
    /// Aggregate usage counters.
    pub usage: Usage,
}
