//! What one sandboxed run produces.

use ptc_runtime::{Memory, ToolCallRecord, Value};

/// Everything a successful sandboxed run produces.
#[derive(Debug, Clone)]
pub struct SandboxOutcome {
    /// The turn's visible result, after the memory contract is applied.
    pub result: Value,
    /// The new memory, after folding in this run's delta. Any closure
    /// it carries keeps its captured environment intact — nothing
    /// about crossing the sandbox boundary serializes it away.
    pub memory: Memory,
    /// `Some(true)` for `return`, `Some(false)` for `fail`, `None` for
    /// a normal (non-terminal) program value.
    pub terminal: Option<bool>,
    /// Lines emitted by `println`, in call order.
    pub prints: Vec<String>,
    /// Tool calls made during the run, in call order.
    pub tool_calls: Vec<ToolCallRecord>,
    /// Evaluation steps taken, for diagnostics.
    pub steps_taken: u64,
}
