//! Budgets and policy for one agent run.

use ptc_protocol::RetryPolicy;
use std::time::Duration;

/// The limits an [`crate::AgentLoop`] run is bound by.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Total normal/must-return turns allowed.
    pub max_turns: u32,
    /// Extra turns granted only to retry a value-validation failure.
    pub return_retries: u32,
    /// Wall-clock budget for one turn's sandboxed run, in milliseconds.
    pub timeout_ms: u64,
    /// Maximum serialized size of one turn's resulting memory.
    pub memory_limit_bytes: usize,
    /// Deepest nesting level a child agent-as-tool may run at.
    pub max_depth: u32,
    /// Wall-clock deadline for the whole run, checked at each turn
    /// boundary. `None` means no mission-wide deadline.
    pub mission_timeout: Option<Duration>,
    /// Backoff policy for retryable LLM transport errors.
    pub retry_policy: RetryPolicy,
    /// How many of the most recent tool calls the compression strategy
    /// shows in the "Tool calls made" section.
    pub tool_call_limit: usize,
    /// How many of the most recent `println` lines the compression
    /// strategy shows in the "Output" section.
    pub println_limit: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        AgentConfig {
            max_turns: 5,
            return_retries: 0,
            timeout_ms: 1_000,
            memory_limit_bytes: 10 * 1024 * 1024,
            max_depth: 5,
            mission_timeout: None,
            retry_policy: RetryPolicy::default(),
            tool_call_limit: ptc_context::DEFAULT_TOOL_CALL_LIMIT,
            println_limit: ptc_context::DEFAULT_PRINTLN_LIMIT,
        }
    }
}
