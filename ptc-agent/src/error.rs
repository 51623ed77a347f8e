//! Why a run terminated without completing successfully.

use thiserror::Error;

/// The reason tag a failed run terminates with.
#[non_exhaustive]
#[derive(Debug, Clone, Error)]
pub enum AgentError {
    /// `max_turns` was exhausted without a `return`/`fail`.
    #[error("max_turns_exceeded")]
    MaxTurnsExceeded,

    /// A nested agent-as-tool exceeded its configured nesting depth.
    #[error("max_depth_exceeded")]
    MaxDepthExceeded,

    /// The parent's remaining-turns budget was exhausted by a nested run.
    #[error("turn_budget_exhausted")]
    TurnBudgetExhausted,

    /// The mission-wide wall-clock deadline passed.
    #[error("mission_timeout")]
    MissionTimeout,

    /// The LLM callable failed and the retry policy gave up.
    #[error("llm_error: {0}")]
    LlmError(String),

    /// A turn's memory breached the configured byte ceiling.
    #[error("memory_limit_exceeded: {0}")]
    MemoryLimitExceeded(String),

    /// `return_retries` was exhausted without a valid return value.
    #[error("budget_exhausted")]
    BudgetExhausted,

    /// The program explicitly called `(fail v)`.
    #[error("failed: {0}")]
    Failed(String),
}
