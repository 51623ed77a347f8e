//! Sandbox-level errors: the typed failures a run reports when it
//! breaches one of its two resource limits, plus the underlying
//! pipeline failures it passes through unchanged.

use thiserror::Error;

/// Everything a sandboxed run can fail with.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum SandboxError {
    /// The source text did not parse.
    #[error("parse_error: {0}")]
    Parse(String),

    /// The raw AST failed analysis (arity, destructuring shape, ...).
    #[error("analyze_error: {0}")]
    Analyze(String),

    /// Evaluation raised an [`ptc_runtime::EvalError`].
    #[error("eval_error: {0}")]
    Eval(String),

    /// The run did not finish within its wall-clock budget.
    #[error("timeout: exceeded {limit_ms}ms")]
    Timeout {
        /// The configured budget.
        limit_ms: u64,
    },

    /// The memory produced by the run, serialized, exceeded the
    /// configured byte ceiling.
    #[error("memory_limit_exceeded: {observed_bytes} bytes, limit {limit_bytes}")]
    MemoryLimitExceeded {
        /// The configured ceiling.
        limit_bytes: usize,
        /// The measured size of the serialized memory.
        observed_bytes: usize,
    },

    /// The worker thread running the evaluation panicked or was
    /// dropped without sending a result.
    #[error("worker thread did not complete: {0}")]
    WorkerLost(String),
}
