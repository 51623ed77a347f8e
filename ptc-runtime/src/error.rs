//! Evaluator errors.
//!
//! The evaluator is pure: every failure is returned as a value, never
//! raised. Tool callables are the only place a host-level panic can
//! occur, and the tool-call boundary converts it to [`EvalError::Tool`].

use thiserror::Error;

use crate::value::Value;

/// Everything the evaluator can fail with.
#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum EvalError {
    /// `{:var, n}` resolved against no binding in the environment chain.
    #[error("unbound_var: {0}")]
    UnboundVar(String),

    /// The call position evaluated to a non-function, non-keyword value.
    #[error("not_callable: {0:?}")]
    NotCallable(Value),

    /// A closure was called with the wrong number of arguments.
    #[error("arity_mismatch: expected {expected}, got {got}")]
    ArityMismatch {
        /// Parameter count the closure declares.
        expected: usize,
        /// Argument count actually supplied.
        got: usize,
    },

    /// A built-in was called with an arity it does not support.
    #[error("arity_error: {0}")]
    ArityError(String),

    /// A keyword was called with an arity other than 1 or 2.
    #[error("invalid_keyword_call: {keyword} called with {arg_count} arguments")]
    InvalidKeywordCall {
        /// The keyword acting as accessor.
        keyword: String,
        /// How many arguments it was given.
        arg_count: usize,
    },

    /// A value had the wrong shape for an operation (e.g. arithmetic
    /// on a string).
    #[error("type_error: {0}")]
    TypeError(String),

    /// A destructuring pattern could not be matched against its value.
    #[error("destructure_error: {0}")]
    DestructureError(String),

    /// A tool call failed: unknown tool name, or the tool callable
    /// raised.
    #[error("tool_error: {0}")]
    Tool(String),

    /// The cooperative cancellation flag was observed during
    /// evaluation. The
    /// sandbox is responsible for translating this into the
    /// user-visible `:timeout` error; it is never surfaced to the LLM
    /// directly under this name.
    #[error("cancelled")]
    Cancelled,
}
