#![deny(missing_docs)]
//! # ptc — programmatic tool calling
//!
//! A single import surface over the PTC-Lisp pipeline: lexer/parser,
//! analyzer, environment/evaluator/memory contract, sandbox, turn
//! history, compression strategy, and the agentic loop that drives a
//! run to completion against a caller-supplied LLM [`Provider`].
//!
//! Most callers only need [`prelude`]; the crate-level re-exports
//! below exist for reaching into one stage directly.

pub use ptc_agent;
pub use ptc_analyzer;
pub use ptc_context;
pub use ptc_protocol;
pub use ptc_runtime;
pub use ptc_sandbox;
pub use ptc_syntax;
pub use ptc_turn;

/// Happy-path imports for driving a run end to end.
pub mod prelude {
    pub use ptc_agent::{AgentConfig, AgentError, AgentFailure, AgentLoop, AgentOutcome, NoValidator, ReturnValidator, Usage};
    pub use ptc_context::{CompressionOptions, CompressionStrategy, SingleUserCoalesced, ToolDescriptor};
    pub use ptc_protocol::{LlmRequest, LlmResponse, Message, Provider, ProviderError, Role, TokenUsage};
    pub use ptc_runtime::{Ctx, Memory, NoTools, ToolCallRecord, ToolTable, Value};
    pub use ptc_sandbox::{SandboxConfig, SandboxError, SandboxOutcome};
    pub use ptc_turn::{FailureRecord, Turn, TurnHistory, TurnOutcome, TurnType};
}
