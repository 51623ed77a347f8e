#![deny(missing_docs)]
//! Wire types and the LLM [`Provider`] trait shared across the PTC-Lisp
//! runtime crates.
//!
//! This is the bottom of the dependency order: every other `ptc-*`
//! crate depends on this one, none of it depends on them.

pub mod provider;
pub mod retry;
pub mod role;

pub use provider::{LlmRequest, LlmResponse, Provider, ProviderError, TokenUsage};
pub use retry::{BackoffStrategy, RetryPolicy};
pub use role::{Message, Role};
