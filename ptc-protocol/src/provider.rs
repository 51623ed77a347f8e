//! The LLM callable contract.
//!
//! [`Provider`] uses RPITIT (return-position `impl Trait` in traits)
//! and is intentionally NOT object-safe — `AgentLoop<P: Provider>` is
//! generic over it, the same duality `neuron-turn::Provider` uses
//! against the object-safe `layer0::Turn` boundary. This runtime has
//! exactly one loop implementation, so no object-safe boundary is
//! needed here at all.

use crate::role::Message;
use serde_json::Value;
use std::future::Future;
use thiserror::Error;

/// Token accounting reported by an LLM call, when the provider reports it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TokenUsage {
    /// Input tokens consumed.
    pub input: u64,
    /// Output tokens generated.
    pub output: u64,
    /// Tokens spent creating a cache entry, if the provider caches.
    pub cache_creation: u64,
    /// Tokens served from cache, if the provider caches.
    pub cache_read: u64,
}

/// One request to the LLM callable.
#[derive(Debug, Clone)]
pub struct LlmRequest {
    /// The compressed system prompt.
    pub system: String,
    /// The compressed messages (normally exactly one user message,
    /// plus any collected assistant history).
    pub messages: Vec<Message>,
    /// 1-based turn number this call is being made for.
    pub turn: u32,
    /// Names of tools available this turn (stripped to none on a
    /// `:retry` turn).
    pub tool_names: Vec<String>,
    /// Whether prompt caching should be requested, if the backend
    /// supports it.
    pub cache: bool,
    /// Provider-specific passthrough options.
    pub llm_opts: Value,
}

/// A successful LLM response.
#[derive(Debug, Clone)]
pub struct LlmResponse {
    /// Raw text returned by the model.
    pub content: String,
    /// Token accounting, if the provider reports it.
    pub tokens: Option<TokenUsage>,
}

/// Errors the LLM callable may report.
///
/// The retry layer in `ptc-agent` recognises at least `RateLimit`,
/// `Timeout`, and `ServerError` as retryable.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The provider rate-limited this request.
    #[error("rate limited")]
    RateLimit,

    /// The call exceeded its own transport timeout.
    #[error("request timed out")]
    Timeout,

    /// The provider reported an internal/server-side error.
    #[error("server error: {0}")]
    ServerError(String),

    /// Any other transport or protocol failure.
    #[error("{0}")]
    Other(String),
}

impl ProviderError {
    /// Whether the agentic loop's backoff policy should retry this error.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ProviderError::RateLimit | ProviderError::Timeout | ProviderError::ServerError(_)
        )
    }
}

/// The LLM callable contract.
///
/// Implementations wrap a concrete vendor client; the concrete client
/// is explicitly out of scope of this runtime.
pub trait Provider: Send + Sync {
    /// Send one request, returning the model's raw text response.
    fn complete(
        &self,
        request: LlmRequest,
    ) -> impl Future<Output = Result<LlmResponse, ProviderError>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_kinds() {
        assert!(ProviderError::RateLimit.is_retryable());
        assert!(ProviderError::Timeout.is_retryable());
        assert!(ProviderError::ServerError("boom".into()).is_retryable());
        assert!(!ProviderError::Other("nope".into()).is_retryable());
    }
}
