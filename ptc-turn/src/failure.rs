//! The structured failure a turn carries when its program did not run
//! to a value: a parse/analyze/eval error, or a sandbox limit breach.

use ptc_sandbox::SandboxError;
use serde::{Deserialize, Serialize};

/// A turn-level failure: a kind tag plus the rendered message.
///
/// `kind` is always the first whitespace-free token of `message` — the
/// same convention the error taxonomy uses for the feedback shown back
/// to the LLM, so printing `message` alone is always a valid error
/// report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureRecord {
    /// One of `parse_error`, `invalid_form`, `invalid_arity`,
    /// `invalid_where_form`, `unbound_var`, `not_callable`,
    /// `arity_mismatch`, `arity_error`, `invalid_keyword_call`,
    /// `type_error`, `destructure_error`, `tool_error`, `timeout`,
    /// `memory_limit_exceeded`.
    pub kind: String,
    /// Full message, offending program preserved separately on [`crate::Turn`].
    pub message: String,
}

impl FailureRecord {
    /// Builds a failure record from a raw kind/message pair.
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        FailureRecord {
            kind: kind.into(),
            message: message.into(),
        }
    }
}

impl From<&SandboxError> for FailureRecord {
    fn from(err: &SandboxError) -> Self {
        match err {
            SandboxError::Parse(msg) => from_tagged(msg, "parse_error"),
            SandboxError::Analyze(msg) => from_tagged(msg, "invalid_form"),
            SandboxError::Eval(msg) => from_tagged(msg, "type_error"),
            SandboxError::Timeout { limit_ms } => {
                FailureRecord::new("timeout", format!("timeout: exceeded {limit_ms}ms"))
            }
            SandboxError::MemoryLimitExceeded {
                limit_bytes,
                observed_bytes,
            } => FailureRecord::new(
                "memory_limit_exceeded",
                format!("memory_limit_exceeded: {observed_bytes} bytes, limit {limit_bytes}"),
            ),
            SandboxError::WorkerLost(msg) => FailureRecord::new("tool_error", format!("tool_error: {msg}")),
            other => FailureRecord::new("tool_error", other.to_string()),
        }
    }
}

impl From<SandboxError> for FailureRecord {
    fn from(err: SandboxError) -> Self {
        FailureRecord::from(&err)
    }
}

/// `msg` already carries a `kind: detail` prefix from the pipeline
/// stage that produced it (`ptc-syntax`/`ptc-analyzer`/`ptc-runtime`
/// error `Display` impls all render this way); this just reads that
/// tag back out instead of re-deriving it.
fn from_tagged(msg: &str, fallback: &str) -> FailureRecord {
    let kind = msg.split_once(':').map(|(k, _)| k.trim()).unwrap_or(fallback);
    FailureRecord::new(kind, msg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_error_keeps_its_own_tag() {
        let err = SandboxError::Parse("parse_error: unterminated string (line 1, column 4)".into());
        let rec = FailureRecord::from(&err);
        assert_eq!(rec.kind, "parse_error");
    }

    #[test]
    fn eval_error_kind_is_read_from_the_inner_message() {
        let err = SandboxError::Eval("unbound_var: x".into());
        let rec = FailureRecord::from(&err);
        assert_eq!(rec.kind, "unbound_var");
        assert_eq!(rec.message, "unbound_var: x");
    }

    #[test]
    fn timeout_and_memory_limit_get_fixed_kinds() {
        assert_eq!(FailureRecord::from(&SandboxError::Timeout { limit_ms: 50 }).kind, "timeout");
        assert_eq!(
            FailureRecord::from(&SandboxError::MemoryLimitExceeded {
                limit_bytes: 10,
                observed_bytes: 20
            })
            .kind,
            "memory_limit_exceeded"
        );
    }
}
