//! Analysis errors (raw AST to core AST).

use thiserror::Error;

/// Everything that can go wrong lowering a raw form into the core AST.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum AnalyzeError {
    /// A form does not have a shape any rule recognizes.
    #[error("invalid_form: {0}")]
    InvalidForm(String),

    /// A special form was called with the wrong number of arguments.
    #[error("invalid_arity: {form} expects {expected}, got {got}")]
    InvalidArity {
        /// Name of the offending form.
        form: String,
        /// Human-readable description of what was expected.
        expected: String,
        /// Number of arguments actually supplied.
        got: usize,
    },

    /// A `where` form used an unrecognized comparison operator or
    /// malformed field path.
    #[error("invalid_where_form: {0}")]
    InvalidWhereForm(String),
}

impl AnalyzeError {
    pub(crate) fn invalid_form(message: impl Into<String>) -> Self {
        Self::InvalidForm(message.into())
    }

    pub(crate) fn invalid_arity(form: impl Into<String>, expected: impl Into<String>, got: usize) -> Self {
        Self::InvalidArity {
            form: form.into(),
            expected: expected.into(),
            got,
        }
    }

    pub(crate) fn invalid_where_form(message: impl Into<String>) -> Self {
        Self::InvalidWhereForm(message.into())
    }
}
