//! Parse errors.

use thiserror::Error;

/// A parse failure, with a 1-based line/column pointing at the first
/// offending character. The parser never attempts recovery — the
/// first error terminates parsing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("parse_error: {message} (line {line}, column {column})")]
pub struct ParseError {
    /// Human-readable description of what went wrong.
    pub message: String,
    /// 1-based line number.
    pub line: usize,
    /// 1-based column number.
    pub column: usize,
}

impl ParseError {
    pub(crate) fn new(message: impl Into<String>, line: usize, column: usize) -> Self {
        Self {
            message: message.into(),
            line,
            column,
        }
    }
}
