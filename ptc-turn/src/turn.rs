//! The immutable turn record itself.

use ptc_runtime::{to_json, ToolCallRecord, Value};
use ptc_sandbox::{SandboxError, SandboxOutcome};
use serde::{Deserialize, Serialize};

use crate::failure::FailureRecord;

/// Which kind of turn this was, per the agentic loop's budget rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnType {
    /// An ordinary turn.
    Normal,
    /// The last turn before `max_turns` is reached; the compression
    /// strategy injects a "final turn" notice for this one.
    MustReturn,
    /// A turn granted after a `return` value failed validation; tools
    /// are stripped so only `return`/`fail` remain callable.
    Retry,
}

/// Which terminal form ended the turn's program, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Terminal {
    /// The program called `(return v)`.
    Return,
    /// The program called `(fail v)`.
    Fail,
}

/// What a turn's program produced.
#[derive(Debug, Clone)]
pub enum TurnOutcome {
    /// The program ran to a value. `terminal` is `Some` when that
    /// value came from `return`/`fail`, `None` for an ordinary
    /// continuing turn.
    Value {
        /// The turn's visible result, after the memory contract.
        value: Value,
        /// `Some(Return)` / `Some(Fail)` / `None`.
        terminal: Option<Terminal>,
    },
    /// The program did not produce a value: a parse, analysis, or
    /// evaluation error, or a sandbox limit breach.
    Failed(FailureRecord),
}

/// One LLM-call-and-execute cycle. Immutable once constructed; the
/// turn list it lives in only ever grows.
#[derive(Debug, Clone)]
pub struct Turn {
    /// 1-based position in the turn list.
    pub number: u32,
    /// The PTC-Lisp source executed this turn, or `None` if it never
    /// parsed into a program at all.
    pub program: Option<String>,
    /// Full LLM output text this turn was parsed from.
    pub raw_response: String,
    /// What the program produced.
    pub outcome: TurnOutcome,
    /// `println` output, in call order.
    pub prints: Vec<String>,
    /// Tool calls made, in call order.
    pub tool_calls: Vec<ToolCallRecord>,
    /// Memory as it stood after this turn (equals the next turn's
    /// starting memory, unless that turn mutates it). For a failed
    /// turn this is the memory the turn started with, unchanged.
    pub memory: ptc_runtime::Memory,
    /// Which budget category this turn was drawn from.
    pub turn_type: TurnType,
}

impl Turn {
    /// Builds the turn for a run that produced a value (terminal or not).
    pub fn from_outcome(
        number: u32,
        program: String,
        raw_response: impl Into<String>,
        outcome: SandboxOutcome,
        turn_type: TurnType,
    ) -> Self {
        let terminal = outcome.terminal.map(|is_return| if is_return { Terminal::Return } else { Terminal::Fail });
        Turn {
            number,
            program: Some(program),
            raw_response: raw_response.into(),
            outcome: TurnOutcome::Value {
                value: outcome.result,
                terminal,
            },
            prints: outcome.prints,
            tool_calls: outcome.tool_calls,
            memory: outcome.memory,
            turn_type,
        }
    }

    /// Builds the turn for a run that failed before producing a value.
    ///
    /// `program` is `Some` when the source parsed (and possibly
    /// analyzed) but evaluation or a sandbox limit failed; `None` when
    /// it never parsed at all.
    pub fn from_error(
        number: u32,
        program: Option<String>,
        raw_response: impl Into<String>,
        error: &SandboxError,
        memory_before: ptc_runtime::Memory,
        turn_type: TurnType,
    ) -> Self {
        Turn {
            number,
            program,
            raw_response: raw_response.into(),
            outcome: TurnOutcome::Failed(FailureRecord::from(error)),
            prints: Vec::new(),
            tool_calls: Vec::new(),
            memory: memory_before,
            turn_type,
        }
    }

    /// `success?` from the data model: `false` exactly when the turn's
    /// `result` is a failure record.
    pub fn success(&self) -> bool {
        matches!(self.outcome, TurnOutcome::Value { .. })
    }

    /// The turn's result value, if it produced one.
    pub fn value(&self) -> Option<&Value> {
        match &self.outcome {
            TurnOutcome::Value { value, .. } => Some(value),
            TurnOutcome::Failed(_) => None,
        }
    }

    /// The terminal marker this turn's value carried, if any.
    pub fn terminal(&self) -> Option<Terminal> {
        match &self.outcome {
            TurnOutcome::Value { terminal, .. } => *terminal,
            TurnOutcome::Failed(_) => None,
        }
    }

    /// The failure record, if this turn did not succeed.
    pub fn failure(&self) -> Option<&FailureRecord> {
        match &self.outcome {
            TurnOutcome::Failed(f) => Some(f),
            TurnOutcome::Value { .. } => None,
        }
    }

    /// Renders the result value as JSON, for diagnostics and tracing.
    /// Closures/built-ins/predicates render as an opaque tag string;
    /// see [`ptc_runtime::to_json`].
    pub fn result_json(&self) -> Option<serde_json::Value> {
        self.value().map(to_json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ptc_runtime::Memory;

    #[test]
    fn success_is_false_for_a_failed_turn() {
        let turn = Turn::from_error(
            1,
            None,
            "not even an s-expression",
            &SandboxError::Parse("parse_error: invalid character at top level".into()),
            Memory::default(),
            TurnType::Normal,
        );
        assert!(!turn.success());
        assert_eq!(turn.failure().unwrap().kind, "parse_error");
        assert!(turn.program.is_none());
    }

    #[test]
    fn a_return_terminal_is_reported() {
        let outcome = SandboxOutcome {
            result: Value::Int(1),
            memory: Memory::default(),
            terminal: Some(true),
            prints: vec![],
            tool_calls: vec![],
            steps_taken: 3,
        };
        let turn = Turn::from_outcome(2, "(return 1)".to_string(), "...", outcome, TurnType::MustReturn);
        assert!(turn.success());
        assert_eq!(turn.terminal(), Some(Terminal::Return));
    }
}
