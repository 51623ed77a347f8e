//! The append-only turn list a run accumulates.

use crate::turn::{Turn, TurnType};
use ptc_runtime::{Memory, Value};
use ptc_sandbox::{SandboxError, SandboxOutcome};

/// Turns so far in one run. Append-only: nothing is ever removed or
/// edited once recorded, and `number` always equals 1-based position.
#[derive(Debug, Clone, Default)]
pub struct TurnHistory(Vec<Turn>);

impl TurnHistory {
    /// An empty history, as at the start of a run.
    pub fn new() -> Self {
        TurnHistory(Vec::new())
    }

    /// Records a turn whose program produced a value, assigning it the
    /// next turn number.
    pub fn record_outcome(
        &mut self,
        program: String,
        raw_response: impl Into<String>,
        outcome: SandboxOutcome,
        turn_type: TurnType,
    ) -> &Turn {
        let number = self.0.len() as u32 + 1;
        self.0.push(Turn::from_outcome(number, program, raw_response, outcome, turn_type));
        self.0.last().expect("just pushed")
    }

    /// Records a turn whose program failed, assigning it the next turn
    /// number. `memory_before` is carried through unchanged, per the
    /// invariant that a failed turn never mutates memory.
    pub fn record_error(
        &mut self,
        program: Option<String>,
        raw_response: impl Into<String>,
        error: &SandboxError,
        memory_before: Memory,
        turn_type: TurnType,
    ) -> &Turn {
        let number = self.0.len() as u32 + 1;
        self.0
            .push(Turn::from_error(number, program, raw_response, error, memory_before, turn_type));
        self.0.last().expect("just pushed")
    }

    /// All turns recorded so far, oldest first.
    pub fn turns(&self) -> &[Turn] {
        &self.0
    }

    /// How many turns have been recorded.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no turns have been recorded yet.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The most recent turn, if any.
    pub fn last(&self) -> Option<&Turn> {
        self.0.last()
    }

    /// Turns whose program produced a value, oldest first.
    pub fn successful(&self) -> impl Iterator<Item = &Turn> {
        self.0.iter().filter(|t| t.success())
    }

    /// Turns whose program failed, oldest first.
    pub fn failed(&self) -> impl Iterator<Item = &Turn> {
        self.0.iter().filter(|t| !t.success())
    }

    /// Memory as it stood after the most recent turn, or empty memory
    /// if no turn has run yet.
    pub fn current_memory(&self) -> Memory {
        self.0.last().map(|t| t.memory.clone()).unwrap_or_default()
    }

    /// The `*1`/`*2`/`*3` bindings: the last up-to-3 successful
    /// results, most recent first, for binding into the environment
    /// every turn's program evaluates against.
    pub fn recent_results(&self) -> Vec<Value> {
        self.0
            .iter()
            .rev()
            .filter_map(|t| t.value().cloned())
            .take(3)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(v: i64) -> SandboxOutcome {
        SandboxOutcome {
            result: Value::Int(v),
            memory: Memory::default(),
            terminal: None,
            prints: vec![],
            tool_calls: vec![],
            steps_taken: 1,
        }
    }

    #[test]
    fn turn_numbers_follow_position() {
        let mut history = TurnHistory::new();
        history.record_outcome("(+ 1 1)".into(), "r1", outcome(2), TurnType::Normal);
        history.record_outcome("(+ 1 2)".into(), "r2", outcome(3), TurnType::Normal);
        assert_eq!(history.turns()[0].number, 1);
        assert_eq!(history.turns()[1].number, 2);
    }

    #[test]
    fn recent_results_are_most_recent_first_capped_at_three() {
        let mut history = TurnHistory::new();
        for v in 1..=4 {
            history.record_outcome(format!("{v}"), "r", outcome(v), TurnType::Normal);
        }
        let recent = history.recent_results();
        assert_eq!(recent, vec![Value::Int(4), Value::Int(3), Value::Int(2)]);
    }

    #[test]
    fn failed_turns_keep_the_prior_memory() {
        let mut history = TurnHistory::new();
        history.record_outcome(
            "{:result nil :seen true}".into(),
            "r1",
            SandboxOutcome {
                result: Value::Nil,
                memory: Memory::new(vec![(Value::Keyword("seen".into()), Value::Bool(true))]),
                terminal: None,
                prints: vec![],
                tool_calls: vec![],
                steps_taken: 1,
            },
            TurnType::Normal,
        );
        let before = history.current_memory();
        history.record_error(
            Some("(oops)".into()),
            "r2",
            &SandboxError::Eval("unbound_var: oops".into()),
            before.clone(),
            TurnType::Normal,
        );
        assert_eq!(history.current_memory(), before);
    }
}
