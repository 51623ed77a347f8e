//! The memory contract: splitting a program's
//! top-level value into a `(result, delta)` pair and folding the delta
//! into the running memory.
//!
//! A program's final value is interpreted one of three ways:
//!   - a map carrying a `:result` key: that key's value is the turn's
//!     result, and the rest of the map (minus `:result`) is the delta
//!     merged into memory;
//!   - a map without `:result`: the whole map is treated as memory-only
//!     delta, and the turn's result is `nil`;
//!   - anything else: the value itself is the result, with an empty
//!     delta.
//!
//! `return` is unwrapped before the contract applies, so a turn can
//! `(return {:result ... :total ...})` and have both the termination
//! and the memory write land in the same turn. `fail` bypasses the
//! contract entirely instead: its payload is reported verbatim as the
//! result and memory passes through unchanged, even when the payload
//! is itself a map.

use crate::memory::Memory;
use crate::value::{lookup_key, Value};

/// The outcome of applying the memory contract to one evaluated value.
pub struct ContractOutcome {
    /// The turn's visible result.
    pub result: Value,
    /// The new memory after folding in this turn's delta.
    pub memory: Memory,
    /// `Some(true)` for `return`, `Some(false)` for `fail`, `None` for
    /// a normal (non-terminal) turn value.
    pub terminal: Option<bool>,
}

const RESULT_KEY: &str = "result";

/// Applies the memory contract to a turn's raw evaluated value.
///
/// `fail` bypasses the contract entirely: its payload is never split on
/// `:result` or merged into memory, since a failing turn has nothing to
/// commit. Only a bare value or a `return`-wrapped one goes through the
/// `:result`-key split below.
pub fn apply_contract(value: Value, memory: &Memory) -> ContractOutcome {
    let (inner, terminal) = match value {
        Value::Return(v) => (*v, Some(true)),
        Value::Fail(v) => (*v, Some(false)),
        other => (other, None),
    };
    if terminal == Some(false) {
        return ContractOutcome {
            result: inner,
            memory: memory.clone(),
            terminal,
        };
    }
    match inner {
        Value::Map(pairs) => {
            let result_key = Value::Keyword(RESULT_KEY.to_string());
            match lookup_key(&pairs, &result_key) {
                Some(result) => {
                    let delta: Vec<(Value, Value)> = pairs
                        .into_iter()
                        .filter(|(k, _)| !is_result_key(k))
                        .collect();
                    let new_memory = memory.merge(&Memory::new(delta));
                    ContractOutcome {
                        result,
                        memory: new_memory,
                        terminal,
                    }
                }
                None => {
                    let new_memory = memory.merge(&Memory::new(pairs));
                    ContractOutcome {
                        result: Value::Nil,
                        memory: new_memory,
                        terminal,
                    }
                }
            }
        }
        other => ContractOutcome {
            result: other,
            memory: memory.clone(),
            terminal,
        },
    }
}

fn is_result_key(k: &Value) -> bool {
    matches!(k, Value::Keyword(s) if s == RESULT_KEY) || matches!(k, Value::Str(s) if s == RESULT_KEY)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn map_with_result_key_splits_result_and_delta() {
        let value = Value::Map(vec![
            (Value::Keyword("result".into()), Value::Int(42)),
            (Value::Keyword("total".into()), Value::Int(7)),
        ]);
        let outcome = apply_contract(value, &Memory::default());
        assert_eq!(outcome.result, Value::Int(42));
        assert_eq!(outcome.memory.get("total"), Value::Int(7));
        assert!(outcome.terminal.is_none());
    }

    #[test]
    fn map_without_result_key_is_pure_delta() {
        let value = Value::Map(vec![(Value::Keyword("seen".into()), Value::Bool(true))]);
        let outcome = apply_contract(value, &Memory::default());
        assert_eq!(outcome.result, Value::Nil);
        assert_eq!(outcome.memory.get("seen"), Value::Bool(true));
    }

    #[test]
    fn non_map_value_is_the_result_with_empty_delta() {
        let outcome = apply_contract(Value::Int(9), &Memory::default());
        assert_eq!(outcome.result, Value::Int(9));
        assert!(outcome.memory.is_empty());
    }

    #[test]
    fn return_wrapper_unwraps_before_the_contract_applies() {
        let value = Value::Return(Box::new(Value::Map(vec![(Value::Keyword("result".into()), Value::Int(1))])));
        let outcome = apply_contract(value, &Memory::default());
        assert_eq!(outcome.result, Value::Int(1));
        assert_eq!(outcome.terminal, Some(true));
    }

    #[test]
    fn fail_wrapper_is_reported_as_a_failing_terminal() {
        let value = Value::Fail(Box::new(Value::Str("boom".into())));
        let outcome = apply_contract(value, &Memory::default());
        assert_eq!(outcome.result, Value::Str("boom".into()));
        assert_eq!(outcome.terminal, Some(false));
    }

    #[test]
    fn fail_with_a_map_payload_bypasses_the_result_key_split() {
        let memory = Memory::new(vec![(Value::Keyword("seen".into()), Value::Bool(true))]);
        let value = Value::Fail(Box::new(Value::Map(vec![
            (Value::Keyword("reason".into()), Value::Str("oops".into())),
            (Value::Keyword("result".into()), Value::Int(99)),
        ])));
        let outcome = apply_contract(value, &memory);
        assert_eq!(
            outcome.result,
            Value::Map(vec![
                (Value::Keyword("reason".into()), Value::Str("oops".into())),
                (Value::Keyword("result".into()), Value::Int(99)),
            ])
        );
        assert_eq!(outcome.terminal, Some(false));
        assert_eq!(outcome.memory.get("seen"), Value::Bool(true));
        assert_eq!(outcome.memory.get("reason"), Value::Nil);
    }

    #[test]
    fn string_keyed_result_is_recognized_same_as_keyword() {
        let value = Value::Map(vec![(Value::Str("result".into()), Value::Int(3))]);
        let outcome = apply_contract(value, &Memory::default());
        assert_eq!(outcome.result, Value::Int(3));
    }

    #[test]
    fn keyword_result_key_wins_over_a_coexisting_string_key() {
        let value = Value::Map(vec![
            (Value::Str("result".into()), Value::Int(1)),
            (Value::Keyword("result".into()), Value::Int(2)),
        ]);
        let outcome = apply_contract(value, &Memory::default());
        assert_eq!(outcome.result, Value::Int(2));
    }
}
