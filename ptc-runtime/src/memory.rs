//! Read-only context and rolling memory (C5's operands).
//!
//! Both are represented the same way a map literal is: an ordered list
//! of key/value pairs supporting the atom-before-string lookup rule,
//! since both are typically seeded from JSON-like host data or from a
//! program's own `{:result ...}` map.

use crate::value::{assoc_key, lookup_name, merge_pairs, Value};

/// The read-only `ctx/name` namespace injected by the host for one run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ctx(pub Vec<(Value, Value)>);

impl Ctx {
    /// Builds a context from key/value pairs, as supplied by the host.
    pub fn new(pairs: Vec<(Value, Value)>) -> Self {
        Ctx(pairs)
    }

    /// Looks up `name` using atom-before-string precedence; absent
    /// names evaluate to `nil`, never an error.
    pub fn get(&self, name: &str) -> Value {
        lookup_name(&self.0, name).unwrap_or(Value::Nil)
    }
}

/// The rolling `memory/name` namespace threaded across turns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Memory(pub Vec<(Value, Value)>);

impl Memory {
    /// An empty memory, as at the start of a run.
    pub fn new(pairs: Vec<(Value, Value)>) -> Self {
        Memory(pairs)
    }

    /// Looks up `name` using atom-before-string precedence; absent
    /// names evaluate to `nil`.
    pub fn get(&self, name: &str) -> Value {
        lookup_name(&self.0, name).unwrap_or(Value::Nil)
    }

    /// Binds `key` to `value`, returning a new memory (copy-on-write).
    pub fn assoc(&self, key: Value, value: Value) -> Memory {
        Memory(assoc_key(&self.0, key, value))
    }

    /// Right-wins merge of `delta` into `self` (the memory contract's `⊕`).
    pub fn merge(&self, delta: &Memory) -> Memory {
        Memory(merge_pairs(&self.0, &delta.0))
    }

    /// Renders this memory as an ordinary map value, e.g. for display
    /// in the compression strategy or for round-tripping through the
    /// memory contract.
    pub fn to_value(&self) -> Value {
        Value::Map(self.0.clone())
    }

    /// Whether memory holds no bindings at all.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Value> for Memory {
    fn from(v: Value) -> Self {
        match v {
            Value::Map(pairs) => Memory(pairs),
            Value::Nil => Memory::default(),
            other => Memory(vec![(Value::Keyword("result".to_string()), other)]),
        }
    }
}
