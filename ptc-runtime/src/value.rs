//! The runtime value domain.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use ptc_analyzer::{Ast, Pattern};

use crate::env::Env;
use crate::error::EvalError;
use crate::memory::Memory;

/// One PTC-Lisp runtime value.
#[derive(Debug, Clone)]
pub enum Value {
    /// `nil`.
    Nil,
    /// `true` / `false`.
    Bool(bool),
    /// A 64-bit integer.
    Int(i64),
    /// A 64-bit float.
    Float(f64),
    /// A string.
    Str(String),
    /// An interned symbolic constant, e.g. `:status`.
    Keyword(String),
    /// An ordered sequence of values.
    Vector(Vec<Value>),
    /// An ordered association of values to values. Both atom-like
    /// (keyword) and string keys are supported; see [`lookup_key`].
    Map(Vec<(Value, Value)>),
    /// An unordered collection of unique values.
    Set(Vec<Value>),
    /// A user-defined function closing over its defining environment.
    Closure(Arc<Closure>),
    /// A built-in function or operator.
    Builtin(Arc<Builtin>),
    /// A `where`/`all-of`/`any-of`/`none-of` predicate builder.
    Predicate(Arc<crate::predicate::PredicateValue>),
    /// The unevaluated wrapper produced by calling `return`; propagates
    /// up through every surrounding construct without further
    /// evaluation until the agentic loop unwraps it.
    Return(Box<Value>),
    /// The unevaluated wrapper produced by calling `fail`.
    Fail(Box<Value>),
}

impl Value {
    /// True for [`Value::Return`]/[`Value::Fail`] — a terminal that
    /// must be propagated rather than combined further.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Value::Return(_) | Value::Fail(_))
    }
}

/// A user-defined function value.
#[derive(Debug)]
pub struct Closure {
    /// One binding pattern per parameter.
    pub params: Vec<Pattern>,
    /// The (already-analyzed) function body.
    pub body: Ast,
    /// The environment active at the `fn` form's definition site.
    pub env: Env,
    /// Optional docstring, if the closure carries one.
    pub doc: Option<String>,
    /// Optional return-type hint, shown by the compression strategy.
    pub return_type_hint: Option<String>,
}

/// A built-in function or operator.
pub struct Builtin {
    /// The name it is bound under in the root environment.
    pub name: &'static str,
    /// Its arity discipline and implementation.
    pub kind: BuiltinKind,
}

impl fmt::Debug for Builtin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Builtin").field("name", &self.name).finish()
    }
}

/// The call-kind enumeration: a small closed set of
/// arity disciplines built-ins may follow.
pub enum BuiltinKind {
    /// Exactly `usize` arguments.
    Normal(usize, BuiltinFn),
    /// Any number of arguments, with a defined zero-argument identity.
    Variadic(Value, BuiltinFn),
    /// Any number of arguments, but at least one.
    VariadicNonempty(BuiltinFn),
    /// Dispatches on argument count among a small fixed set of arities.
    MultiArity(&'static [(usize, BuiltinFn)]),
}

/// Implementation signature shared by every built-in. Built-ins are
/// pure transforms of already-evaluated arguments; the `(EvalCtx,
/// Memory)` pair is threaded through only so higher-order built-ins
/// (`map`, `filter`, `reduce`, ...) can invoke a function-valued
/// argument without bypassing memory threading or cooperative
/// cancellation checks.
pub type BuiltinFn = fn(&crate::eval::EvalCtx, Memory, &[Value]) -> Result<(Value, Memory), EvalError>;

impl Value {
    /// Every value is truthy except `false` and `nil`.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Nil | Value::Bool(false))
    }

    /// A short, stable name for error messages and type predicates.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Bool(_) => "boolean",
            Value::Int(_) => "integer",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::Keyword(_) => "keyword",
            Value::Vector(_) => "vector",
            Value::Map(_) => "map",
            Value::Set(_) => "set",
            Value::Closure(_) => "fn",
            Value::Builtin(_) => "fn",
            Value::Predicate(_) => "fn",
            Value::Return(_) => "return",
            Value::Fail(_) => "fail",
        }
    }

    /// Whether this value is callable (closure, built-in, predicate,
    /// or keyword acting as a map accessor).
    pub fn is_callable(&self) -> bool {
        matches!(
            self,
            Value::Closure(_) | Value::Builtin(_) | Value::Predicate(_) | Value::Keyword(_)
        )
    }

    /// Numeric coercion to `f64`, used by arithmetic and comparisons.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(n) => Some(*n as f64),
            Value::Float(n) => Some(*n),
            _ => None,
        }
    }

    /// True for `Int`/`Float`.
    pub fn is_number(&self) -> bool {
        matches!(self, Value::Int(_) | Value::Float(_))
    }

    /// Converts a sequence-shaped value (vector or set) into a
    /// snapshot `Vec<Value>`; returns `None` for anything else.
    pub fn as_seq(&self) -> Option<&[Value]> {
        match self {
            Value::Vector(xs) | Value::Set(xs) => Some(xs),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Int(a), Value::Float(b)) | (Value::Float(b), Value::Int(a)) => (*a as f64) == *b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Keyword(a), Value::Keyword(b)) => a == b,
            (Value::Vector(a), Value::Vector(b)) => a == b,
            (Value::Set(a), Value::Set(b)) => a.len() == b.len() && a.iter().all(|x| b.contains(x)),
            (Value::Map(a), Value::Map(b)) => {
                a.len() == b.len() && a.iter().all(|(k, v)| b.iter().any(|(k2, v2)| k == k2 && v == v2))
            }
            (Value::Closure(a), Value::Closure(b)) => Arc::ptr_eq(a, b),
            (Value::Builtin(a), Value::Builtin(b)) => Arc::ptr_eq(a, b),
            (Value::Predicate(a), Value::Predicate(b)) => Arc::ptr_eq(a, b),
            (Value::Return(a), Value::Return(b)) => a == b,
            (Value::Fail(a), Value::Fail(b)) => a == b,
            _ => false,
        }
    }
}

/// A best-effort total order used by `sort`/`sort-by` when no
/// comparator is supplied: numbers compare numerically, strings and
/// keywords lexicographically, booleans `false < true`. Values of
/// unrelated types compare equal, which keeps `sort` stable rather
/// than erroring on heterogeneous input.
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => a
            .as_f64()
            .unwrap()
            .partial_cmp(&b.as_f64().unwrap())
            .unwrap_or(Ordering::Equal),
        (Value::Str(x), Value::Str(y)) => x.cmp(y),
        (Value::Keyword(x), Value::Keyword(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        _ => Ordering::Equal,
    }
}

/// Looks up `key` in a map's key/value pairs, applying the
/// atom-before-string precedence rule: a keyword key
/// tries the keyword form first, falling back to the string form only
/// when the keyword form is entirely absent (even a `false`/`nil`
/// keyword-keyed value wins over a present string-keyed one).
pub fn lookup_key(pairs: &[(Value, Value)], key: &Value) -> Option<Value> {
    match key {
        Value::Keyword(k) => find_exact(pairs, &Value::Keyword(k.clone()))
            .or_else(|| find_exact(pairs, &Value::Str(k.clone()))),
        other => find_exact(pairs, other),
    }
}

/// Looks up a bare name (as used by `{:memory, n}`/`{:ctx, n}`
/// reference nodes and the memory contract's `:result` key) using the
/// same atom-before-string precedence as [`lookup_key`].
pub fn lookup_name(pairs: &[(Value, Value)], name: &str) -> Option<Value> {
    lookup_key(pairs, &Value::Keyword(name.to_string()))
}

fn find_exact(pairs: &[(Value, Value)], key: &Value) -> Option<Value> {
    pairs.iter().find(|(k, _)| k == key).map(|(_, v)| v.clone())
}

/// Returns a new pair list with `key` bound to `value`, replacing any
/// existing exact-key entry (copy-on-write; the input is unchanged).
pub fn assoc_key(pairs: &[(Value, Value)], key: Value, value: Value) -> Vec<(Value, Value)> {
    let mut out = Vec::with_capacity(pairs.len() + 1);
    let mut replaced = false;
    for (k, v) in pairs {
        if *k == key {
            out.push((key.clone(), value.clone()));
            replaced = true;
        } else {
            out.push((k.clone(), v.clone()));
        }
    }
    if !replaced {
        out.push((key, value));
    }
    out
}

/// Right-wins merge of two pair lists (the memory contract's `⊕`).
pub fn merge_pairs(base: &[(Value, Value)], delta: &[(Value, Value)]) -> Vec<(Value, Value)> {
    let mut out = base.to_vec();
    for (k, v) in delta {
        out = assoc_key(&out, k.clone(), v.clone());
    }
    out
}

/// Renders a value as owned `serde_json::Value` data, for crossing a
/// thread/process boundary (the sandbox) or serializing a turn record.
/// Keywords render as a leading-colon string to stay distinguishable
/// from plain strings; closures, built-ins, and predicates have no
/// useful wire form and render as an opaque tag string.
pub fn to_json(v: &Value) -> serde_json::Value {
    match v {
        Value::Nil => serde_json::Value::Null,
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::Int(n) => serde_json::Value::from(*n),
        Value::Float(n) => serde_json::Number::from_f64(*n)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Value::Str(s) => serde_json::Value::String(s.clone()),
        Value::Keyword(k) => serde_json::Value::String(format!(":{k}")),
        Value::Vector(xs) => serde_json::Value::Array(xs.iter().map(to_json).collect()),
        Value::Set(xs) => serde_json::Value::Array(xs.iter().map(to_json).collect()),
        Value::Map(pairs) => {
            let mut obj = serde_json::Map::with_capacity(pairs.len());
            for (k, val) in pairs {
                let key = match k {
                    Value::Keyword(s) => s.clone(),
                    Value::Str(s) => s.clone(),
                    other => display_key(other),
                };
                obj.insert(key, to_json(val));
            }
            serde_json::Value::Object(obj)
        }
        Value::Closure(_) => serde_json::Value::String("#<closure>".to_string()),
        Value::Builtin(b) => serde_json::Value::String(format!("#<builtin:{}>", b.name)),
        Value::Predicate(_) => serde_json::Value::String("#<predicate>".to_string()),
        Value::Return(inner) => {
            let mut obj = serde_json::Map::with_capacity(1);
            obj.insert("return".to_string(), to_json(inner));
            serde_json::Value::Object(obj)
        }
        Value::Fail(inner) => {
            let mut obj = serde_json::Map::with_capacity(1);
            obj.insert("fail".to_string(), to_json(inner));
            serde_json::Value::Object(obj)
        }
    }
}

fn display_key(v: &Value) -> String {
    match v {
        Value::Int(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => format!("{other:?}"),
    }
}

/// Builds a value from host-provided JSON data (a sandbox run's `ctx`/
/// `memory` input). Object keys become keywords, matching the
/// `ctx/name`/`memory/name` namespaces they are meant to feed; a
/// string beginning with `:` round-trips back to a keyword produced by
/// [`to_json`], everything else stays a string.
pub fn from_json(v: &serde_json::Value) -> Value {
    match v {
        serde_json::Value::Null => Value::Nil,
        serde_json::Value::Bool(b) => Value::Bool(*b),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Int(i)
            } else {
                Value::Float(n.as_f64().unwrap_or(0.0))
            }
        }
        serde_json::Value::String(s) => match s.strip_prefix(':') {
            Some(rest) => Value::Keyword(rest.to_string()),
            None => Value::Str(s.clone()),
        },
        serde_json::Value::Array(xs) => Value::Vector(xs.iter().map(from_json).collect()),
        serde_json::Value::Object(obj) => {
            let pairs = obj.iter().map(|(k, v)| (Value::Keyword(k.clone()), from_json(v))).collect();
            Value::Map(pairs)
        }
    }
}
