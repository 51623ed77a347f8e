//! Set built-ins.

use crate::error::EvalError;
use crate::value::{BuiltinKind, Value};

use super::mk;

fn items_of(v: &Value) -> Result<&[Value], EvalError> {
    match v {
        Value::Vector(xs) | Value::Set(xs) => Ok(xs),
        other => Err(EvalError::TypeError(format!("expected a collection, got {}", other.type_name()))),
    }
}

fn dedup(items: Vec<Value>) -> Vec<Value> {
    let mut out: Vec<Value> = Vec::new();
    for v in items {
        if !out.contains(&v) {
            out.push(v);
        }
    }
    out
}

/// All set built-ins.
pub fn builtins() -> Vec<(String, Value)> {
    vec![
        mk("set", BuiltinKind::Normal(1, |_c, m, a| {
            let items = items_of(&a[0])?.to_vec();
            Ok((Value::Set(dedup(items)), m))
        })),
        mk("union", BuiltinKind::VariadicNonempty(|_c, m, a| {
            let mut out = Vec::new();
            for v in a {
                out.extend(items_of(v)?.iter().cloned());
            }
            Ok((Value::Set(dedup(out)), m))
        })),
        mk("intersection", BuiltinKind::VariadicNonempty(|_c, m, a| {
            let mut out = items_of(&a[0])?.to_vec();
            for v in &a[1..] {
                let other = items_of(v)?;
                out.retain(|x| other.contains(x));
            }
            Ok((Value::Set(dedup(out)), m))
        })),
        mk("difference", BuiltinKind::VariadicNonempty(|_c, m, a| {
            let mut out = items_of(&a[0])?.to_vec();
            for v in &a[1..] {
                let other = items_of(v)?;
                out.retain(|x| !other.contains(x));
            }
            Ok((Value::Set(dedup(out)), m))
        })),
    ]
}
