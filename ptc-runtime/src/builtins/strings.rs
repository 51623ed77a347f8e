//! String built-ins.

use crate::error::EvalError;
use crate::memory::Memory;
use crate::value::{BuiltinKind, Value};

use super::{display_value, mk};

fn as_str(v: &Value) -> Result<&str, EvalError> {
    match v {
        Value::Str(s) => Ok(s.as_str()),
        other => Err(EvalError::TypeError(format!("expected a string, got {}", other.type_name()))),
    }
}

fn as_int(v: &Value) -> Result<i64, EvalError> {
    match v {
        Value::Int(n) => Ok(*n),
        other => Err(EvalError::TypeError(format!("expected an integer, got {}", other.type_name()))),
    }
}

/// All string built-ins.
pub fn builtins() -> Vec<(String, Value)> {
    vec![
        mk("str", BuiltinKind::Variadic(Value::Str(String::new()), |_c, m, a| {
            let joined = a.iter().map(display_value).collect::<Vec<_>>().join("");
            Ok((Value::Str(joined), m))
        })),
        mk("subs", BuiltinKind::MultiArity(&[(2, subs2), (3, subs3)])),
        mk(
            "join",
            BuiltinKind::Normal(2, |_c, m, a| {
                let sep = as_str(&a[0])?;
                let items = match &a[1] {
                    Value::Vector(xs) | Value::Set(xs) => xs.clone(),
                    other => return Err(EvalError::TypeError(format!("join: expected a collection, got {}", other.type_name()))),
                };
                let joined = items.iter().map(display_value).collect::<Vec<_>>().join(sep);
                Ok((Value::Str(joined), m))
            }),
        ),
        mk(
            "split",
            BuiltinKind::Normal(2, |_c, m, a| {
                let s = as_str(&a[0])?;
                let sep = as_str(&a[1])?;
                let parts = if sep.is_empty() {
                    s.chars().map(|c| Value::Str(c.to_string())).collect()
                } else {
                    s.split(sep).map(|p| Value::Str(p.to_string())).collect()
                };
                Ok((Value::Vector(parts), m))
            }),
        ),
        mk(
            "trim",
            BuiltinKind::Normal(1, |_c, m, a| Ok((Value::Str(as_str(&a[0])?.trim().to_string()), m))),
        ),
        mk(
            "replace",
            BuiltinKind::Normal(3, |_c, m, a| {
                let s = as_str(&a[0])?;
                let pat = as_str(&a[1])?;
                let rep = as_str(&a[2])?;
                Ok((Value::Str(s.replace(pat, rep)), m))
            }),
        ),
        mk(
            "upcase",
            BuiltinKind::Normal(1, |_c, m, a| Ok((Value::Str(as_str(&a[0])?.to_uppercase()), m))),
        ),
        mk(
            "downcase",
            BuiltinKind::Normal(1, |_c, m, a| Ok((Value::Str(as_str(&a[0])?.to_lowercase()), m))),
        ),
        mk(
            "starts-with?",
            BuiltinKind::Normal(2, |_c, m, a| Ok((Value::Bool(as_str(&a[0])?.starts_with(as_str(&a[1])?)), m))),
        ),
        mk(
            "ends-with?",
            BuiltinKind::Normal(2, |_c, m, a| Ok((Value::Bool(as_str(&a[0])?.ends_with(as_str(&a[1])?)), m))),
        ),
        mk(
            "includes?",
            BuiltinKind::Normal(2, |_c, m, a| Ok((Value::Bool(as_str(&a[0])?.contains(as_str(&a[1])?)), m))),
        ),
        mk(
            "parse-long",
            BuiltinKind::Normal(1, |_c, m, a| {
                let s = as_str(&a[0])?;
                Ok((s.trim().parse::<i64>().map(Value::Int).unwrap_or(Value::Nil), m))
            }),
        ),
        mk(
            "parse-double",
            BuiltinKind::Normal(1, |_c, m, a| {
                let s = as_str(&a[0])?;
                Ok((s.trim().parse::<f64>().map(Value::Float).unwrap_or(Value::Nil), m))
            }),
        ),
    ]
}

fn subs2(_ctx: &crate::eval::EvalCtx, memory: Memory, args: &[Value]) -> Result<(Value, Memory), EvalError> {
    let s = as_str(&args[0])?;
    let start = as_int(&args[1])? as usize;
    let chars: Vec<char> = s.chars().collect();
    if start > chars.len() {
        return Err(EvalError::TypeError(format!("subs: start index {start} out of bounds")));
    }
    Ok((Value::Str(chars[start..].iter().collect()), memory))
}

fn subs3(_ctx: &crate::eval::EvalCtx, memory: Memory, args: &[Value]) -> Result<(Value, Memory), EvalError> {
    let s = as_str(&args[0])?;
    let start = as_int(&args[1])? as usize;
    let end = as_int(&args[2])? as usize;
    let chars: Vec<char> = s.chars().collect();
    if start > end || end > chars.len() {
        return Err(EvalError::TypeError(format!("subs: invalid range {start}..{end}")));
    }
    Ok((Value::Str(chars[start..end].iter().collect()), memory))
}
