//! Row-aggregation built-ins operating on a field key (keyword, string,
//! or function) over a sequence of map-shaped rows.

use crate::error::EvalError;
use crate::eval::apply_value;
use crate::memory::Memory;
use crate::value::{lookup_key, BuiltinKind, Value};

use super::mk;

fn rows_of(v: &Value) -> Result<&[Value], EvalError> {
    match v {
        Value::Vector(xs) | Value::Set(xs) => Ok(xs),
        other => Err(EvalError::TypeError(format!("expected a collection of rows, got {}", other.type_name()))),
    }
}

/// Fetches `key` from `row` given a keyword, string, or function key,
/// threading memory through a function-key call.
fn fetch(ctx: &crate::eval::EvalCtx, key: &Value, row: &Value, memory: Memory) -> Result<(Value, Memory), EvalError> {
    match key {
        Value::Keyword(_) | Value::Str(_) => {
            let found = match row {
                Value::Map(pairs) => lookup_key(pairs, key),
                _ => None,
            };
            Ok((found.unwrap_or(Value::Nil), memory))
        }
        other if other.is_callable() => apply_value(ctx, key, vec![row.clone()], memory),
        other => Err(EvalError::TypeError(format!("expected a keyword, string, or function key, got {}", other.type_name()))),
    }
}

fn num(v: &Value) -> Result<f64, EvalError> {
    v.as_f64()
        .ok_or_else(|| EvalError::TypeError(format!("expected a number, got {}", v.type_name())))
}

/// All aggregation built-ins.
pub fn builtins() -> Vec<(String, Value)> {
    vec![
        mk("sum-by", BuiltinKind::Normal(2, sum_by)),
        mk("avg-by", BuiltinKind::Normal(2, avg_by)),
        mk("min-by", BuiltinKind::Normal(2, min_by)),
        mk("max-by", BuiltinKind::Normal(2, max_by)),
        mk("pluck", BuiltinKind::Normal(2, pluck)),
    ]
}

fn sum_by(ctx: &crate::eval::EvalCtx, mut memory: Memory, args: &[Value]) -> Result<(Value, Memory), EvalError> {
    let key = &args[0];
    let rows = rows_of(&args[1])?.to_vec();
    let mut total_int = 0i64;
    let mut total_float = 0.0f64;
    let mut saw_float = false;
    for row in rows {
        let (v, m) = fetch(ctx, key, &row, memory)?;
        memory = m;
        match v {
            Value::Int(n) => total_int = total_int.wrapping_add(n),
            other => {
                saw_float = true;
                total_float += num(&other)?;
            }
        }
    }
    let result = if saw_float {
        Value::Float(total_float + total_int as f64)
    } else {
        Value::Int(total_int)
    };
    Ok((result, memory))
}

fn avg_by(ctx: &crate::eval::EvalCtx, mut memory: Memory, args: &[Value]) -> Result<(Value, Memory), EvalError> {
    let key = &args[0];
    let rows = rows_of(&args[1])?.to_vec();
    if rows.is_empty() {
        return Ok((Value::Nil, memory));
    }
    let mut total = 0.0;
    let n = rows.len();
    for row in rows {
        let (v, m) = fetch(ctx, key, &row, memory)?;
        memory = m;
        total += num(&v)?;
    }
    Ok((Value::Float(total / n as f64), memory))
}

fn min_by(ctx: &crate::eval::EvalCtx, mut memory: Memory, args: &[Value]) -> Result<(Value, Memory), EvalError> {
    let key = &args[0];
    let rows = rows_of(&args[1])?.to_vec();
    let mut best: Option<(f64, Value)> = None;
    for row in rows {
        let (v, m) = fetch(ctx, key, &row, memory)?;
        memory = m;
        let n = num(&v)?;
        if best.as_ref().map(|(b, _)| n < *b).unwrap_or(true) {
            best = Some((n, row));
        }
    }
    Ok((best.map(|(_, row)| row).unwrap_or(Value::Nil), memory))
}

fn max_by(ctx: &crate::eval::EvalCtx, mut memory: Memory, args: &[Value]) -> Result<(Value, Memory), EvalError> {
    let key = &args[0];
    let rows = rows_of(&args[1])?.to_vec();
    let mut best: Option<(f64, Value)> = None;
    for row in rows {
        let (v, m) = fetch(ctx, key, &row, memory)?;
        memory = m;
        let n = num(&v)?;
        if best.as_ref().map(|(b, _)| n > *b).unwrap_or(true) {
            best = Some((n, row));
        }
    }
    Ok((best.map(|(_, row)| row).unwrap_or(Value::Nil), memory))
}

fn pluck(ctx: &crate::eval::EvalCtx, mut memory: Memory, args: &[Value]) -> Result<(Value, Memory), EvalError> {
    let key = &args[0];
    let rows = rows_of(&args[1])?.to_vec();
    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        let (v, m) = fetch(ctx, key, &row, memory)?;
        memory = m;
        out.push(v);
    }
    Ok((Value::Vector(out), memory))
}
