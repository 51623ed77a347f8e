//! `where` predicate builders and `all-of`/`any-of`/`none-of` combinators
//! over rows.

use ptc_analyzer::{CombinatorTag, FieldPath, FieldStep, WhereOp};

use crate::error::EvalError;
use crate::eval::{apply_value, EvalCtx};
use crate::memory::Memory;
use crate::value::{lookup_key, Value};

/// A callable predicate value: either a `where`-built field test or a
/// combinator over other predicate-like callables.
pub enum PredicateValue {
    /// `(where field)` or `(where field op rhs)`.
    Where {
        /// The field path to fetch from the row.
        field: FieldPath,
        /// Which test to apply.
        op: WhereOp,
        /// The already-evaluated right-hand side, if any.
        rhs: Option<Value>,
    },
    /// `all-of`/`any-of`/`none-of` over already-evaluated sub-predicates.
    Combinator {
        /// Which combinator this is.
        tag: CombinatorTag,
        /// The sub-predicates, each callable with one row argument.
        subs: Vec<Value>,
    },
}

/// Applies a predicate value to one row, returning its boolean result
/// and the memory threaded through any combinator sub-calls.
pub fn call_predicate(ctx: &EvalCtx, pred: &PredicateValue, row: &Value, memory: Memory) -> Result<(Value, Memory), EvalError> {
    match pred {
        PredicateValue::Where { field, op, rhs } => {
            let found = fetch_field(row, field);
            let result = eval_where(*op, found, rhs.as_ref());
            Ok((Value::Bool(result), memory))
        }
        PredicateValue::Combinator { tag, subs } => call_combinator(ctx, *tag, subs, row, memory),
    }
}

fn call_combinator(
    ctx: &EvalCtx,
    tag: CombinatorTag,
    subs: &[Value],
    row: &Value,
    mut memory: Memory,
) -> Result<(Value, Memory), EvalError> {
    match tag {
        CombinatorTag::AllOf if subs.is_empty() => Ok((Value::Bool(true), memory)),
        CombinatorTag::AnyOf if subs.is_empty() => Ok((Value::Bool(false), memory)),
        CombinatorTag::NoneOf if subs.is_empty() => Ok((Value::Bool(true), memory)),
        CombinatorTag::AllOf => {
            for sub in subs {
                let (v, m) = apply_value(ctx, sub, vec![row.clone()], memory)?;
                memory = m;
                if !v.is_truthy() {
                    return Ok((Value::Bool(false), memory));
                }
            }
            Ok((Value::Bool(true), memory))
        }
        CombinatorTag::AnyOf => {
            for sub in subs {
                let (v, m) = apply_value(ctx, sub, vec![row.clone()], memory)?;
                memory = m;
                if v.is_truthy() {
                    return Ok((Value::Bool(true), memory));
                }
            }
            Ok((Value::Bool(false), memory))
        }
        CombinatorTag::NoneOf => {
            for sub in subs {
                let (v, m) = apply_value(ctx, sub, vec![row.clone()], memory)?;
                memory = m;
                if v.is_truthy() {
                    return Ok((Value::Bool(false), memory));
                }
            }
            Ok((Value::Bool(true), memory))
        }
    }
}

/// Fetches a field path's value from a row using atom-before-string
/// precedence at every step; missing at any step yields `None`.
pub fn fetch_field(row: &Value, field: &FieldPath) -> Option<Value> {
    let mut cur = row.clone();
    for step in field {
        let pairs = match &cur {
            Value::Map(pairs) => pairs,
            _ => return None,
        };
        let key = match step {
            FieldStep::Keyword(k) => Value::Keyword(k.clone()),
            FieldStep::Str(s) => Value::Str(s.clone()),
            FieldStep::Int(n) => Value::Int(*n),
        };
        cur = lookup_key(pairs, &key)?;
    }
    Some(cur)
}

fn eval_where(op: WhereOp, found: Option<Value>, rhs: Option<&Value>) -> bool {
    match op {
        WhereOp::Truthy => found.map(|v| v.is_truthy()).unwrap_or(false),
        WhereOp::Eq => match (&found, rhs) {
            (None, _) => false,
            (Some(Value::Nil), Some(Value::Nil)) => true,
            (Some(v), Some(r)) => v == r,
            (Some(_), None) => false,
        },
        WhereOp::Ne => !eval_where(WhereOp::Eq, found, rhs),
        WhereOp::Lt | WhereOp::Gt | WhereOp::Lte | WhereOp::Gte => {
            let (Some(l), Some(r)) = (found.as_ref(), rhs) else {
                return false;
            };
            let (Some(lf), Some(rf)) = (l.as_f64(), r.as_f64()) else {
                return false;
            };
            match op {
                WhereOp::Lt => lf < rf,
                WhereOp::Gt => lf > rf,
                WhereOp::Lte => lf <= rf,
                WhereOp::Gte => lf >= rf,
                _ => unreachable!(),
            }
        }
        WhereOp::In => {
            let (Some(l), Some(r)) = (found, rhs) else {
                return false;
            };
            match r {
                Value::Vector(xs) | Value::Set(xs) => xs.contains(&l),
                _ => false,
            }
        }
        WhereOp::Includes => {
            let (Some(l), Some(r)) = (found, rhs) else {
                return false;
            };
            match l {
                Value::Str(s) => match r {
                    Value::Str(needle) => s.contains(needle.as_str()),
                    _ => false,
                },
                Value::Vector(xs) | Value::Set(xs) => xs.contains(r),
                _ => false,
            }
        }
    }
}
