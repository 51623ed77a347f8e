//! Sequence and map built-ins: access, transform, and update operations.

use std::cmp::Ordering;

use crate::error::EvalError;
use crate::eval::apply_value;
use crate::memory::Memory;
use crate::value::{assoc_key, compare_values, lookup_key, merge_pairs, BuiltinKind, Value};

use super::mk;

fn seq_items(v: &Value) -> Result<Vec<Value>, EvalError> {
    match v {
        Value::Vector(xs) | Value::Set(xs) => Ok(xs.clone()),
        other => Err(EvalError::TypeError(format!("expected a collection, got {}", other.type_name()))),
    }
}

fn wrap_like(original: &Value, items: Vec<Value>) -> Value {
    match original {
        Value::Set(_) => Value::Set(items),
        _ => Value::Vector(items),
    }
}

fn pairs_of(v: &Value) -> Result<&[(Value, Value)], EvalError> {
    match v {
        Value::Map(pairs) => Ok(pairs),
        other => Err(EvalError::TypeError(format!("expected a map, got {}", other.type_name()))),
    }
}

fn as_index(v: &Value) -> Result<usize, EvalError> {
    match v {
        Value::Int(n) if *n >= 0 => Ok(*n as usize),
        other => Err(EvalError::TypeError(format!("expected a non-negative index, got {}", other.type_name()))),
    }
}

/// All sequence/map built-ins.
pub fn builtins() -> Vec<(String, Value)> {
    vec![
        mk("count", BuiltinKind::Normal(1, |_c, m, a| {
            let n = match &a[0] {
                Value::Vector(xs) | Value::Set(xs) => xs.len(),
                Value::Map(pairs) => pairs.len(),
                Value::Str(s) => s.chars().count(),
                Value::Nil => 0,
                other => return Err(EvalError::TypeError(format!("count: not countable: {}", other.type_name()))),
            };
            Ok((Value::Int(n as i64), m))
        })),
        mk("first", BuiltinKind::Normal(1, |_c, m, a| {
            let items = seq_items(&a[0])?;
            Ok((items.first().cloned().unwrap_or(Value::Nil), m))
        })),
        mk("second", BuiltinKind::Normal(1, |_c, m, a| {
            let items = seq_items(&a[0])?;
            Ok((items.get(1).cloned().unwrap_or(Value::Nil), m))
        })),
        mk("last", BuiltinKind::Normal(1, |_c, m, a| {
            let items = seq_items(&a[0])?;
            Ok((items.last().cloned().unwrap_or(Value::Nil), m))
        })),
        mk("rest", BuiltinKind::Normal(1, |_c, m, a| {
            let items = seq_items(&a[0])?;
            let rest = if items.is_empty() { vec![] } else { items[1..].to_vec() };
            Ok((wrap_like(&a[0], rest), m))
        })),
        mk("next", BuiltinKind::Normal(1, |_c, m, a| {
            let items = seq_items(&a[0])?;
            if items.len() <= 1 {
                Ok((Value::Nil, m))
            } else {
                Ok((wrap_like(&a[0], items[1..].to_vec()), m))
            }
        })),
        mk("take", BuiltinKind::Normal(2, |_c, m, a| {
            let n = as_index(&a[0])?;
            let items = seq_items(&a[1])?;
            Ok((wrap_like(&a[1], items.into_iter().take(n).collect()), m))
        })),
        mk("drop", BuiltinKind::Normal(2, |_c, m, a| {
            let n = as_index(&a[0])?;
            let items = seq_items(&a[1])?;
            Ok((wrap_like(&a[1], items.into_iter().skip(n).collect()), m))
        })),
        mk("take-last", BuiltinKind::Normal(2, |_c, m, a| {
            let n = as_index(&a[0])?;
            let items = seq_items(&a[1])?;
            let start = items.len().saturating_sub(n);
            Ok((wrap_like(&a[1], items[start..].to_vec()), m))
        })),
        mk("drop-last", BuiltinKind::Normal(2, |_c, m, a| {
            let n = as_index(&a[0])?;
            let items = seq_items(&a[1])?;
            let end = items.len().saturating_sub(n);
            Ok((wrap_like(&a[1], items[..end].to_vec()), m))
        })),
        mk("butlast", BuiltinKind::Normal(1, |_c, m, a| {
            let items = seq_items(&a[0])?;
            let end = items.len().saturating_sub(1);
            Ok((wrap_like(&a[0], items[..end].to_vec()), m))
        })),
        mk("nth", BuiltinKind::MultiArity(&[(2, nth2), (3, nth3)])),
        mk("distinct", BuiltinKind::Normal(1, |_c, m, a| {
            let items = seq_items(&a[0])?;
            let mut out: Vec<Value> = Vec::new();
            for v in items {
                if !out.contains(&v) {
                    out.push(v);
                }
            }
            Ok((wrap_like(&a[0], out), m))
        })),
        mk("reverse", BuiltinKind::Normal(1, |_c, m, a| {
            let mut items = seq_items(&a[0])?;
            items.reverse();
            Ok((wrap_like(&a[0], items), m))
        })),
        mk("sort", BuiltinKind::MultiArity(&[(1, sort1), (2, sort2)])),
        mk("sort-by", BuiltinKind::MultiArity(&[(2, sort_by2), (3, sort_by3)])),
        mk("filter", BuiltinKind::Normal(2, filter_fn)),
        mk("remove", BuiltinKind::Normal(2, remove_fn)),
        mk("map", BuiltinKind::Normal(2, map_fn)),
        mk("mapv", BuiltinKind::Normal(2, map_fn)),
        mk("reduce", BuiltinKind::MultiArity(&[(2, reduce2), (3, reduce3)])),
        mk("group-by", BuiltinKind::Normal(2, group_by_fn)),
        mk("frequencies", BuiltinKind::Normal(1, |_c, m, a| {
            let items = seq_items(&a[0])?;
            let mut out: Vec<(Value, Value)> = Vec::new();
            for v in items {
                let n = lookup_key(&out, &v).and_then(|c| c.as_f64()).unwrap_or(0.0) as i64;
                out = assoc_key(&out, v, Value::Int(n + 1));
            }
            Ok((Value::Map(out), m))
        })),
        mk("take-while", BuiltinKind::Normal(2, take_while_fn)),
        mk("drop-while", BuiltinKind::Normal(2, drop_while_fn)),
        mk("range", BuiltinKind::MultiArity(&[(1, range1), (2, range2), (3, range3)])),
        mk("into", BuiltinKind::Normal(2, |_c, m, a| {
            let items = seq_items(&a[1])?;
            Ok((wrap_like(&a[0], items), m))
        })),
        mk("empty?", BuiltinKind::Normal(1, |_c, m, a| {
            let n = match &a[0] {
                Value::Vector(xs) | Value::Set(xs) => xs.len(),
                Value::Map(pairs) => pairs.len(),
                Value::Str(s) => s.len(),
                Value::Nil => 0,
                other => return Err(EvalError::TypeError(format!("empty?: not a collection: {}", other.type_name()))),
            };
            Ok((Value::Bool(n == 0), m))
        })),
        mk("not-empty", BuiltinKind::Normal(1, |_c, m, a| {
            let n = match &a[0] {
                Value::Vector(xs) | Value::Set(xs) => xs.len(),
                Value::Map(pairs) => pairs.len(),
                _ => 0,
            };
            Ok((if n == 0 { Value::Bool(false) } else { a[0].clone() }, m))
        })),
        mk("contains?", BuiltinKind::Normal(2, |_c, m, a| {
            let found = match &a[0] {
                Value::Map(pairs) => lookup_key(pairs, &a[1]).is_some(),
                Value::Vector(xs) | Value::Set(xs) => xs.contains(&a[1]),
                _ => false,
            };
            Ok((Value::Bool(found), m))
        })),
        mk("get", BuiltinKind::MultiArity(&[(2, get2), (3, get3)])),
        mk("get-in", BuiltinKind::MultiArity(&[(2, get_in2), (3, get_in3)])),
        mk("assoc", BuiltinKind::Normal(3, |_c, m, a| {
            let pairs = pairs_of(&a[0])?;
            Ok((Value::Map(assoc_key(pairs, a[1].clone(), a[2].clone())), m))
        })),
        mk("assoc-in", BuiltinKind::Normal(3, |_c, m, a| {
            let path = seq_items(&a[1])?;
            Ok((assoc_in(&a[0], &path, a[2].clone())?, m))
        })),
        mk("update", BuiltinKind::Normal(3, update_fn)),
        mk("update-in", BuiltinKind::Normal(3, update_in_fn)),
        mk("update-vals", BuiltinKind::Normal(2, update_vals_fn)),
        mk("merge", BuiltinKind::VariadicNonempty(|_c, m, a| {
            let mut out = pairs_of(&a[0])?.to_vec();
            for v in &a[1..] {
                out = merge_pairs(&out, pairs_of(v)?);
            }
            Ok((Value::Map(out), m))
        })),
        mk("keys", BuiltinKind::Normal(1, |_c, m, a| {
            let pairs = pairs_of(&a[0])?;
            Ok((Value::Vector(pairs.iter().map(|(k, _)| k.clone()).collect()), m))
        })),
        mk("vals", BuiltinKind::Normal(1, |_c, m, a| {
            let pairs = pairs_of(&a[0])?;
            Ok((Value::Vector(pairs.iter().map(|(_, v)| v.clone()).collect()), m))
        })),
        mk("entries", BuiltinKind::Normal(1, |_c, m, a| {
            let pairs = pairs_of(&a[0])?;
            Ok((
                Value::Vector(pairs.iter().map(|(k, v)| Value::Vector(vec![k.clone(), v.clone()])).collect()),
                m,
            ))
        })),
    ]
}

fn nth2(_ctx: &crate::eval::EvalCtx, memory: Memory, args: &[Value]) -> Result<(Value, Memory), EvalError> {
    let items = seq_items(&args[0])?;
    let i = as_index(&args[1])?;
    items
        .get(i)
        .cloned()
        .map(|v| (v, memory.clone()))
        .ok_or_else(|| EvalError::TypeError(format!("nth: index {i} out of bounds")))
}

fn nth3(_ctx: &crate::eval::EvalCtx, memory: Memory, args: &[Value]) -> Result<(Value, Memory), EvalError> {
    let items = seq_items(&args[0])?;
    let i = as_index(&args[1])?;
    Ok((items.get(i).cloned().unwrap_or_else(|| args[2].clone()), memory))
}

fn sort1(_ctx: &crate::eval::EvalCtx, memory: Memory, args: &[Value]) -> Result<(Value, Memory), EvalError> {
    let mut items = seq_items(&args[0])?;
    items.sort_by(compare_values);
    Ok((wrap_like(&args[0], items), memory))
}

fn sort2(ctx: &crate::eval::EvalCtx, memory: Memory, args: &[Value]) -> Result<(Value, Memory), EvalError> {
    let cmp_fn = &args[0];
    let items = seq_items(&args[1])?;
    sorted_by_comparator(ctx, cmp_fn, items, &args[1], memory)
}

fn sorted_by_comparator(
    ctx: &crate::eval::EvalCtx,
    cmp_fn: &Value,
    items: Vec<Value>,
    original: &Value,
    memory: Memory,
) -> Result<(Value, Memory), EvalError> {
    let mut err = None;
    let mut memory = memory;
    let mut out = items;
    out.sort_by(|x, y| {
        if err.is_some() {
            return Ordering::Equal;
        }
        match apply_value(ctx, cmp_fn, vec![x.clone(), y.clone()], memory.clone()) {
            Ok((v, m)) => {
                memory = m;
                match v {
                    Value::Bool(true) => Ordering::Less,
                    Value::Bool(false) => Ordering::Greater,
                    other => {
                        let n = other.as_f64().unwrap_or(0.0);
                        n.partial_cmp(&0.0).unwrap_or(Ordering::Equal)
                    }
                }
            }
            Err(e) => {
                err = Some(e);
                Ordering::Equal
            }
        }
    });
    if let Some(e) = err {
        return Err(e);
    }
    Ok((wrap_like(original, out), memory))
}

fn sort_by2(ctx: &crate::eval::EvalCtx, mut memory: Memory, args: &[Value]) -> Result<(Value, Memory), EvalError> {
    let key_fn = &args[0];
    let items = seq_items(&args[1])?;
    let mut keyed = Vec::with_capacity(items.len());
    for item in items {
        let (k, m) = apply_value(ctx, key_fn, vec![item.clone()], memory)?;
        memory = m;
        keyed.push((k, item));
    }
    keyed.sort_by(|(k1, _), (k2, _)| compare_values(k1, k2));
    Ok((wrap_like(&args[1], keyed.into_iter().map(|(_, v)| v).collect()), memory))
}

fn sort_by3(ctx: &crate::eval::EvalCtx, mut memory: Memory, args: &[Value]) -> Result<(Value, Memory), EvalError> {
    let key_fn = &args[0];
    let cmp_fn = &args[1];
    let items = seq_items(&args[2])?;
    let mut keyed = Vec::with_capacity(items.len());
    for item in items {
        let (k, m) = apply_value(ctx, key_fn, vec![item.clone()], memory)?;
        memory = m;
        keyed.push((k, item));
    }
    let mut err = None;
    keyed.sort_by(|(k1, _), (k2, _)| {
        if err.is_some() {
            return Ordering::Equal;
        }
        match apply_value(ctx, cmp_fn, vec![k1.clone(), k2.clone()], memory.clone()) {
            Ok((Value::Bool(true), m)) => {
                memory = m;
                Ordering::Less
            }
            Ok((Value::Bool(false), m)) => {
                memory = m;
                Ordering::Greater
            }
            Ok((other, m)) => {
                memory = m;
                other.as_f64().unwrap_or(0.0).partial_cmp(&0.0).unwrap_or(Ordering::Equal)
            }
            Err(e) => {
                err = Some(e);
                Ordering::Equal
            }
        }
    });
    if let Some(e) = err {
        return Err(e);
    }
    Ok((wrap_like(&args[2], keyed.into_iter().map(|(_, v)| v).collect()), memory))
}

fn filter_fn(ctx: &crate::eval::EvalCtx, mut memory: Memory, args: &[Value]) -> Result<(Value, Memory), EvalError> {
    let pred = &args[0];
    let items = seq_items(&args[1])?;
    let mut out = Vec::new();
    for item in items {
        let (v, m) = apply_value(ctx, pred, vec![item.clone()], memory)?;
        memory = m;
        if v.is_truthy() {
            out.push(item);
        }
    }
    Ok((wrap_like(&args[1], out), memory))
}

fn remove_fn(ctx: &crate::eval::EvalCtx, mut memory: Memory, args: &[Value]) -> Result<(Value, Memory), EvalError> {
    let pred = &args[0];
    let items = seq_items(&args[1])?;
    let mut out = Vec::new();
    for item in items {
        let (v, m) = apply_value(ctx, pred, vec![item.clone()], memory)?;
        memory = m;
        if !v.is_truthy() {
            out.push(item);
        }
    }
    Ok((wrap_like(&args[1], out), memory))
}

fn map_fn(ctx: &crate::eval::EvalCtx, mut memory: Memory, args: &[Value]) -> Result<(Value, Memory), EvalError> {
    let f = &args[0];
    let items = seq_items(&args[1])?;
    let mut out = Vec::with_capacity(items.len());
    for item in items {
        let (v, m) = apply_value(ctx, f, vec![item], memory)?;
        memory = m;
        out.push(v);
    }
    Ok((Value::Vector(out), memory))
}

fn reduce2(ctx: &crate::eval::EvalCtx, mut memory: Memory, args: &[Value]) -> Result<(Value, Memory), EvalError> {
    let f = &args[0];
    let items = seq_items(&args[1])?;
    let mut it = items.into_iter();
    let mut acc = match it.next() {
        Some(v) => v,
        None => return Ok((Value::Nil, memory)),
    };
    for item in it {
        let (v, m) = apply_value(ctx, f, vec![acc, item], memory)?;
        memory = m;
        acc = v;
    }
    Ok((acc, memory))
}

fn reduce3(ctx: &crate::eval::EvalCtx, mut memory: Memory, args: &[Value]) -> Result<(Value, Memory), EvalError> {
    let f = &args[0];
    let mut acc = args[1].clone();
    let items = seq_items(&args[2])?;
    for item in items {
        let (v, m) = apply_value(ctx, f, vec![acc, item], memory)?;
        memory = m;
        acc = v;
    }
    Ok((acc, memory))
}

fn group_by_fn(ctx: &crate::eval::EvalCtx, mut memory: Memory, args: &[Value]) -> Result<(Value, Memory), EvalError> {
    let f = &args[0];
    let items = seq_items(&args[1])?;
    let mut out: Vec<(Value, Value)> = Vec::new();
    for item in items {
        let (key, m) = apply_value(ctx, f, vec![item.clone()], memory)?;
        memory = m;
        let bucket = lookup_key(&out, &key);
        let mut xs = match bucket {
            Some(Value::Vector(xs)) => xs,
            _ => Vec::new(),
        };
        xs.push(item);
        out = assoc_key(&out, key, Value::Vector(xs));
    }
    Ok((Value::Map(out), memory))
}

fn take_while_fn(ctx: &crate::eval::EvalCtx, mut memory: Memory, args: &[Value]) -> Result<(Value, Memory), EvalError> {
    let pred = &args[0];
    let items = seq_items(&args[1])?;
    let mut out = Vec::new();
    for item in items {
        let (v, m) = apply_value(ctx, pred, vec![item.clone()], memory)?;
        memory = m;
        if !v.is_truthy() {
            break;
        }
        out.push(item);
    }
    Ok((wrap_like(&args[1], out), memory))
}

fn drop_while_fn(ctx: &crate::eval::EvalCtx, mut memory: Memory, args: &[Value]) -> Result<(Value, Memory), EvalError> {
    let pred = &args[0];
    let items = seq_items(&args[1])?;
    let mut out = Vec::new();
    let mut dropping = true;
    for item in items {
        if dropping {
            let (v, m) = apply_value(ctx, pred, vec![item.clone()], memory)?;
            memory = m;
            if v.is_truthy() {
                continue;
            }
            dropping = false;
        }
        out.push(item);
    }
    Ok((wrap_like(&args[1], out), memory))
}

fn range1(_ctx: &crate::eval::EvalCtx, memory: Memory, args: &[Value]) -> Result<(Value, Memory), EvalError> {
    let end = as_index(&args[0])? as i64;
    Ok((Value::Vector((0..end).map(Value::Int).collect()), memory))
}

fn range2(_ctx: &crate::eval::EvalCtx, memory: Memory, args: &[Value]) -> Result<(Value, Memory), EvalError> {
    let start = match &args[0] {
        Value::Int(n) => *n,
        other => return Err(EvalError::TypeError(format!("range: expected integer, got {}", other.type_name()))),
    };
    let end = match &args[1] {
        Value::Int(n) => *n,
        other => return Err(EvalError::TypeError(format!("range: expected integer, got {}", other.type_name()))),
    };
    Ok((Value::Vector((start..end).map(Value::Int).collect()), memory))
}

fn range3(_ctx: &crate::eval::EvalCtx, memory: Memory, args: &[Value]) -> Result<(Value, Memory), EvalError> {
    let (start, end, step) = match (&args[0], &args[1], &args[2]) {
        (Value::Int(a), Value::Int(b), Value::Int(c)) => (*a, *b, *c),
        _ => return Err(EvalError::TypeError("range: expected integer bounds and step".to_string())),
    };
    if step == 0 {
        return Err(EvalError::TypeError("range: step must not be zero".to_string()));
    }
    let mut out = Vec::new();
    let mut cur = start;
    if step > 0 {
        while cur < end {
            out.push(Value::Int(cur));
            cur += step;
        }
    } else {
        while cur > end {
            out.push(Value::Int(cur));
            cur += step;
        }
    }
    Ok((Value::Vector(out), memory))
}

fn get2(_ctx: &crate::eval::EvalCtx, memory: Memory, args: &[Value]) -> Result<(Value, Memory), EvalError> {
    let found = match &args[0] {
        Value::Map(pairs) => lookup_key(pairs, &args[1]),
        Value::Vector(xs) => as_index(&args[1]).ok().and_then(|i| xs.get(i).cloned()),
        _ => None,
    };
    Ok((found.unwrap_or(Value::Nil), memory))
}

fn get3(_ctx: &crate::eval::EvalCtx, memory: Memory, args: &[Value]) -> Result<(Value, Memory), EvalError> {
    let found = match &args[0] {
        Value::Map(pairs) => lookup_key(pairs, &args[1]),
        Value::Vector(xs) => as_index(&args[1]).ok().and_then(|i| xs.get(i).cloned()),
        _ => None,
    };
    Ok((found.unwrap_or_else(|| args[2].clone()), memory))
}

fn get_path(root: &Value, path: &[Value]) -> Option<Value> {
    let mut cur = root.clone();
    for step in path {
        cur = match &cur {
            Value::Map(pairs) => lookup_key(pairs, step)?,
            Value::Vector(xs) => {
                let i = as_index(step).ok()?;
                xs.get(i).cloned()?
            }
            _ => return None,
        };
    }
    Some(cur)
}

fn get_in2(_ctx: &crate::eval::EvalCtx, memory: Memory, args: &[Value]) -> Result<(Value, Memory), EvalError> {
    let path = seq_items(&args[1])?;
    Ok((get_path(&args[0], &path).unwrap_or(Value::Nil), memory))
}

fn get_in3(_ctx: &crate::eval::EvalCtx, memory: Memory, args: &[Value]) -> Result<(Value, Memory), EvalError> {
    let path = seq_items(&args[1])?;
    Ok((get_path(&args[0], &path).unwrap_or_else(|| args[2].clone()), memory))
}

fn assoc_in(root: &Value, path: &[Value], value: Value) -> Result<Value, EvalError> {
    if path.is_empty() {
        return Ok(value);
    }
    let (key, rest) = (&path[0], &path[1..]);
    let pairs = match root {
        Value::Map(pairs) => pairs.clone(),
        Value::Nil => Vec::new(),
        other => return Err(EvalError::TypeError(format!("assoc-in: expected a map, got {}", other.type_name()))),
    };
    let existing = lookup_key(&pairs, key).unwrap_or(Value::Nil);
    let updated = assoc_in(&existing, rest, value)?;
    Ok(Value::Map(assoc_key(&pairs, key.clone(), updated)))
}

fn update_fn(ctx: &crate::eval::EvalCtx, memory: Memory, args: &[Value]) -> Result<(Value, Memory), EvalError> {
    let pairs = pairs_of(&args[0])?;
    let key = &args[1];
    let f = &args[2];
    let current = lookup_key(pairs, key).unwrap_or(Value::Nil);
    let (updated, memory) = apply_value(ctx, f, vec![current], memory)?;
    Ok((Value::Map(assoc_key(pairs, key.clone(), updated)), memory))
}

fn update_in_fn(ctx: &crate::eval::EvalCtx, memory: Memory, args: &[Value]) -> Result<(Value, Memory), EvalError> {
    let path = seq_items(&args[1])?;
    let f = &args[2];
    let current = get_path(&args[0], &path).unwrap_or(Value::Nil);
    let (updated, memory) = apply_value(ctx, f, vec![current], memory)?;
    Ok((assoc_in(&args[0], &path, updated)?, memory))
}

fn update_vals_fn(ctx: &crate::eval::EvalCtx, mut memory: Memory, args: &[Value]) -> Result<(Value, Memory), EvalError> {
    let pairs = pairs_of(&args[0])?.to_vec();
    let f = &args[1];
    let mut out = Vec::with_capacity(pairs.len());
    for (k, v) in pairs {
        let (updated, m) = apply_value(ctx, f, vec![v], memory)?;
        memory = m;
        out.push((k, updated));
    }
    Ok((Value::Map(out), memory))
}
