//! The process-wide built-in function table.
//!
//! Built once behind a [`std::sync::OnceLock`] and never mutated —
//! the only global state the runtime carries.

mod aggregations;
mod arithmetic;
mod collections;
mod sets;
mod strings;

use std::sync::Arc;
use std::sync::OnceLock;

use crate::env::Env;
use crate::value::{Builtin, BuiltinKind, Value};

fn mk(name: &'static str, kind: BuiltinKind) -> (String, Value) {
    (name.to_string(), Value::Builtin(Arc::new(Builtin { name, kind })))
}

/// Returns the shared root environment: an immutable frame seeded with
/// every built-in, with no parent. Every run starts a fresh `let`/`fn`
/// chain from a clone of this handle.
pub fn root_env() -> Env {
    static ROOT: OnceLock<Env> = OnceLock::new();
    ROOT.get_or_init(build_root).clone()
}

fn build_root() -> Env {
    let mut bindings = Vec::new();
    bindings.extend(arithmetic::builtins());
    bindings.extend(collections::builtins());
    bindings.extend(aggregations::builtins());
    bindings.extend(strings::builtins());
    bindings.extend(sets::builtins());
    bindings.extend(terminal_builtins());
    Env::empty().bind_many(bindings)
}

fn terminal_builtins() -> Vec<(String, Value)> {
    vec![
        mk("return", BuiltinKind::Normal(1, |_ctx, memory, args| {
            Ok((Value::Return(Box::new(args[0].clone())), memory))
        })),
        mk("fail", BuiltinKind::Normal(1, |_ctx, memory, args| {
            Ok((Value::Fail(Box::new(args[0].clone())), memory))
        })),
        mk("println", BuiltinKind::Variadic(Value::Nil, |ctx, memory, args| {
            let line = args
                .iter()
                .map(display_value)
                .collect::<Vec<_>>()
                .join(" ");
            ctx.prints.borrow_mut().push(line);
            Ok((Value::Nil, memory))
        })),
    ]
}

/// Renders a value the way `println`/error messages show it: compact,
/// not round-trippable PTC-Lisp source.
pub(crate) fn display_value(v: &Value) -> String {
    match v {
        Value::Nil => "nil".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Int(n) => n.to_string(),
        Value::Float(n) => n.to_string(),
        Value::Str(s) => s.clone(),
        Value::Keyword(k) => format!(":{k}"),
        Value::Vector(xs) => format!("[{}]", xs.iter().map(display_value).collect::<Vec<_>>().join(" ")),
        Value::Set(xs) => format!("#{{{}}}", xs.iter().map(display_value).collect::<Vec<_>>().join(" ")),
        Value::Map(pairs) => format!(
            "{{{}}}",
            pairs
                .iter()
                .map(|(k, v)| format!("{} {}", display_value(k), display_value(v)))
                .collect::<Vec<_>>()
                .join(" ")
        ),
        Value::Closure(_) | Value::Builtin(_) | Value::Predicate(_) => "#<fn>".to_string(),
        Value::Return(v) => format!("#<return {}>", display_value(v)),
        Value::Fail(v) => format!("#<fail {}>", display_value(v)),
    }
}
