//! Destructuring at binding time: patterns introduced by `let`/`fn`
//! params against an already-evaluated value.

use ptc_analyzer::{Destructure, Pattern};

use crate::env::Env;
use crate::error::EvalError;
use crate::eval::{eval_ast, EvalCtx};
use crate::memory::Memory;
use crate::value::{lookup_key, Value};

/// Binds `pattern` against `value`, extending `env` with every name
/// the pattern introduces. Returns the extended environment and the
/// memory threaded through any `:or` default-expression evaluation.
pub fn bind_pattern(
    ctx: &EvalCtx,
    env: &Env,
    pattern: &Pattern,
    value: &Value,
    memory: Memory,
) -> Result<(Env, Memory), EvalError> {
    match pattern {
        Pattern::Var(name) => Ok((env.bind(name.clone(), value.clone()), memory)),
        Pattern::Destructure(shape) => bind_destructure(ctx, env, shape, value, memory),
    }
}

fn bind_destructure(
    ctx: &EvalCtx,
    env: &Env,
    shape: &Destructure,
    value: &Value,
    memory: Memory,
) -> Result<(Env, Memory), EvalError> {
    match shape {
        Destructure::Seq(patterns) => bind_seq(ctx, env, patterns, value, memory),
        Destructure::Keys { names, defaults } => {
            let pairs = as_map_pairs(value)?;
            bind_keys(ctx, env, names, &[], defaults, pairs, memory)
        }
        Destructure::Map { keys, renames, defaults } => {
            let pairs = as_map_pairs(value)?;
            bind_keys(ctx, env, keys, renames, defaults, pairs, memory)
        }
        Destructure::As(alias, inner) => {
            let env = env.bind(alias.clone(), value.clone());
            bind_pattern(ctx, &env, inner, value, memory)
        }
    }
}

fn bind_seq(
    ctx: &EvalCtx,
    env: &Env,
    patterns: &[Pattern],
    value: &Value,
    mut memory: Memory,
) -> Result<(Env, Memory), EvalError> {
    let Some(seq) = value.as_seq() else {
        return Err(EvalError::DestructureError(format!(
            "expected a sequential value to destructure, got {}",
            value.type_name()
        )));
    };
    if patterns.len() > seq.len() {
        return Err(EvalError::DestructureError(format!(
            "pattern expects {} element(s), value has only {}",
            patterns.len(),
            seq.len()
        )));
    }
    let mut env = env.clone();
    for (pat, elem) in patterns.iter().zip(seq.iter()) {
        let (new_env, new_memory) = bind_pattern(ctx, &env, pat, elem, memory)?;
        env = new_env;
        memory = new_memory;
    }
    Ok((env, memory))
}

#[allow(clippy::too_many_arguments)]
fn bind_keys(
    ctx: &EvalCtx,
    env: &Env,
    keys: &[String],
    renames: &[(String, String)],
    defaults: &[(String, ptc_analyzer::Ast)],
    pairs: &[(Value, Value)],
    mut memory: Memory,
) -> Result<(Env, Memory), EvalError> {
    let mut env = env.clone();

    let mut entries: Vec<(String, String)> = keys.iter().map(|k| (k.clone(), k.clone())).collect();
    entries.extend(renames.iter().cloned());

    for (local_name, source_kw) in entries {
        let found = lookup_key(pairs, &Value::Keyword(source_kw));
        let bound = match found {
            Some(v) => v,
            None => match defaults.iter().find(|(n, _)| *n == local_name) {
                Some((_, default_expr)) => {
                    let (v, new_memory) = eval_ast(ctx, default_expr, memory, &env)?;
                    memory = new_memory;
                    v
                }
                None => Value::Nil,
            },
        };
        env = env.bind(local_name, bound);
    }

    Ok((env, memory))
}

fn as_map_pairs(value: &Value) -> Result<&[(Value, Value)], EvalError> {
    match value {
        Value::Map(pairs) => Ok(pairs),
        other => Err(EvalError::DestructureError(format!(
            "expected a map to destructure, got {}",
            other.type_name()
        ))),
    }
}
