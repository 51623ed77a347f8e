//! The tree-walking evaluator (C4): `eval(ast, ctx, memory, env, tool_fn)`.

use std::cell::{Cell, RefCell};
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::Arc;

use ptc_analyzer::Ast;

use crate::env::Env;
use crate::error::EvalError;
use crate::memory::{Ctx, Memory};
use crate::pattern::bind_pattern;
use crate::predicate::{call_predicate, PredicateValue};
use crate::value::{Builtin, BuiltinKind, Closure, Value};

/// One recorded tool invocation, kept in turn order (a turn's
/// `Turn.tool_calls`).
#[derive(Debug, Clone)]
pub struct ToolCallRecord {
    /// The tool's name.
    pub name: String,
    /// The already-evaluated argument value passed to it.
    pub args: Value,
    /// What the tool returned, or the error message if it failed.
    pub result: Result<Value, String>,
}

/// A host-provided table of callable tools. Implementations receive
/// the already-evaluated argument value and return a value or an
/// error message; panics are not caught here (see `ptc-sandbox` for
/// the outer isolation boundary).
pub trait ToolTable {
    /// Invokes `name` with `args`, or reports it unknown/failed.
    fn call(&self, name: &str, args: Value) -> Result<Value, String>;
}

/// A tool table with no tools at all, useful for pure expression
/// evaluation and tests.
pub struct NoTools;

impl ToolTable for NoTools {
    fn call(&self, name: &str, _args: Value) -> Result<Value, String> {
        Err(format!("unknown tool: {name}"))
    }
}

/// Per-evaluation state threaded through every recursive call: the
/// read-only context, the tool table, out-of-band side buffers for
/// `println` output and tool-call history, and the cooperative
/// cancellation flag the sandbox flips on timeout.
pub struct EvalCtx {
    /// The run's read-only `ctx/name` namespace.
    pub ctx: Ctx,
    /// The tool table for this run.
    pub tools: Arc<dyn ToolTable + Send + Sync>,
    /// Flipped by the sandbox when the wall-clock budget elapses.
    pub cancelled: Arc<AtomicBool>,
    /// Lines emitted by `println`, in call order.
    pub prints: RefCell<Vec<String>>,
    /// Tool calls made, in call order.
    pub tool_calls: RefCell<Vec<ToolCallRecord>>,
    steps: Cell<u64>,
}

impl EvalCtx {
    /// Builds a fresh evaluation context for one program run.
    pub fn new(ctx: Ctx, tools: Arc<dyn ToolTable + Send + Sync>, cancelled: Arc<AtomicBool>) -> Self {
        EvalCtx {
            ctx,
            tools,
            cancelled,
            prints: RefCell::new(Vec::new()),
            tool_calls: RefCell::new(Vec::new()),
            steps: Cell::new(0),
        }
    }

    fn check_cancelled(&self) -> Result<(), EvalError> {
        self.steps.set(self.steps.get() + 1);
        if self.cancelled.load(AtomicOrdering::Relaxed) {
            return Err(EvalError::Cancelled);
        }
        Ok(())
    }

    /// Total number of evaluation steps taken so far, for diagnostics.
    pub fn steps_taken(&self) -> u64 {
        self.steps.get()
    }
}

/// Evaluates one core-AST node, threading `memory` linearly through
/// its subexpressions.
pub fn eval_ast(ctx: &EvalCtx, ast: &Ast, memory: Memory, env: &Env) -> Result<(Value, Memory), EvalError> {
    ctx.check_cancelled()?;
    match ast {
        Ast::Nil => Ok((Value::Nil, memory)),
        Ast::Bool(b) => Ok((Value::Bool(*b), memory)),
        Ast::Int(n) => Ok((Value::Int(*n), memory)),
        Ast::Float(n) => Ok((Value::Float(*n), memory)),
        Ast::Str(s) => Ok((Value::Str(s.clone()), memory)),
        Ast::Keyword(k) => Ok((Value::Keyword(k.clone()), memory)),

        Ast::Var(n) => match env.get(n) {
            Some(v) => Ok((v, memory)),
            None => Err(EvalError::UnboundVar(n.clone())),
        },
        Ast::Ctx(n) => Ok((ctx.ctx.get(n), memory)),
        Ast::Memory(n) => Ok((memory.get(n), memory)),

        Ast::Vector(xs) => {
            let mut out = Vec::with_capacity(xs.len());
            let mut memory = memory;
            for x in xs {
                let (v, m) = eval_ast(ctx, x, memory, env)?;
                memory = m;
                if v.is_terminal() {
                    return Ok((v, memory));
                }
                out.push(v);
            }
            Ok((Value::Vector(out), memory))
        }
        Ast::Map(pairs) => {
            let mut out = Vec::with_capacity(pairs.len());
            let mut memory = memory;
            for (k, v) in pairs {
                let (kv, m) = eval_ast(ctx, k, memory, env)?;
                memory = m;
                if kv.is_terminal() {
                    return Ok((kv, memory));
                }
                let (vv, m) = eval_ast(ctx, v, memory, env)?;
                memory = m;
                if vv.is_terminal() {
                    return Ok((vv, memory));
                }
                out = crate::value::assoc_key(&out, kv, vv);
            }
            Ok((Value::Map(out), memory))
        }
        Ast::Set(xs) => {
            let mut out: Vec<Value> = Vec::new();
            let mut memory = memory;
            for x in xs {
                let (v, m) = eval_ast(ctx, x, memory, env)?;
                memory = m;
                if v.is_terminal() {
                    return Ok((v, memory));
                }
                if !out.contains(&v) {
                    out.push(v);
                }
            }
            Ok((Value::Set(out), memory))
        }

        Ast::If(c, t, e) => {
            let (cv, memory) = eval_ast(ctx, c, memory, env)?;
            if cv.is_terminal() {
                return Ok((cv, memory));
            }
            if cv.is_truthy() {
                eval_ast(ctx, t, memory, env)
            } else {
                eval_ast(ctx, e, memory, env)
            }
        }
        Ast::And(exprs) => {
            if exprs.is_empty() {
                return Ok((Value::Bool(true), memory));
            }
            let mut memory = memory;
            let mut last = Value::Bool(true);
            for x in exprs {
                let (v, m) = eval_ast(ctx, x, memory, env)?;
                memory = m;
                if v.is_terminal() {
                    return Ok((v, memory));
                }
                if !v.is_truthy() {
                    return Ok((v, memory));
                }
                last = v;
            }
            Ok((last, memory))
        }
        Ast::Or(exprs) => {
            if exprs.is_empty() {
                return Ok((Value::Nil, memory));
            }
            let mut memory = memory;
            let mut last = Value::Nil;
            for x in exprs {
                let (v, m) = eval_ast(ctx, x, memory, env)?;
                memory = m;
                if v.is_terminal() {
                    return Ok((v, memory));
                }
                if v.is_truthy() {
                    return Ok((v, memory));
                }
                last = v;
            }
            Ok((last, memory))
        }

        Ast::Let(bindings, body) => {
            let mut env = env.clone();
            let mut memory = memory;
            for binding in bindings {
                let (v, m) = eval_ast(ctx, &binding.expr, memory, &env)?;
                memory = m;
                if v.is_terminal() {
                    return Ok((v, memory));
                }
                let (new_env, new_memory) = bind_pattern(ctx, &env, &binding.pattern, &v, memory)?;
                env = new_env;
                memory = new_memory;
            }
            eval_ast(ctx, body, memory, &env)
        }

        Ast::Fn(params, body) => {
            let closure = Closure {
                params: params.clone(),
                body: (**body).clone(),
                env: env.clone(),
                doc: None,
                return_type_hint: None,
            };
            Ok((Value::Closure(Arc::new(closure)), memory))
        }

        Ast::Do(xs) => {
            if xs.is_empty() {
                return Ok((Value::Nil, memory));
            }
            let mut memory = memory;
            let mut last = Value::Nil;
            for (i, x) in xs.iter().enumerate() {
                let (v, m) = eval_ast(ctx, x, memory, env)?;
                memory = m;
                if v.is_terminal() {
                    return Ok((v, memory));
                }
                if i == xs.len() - 1 {
                    last = v;
                }
            }
            Ok((last, memory))
        }

        Ast::Call(callee, args) => {
            let (callee_v, memory) = eval_ast(ctx, callee, memory, env)?;
            if callee_v.is_terminal() {
                return Ok((callee_v, memory));
            }
            let mut evaluated = Vec::with_capacity(args.len());
            let mut memory = memory;
            for a in args {
                let (v, m) = eval_ast(ctx, a, memory, env)?;
                memory = m;
                if v.is_terminal() {
                    return Ok((v, memory));
                }
                evaluated.push(v);
            }
            apply_value(ctx, &callee_v, evaluated, memory)
        }

        Ast::CallTool(name, args_expr) => {
            let (args_v, memory) = eval_ast(ctx, args_expr, memory, env)?;
            if args_v.is_terminal() {
                return Ok((args_v, memory));
            }
            let result = ctx.tools.call(name, args_v.clone());
            ctx.tool_calls.borrow_mut().push(ToolCallRecord {
                name: name.clone(),
                args: args_v,
                result: result.clone(),
            });
            match result {
                Ok(v) => Ok((v, memory)),
                Err(msg) => Err(EvalError::Tool(msg)),
            }
        }

        Ast::Where(field, op, rhs) => {
            let (rhs_v, memory) = match rhs {
                Some(expr) => {
                    let (v, m) = eval_ast(ctx, expr, memory, env)?;
                    if v.is_terminal() {
                        return Ok((v, m));
                    }
                    (Some(v), m)
                }
                None => (None, memory),
            };
            let predicate = PredicateValue::Where {
                field: field.clone(),
                op: *op,
                rhs: rhs_v,
            };
            Ok((Value::Predicate(Arc::new(predicate)), memory))
        }
        Ast::PredCombinator(tag, subs) => {
            let mut evaluated = Vec::with_capacity(subs.len());
            let mut memory = memory;
            for s in subs {
                let (v, m) = eval_ast(ctx, s, memory, env)?;
                memory = m;
                if v.is_terminal() {
                    return Ok((v, memory));
                }
                evaluated.push(v);
            }
            let predicate = PredicateValue::Combinator {
                tag: *tag,
                subs: evaluated,
            };
            Ok((Value::Predicate(Arc::new(predicate)), memory))
        }
    }
}

/// Applies an already-evaluated callee to already-evaluated arguments
/// Used both by `{:call}` and by
/// higher-order built-ins (`map`, `filter`, `reduce`, ...).
pub fn apply_value(ctx: &EvalCtx, callee: &Value, args: Vec<Value>, memory: Memory) -> Result<(Value, Memory), EvalError> {
    ctx.check_cancelled()?;
    match callee {
        Value::Closure(c) => apply_closure(ctx, c, args, memory),
        Value::Builtin(b) => apply_builtin(ctx, b, args, memory),
        Value::Predicate(p) => {
            if args.len() != 1 {
                return Err(EvalError::ArityError(format!(
                    "predicate expects exactly 1 argument, got {}",
                    args.len()
                )));
            }
            call_predicate(ctx, p, &args[0], memory)
        }
        Value::Keyword(k) => apply_keyword(k, &args, memory),
        other => Err(EvalError::NotCallable(other.clone())),
    }
}

fn apply_closure(ctx: &EvalCtx, c: &Arc<Closure>, args: Vec<Value>, memory: Memory) -> Result<(Value, Memory), EvalError> {
    if c.params.len() != args.len() {
        return Err(EvalError::ArityMismatch {
            expected: c.params.len(),
            got: args.len(),
        });
    }
    let mut env = c.env.clone();
    let mut memory = memory;
    for (pat, arg) in c.params.iter().zip(args.iter()) {
        let (new_env, new_memory) = bind_pattern(ctx, &env, pat, arg, memory)?;
        env = new_env;
        memory = new_memory;
    }
    eval_ast(ctx, &c.body, memory, &env)
}

fn apply_builtin(ctx: &EvalCtx, b: &Arc<Builtin>, args: Vec<Value>, memory: Memory) -> Result<(Value, Memory), EvalError> {
    match &b.kind {
        BuiltinKind::Normal(n, f) => {
            if args.len() != *n {
                return Err(EvalError::ArityError(format!(
                    "{} expects exactly {} argument(s), got {}",
                    b.name,
                    n,
                    args.len()
                )));
            }
            f(ctx, memory, &args)
        }
        BuiltinKind::Variadic(identity, f) => {
            if args.is_empty() {
                return Ok((identity.clone(), memory));
            }
            f(ctx, memory, &args)
        }
        BuiltinKind::VariadicNonempty(f) => {
            if args.is_empty() {
                return Err(EvalError::ArityError(format!("{} requires at least 1 argument", b.name)));
            }
            f(ctx, memory, &args)
        }
        BuiltinKind::MultiArity(arms) => {
            for (arity, f) in *arms {
                if *arity == args.len() {
                    return f(ctx, memory, &args);
                }
            }
            let arities: Vec<String> = arms.iter().map(|(a, _)| a.to_string()).collect();
            Err(EvalError::ArityError(format!(
                "{} accepts {} argument(s), got {}",
                b.name,
                arities.join(" or "),
                args.len()
            )))
        }
    }
}

fn apply_keyword(k: &str, args: &[Value], memory: Memory) -> Result<(Value, Memory), EvalError> {
    match args.len() {
        1 => {
            let m = match &args[0] {
                Value::Map(pairs) => pairs.as_slice(),
                _ => &[],
            };
            let v = crate::value::lookup_key(m, &Value::Keyword(k.to_string())).unwrap_or(Value::Nil);
            Ok((v, memory))
        }
        2 => {
            let m = match &args[0] {
                Value::Map(pairs) => pairs.as_slice(),
                _ => &[],
            };
            let v = crate::value::lookup_key(m, &Value::Keyword(k.to_string())).unwrap_or_else(|| args[1].clone());
            Ok((v, memory))
        }
        n => Err(EvalError::InvalidKeywordCall {
            keyword: k.to_string(),
            arg_count: n,
        }),
    }
}
