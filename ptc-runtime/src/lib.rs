#![deny(missing_docs)]
//! Environment, evaluator, built-in functions, and the memory contract
//! for PTC-Lisp (C3, C4, C5).

mod builtins;
mod contract;
mod env;
mod error;
mod eval;
mod memory;
mod pattern;
mod predicate;
mod value;

pub use builtins::root_env;
pub use contract::{apply_contract, ContractOutcome};
pub use env::Env;
pub use error::EvalError;
pub use eval::{apply_value, eval_ast, EvalCtx, NoTools, ToolCallRecord, ToolTable};
pub use memory::{Ctx, Memory};
pub use predicate::PredicateValue;
pub use value::{from_json, to_json, Builtin, BuiltinFn, BuiltinKind, Closure, Value};
