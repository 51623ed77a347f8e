#![deny(missing_docs)]
//! Analysis (C2): lowers the raw AST produced by `ptc-syntax` into the
//! core AST that `ptc-runtime` evaluates. Special forms (`when`,
//! `cond`, `->`, `->>`) are desugared here; nothing downstream needs
//! to know they ever existed.

mod analyzer;
mod ast;
mod error;

pub use analyzer::analyze;
pub use ast::{Ast, Binding, CombinatorTag, Destructure, FieldPath, FieldStep, Pattern, WhereOp};
pub use error::AnalyzeError;
