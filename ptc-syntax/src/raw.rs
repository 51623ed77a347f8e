//! The raw AST: tagged surface forms produced directly by the parser.
//!
//! These are the only surface-visible shapes — the
//! analyzer (C2) is the only consumer.

use std::fmt;

/// One raw, untyped surface form.
#[derive(Debug, Clone, PartialEq)]
pub enum RawForm {
    /// `nil`.
    Nil,
    /// `true` / `false`.
    Bool(bool),
    /// An integer literal.
    Int(i64),
    /// A floating-point literal.
    Float(f64),
    /// A string literal, already unescaped.
    Str(String),
    /// A bare symbol, e.g. `foo`, `+`, `->`.
    Symbol(String),
    /// A namespaced symbol, e.g. `ctx/orders`, `tool/search`.
    NamespacedSymbol(String, String),
    /// A keyword, e.g. `:status`.
    Keyword(String),
    /// `(...)`.
    List(Vec<RawForm>),
    /// `[...]`.
    Vector(Vec<RawForm>),
    /// `{...}`, stored as ordered key/value pairs (an even number of
    /// forms was required at parse time).
    Map(Vec<(RawForm, RawForm)>),
    /// `#{...}`.
    Set(Vec<RawForm>),
}

impl fmt::Display for RawForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawForm::Nil => write!(f, "nil"),
            RawForm::Bool(true) => write!(f, "true"),
            RawForm::Bool(false) => write!(f, "false"),
            RawForm::Int(n) => write!(f, "{n}"),
            RawForm::Float(n) => write!(f, "{n}"),
            RawForm::Str(s) => {
                write!(f, "\"")?;
                for c in s.chars() {
                    match c {
                        '\\' => write!(f, "\\\\")?,
                        '"' => write!(f, "\\\"")?,
                        '\n' => write!(f, "\\n")?,
                        '\r' => write!(f, "\\r")?,
                        '\t' => write!(f, "\\t")?,
                        other => write!(f, "{other}")?,
                    }
                }
                write!(f, "\"")
            }
            RawForm::Symbol(s) => write!(f, "{s}"),
            RawForm::NamespacedSymbol(ns, name) => write!(f, "{ns}/{name}"),
            RawForm::Keyword(k) => write!(f, ":{k}"),
            RawForm::List(xs) => write_seq(f, "(", ")", xs),
            RawForm::Vector(xs) => write_seq(f, "[", "]", xs),
            RawForm::Set(xs) => write_seq(f, "#{", "}", xs),
            RawForm::Map(pairs) => {
                write!(f, "{{")?;
                for (i, (k, v)) in pairs.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{k} {v}")?;
                }
                write!(f, "}}")
            }
        }
    }
}

fn write_seq(f: &mut fmt::Formatter<'_>, open: &str, close: &str, xs: &[RawForm]) -> fmt::Result {
    write!(f, "{open}")?;
    for (i, x) in xs.iter().enumerate() {
        if i > 0 {
            write!(f, " ")?;
        }
        write!(f, "{x}")?;
    }
    write!(f, "{close}")
}
