//! The core AST: what the analyzer produces and the evaluator consumes.
//!
//! Surface sugar (`when`, `cond`, `->`, `->>`) is gone by the time a
//! tree reaches these shapes — only the core primitives
//! remain.

/// A fully-analyzed program fragment.
#[derive(Debug, Clone, PartialEq)]
pub enum Ast {
    /// `nil`.
    Nil,
    /// `true` / `false`.
    Bool(bool),
    /// An integer literal.
    Int(i64),
    /// A floating-point literal.
    Float(f64),
    /// A string literal.
    Str(String),
    /// A keyword literal, e.g. `:status` — also usable as a function.
    Keyword(String),
    /// `[...]`.
    Vector(Vec<Ast>),
    /// `{...}`, ordered key/value pairs.
    Map(Vec<(Ast, Ast)>),
    /// `#{...}`.
    Set(Vec<Ast>),

    /// A reference to a local binding or built-in.
    Var(String),
    /// A reference into the turn's context, `ctx/name`.
    Ctx(String),
    /// A reference into memory, `memory/name`.
    Memory(String),

    /// `(if cond then else)`.
    If(Box<Ast>, Box<Ast>, Box<Ast>),
    /// `(and a b ...)`.
    And(Vec<Ast>),
    /// `(or a b ...)`.
    Or(Vec<Ast>),

    /// `(let [bindings...] body)`.
    Let(Vec<Binding>, Box<Ast>),
    /// `(fn [params...] body)`.
    Fn(Vec<Pattern>, Box<Ast>),

    /// Function application: callee applied to arguments.
    Call(Box<Ast>, Vec<Ast>),
    /// `(call "tool-name" args-expr)`.
    CallTool(String, Box<Ast>),

    /// `(where field)` or `(where field op rhs)`.
    Where(FieldPath, WhereOp, Option<Box<Ast>>),
    /// `(all-of ...)` / `(any-of ...)` / `(none-of ...)`.
    PredCombinator(CombinatorTag, Vec<Ast>),

    /// `(do a b ...)`, or the implicit body of `let`/`fn`/`when`/etc.
    /// when it has more than one expression.
    Do(Vec<Ast>),
}

/// One `let` binding: a pattern bound to the value of an expression.
#[derive(Debug, Clone, PartialEq)]
pub struct Binding {
    /// What the value is bound to.
    pub pattern: Pattern,
    /// The expression producing the value.
    pub expr: Ast,
}

/// A binding-site pattern — a plain name or a destructuring shape.
#[derive(Debug, Clone, PartialEq)]
pub enum Pattern {
    /// A plain symbol.
    Var(String),
    /// A destructuring pattern.
    Destructure(Destructure),
}

/// The shapes `let`/`fn` binding patterns can take.
#[derive(Debug, Clone, PartialEq)]
pub enum Destructure {
    /// `[a b c]` — positional destructuring of a sequence.
    Seq(Vec<Pattern>),
    /// `{:keys [a b]}`, optionally with `:or` defaults.
    Keys {
        /// Names pulled from the matching keyword keys.
        names: Vec<String>,
        /// `:or` default expressions, keyed by binding name.
        defaults: Vec<(String, Ast)>,
    },
    /// `{:keys [a] renamed :kw}` — keys plus symbol-keyed renames.
    Map {
        /// Names pulled from `:keys`.
        keys: Vec<String>,
        /// `(local_name, source_keyword)` renames.
        renames: Vec<(String, String)>,
        /// `:or` default expressions, keyed by binding name.
        defaults: Vec<(String, Ast)>,
    },
    /// `{:as whole ...}` — binds the undestructured value to `whole`
    /// in addition to the wrapped pattern.
    As(String, Box<Pattern>),
}

/// One step of a `where` field path.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldStep {
    /// A keyword step, e.g. `:status`.
    Keyword(String),
    /// A string step.
    Str(String),
    /// An integer (index) step.
    Int(i64),
}

/// A `where` field path: a single step, or a vector of steps for
/// nested lookups.
pub type FieldPath = Vec<FieldStep>;

/// The comparison operator named by a `where` form, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WhereOp {
    /// `(where field)` — truthiness of the looked-up value.
    Truthy,
    /// `=`
    Eq,
    /// `!=`
    Ne,
    /// `<`
    Lt,
    /// `>`
    Gt,
    /// `<=`
    Lte,
    /// `>=`
    Gte,
    /// `in` — value is a member of the rhs collection.
    In,
    /// `includes` — rhs is a member of the looked-up collection.
    Includes,
}

/// Which predicate combinator a `{:pred_combinator}` node is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CombinatorTag {
    /// `all-of` — every sub-predicate must hold.
    AllOf,
    /// `any-of` — at least one sub-predicate must hold.
    AnyOf,
    /// `none-of` — no sub-predicate may hold.
    NoneOf,
}
