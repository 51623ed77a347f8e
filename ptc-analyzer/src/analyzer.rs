//! Raw AST to core AST: special-form desugaring and validation.

use ptc_syntax::RawForm;

use crate::ast::{Ast, Binding, CombinatorTag, Destructure, FieldPath, FieldStep, Pattern, WhereOp};
use crate::error::AnalyzeError;

const COMPARISON_OPS: &[&str] = &["<", ">", "<=", ">=", "=", "!="];

/// Lowers a whole program (one or more top-level forms) into a single
/// core-AST expression, wrapping multiple forms in an implicit `do`.
pub fn analyze(forms: &[RawForm]) -> Result<Ast, AnalyzeError> {
    match forms {
        [] => Ok(Ast::Nil),
        [one] => analyze_form(one),
        many => Ok(Ast::Do(analyze_each(many)?)),
    }
}

fn analyze_each(forms: &[RawForm]) -> Result<Vec<Ast>, AnalyzeError> {
    forms.iter().map(analyze_form).collect()
}

fn analyze_form(form: &RawForm) -> Result<Ast, AnalyzeError> {
    match form {
        RawForm::Nil => Ok(Ast::Nil),
        RawForm::Bool(b) => Ok(Ast::Bool(*b)),
        RawForm::Int(n) => Ok(Ast::Int(*n)),
        RawForm::Float(n) => Ok(Ast::Float(*n)),
        RawForm::Str(s) => Ok(Ast::Str(s.clone())),
        RawForm::Keyword(k) => Ok(Ast::Keyword(k.clone())),
        RawForm::Symbol(s) => Ok(Ast::Var(s.clone())),
        RawForm::NamespacedSymbol(ns, name) => analyze_namespaced_ref(ns, name),
        RawForm::Vector(xs) => Ok(Ast::Vector(analyze_each(xs)?)),
        RawForm::Set(xs) => Ok(Ast::Set(analyze_each(xs)?)),
        RawForm::Map(pairs) => {
            let mut out = Vec::with_capacity(pairs.len());
            for (k, v) in pairs {
                out.push((analyze_form(k)?, analyze_form(v)?));
            }
            Ok(Ast::Map(out))
        }
        RawForm::List(xs) => analyze_list(xs),
    }
}

fn analyze_namespaced_ref(ns: &str, name: &str) -> Result<Ast, AnalyzeError> {
    match ns {
        "ctx" => Ok(Ast::Ctx(name.to_string())),
        "memory" => Ok(Ast::Memory(name.to_string())),
        "tool" => Err(AnalyzeError::invalid_form(format!(
            "tool/{name} is only valid as the call target of `(tool/{name} args)`"
        ))),
        other => Err(AnalyzeError::invalid_form(format!(
            "unsupported namespace `{other}/{name}`"
        ))),
    }
}

fn analyze_list(xs: &[RawForm]) -> Result<Ast, AnalyzeError> {
    let Some(head) = xs.first() else {
        return Err(AnalyzeError::invalid_form("empty list is not callable"));
    };
    let args = &xs[1..];

    if let RawForm::NamespacedSymbol(ns, name) = head {
        if ns == "tool" {
            return analyze_tool_call_sugar(name, args);
        }
        return analyze_generic_call(head, args);
    }

    let RawForm::Symbol(name) = head else {
        return analyze_generic_call(head, args);
    };

    match name.as_str() {
        "if" => analyze_if(args),
        "when" => analyze_when(args),
        "cond" => analyze_cond(args),
        "->" => analyze_thread(args, true),
        "->>" => analyze_thread(args, false),
        "and" => Ok(Ast::And(analyze_each(args)?)),
        "or" => Ok(Ast::Or(analyze_each(args)?)),
        "let" => analyze_let(args),
        "fn" => analyze_fn(args),
        "do" => Ok(Ast::Do(analyze_each(args)?)),
        "where" => analyze_where(args),
        "all-of" => Ok(Ast::PredCombinator(CombinatorTag::AllOf, analyze_each(args)?)),
        "any-of" => Ok(Ast::PredCombinator(CombinatorTag::AnyOf, analyze_each(args)?)),
        "none-of" => Ok(Ast::PredCombinator(CombinatorTag::NoneOf, analyze_each(args)?)),
        "call" => analyze_call_tool_form(args),
        op if COMPARISON_OPS.contains(&op) => analyze_comparison(op, args),
        _ => analyze_generic_call(head, args),
    }
}

fn analyze_tool_call_sugar(name: &str, args: &[RawForm]) -> Result<Ast, AnalyzeError> {
    if args.len() != 1 {
        return Err(AnalyzeError::invalid_arity(
            format!("tool/{name}"),
            "exactly 1 argument",
            args.len(),
        ));
    }
    let args_expr = analyze_form(&args[0])?;
    Ok(Ast::CallTool(name.to_string(), Box::new(args_expr)))
}

fn analyze_generic_call(head: &RawForm, args: &[RawForm]) -> Result<Ast, AnalyzeError> {
    let callee = analyze_form(head)?;
    Ok(Ast::Call(Box::new(callee), analyze_each(args)?))
}

fn analyze_comparison(op: &str, args: &[RawForm]) -> Result<Ast, AnalyzeError> {
    if args.len() != 2 {
        return Err(AnalyzeError::invalid_arity(op, "exactly 2 arguments", args.len()));
    }
    Ok(Ast::Call(Box::new(Ast::Var(op.to_string())), analyze_each(args)?))
}

fn analyze_if(args: &[RawForm]) -> Result<Ast, AnalyzeError> {
    if args.len() != 3 {
        return Err(AnalyzeError::invalid_arity("if", "exactly 3 arguments", args.len()));
    }
    Ok(Ast::If(
        Box::new(analyze_form(&args[0])?),
        Box::new(analyze_form(&args[1])?),
        Box::new(analyze_form(&args[2])?),
    ))
}

fn analyze_when(args: &[RawForm]) -> Result<Ast, AnalyzeError> {
    let Some((cond, body)) = args.split_first() else {
        return Err(AnalyzeError::invalid_arity("when", "at least 1 argument (a condition)", 0));
    };
    Ok(Ast::If(
        Box::new(analyze_form(cond)?),
        Box::new(body_to_ast(body)?),
        Box::new(Ast::Nil),
    ))
}

fn body_to_ast(exprs: &[RawForm]) -> Result<Ast, AnalyzeError> {
    match exprs {
        [] => Ok(Ast::Nil),
        [one] => analyze_form(one),
        many => Ok(Ast::Do(analyze_each(many)?)),
    }
}

fn analyze_cond(args: &[RawForm]) -> Result<Ast, AnalyzeError> {
    if args.len() % 2 != 0 {
        return Err(AnalyzeError::invalid_arity(
            "cond",
            "an even number of test/expression forms",
            args.len(),
        ));
    }
    analyze_form(&desugar_cond(args))
}

fn desugar_cond(pairs: &[RawForm]) -> RawForm {
    match pairs {
        [] => RawForm::Nil,
        [test, body, rest @ ..] => {
            if let RawForm::Keyword(k) = test {
                if k == "else" {
                    return body.clone();
                }
            }
            RawForm::List(vec![
                RawForm::Symbol("if".to_string()),
                test.clone(),
                body.clone(),
                desugar_cond(rest),
            ])
        }
        [_] => RawForm::Nil,
    }
}

fn analyze_thread(args: &[RawForm], insert_first: bool) -> Result<Ast, AnalyzeError> {
    let name = if insert_first { "->" } else { "->>" };
    let Some((seed, stages)) = args.split_first() else {
        return Err(AnalyzeError::invalid_arity(name, "at least 1 argument", 0));
    };
    let mut cur = seed.clone();
    for stage in stages {
        cur = insert_into_stage(stage, cur, insert_first)?;
    }
    analyze_form(&cur)
}

fn insert_into_stage(stage: &RawForm, value: RawForm, insert_first: bool) -> Result<RawForm, AnalyzeError> {
    match stage {
        RawForm::List(xs) => {
            let mut new_xs = xs.clone();
            if insert_first {
                if new_xs.is_empty() {
                    new_xs.push(value);
                } else {
                    new_xs.insert(1, value);
                }
            } else {
                new_xs.push(value);
            }
            Ok(RawForm::List(new_xs))
        }
        RawForm::Symbol(_) => Ok(RawForm::List(vec![stage.clone(), value])),
        other => Err(AnalyzeError::invalid_form(format!(
            "threading macro stage must be a symbol or a list, got `{other}`"
        ))),
    }
}

fn analyze_let(args: &[RawForm]) -> Result<Ast, AnalyzeError> {
    let Some((bindings_form, body)) = args.split_first() else {
        return Err(AnalyzeError::invalid_arity("let", "a binding vector", 0));
    };
    let RawForm::Vector(binding_forms) = bindings_form else {
        return Err(AnalyzeError::invalid_form("`let` binding form must be a vector"));
    };
    if binding_forms.len() % 2 != 0 {
        return Err(AnalyzeError::invalid_arity(
            "let",
            "an even number of forms in the binding vector",
            binding_forms.len(),
        ));
    }
    let mut bindings = Vec::with_capacity(binding_forms.len() / 2);
    for pair in binding_forms.chunks(2) {
        let pattern = analyze_pattern(&pair[0])?;
        let expr = analyze_form(&pair[1])?;
        bindings.push(Binding { pattern, expr });
    }
    Ok(Ast::Let(bindings, Box::new(body_to_ast(body)?)))
}

fn analyze_fn(args: &[RawForm]) -> Result<Ast, AnalyzeError> {
    let Some((params_form, body)) = args.split_first() else {
        return Err(AnalyzeError::invalid_arity("fn", "a parameter vector", 0));
    };
    let RawForm::Vector(param_forms) = params_form else {
        return Err(AnalyzeError::invalid_form("`fn` parameter form must be a vector"));
    };
    let params = param_forms.iter().map(analyze_pattern).collect::<Result<Vec<_>, _>>()?;
    Ok(Ast::Fn(params, Box::new(body_to_ast(body)?)))
}

fn analyze_pattern(form: &RawForm) -> Result<Pattern, AnalyzeError> {
    match form {
        RawForm::Symbol(s) => Ok(Pattern::Var(s.clone())),
        RawForm::Vector(items) => Ok(Pattern::Destructure(Destructure::Seq(
            items.iter().map(analyze_pattern).collect::<Result<Vec<_>, _>>()?,
        ))),
        RawForm::Map(pairs) => analyze_map_pattern(pairs),
        other => Err(AnalyzeError::invalid_form(format!(
            "not a valid binding pattern: `{other}`"
        ))),
    }
}

fn analyze_map_pattern(pairs: &[(RawForm, RawForm)]) -> Result<Pattern, AnalyzeError> {
    let mut keys_names: Vec<String> = Vec::new();
    let mut renames: Vec<(String, String)> = Vec::new();
    let mut defaults: Vec<(String, Ast)> = Vec::new();
    let mut as_alias: Option<String> = None;

    for (k, v) in pairs {
        match k {
            RawForm::Keyword(kw) if kw == "keys" => {
                let RawForm::Vector(names) = v else {
                    return Err(AnalyzeError::invalid_form("`:keys` value must be a vector of symbols"));
                };
                for n in names {
                    let RawForm::Symbol(s) = n else {
                        return Err(AnalyzeError::invalid_form("`:keys` entries must be symbols"));
                    };
                    keys_names.push(s.clone());
                }
            }
            RawForm::Keyword(kw) if kw == "as" => {
                let RawForm::Symbol(s) = v else {
                    return Err(AnalyzeError::invalid_form("`:as` value must be a symbol"));
                };
                as_alias = Some(s.clone());
            }
            RawForm::Keyword(kw) if kw == "or" => {
                let RawForm::Map(default_pairs) = v else {
                    return Err(AnalyzeError::invalid_form("`:or` value must be a map"));
                };
                for (dk, dv) in default_pairs {
                    let RawForm::Symbol(dname) = dk else {
                        return Err(AnalyzeError::invalid_form("default keys must be symbols"));
                    };
                    defaults.push((dname.clone(), analyze_form(dv)?));
                }
            }
            RawForm::Symbol(local_name) => {
                let RawForm::Keyword(source_kw) = v else {
                    return Err(AnalyzeError::invalid_form(
                        "symbol-keyed destructuring entries must map to a keyword",
                    ));
                };
                renames.push((local_name.clone(), source_kw.clone()));
            }
            other => {
                return Err(AnalyzeError::invalid_form(format!(
                    "unsupported destructuring key: `{other}`"
                )))
            }
        }
    }

    let base = if renames.is_empty() {
        Pattern::Destructure(Destructure::Keys {
            names: keys_names,
            defaults,
        })
    } else {
        Pattern::Destructure(Destructure::Map {
            keys: keys_names,
            renames,
            defaults,
        })
    };

    Ok(match as_alias {
        Some(alias) => Pattern::Destructure(Destructure::As(alias, Box::new(base))),
        None => base,
    })
}

fn analyze_where(args: &[RawForm]) -> Result<Ast, AnalyzeError> {
    match args.len() {
        1 => {
            let field = parse_field_path(&args[0])?;
            Ok(Ast::Where(field, WhereOp::Truthy, None))
        }
        3 => {
            let field = parse_field_path(&args[0])?;
            let op = parse_where_op(&args[1])?;
            let rhs = analyze_form(&args[2])?;
            Ok(Ast::Where(field, op, Some(Box::new(rhs))))
        }
        n => Err(AnalyzeError::invalid_arity(
            "where",
            "either a field, or a field/operator/value triple",
            n,
        )),
    }
}

fn parse_field_path(form: &RawForm) -> Result<FieldPath, AnalyzeError> {
    match form {
        RawForm::Keyword(k) => Ok(vec![FieldStep::Keyword(k.clone())]),
        RawForm::Vector(steps) => steps
            .iter()
            .map(|s| match s {
                RawForm::Keyword(k) => Ok(FieldStep::Keyword(k.clone())),
                RawForm::Str(s) => Ok(FieldStep::Str(s.clone())),
                RawForm::Int(n) => Ok(FieldStep::Int(*n)),
                other => Err(AnalyzeError::invalid_where_form(format!(
                    "field path steps must be a keyword, string, or integer, got `{other}`"
                ))),
            })
            .collect(),
        other => Err(AnalyzeError::invalid_where_form(format!(
            "field position must be a keyword or a vector of steps, got `{other}`"
        ))),
    }
}

fn parse_where_op(form: &RawForm) -> Result<WhereOp, AnalyzeError> {
    let RawForm::Symbol(s) = form else {
        return Err(AnalyzeError::invalid_where_form(format!(
            "comparison operator must be a symbol, got `{form}`"
        )));
    };
    match s.as_str() {
        "=" => Ok(WhereOp::Eq),
        "!=" => Ok(WhereOp::Ne),
        "<" => Ok(WhereOp::Lt),
        ">" => Ok(WhereOp::Gt),
        "<=" => Ok(WhereOp::Lte),
        ">=" => Ok(WhereOp::Gte),
        "in" => Ok(WhereOp::In),
        "includes" => Ok(WhereOp::Includes),
        other => Err(AnalyzeError::invalid_where_form(format!(
            "unrecognized comparison operator: `{other}`"
        ))),
    }
}

fn analyze_call_tool_form(args: &[RawForm]) -> Result<Ast, AnalyzeError> {
    if args.len() != 2 {
        return Err(AnalyzeError::invalid_arity(
            "call",
            "a string literal tool name and an argument expression",
            args.len(),
        ));
    }
    let RawForm::Str(name) = &args[0] else {
        return Err(AnalyzeError::invalid_form("tool name in `call` must be a string literal"));
    };
    let args_expr = analyze_form(&args[1])?;
    Ok(Ast::CallTool(name.clone(), Box::new(args_expr)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ptc_syntax::parse_program;

    fn analyze_src(src: &str) -> Result<Ast, AnalyzeError> {
        let forms = parse_program(src).expect("parses");
        analyze(&forms)
    }

    #[test]
    fn if_requires_exactly_three_args() {
        assert!(analyze_src("(if true 1 2)").is_ok());
        assert!(matches!(
            analyze_src("(if true 1)"),
            Err(AnalyzeError::InvalidArity { form, .. }) if form == "if"
        ));
        assert!(matches!(
            analyze_src("(if true 1 2 3)"),
            Err(AnalyzeError::InvalidArity { form, .. }) if form == "if"
        ));
    }

    #[test]
    fn comparison_ops_are_strictly_binary() {
        assert!(analyze_src("(<= 1 10)").is_ok());
        assert!(matches!(
            analyze_src("(<= 1 5 10)"),
            Err(AnalyzeError::InvalidArity { form, .. }) if form == "<="
        ));
    }

    #[test]
    fn when_desugars_to_if_with_nil_else() {
        let got = analyze_src("(when true 1 2)").unwrap();
        let expected = Ast::If(
            Box::new(Ast::Bool(true)),
            Box::new(Ast::Do(vec![Ast::Int(1), Ast::Int(2)])),
            Box::new(Ast::Nil),
        );
        assert_eq!(got, expected);
    }

    #[test]
    fn cond_with_else_desugars_to_nested_if() {
        let got = analyze_src("(cond false 1 :else 2)").unwrap();
        let expected = Ast::If(Box::new(Ast::Bool(false)), Box::new(Ast::Int(1)), Box::new(Ast::Int(2)));
        assert_eq!(got, expected);
    }

    #[test]
    fn thread_first_inserts_as_first_arg() {
        let threaded = analyze_src("(-> x (f a) (g b))").unwrap();
        let manual = analyze_src("(g (f x a) b)").unwrap();
        assert_eq!(threaded, manual);
    }

    #[test]
    fn thread_last_inserts_as_last_arg() {
        let threaded = analyze_src("(->> x (f a) (g b))").unwrap();
        let manual = analyze_src("(g b (f a x))").unwrap();
        assert_eq!(threaded, manual);
    }

    #[test]
    fn thread_first_bare_symbol_stage() {
        let threaded = analyze_src("(-> x f g)").unwrap();
        let manual = analyze_src("(g (f x))").unwrap();
        assert_eq!(threaded, manual);
    }

    #[test]
    fn let_even_binding_vector_required() {
        assert!(analyze_src("(let [a 1] a)").is_ok());
        assert!(analyze_src("(let [a] a)").is_err());
    }

    #[test]
    fn let_seq_destructure() {
        let got = analyze_src("(let [[a b] x] a)").unwrap();
        match got {
            Ast::Let(bindings, _) => match &bindings[0].pattern {
                Pattern::Destructure(Destructure::Seq(pats)) => {
                    assert_eq!(pats.len(), 2);
                }
                other => panic!("expected seq destructure, got {other:?}"),
            },
            other => panic!("expected let, got {other:?}"),
        }
    }

    #[test]
    fn keys_destructure_with_or_defaults() {
        let got = analyze_src("(let [{:keys [a b] :or {b 2}} x] a)").unwrap();
        match got {
            Ast::Let(bindings, _) => match &bindings[0].pattern {
                Pattern::Destructure(Destructure::Keys { names, defaults }) => {
                    assert_eq!(names, &["a".to_string(), "b".to_string()]);
                    assert_eq!(defaults.len(), 1);
                }
                other => panic!("expected keys destructure, got {other:?}"),
            },
            other => panic!("expected let, got {other:?}"),
        }
    }

    #[test]
    fn or_default_keys_must_be_symbols() {
        assert!(analyze_src("(let [{:keys [a] :or {:b 2}} x] a)").is_err());
    }

    #[test]
    fn map_destructure_with_renames_and_as() {
        let got = analyze_src("(let [{:as whole total :total} x] whole)").unwrap();
        match got {
            Ast::Let(bindings, _) => match &bindings[0].pattern {
                Pattern::Destructure(Destructure::As(alias, inner)) => {
                    assert_eq!(alias, "whole");
                    match inner.as_ref() {
                        Pattern::Destructure(Destructure::Map { renames, .. }) => {
                            assert_eq!(renames, &[("total".to_string(), "total".to_string())]);
                        }
                        other => panic!("expected map destructure, got {other:?}"),
                    }
                }
                other => panic!("expected as-wrapped pattern, got {other:?}"),
            },
            other => panic!("expected let, got {other:?}"),
        }
    }

    #[test]
    fn where_truthy_form() {
        let got = analyze_src("(where :active)").unwrap();
        assert_eq!(got, Ast::Where(vec![FieldStep::Keyword("active".into())], WhereOp::Truthy, None));
    }

    #[test]
    fn where_comparison_form() {
        let got = analyze_src("(where :amount > 100)").unwrap();
        assert_eq!(
            got,
            Ast::Where(
                vec![FieldStep::Keyword("amount".into())],
                WhereOp::Gt,
                Some(Box::new(Ast::Int(100)))
            )
        );
    }

    #[test]
    fn where_rejects_unknown_operator() {
        assert!(matches!(analyze_src("(where :amount contains 100)"), Err(_)));
    }

    #[test]
    fn where_rejects_bad_arity() {
        assert!(matches!(
            analyze_src("(where :amount > 100 200)"),
            Err(AnalyzeError::InvalidArity { form, .. }) if form == "where"
        ));
    }

    #[test]
    fn all_of_lowers_to_pred_combinator() {
        let got = analyze_src("(all-of (where :a) (where :b))").unwrap();
        match got {
            Ast::PredCombinator(CombinatorTag::AllOf, subs) => assert_eq!(subs.len(), 2),
            other => panic!("expected all-of, got {other:?}"),
        }
    }

    #[test]
    fn call_tool_sugar_and_explicit_form_agree() {
        let sugar = analyze_src(r#"(tool/search {:q "x"})"#).unwrap();
        let explicit = analyze_src(r#"(call "search" {:q "x"})"#).unwrap();
        assert_eq!(sugar, explicit);
    }

    #[test]
    fn call_tool_requires_string_literal_name() {
        assert!(analyze_src("(call foo {})").is_err());
    }

    #[test]
    fn bare_tool_reference_outside_call_position_errors() {
        assert!(analyze_src("(map tool/search things)").is_err());
    }

    #[test]
    fn ctx_and_memory_namespaces_resolve() {
        assert_eq!(analyze_src("ctx/orders").unwrap(), Ast::Ctx("orders".into()));
        assert_eq!(analyze_src("memory/seen").unwrap(), Ast::Memory("seen".into()));
    }

    #[test]
    fn fn_with_destructured_param() {
        let got = analyze_src("(fn [{:keys [x]}] x)").unwrap();
        match got {
            Ast::Fn(params, _) => assert_eq!(params.len(), 1),
            other => panic!("expected fn, got {other:?}"),
        }
    }

    #[test]
    fn multiple_top_level_forms_wrap_in_do() {
        let got = analyze_src("1 2 3").unwrap();
        assert_eq!(got, Ast::Do(vec![Ast::Int(1), Ast::Int(2), Ast::Int(3)]));
    }
}
