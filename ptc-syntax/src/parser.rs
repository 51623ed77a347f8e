//! Recursive-descent parser over the PTC-Lisp surface grammar
//! from a token stream into raw forms.
//!
//! The recursive structure (lists, vectors, maps, sets) is hand-rolled
//! over a character cursor so that line/column tracking for error
//! reporting is exact; the numeric-literal sub-grammar is recognised
//! with `nom` combinators, the way the closest reference Lisp
//! interpreter in this corpus parses s-expressions.

use crate::error::ParseError;
use crate::raw::RawForm;
use nom::branch::alt;
use nom::character::complete::{char as nom_char, digit1};
use nom::combinator::{opt, recognize};
use nom::sequence::{pair, preceded};
use nom::IResult;

const IDENT_SYMBOLS: &[char] = &['-', '_', '+', '*', '/', '?', '!', '<', '>', '='];

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || IDENT_SYMBOLS.contains(&c)
}

/// Recognises the body of an integer or float literal: `-?[0-9]+(\.[0-9]+)?([eE][+-]?[0-9]+)?`.
fn lex_number_body(input: &str) -> IResult<&str, &str> {
    recognize(preceded(
        opt(nom_char('-')),
        pair(
            digit1,
            opt(pair(
                opt(pair(nom_char('.'), digit1)),
                opt(pair(alt((nom_char('e'), nom_char('E'))), pair(opt(alt((nom_char('+'), nom_char('-')))), digit1))),
            )),
        ),
    ))(input)
}

struct Cursor {
    chars: Vec<char>,
    pos: usize,
}

impl Cursor {
    fn new(src: &str) -> Self {
        Self {
            chars: src.chars().collect(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    /// 1-based (line, column) of the current position.
    fn line_col(&self) -> (usize, usize) {
        let mut line = 1;
        let mut col = 1;
        for &c in &self.chars[..self.pos] {
            if c == '\n' {
                line += 1;
                col = 1;
            } else {
                col += 1;
            }
        }
        (line, col)
    }

    fn err(&self, message: impl Into<String>) -> ParseError {
        let (line, column) = self.line_col();
        ParseError::new(message, line, column)
    }

    fn rest_str(&self) -> String {
        self.chars[self.pos..].iter().collect()
    }

    fn skip_ws(&mut self) {
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() || c == ',' => {
                    self.advance();
                }
                Some(';') => {
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.advance();
                    }
                }
                _ => break,
            }
        }
    }
}

/// Parse a full program: zero or more top-level forms. The analyzer
/// wraps more than one into an implicit `do`.
pub fn parse_program(src: &str) -> Result<Vec<RawForm>, ParseError> {
    let mut cur = Cursor::new(src);
    let mut forms = Vec::new();
    loop {
        cur.skip_ws();
        if cur.peek().is_none() {
            break;
        }
        forms.push(parse_form(&mut cur)?);
    }
    Ok(forms)
}

/// Parse exactly one top-level form, erroring if there is trailing
/// non-whitespace content.
pub fn parse_one(src: &str) -> Result<RawForm, ParseError> {
    let mut cur = Cursor::new(src);
    cur.skip_ws();
    let form = parse_form(&mut cur)?;
    cur.skip_ws();
    if cur.peek().is_some() {
        return Err(cur.err("unexpected trailing input after form"));
    }
    Ok(form)
}

fn parse_form(cur: &mut Cursor) -> Result<RawForm, ParseError> {
    cur.skip_ws();
    match cur.peek() {
        None => Err(cur.err("unexpected end of input")),
        Some('(') => parse_seq(cur, '(', ')').map(RawForm::List),
        Some('[') => parse_seq(cur, '[', ']').map(RawForm::Vector),
        Some('{') => parse_map(cur),
        Some('#') if cur.peek_at(1) == Some('{') => {
            cur.advance(); // '#'
            parse_seq(cur, '{', '}').map(RawForm::Set)
        }
        Some('"') => parse_string(cur).map(RawForm::Str),
        Some(':') => parse_keyword(cur),
        Some(c) if c.is_ascii_digit() => parse_number(cur),
        Some('-') if cur.peek_at(1).is_some_and(|c| c.is_ascii_digit()) => parse_number(cur),
        Some(c) if is_ident_char(c) => parse_symbol_like(cur),
        Some(c) => Err(cur.err(format!("invalid character '{c}'"))),
    }
}

fn parse_seq(cur: &mut Cursor, _open: char, close: char) -> Result<Vec<RawForm>, ParseError> {
    cur.advance(); // consume opener
    let mut items = Vec::new();
    loop {
        cur.skip_ws();
        match cur.peek() {
            None => return Err(cur.err(format!("unterminated collection, expected '{close}'"))),
            Some(c) if c == close => {
                cur.advance();
                break;
            }
            _ => items.push(parse_form(cur)?),
        }
    }
    Ok(items)
}

fn parse_map(cur: &mut Cursor) -> Result<RawForm, ParseError> {
    cur.advance(); // '{'
    let mut forms = Vec::new();
    loop {
        cur.skip_ws();
        match cur.peek() {
            None => return Err(cur.err("unterminated collection, expected '}'")),
            Some('}') => {
                cur.advance();
                break;
            }
            _ => forms.push(parse_form(cur)?),
        }
    }
    if forms.len() % 2 != 0 {
        return Err(cur.err("map literal requires an even number of forms"));
    }
    let mut pairs = Vec::with_capacity(forms.len() / 2);
    let mut it = forms.into_iter();
    while let (Some(k), Some(v)) = (it.next(), it.next()) {
        pairs.push((k, v));
    }
    Ok(RawForm::Map(pairs))
}

fn parse_string(cur: &mut Cursor) -> Result<String, ParseError> {
    cur.advance(); // opening quote
    let mut out = String::new();
    loop {
        match cur.advance() {
            None => return Err(cur.err("unterminated string literal")),
            Some('"') => break,
            Some('\n') => return Err(cur.err("unterminated string literal (literal newline)")),
            Some('\\') => match cur.advance() {
                Some('\\') => out.push('\\'),
                Some('"') => out.push('"'),
                Some('n') => out.push('\n'),
                Some('r') => out.push('\r'),
                Some('t') => out.push('\t'),
                Some(other) => return Err(cur.err(format!("invalid escape sequence '\\{other}'"))),
                None => return Err(cur.err("unterminated string literal")),
            },
            Some(c) => out.push(c),
        }
    }
    Ok(out)
}

fn parse_keyword(cur: &mut Cursor) -> Result<RawForm, ParseError> {
    cur.advance(); // ':'
    let name = read_ident(cur);
    if name.is_empty() {
        return Err(cur.err("expected keyword name after ':'"));
    }
    if name.contains('/') {
        return Err(cur.err(format!("namespaced keyword ':{name}' is not allowed")));
    }
    Ok(RawForm::Keyword(name))
}

fn read_ident(cur: &mut Cursor) -> String {
    let mut out = String::new();
    while let Some(c) = cur.peek() {
        if is_ident_char(c) {
            out.push(c);
            cur.advance();
        } else {
            break;
        }
    }
    out
}

fn parse_number(cur: &mut Cursor) -> Result<RawForm, ParseError> {
    let rest = cur.rest_str();
    match lex_number_body(&rest) {
        Ok((_remaining, body)) => {
            let is_float = body.contains('.') || body.contains('e') || body.contains('E');
            let consumed_chars = body.chars().count();
            let body = body.to_string();
            for _ in 0..consumed_chars {
                cur.advance();
            }
            if is_float {
                let value: f64 = body
                    .parse()
                    .map_err(|_| cur.err(format!("invalid float literal '{body}'")))?;
                Ok(RawForm::Float(value))
            } else {
                let value: i64 = body
                    .parse()
                    .map_err(|_| cur.err(format!("invalid integer literal '{body}'")))?;
                Ok(RawForm::Int(value))
            }
        }
        Err(_) => Err(cur.err("invalid numeric literal")),
    }
}

fn parse_symbol_like(cur: &mut Cursor) -> Result<RawForm, ParseError> {
    let name = read_ident(cur);
    match name.as_str() {
        "nil" => return Ok(RawForm::Nil),
        "true" => return Ok(RawForm::Bool(true)),
        "false" => return Ok(RawForm::Bool(false)),
        _ => {}
    }
    if name != "/" {
        if let Some(idx) = name.find('/') {
            let (ns, rest) = name.split_at(idx);
            let name_part = &rest[1..];
            if !ns.is_empty() && !name_part.is_empty() && !name_part.contains('/') {
                return Ok(RawForm::NamespacedSymbol(ns.to_string(), name_part.to_string()));
            }
        }
    }
    Ok(RawForm::Symbol(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literals() {
        assert_eq!(parse_one("nil").unwrap(), RawForm::Nil);
        assert_eq!(parse_one("true").unwrap(), RawForm::Bool(true));
        assert_eq!(parse_one("false").unwrap(), RawForm::Bool(false));
        assert_eq!(parse_one("42").unwrap(), RawForm::Int(42));
        assert_eq!(parse_one("-7").unwrap(), RawForm::Int(-7));
        assert_eq!(parse_one("3.5").unwrap(), RawForm::Float(3.5));
    }

    #[test]
    fn lexer_prefix_safety() {
        assert_eq!(parse_one("nilly").unwrap(), RawForm::Symbol("nilly".into()));
        assert_eq!(parse_one("true?").unwrap(), RawForm::Symbol("true?".into()));
        assert_eq!(
            parse_one("false-positive").unwrap(),
            RawForm::Symbol("false-positive".into())
        );
    }

    #[test]
    fn operator_symbols() {
        for op in ["+", "-", "*", "/", "=", "!=", "<", ">", "<=", ">=", "->", "->>"] {
            assert_eq!(parse_one(op).unwrap(), RawForm::Symbol(op.to_string()), "op={op}");
        }
    }

    #[test]
    fn namespaced_symbols() {
        assert_eq!(
            parse_one("ctx/orders").unwrap(),
            RawForm::NamespacedSymbol("ctx".into(), "orders".into())
        );
        assert_eq!(
            parse_one("tool/search").unwrap(),
            RawForm::NamespacedSymbol("tool".into(), "search".into())
        );
    }

    #[test]
    fn namespaced_keyword_fails() {
        assert!(parse_one(":foo/bar").is_err());
    }

    #[test]
    fn string_escapes() {
        assert_eq!(
            parse_one(r#""a\nb\"c""#).unwrap(),
            RawForm::Str("a\nb\"c".into())
        );
    }

    #[test]
    fn unterminated_string() {
        assert!(parse_one("\"abc").is_err());
    }

    #[test]
    fn literal_newline_in_string_rejected() {
        assert!(parse_one("\"abc\ndef\"").is_err());
    }

    #[test]
    fn unterminated_collection() {
        assert!(parse_one("(+ 1 2").is_err());
    }

    #[test]
    fn odd_map_forms() {
        assert!(parse_one("{:a 1 :b}").is_err());
    }

    #[test]
    fn collections_roundtrip() {
        let src = "(+ 1 [2 3] {:a 1} #{1 2})";
        let parsed = parse_one(src).unwrap();
        let printed = parsed.to_string();
        let reparsed = parse_one(&printed).unwrap();
        assert_eq!(parsed, reparsed);
    }

    #[test]
    fn comments_and_commas_are_whitespace() {
        let a = parse_one("(+ 1, 2 ; trailing comment\n)").unwrap();
        let b = parse_one("(+ 1 2)").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn multiple_top_level_forms() {
        let forms = parse_program("1 2 (+ 1 2)").unwrap();
        assert_eq!(forms.len(), 3);
    }
}
