//! The reader: turns raw text into a term tree.
//!
//! Two conceptual stages share one pass: token-level recognizers (atoms,
//! strings, comments) and a recursive-descent structure parser for lists,
//! dotted pairs, and the quote-family shorthands. `(`, `)`, and the dotted
//! `.` marker are three distinct token kinds; `.` only acts as a dot
//! marker when followed by a delimiter, so `.5` reads as a float and `a.b`
//! as a symbol.
//!
//! String literals are consumed verbatim between `"` marks with no escape
//! processing. `;` starts a comment running to end of line. `'e`, `` `e ``,
//! `,e`, and `,@e` read as `(quote e)`, `(quasiquote e)`, `(unquote e)`,
//! and `(unquote-splicing e)`.

use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::{take_till, take_while1},
    character::complete::{char, multispace1},
    combinator::value,
    error::ErrorKind,
    multi::many0,
    sequence::pair,
};

use crate::ast::Value;
use crate::{Error, MAX_PARSE_DEPTH, SyntaxError, SyntaxErrorKind};

/// Characters that terminate an atom token.
fn is_delimiter(c: char) -> bool {
    c.is_whitespace() || "();\"'`,".contains(c)
}

fn is_atom_char(c: char) -> bool {
    !is_delimiter(c)
}

/// Skip whitespace and `;` line comments.
fn skip_ws(input: &str) -> IResult<&str, ()> {
    value(
        (),
        many0(alt((
            value((), multispace1),
            value((), pair(char(';'), take_till(|c| c == '\n'))),
        ))),
    )
    .parse(input)
}

/// Classify a bare atom token: boolean, then exact integer, then float,
/// else symbol.
fn classify_atom(token: &str) -> Value {
    match token {
        "#t" => Value::Bool(true),
        "#f" => Value::Bool(false),
        _ => {
            if let Ok(n) = token.parse::<i64>() {
                Value::Integer(n)
            } else if let Ok(x) = token.parse::<f64>() {
                Value::Float(x)
            } else {
                Value::Symbol(token.to_owned())
            }
        }
    }
}

fn parse_atom(input: &str) -> IResult<&str, Value> {
    let (rest, token) = take_while1(is_atom_char).parse(input)?;
    Ok((rest, classify_atom(token)))
}

/// Parse a string literal: consumed verbatim until the closing `"`,
/// no escape processing.
fn parse_string(input: &str) -> IResult<&str, Value> {
    let (rest, _) = char('"').parse(input)?;
    match rest.find('"') {
        Some(idx) => Ok((&rest[idx + 1..], Value::String(rest[..idx].to_owned()))),
        // Unterminated string: report at end of input
        None => Err(nom::Err::Failure(nom::error::Error::new(
            "",
            ErrorKind::Eof,
        ))),
    }
}

/// Recognize the dotted-pair `.` marker: a `.` is only a dot marker when
/// the following character is a delimiter (or end of input).
fn strip_dot_marker(input: &str) -> Option<&str> {
    let rest = input.strip_prefix('.')?;
    match rest.chars().next() {
        None => Some(rest),
        Some(c) if is_delimiter(c) => Some(rest),
        Some(_) => None,
    }
}

/// Parse a list or dotted pair after the opening `(`.
fn parse_list(input: &str, depth: usize) -> IResult<&str, Value> {
    let (mut rest, _) = char('(').parse(input)?;
    let mut elements = Vec::new();

    loop {
        let (after_ws, ()) = skip_ws(rest)?;
        rest = after_ws;

        if let Some(after) = rest.strip_prefix(')') {
            return Ok((after, Value::List(elements)));
        }

        if rest.is_empty() {
            return Err(nom::Err::Failure(nom::error::Error::new(
                rest,
                ErrorKind::Eof,
            )));
        }

        if let Some(after_dot) = strip_dot_marker(rest) {
            // Dotted tail: at least one head element, exactly one tail
            // term, then the closing paren
            if elements.is_empty() {
                return Err(nom::Err::Failure(nom::error::Error::new(
                    rest,
                    ErrorKind::Verify,
                )));
            }
            let (after_tail, tail) = parse_expr(after_dot, depth + 1)?;
            let (after_ws, ()) = skip_ws(after_tail)?;
            return match after_ws.strip_prefix(')') {
                Some(after) => Ok((after, Value::DottedList(elements, Box::new(tail)))),
                None if after_ws.is_empty() => Err(nom::Err::Failure(nom::error::Error::new(
                    after_ws,
                    ErrorKind::Eof,
                ))),
                None => Err(nom::Err::Failure(nom::error::Error::new(
                    after_ws,
                    ErrorKind::Verify,
                ))),
            };
        }

        let (after_elem, element) = parse_expr(rest, depth + 1)?;
        elements.push(element);
        rest = after_elem;
    }
}

/// Wrap a quote-family shorthand: `'e` becomes `(quote e)` and so on.
fn parse_prefixed<'a>(
    form: &'static str,
    input: &'a str,
    depth: usize,
) -> IResult<&'a str, Value> {
    let (rest, inner) = parse_expr(input, depth + 1)?;
    Ok((
        rest,
        Value::List(vec![Value::Symbol(form.to_owned()), inner]),
    ))
}

fn parse_expr(input: &str, depth: usize) -> IResult<&str, Value> {
    if depth >= MAX_PARSE_DEPTH {
        return Err(nom::Err::Failure(nom::error::Error::new(
            input,
            ErrorKind::TooLarge,
        )));
    }

    let (input, ()) = skip_ws(input)?;
    let mut chars = input.chars();
    match chars.next() {
        None => Err(nom::Err::Error(nom::error::Error::new(
            input,
            ErrorKind::Eof,
        ))),
        Some('(') => parse_list(input, depth),
        Some('"') => parse_string(input),
        Some(')') => Err(nom::Err::Error(nom::error::Error::new(
            input,
            ErrorKind::Char,
        ))),
        Some('\'') => parse_prefixed("quote", chars.as_str(), depth),
        Some('`') => parse_prefixed("quasiquote", chars.as_str(), depth),
        Some(',') => {
            if let Some(rest) = chars.as_str().strip_prefix('@') {
                parse_prefixed("unquote-splicing", rest, depth)
            } else {
                parse_prefixed("unquote", chars.as_str(), depth)
            }
        }
        Some(_) => parse_atom(input),
    }
}

/// Convert nom parsing errors to a structured [`SyntaxError`].
fn syntax_error_from_nom(input: &str, error: nom::Err<nom::error::Error<&str>>) -> SyntaxError {
    match error {
        nom::Err::Error(e) | nom::Err::Failure(e) => {
            let position = input.len().saturating_sub(e.input.len());
            match e.code {
                ErrorKind::TooLarge => SyntaxError::new(
                    SyntaxErrorKind::TooDeeplyNested,
                    format!("expression too deeply nested (max depth: {MAX_PARSE_DEPTH})"),
                ),
                ErrorKind::Verify => SyntaxError::with_context(
                    SyntaxErrorKind::InvalidSyntax,
                    "malformed dotted-pair syntax",
                    input,
                    position,
                ),
                _ if position >= input.len() => SyntaxError::new(
                    SyntaxErrorKind::Incomplete,
                    "unexpected end of input while reading",
                ),
                _ if e.input.starts_with(')') => SyntaxError::with_context(
                    SyntaxErrorKind::InvalidSyntax,
                    "unexpected ')'",
                    input,
                    position,
                ),
                _ => SyntaxError::with_context(
                    SyntaxErrorKind::InvalidSyntax,
                    format!("invalid syntax at position {position}"),
                    input,
                    position,
                ),
            }
        }
        nom::Err::Incomplete(_) => {
            SyntaxError::new(SyntaxErrorKind::Incomplete, "incomplete input")
        }
    }
}

/// Parse one complete expression from the input. Comments and surrounding
/// whitespace are skipped; anything left over after the expression is a
/// `TrailingContent` error.
pub fn parse(input: &str) -> Result<Value, Error> {
    match parse_expr(input, 0) {
        Ok((rest, parsed)) => {
            let (trailing, ()) = skip_ws(rest).unwrap_or((rest, ()));
            if trailing.is_empty() {
                Ok(parsed)
            } else {
                let position = input.len().saturating_sub(trailing.len());
                Err(Error::Syntax(SyntaxError::with_context(
                    SyntaxErrorKind::TrailingContent,
                    "unexpected input after a complete expression",
                    input,
                    position,
                )))
            }
        }
        Err(e) => Err(Error::Syntax(syntax_error_from_nom(input, e))),
    }
}
