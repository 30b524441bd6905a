//! Minischeme - a minimal tree-walking Scheme interpreter
//!
//! This crate implements a small Lisp-family expression language: a reader
//! that turns parenthesized text into term trees, a lexically scoped
//! environment chain, and a recursive evaluator with the classic special
//! forms (`quote`, `if`, `define`, `set!`, `lambda`), derived forms
//! (`cond`, `let`) rewritten into primitive forms before evaluation, and an
//! escape-only `call/cc`.
//!
//! ## Semantics
//!
//! - Everything except `#f` is truthy: `(if 0 1 2)` evaluates to `1`.
//! - Integers and floats are classified at read time and arithmetic
//!   preserves the classification; `/` is true division and always
//!   produces a float.
//! - Closures capture their defining environment frame by reference, so
//!   `set!` through a captured frame is visible to every closure sharing it.
//! - `call/cc` provides a one-shot upward escape only. The escape procedure
//!   aborts back to its `call/cc` call site; invoking it after that call
//!   has returned is an error. Continuations are not re-entrant.
//! - Dotted pairs are data: a dotted term reaching the evaluator is an
//!   `UnsupportedForm` error.
//! - `quasiquote` is a stub that returns its argument unevaluated; there is
//!   no unquote-splicing expansion.
//!
//! ## Modules
//!
//! - `ast`: the `Value` term/value representation and its printer
//! - `reader`: S-expression parsing from text
//! - `evaluator`: environments, special forms, derived-form expansion
//! - `builtins`: the primitive procedure table, including `call/cc`

use std::fmt;

/// Maximum parsing depth to prevent stack overflow on adversarial nesting.
pub const MAX_PARSE_DEPTH: usize = 64;

/// Maximum evaluation depth. There is no tail-call elimination: every
/// nested evaluation is a new stack activation, so deep user recursion is
/// cut off here with an error rather than exhausting the host stack.
pub const MAX_EVAL_DEPTH: usize = 512;

/// Categorizes the different kinds of reader failures.
#[derive(Debug, PartialEq, Clone)]
pub enum SyntaxErrorKind {
    /// Invalid or unexpected syntax (unmatched `)`, malformed dotted tail)
    InvalidSyntax,
    /// Input ended before the expression was complete (EOF, unterminated
    /// string, unclosed parens)
    Incomplete,
    /// Expression nesting exceeded [`MAX_PARSE_DEPTH`]
    TooDeeplyNested,
    /// Extra input found after a complete, valid expression
    TrailingContent,
}

/// A structured error describing a reader failure.
#[derive(Debug, PartialEq, Clone)]
pub struct SyntaxError {
    pub kind: SyntaxErrorKind,
    pub message: String,
    /// Context snippet from the input showing where the error occurred
    pub context: Option<String>,
}

impl SyntaxError {
    pub fn new(kind: SyntaxErrorKind, message: impl Into<String>) -> Self {
        SyntaxError {
            kind,
            message: message.into(),
            context: None,
        }
    }

    /// Create a SyntaxError with a context snippet extracted from the input
    /// around a byte offset.
    pub fn with_context(
        kind: SyntaxErrorKind,
        message: impl Into<String>,
        input: &str,
        error_offset: usize,
    ) -> Self {
        const MAX_CONTEXT: usize = 60;

        let context_start = error_offset.saturating_sub(20);
        let snippet: String = input
            .chars()
            .skip(context_start)
            .take(MAX_CONTEXT)
            .collect();

        let mut display_context = String::new();
        if context_start > 0 {
            display_context.push_str("[...]");
        }
        display_context.push_str(&snippet);
        if context_start + snippet.len() < input.len() {
            display_context.push_str("[...]");
        }
        let display_context = display_context.replace('\n', "\\n").replace('\r', "");

        SyntaxError {
            kind,
            message: message.into(),
            context: Some(display_context),
        }
    }
}

/// Error types for the interpreter.
///
/// `ContinuationEscape` is an internal control signal, not a user-visible
/// error: it carries the value passed to a `call/cc` escape procedure up
/// the evaluation stack and is intercepted by the `call/cc` frame whose
/// token it carries. If one reaches the public evaluation boundary the
/// escape was invoked outside the extent of its `call/cc`, which is
/// reported as an unsupported form.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    Syntax(SyntaxError),
    /// Runtime fault: division by zero, arithmetic overflow, car of an
    /// empty list, and similar
    EvalError(String),
    /// An operand had the wrong type for the operation
    TypeMismatch(String),
    /// Symbol lookup or `set!` target not found in any enclosing frame
    UndefinedSymbol(String),
    /// Application head evaluated to a non-procedure
    NotCallable(String),
    /// Structurally valid term that is not evaluable (dotted pair as code,
    /// empty application, malformed special form)
    UnsupportedForm(String),
    /// Parameter/argument count mismatch on application
    ArityMismatch {
        expected: usize,
        got: usize,
        expression: Option<String>,
    },
    /// Internal carrier for the one-shot `call/cc` escape (see above)
    ContinuationEscape {
        token: u64,
        value: Box<crate::ast::Value>,
    },
}

impl Error {
    /// Create an ArityMismatch without expression context
    pub fn arity_mismatch(expected: usize, got: usize) -> Self {
        Error::ArityMismatch {
            expected,
            got,
            expression: None,
        }
    }

    /// Create an ArityMismatch with expression context
    pub fn arity_mismatch_with_expr(expected: usize, got: usize, expression: String) -> Self {
        Error::ArityMismatch {
            expected,
            got,
            expression: Some(expression),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Syntax(e) => {
                write!(f, "SyntaxError: {}", e.message)?;
                if let Some(context) = &e.context {
                    write!(f, "\nContext: {context}")?;
                }
                Ok(())
            }
            Error::EvalError(msg) => write!(f, "EvaluationError: {msg}"),
            Error::TypeMismatch(msg) => write!(f, "Type error: {msg}"),
            Error::UndefinedSymbol(name) => write!(f, "Undefined symbol: {name}"),
            Error::NotCallable(what) => write!(f, "Not callable: {what}"),
            Error::UnsupportedForm(msg) => write!(f, "Unsupported form: {msg}"),
            Error::ArityMismatch {
                expected,
                got,
                expression,
            } => match expression {
                Some(expr) => write!(
                    f,
                    "ArityMismatch: expression {expr}: expected {expected} arguments, got {got}"
                ),
                None => write!(
                    f,
                    "ArityMismatch: procedure expected {expected} arguments but got {got}"
                ),
            },
            Error::ContinuationEscape { .. } => write!(
                f,
                "Unsupported form: escape procedure invoked outside the extent of its call/cc"
            ),
        }
    }
}

pub mod ast;
pub mod builtins;
pub mod evaluator;
pub mod reader;
