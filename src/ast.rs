//! Core term/value representation for the interpreter. The main enum,
//! [`Value`], covers every term shape the reader produces (symbols, numbers,
//! booleans, strings, proper and dotted lists) plus the runtime-only shapes
//! (closures, primitives, the unspecified marker). Reader output and quoted
//! data share this representation, so quoting is the identity. Ergonomic
//! helper functions such as [`val`], [`sym`], and [`nil`] are provided for
//! convenient construction in code and tests, along with conversion traits
//! for common Rust types. Display output is the interpreter's printer:
//! lists as `(a b c)`, dotted pairs as `(a b . c)`, floats always carrying
//! a decimal point so they stay distinguishable from integers.

use crate::Error;
use crate::evaluator::Environment;
use std::sync::Arc;

/// Canonical signature of a host-provided primitive procedure.
pub type PrimitiveFn = dyn Fn(Vec<Value>) -> Result<Value, Error>;

/// Core term/value type of the interpreter.
///
/// To build a term, use the ergonomic helper functions:
/// - `val(42)` for values, `sym("name")` for symbols, `nil()` for empty lists
/// - `val([1, 2, 3])` for homogeneous lists
/// - `val(vec![sym("op"), val(42)])` for mixed lists
#[derive(Clone)]
pub enum Value {
    /// Exact integers, classified at read time
    Integer(i64),
    /// Floating-point numbers, classified at read time
    Float(f64),
    /// Boolean values; `#f` is the only falsy value
    Bool(bool),
    /// String literals
    String(String),
    /// Symbols (identifiers)
    Symbol(String),
    /// Proper lists; the empty list represents nil
    List(Vec<Value>),
    /// Dotted pairs: one or more head elements and a non-list tail
    DottedList(Vec<Value>, Box<Value>),
    /// User-defined closures. The captured environment is held by
    /// reference, not copied: the defining frame stays live and mutable
    /// for as long as any closure (or call activation) refers to it.
    Function {
        params: Vec<String>,
        body: Box<Value>,
        env: Environment,
    },
    /// Host-provided primitive procedures.
    /// Uses the id string for equality comparison instead of the pointer.
    Primitive {
        id: String,
        func: Arc<PrimitiveFn>,
    },
    /// The no-value marker (result of `define`, `set!`, an exhausted
    /// `cond`). Never equals itself or any other value, and the REPL
    /// suppresses it.
    Unspecified,
}

impl std::fmt::Debug for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Integer(n) => write!(f, "Integer({n})"),
            Value::Float(x) => write!(f, "Float({x})"),
            Value::Bool(b) => write!(f, "Bool({b})"),
            Value::String(s) => write!(f, "String(\"{s}\")"),
            Value::Symbol(s) => write!(f, "Symbol({s})"),
            Value::List(list) => {
                write!(f, "List(")?;
                for (i, v) in list.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{v:?}")?;
                }
                write!(f, ")")
            }
            Value::DottedList(head, tail) => {
                write!(f, "DottedList(")?;
                for v in head.iter() {
                    write!(f, "{v:?}, ")?;
                }
                write!(f, ". {tail:?})")
            }
            Value::Function { params, body, .. } => {
                write!(f, "Function(params={params:?}, body={body:?})")
            }
            Value::Primitive { id, .. } => write!(f, "Primitive({id})"),
            Value::Unspecified => write!(f, "Unspecified"),
        }
    }
}

// From trait implementations for Value - enables .into() conversion
impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

macro_rules! impl_from_integer {
    ($int_type:ty) => {
        impl From<$int_type> for Value {
            fn from(n: $int_type) -> Self {
                Value::Integer(n as i64)
            }
        }
    };
}

// Generate From implementations for the common integer types
impl_from_integer!(i8);
impl_from_integer!(i16);
impl_from_integer!(i32);
impl_from_integer!(i64); // No casting in this case
impl_from_integer!(u8);
impl_from_integer!(u16);
impl_from_integer!(u32);

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::List(v.into_iter().map(|x| x.into()).collect())
    }
}

impl<T: Into<Value>, const N: usize> From<[T; N]> for Value {
    fn from(arr: [T; N]) -> Self {
        Value::List(arr.into_iter().map(|x| x.into()).collect())
    }
}

impl<T: Into<Value> + Clone> From<&[T]> for Value {
    fn from(slice: &[T]) -> Self {
        Value::List(slice.iter().cloned().map(|x| x.into()).collect())
    }
}

/// Helper function for creating symbols - works great in mixed lists!
pub fn sym<S: AsRef<str>>(name: S) -> Value {
    Value::Symbol(name.as_ref().to_owned())
}

/// Helper function for creating Values - works great in mixed lists!
/// Accepts any type that can be converted to Value
pub fn val<T: Into<Value>>(value: T) -> Value {
    value.into()
}

/// Helper function for creating empty lists (nil) - follows Lisp/Scheme
/// conventions where nil represents the empty list
pub fn nil() -> Value {
    Value::List(vec![])
}

/// Print a float so it round-trips through the reader as a float: whole
/// values keep one decimal digit (`2.0`, not `2`).
fn fmt_float(f: &mut std::fmt::Formatter<'_>, x: f64) -> std::fmt::Result {
    if x.is_finite() && x.fract() == 0.0 {
        write!(f, "{x:.1}")
    } else {
        write!(f, "{x}")
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Integer(n) => write!(f, "{n}"),
            Value::Float(x) => fmt_float(f, *x),
            Value::Bool(b) => write!(f, "{}", if *b { "#t" } else { "#f" }),
            // The reader performs no escape processing, so strings are
            // printed back verbatim between their quote marks.
            Value::String(s) => write!(f, "\"{s}\""),
            Value::Symbol(s) => write!(f, "{s}"),
            Value::List(elements) => {
                write!(f, "(")?;
                for (i, elem) in elements.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{elem}")?;
                }
                write!(f, ")")
            }
            Value::DottedList(head, tail) => {
                write!(f, "(")?;
                for elem in head.iter() {
                    write!(f, "{elem} ")?;
                }
                write!(f, ". {tail})")
            }
            Value::Function { .. } => write!(f, "#<function>"),
            Value::Primitive { id, .. } => write!(f, "#<primitive:{id}>"),
            Value::Unspecified => write!(f, "#<unspecified>"),
        }
    }
}

impl Value {
    /// Check if a value represents nil (the empty list)
    pub fn is_nil(&self) -> bool {
        matches!(self, Value::List(list) if list.is_empty())
    }

    /// Check if a value is a procedure (closure or primitive)
    pub fn is_procedure(&self) -> bool {
        matches!(self, Value::Function { .. } | Value::Primitive { .. })
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Symbol(a), Value::Symbol(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::DottedList(h1, t1), Value::DottedList(h2, t2)) => h1 == h2 && t1 == t2,
            (Value::Primitive { id: id1, .. }, Value::Primitive { id: id2, .. }) => {
                // Compare primitives by id string, not function pointer
                id1 == id2
            }
            (
                Value::Function {
                    params: p1,
                    body: b1,
                    env: e1,
                },
                Value::Function {
                    params: p2,
                    body: b2,
                    env: e2,
                },
            ) => p1 == p2 && b1 == b2 && e1 == e2,
            (Value::Unspecified, _) | (_, Value::Unspecified) => false, // Unspecified never equals anything
            _ => false, // Different variants are never equal
        }
    }
}

#[cfg(test)]
mod helper_function_tests {
    use super::*;

    #[test]
    fn test_helper_functions_data_driven() {
        // Test cases as (Value, Value) tuples: (helper_result, expected_value)
        let test_cases = vec![
            // Basic numbers
            (val(42), Value::Integer(42)),
            (val(-17), Value::Integer(-17)),
            (val(i64::MAX), Value::Integer(i64::MAX)),
            (val(i64::MIN), Value::Integer(i64::MIN)),
            (val(3.5), Value::Float(3.5)),
            (val(-0.25), Value::Float(-0.25)),
            // Basic booleans and strings
            (val(true), Value::Bool(true)),
            (val("hello"), Value::String("hello".to_owned())),
            (val(""), Value::String(String::new())),
            // Sym, from both &str and String
            (sym("foo-bar?"), Value::Symbol("foo-bar?".to_owned())),
            (sym("-"), Value::Symbol("-".to_owned())),
            (sym(String::from("test")), Value::Symbol("test".to_owned())),
            // Empty list (nil)
            (nil(), Value::List(vec![])),
            // Lists from arrays of primitives
            (
                val([1, 2, 3]),
                Value::List(vec![
                    Value::Integer(1),
                    Value::Integer(2),
                    Value::Integer(3),
                ]),
            ),
            // Mixed type lists using helper functions
            (
                val(vec![sym("op"), val(42), val("result"), val(true)]),
                Value::List(vec![
                    Value::Symbol("op".to_owned()),
                    Value::Integer(42),
                    Value::String("result".to_owned()),
                    Value::Bool(true),
                ]),
            ),
        ];

        for (i, (actual, expected)) in test_cases.iter().enumerate() {
            assert!(
                !(actual != expected),
                "Test case {} failed:\n  Expected: {:?}\n  Got: {:?}",
                i + 1,
                expected,
                actual
            );
        }
    }

    #[test]
    fn test_numeric_variants_are_distinct() {
        // Integer/float classification is preserved: structurally distinct
        assert_ne!(val(2), val(2.0));
        assert_eq!(val(2.0), Value::Float(2.0));
    }

    #[test]
    fn test_unspecified_values() {
        // Unspecified never equals anything, including itself
        let unspec = Value::Unspecified;
        assert_ne!(unspec, unspec);
        assert_ne!(unspec, Value::Unspecified);
        assert_ne!(unspec, val(42));
    }

    #[test]
    fn test_display_formatting() {
        let cases = vec![
            (val(42), "42"),
            (val(-5), "-5"),
            (val(2.0), "2.0"),
            (val(2.5), "2.5"),
            (val(true), "#t"),
            (val(false), "#f"),
            (val("hi"), "\"hi\""),
            (sym("foo"), "foo"),
            (nil(), "()"),
            (val([1, 2, 3]), "(1 2 3)"),
            (
                Value::DottedList(vec![val(1)], Box::new(val(2))),
                "(1 . 2)",
            ),
            (
                Value::DottedList(vec![val(1), val(2)], Box::new(val(3))),
                "(1 2 . 3)",
            ),
            (Value::Unspecified, "#<unspecified>"),
        ];

        for (value, expected) in cases {
            assert_eq!(format!("{value}"), expected);
        }
    }
}
