//! The primitive procedure table installed into the global frame.
//!
//! Every primitive is a plain `fn(&[Value]) -> Result<Value, Error>` paired
//! with an [`Arity`] in a static [`PrimitiveDef`] registry; registration
//! wraps each entry so the arity is validated before the function runs.
//! Arithmetic preserves the integer/float classification: `+ - *` fold with
//! overflow checking on integers and promote to float on mixed operands,
//! while `/` is true division and always produces a float.
//!
//! `call/cc` lives here too: it is an ordinary primitive whose escape
//! signal rides the error channel (see [`Error::ContinuationEscape`]).

use crate::ast::Value;
use crate::evaluator;
use crate::Error;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Argument-count contract for a primitive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Arity {
    Exact(usize),
    AtLeast(usize),
}

impl Arity {
    pub fn validate(&self, got: usize) -> Result<(), Error> {
        match *self {
            Arity::Exact(expected) if got == expected => Ok(()),
            Arity::AtLeast(min) if got >= min => Ok(()),
            Arity::Exact(expected) => Err(Error::arity_mismatch(expected, got)),
            Arity::AtLeast(min) => Err(Error::arity_mismatch(min, got)),
        }
    }
}

/// One entry in the primitive registry.
pub struct PrimitiveDef {
    pub name: &'static str,
    pub arity: Arity,
    pub func: fn(&[Value]) -> Result<Value, Error>,
}

/// The full primitive registry, installed by `create_global_env`.
pub fn primitive_defs() -> &'static [PrimitiveDef] {
    static DEFS: &[PrimitiveDef] = &[
        PrimitiveDef { name: "+", arity: Arity::AtLeast(1), func: add },
        PrimitiveDef { name: "-", arity: Arity::AtLeast(1), func: subtract },
        PrimitiveDef { name: "*", arity: Arity::AtLeast(1), func: multiply },
        PrimitiveDef { name: "/", arity: Arity::Exact(2), func: divide },
        PrimitiveDef { name: ">", arity: Arity::AtLeast(2), func: greater_than },
        PrimitiveDef { name: "<", arity: Arity::AtLeast(2), func: less_than },
        PrimitiveDef { name: ">=", arity: Arity::AtLeast(2), func: greater_or_equal },
        PrimitiveDef { name: "<=", arity: Arity::AtLeast(2), func: less_or_equal },
        PrimitiveDef { name: "=", arity: Arity::AtLeast(2), func: numeric_equal },
        PrimitiveDef { name: "abs", arity: Arity::Exact(1), func: abs },
        PrimitiveDef { name: "append", arity: Arity::AtLeast(0), func: append },
        PrimitiveDef { name: "begin", arity: Arity::AtLeast(1), func: begin },
        PrimitiveDef { name: "car", arity: Arity::Exact(1), func: car },
        PrimitiveDef { name: "cdr", arity: Arity::Exact(1), func: cdr },
        PrimitiveDef { name: "cons", arity: Arity::Exact(2), func: cons },
        PrimitiveDef { name: "eq?", arity: Arity::Exact(2), func: eq_p },
        PrimitiveDef { name: "equal?", arity: Arity::Exact(2), func: equal_p },
        PrimitiveDef { name: "length", arity: Arity::Exact(1), func: length },
        PrimitiveDef { name: "list", arity: Arity::AtLeast(0), func: list },
        PrimitiveDef { name: "list?", arity: Arity::Exact(1), func: list_p },
        PrimitiveDef { name: "map", arity: Arity::AtLeast(2), func: map },
        PrimitiveDef { name: "max", arity: Arity::AtLeast(1), func: max },
        PrimitiveDef { name: "min", arity: Arity::AtLeast(1), func: min },
        PrimitiveDef { name: "not", arity: Arity::Exact(1), func: not },
        PrimitiveDef { name: "null?", arity: Arity::Exact(1), func: null_p },
        PrimitiveDef { name: "number?", arity: Arity::Exact(1), func: number_p },
        PrimitiveDef { name: "procedure?", arity: Arity::Exact(1), func: procedure_p },
        PrimitiveDef { name: "round", arity: Arity::Exact(1), func: round },
        PrimitiveDef { name: "symbol?", arity: Arity::Exact(1), func: symbol_p },
        PrimitiveDef { name: "call/cc", arity: Arity::Exact(1), func: call_cc },
        PrimitiveDef { name: "sqrt", arity: Arity::Exact(1), func: sqrt },
        PrimitiveDef { name: "sin", arity: Arity::Exact(1), func: sin },
        PrimitiveDef { name: "cos", arity: Arity::Exact(1), func: cos },
        PrimitiveDef { name: "tan", arity: Arity::Exact(1), func: tan },
        PrimitiveDef { name: "atan", arity: Arity::Exact(1), func: atan },
        PrimitiveDef { name: "log", arity: Arity::Exact(1), func: log },
        PrimitiveDef { name: "exp", arity: Arity::Exact(1), func: exp },
        PrimitiveDef { name: "expt", arity: Arity::Exact(2), func: expt },
        PrimitiveDef { name: "floor", arity: Arity::Exact(1), func: floor },
        PrimitiveDef { name: "ceiling", arity: Arity::Exact(1), func: ceiling },
    ];
    DEFS
}

/// A number with its integer/float classification intact.
#[derive(Clone, Copy)]
enum Num {
    Int(i64),
    Float(f64),
}

impl Num {
    fn of(value: &Value) -> Result<Num, Error> {
        match value {
            Value::Integer(n) => Ok(Num::Int(*n)),
            Value::Float(f) => Ok(Num::Float(*f)),
            other => Err(Error::TypeMismatch(format!(
                "expected a number, got {other}"
            ))),
        }
    }

    fn as_f64(self) -> f64 {
        match self {
            Num::Int(n) => n as f64,
            Num::Float(f) => f,
        }
    }

    fn into_value(self) -> Value {
        match self {
            Num::Int(n) => Value::Integer(n),
            Num::Float(f) => Value::Float(f),
        }
    }
}

/// Fold a numeric operator over the arguments. Integer pairs stay integer
/// with overflow checking; any float operand promotes the rest of the fold.
fn numeric_fold(
    args: &[Value],
    op_name: &str,
    int_op: fn(i64, i64) -> Option<i64>,
    float_op: fn(f64, f64) -> f64,
) -> Result<Value, Error> {
    let mut acc = Num::of(&args[0])?;
    for arg in &args[1..] {
        let next = Num::of(arg)?;
        acc = match (acc, next) {
            (Num::Int(a), Num::Int(b)) => Num::Int(int_op(a, b).ok_or_else(|| {
                Error::EvalError(format!("integer overflow in {op_name}"))
            })?),
            (a, b) => Num::Float(float_op(a.as_f64(), b.as_f64())),
        };
    }
    Ok(acc.into_value())
}

fn add(args: &[Value]) -> Result<Value, Error> {
    numeric_fold(args, "+", i64::checked_add, |a, b| a + b)
}

fn subtract(args: &[Value]) -> Result<Value, Error> {
    // Single argument is negation
    if args.len() == 1 {
        return match Num::of(&args[0])? {
            Num::Int(n) => n
                .checked_neg()
                .map(Value::Integer)
                .ok_or_else(|| Error::EvalError("integer overflow in -".to_owned())),
            Num::Float(f) => Ok(Value::Float(-f)),
        };
    }
    numeric_fold(args, "-", i64::checked_sub, |a, b| a - b)
}

fn multiply(args: &[Value]) -> Result<Value, Error> {
    numeric_fold(args, "*", i64::checked_mul, |a, b| a * b)
}

/// True division: always a float, even for evenly dividing integers.
fn divide(args: &[Value]) -> Result<Value, Error> {
    let numerator = Num::of(&args[0])?.as_f64();
    let denominator = Num::of(&args[1])?.as_f64();
    if denominator == 0.0 {
        return Err(Error::EvalError("division by zero".to_owned()));
    }
    Ok(Value::Float(numerator / denominator))
}

/// Chain a comparison across adjacent argument pairs, promoting to float.
fn compare_chain(args: &[Value], cmp: fn(f64, f64) -> bool) -> Result<Value, Error> {
    let mut prev = Num::of(&args[0])?.as_f64();
    for arg in &args[1..] {
        let next = Num::of(arg)?.as_f64();
        if !cmp(prev, next) {
            return Ok(Value::Bool(false));
        }
        prev = next;
    }
    Ok(Value::Bool(true))
}

fn greater_than(args: &[Value]) -> Result<Value, Error> {
    compare_chain(args, |a, b| a > b)
}

fn less_than(args: &[Value]) -> Result<Value, Error> {
    compare_chain(args, |a, b| a < b)
}

fn greater_or_equal(args: &[Value]) -> Result<Value, Error> {
    compare_chain(args, |a, b| a >= b)
}

fn less_or_equal(args: &[Value]) -> Result<Value, Error> {
    compare_chain(args, |a, b| a <= b)
}

fn numeric_equal(args: &[Value]) -> Result<Value, Error> {
    compare_chain(args, |a, b| a == b)
}

fn abs(args: &[Value]) -> Result<Value, Error> {
    match Num::of(&args[0])? {
        Num::Int(n) => n
            .checked_abs()
            .map(Value::Integer)
            .ok_or_else(|| Error::EvalError("integer overflow in abs".to_owned())),
        Num::Float(f) => Ok(Value::Float(f.abs())),
    }
}

fn append(args: &[Value]) -> Result<Value, Error> {
    let mut combined = Vec::new();
    for arg in args {
        match arg {
            Value::List(items) => combined.extend(items.iter().cloned()),
            other => {
                return Err(Error::TypeMismatch(format!(
                    "append expects lists, got {other}"
                )));
            }
        }
    }
    Ok(Value::List(combined))
}

/// Arguments are already evaluated left to right by application, so
/// sequencing has happened by the time this runs.
fn begin(args: &[Value]) -> Result<Value, Error> {
    match args.last() {
        Some(last) => Ok(last.clone()),
        None => Err(Error::arity_mismatch(1, 0)),
    }
}

fn car(args: &[Value]) -> Result<Value, Error> {
    match &args[0] {
        Value::List(items) => items
            .first()
            .cloned()
            .ok_or_else(|| Error::EvalError("car of empty list".to_owned())),
        // DottedList heads are non-empty by construction
        Value::DottedList(head, _) => head
            .first()
            .cloned()
            .ok_or_else(|| Error::EvalError("car of empty list".to_owned())),
        other => Err(Error::TypeMismatch(format!("car expects a pair, got {other}"))),
    }
}

fn cdr(args: &[Value]) -> Result<Value, Error> {
    match &args[0] {
        Value::List(items) => {
            if items.is_empty() {
                Err(Error::EvalError("cdr of empty list".to_owned()))
            } else {
                Ok(Value::List(items[1..].to_vec()))
            }
        }
        Value::DottedList(head, tail) => {
            if head.len() == 1 {
                Ok((**tail).clone())
            } else {
                Ok(Value::DottedList(head[1..].to_vec(), tail.clone()))
            }
        }
        other => Err(Error::TypeMismatch(format!("cdr expects a pair, got {other}"))),
    }
}

/// Cons normalizes its result: onto a list prepends, onto a dotted list
/// extends its head, onto anything else forms a dotted pair.
fn cons(args: &[Value]) -> Result<Value, Error> {
    let head = args[0].clone();
    match &args[1] {
        Value::List(items) => {
            let mut combined = Vec::with_capacity(items.len() + 1);
            combined.push(head);
            combined.extend(items.iter().cloned());
            Ok(Value::List(combined))
        }
        Value::DottedList(existing, tail) => {
            let mut combined = Vec::with_capacity(existing.len() + 1);
            combined.push(head);
            combined.extend(existing.iter().cloned());
            Ok(Value::DottedList(combined, tail.clone()))
        }
        other => Ok(Value::DottedList(vec![head], Box::new(other.clone()))),
    }
}

/// Value identity on atoms. Compound values never answer `#t`: there is no
/// object identity to observe in a value-semantic representation.
fn eq_p(args: &[Value]) -> Result<Value, Error> {
    let identical = match (&args[0], &args[1]) {
        (Value::List(_) | Value::DottedList(..), _) => false,
        (_, Value::List(_) | Value::DottedList(..)) => false,
        (a, b) => a == b,
    };
    Ok(Value::Bool(identical))
}

/// Deep structural equality. Integers and floats are distinct even when
/// numerically equal; use `=` for numeric comparison.
fn equal_p(args: &[Value]) -> Result<Value, Error> {
    Ok(Value::Bool(args[0] == args[1]))
}

fn length(args: &[Value]) -> Result<Value, Error> {
    match &args[0] {
        Value::List(items) => Ok(Value::Integer(items.len() as i64)),
        other => Err(Error::TypeMismatch(format!(
            "length expects a list, got {other}"
        ))),
    }
}

fn list(args: &[Value]) -> Result<Value, Error> {
    Ok(Value::List(args.to_vec()))
}

fn list_p(args: &[Value]) -> Result<Value, Error> {
    Ok(Value::Bool(matches!(args[0], Value::List(_))))
}

/// Apply a procedure across one or more lists, zipping to the shortest.
fn map(args: &[Value]) -> Result<Value, Error> {
    let proc = &args[0];
    let mut lists = Vec::with_capacity(args.len() - 1);
    for arg in &args[1..] {
        match arg {
            Value::List(items) => lists.push(items),
            other => {
                return Err(Error::TypeMismatch(format!(
                    "map expects lists, got {other}"
                )));
            }
        }
    }

    let shortest = lists.iter().map(|items| items.len()).min().unwrap_or(0);
    let mut results = Vec::with_capacity(shortest);
    for index in 0..shortest {
        let row: Vec<Value> = lists.iter().map(|items| items[index].clone()).collect();
        results.push(evaluator::apply(proc, row)?);
    }
    Ok(Value::List(results))
}

fn extremum(args: &[Value], keep_left: fn(f64, f64) -> bool) -> Result<Value, Error> {
    let mut best = Num::of(&args[0])?;
    for arg in &args[1..] {
        let candidate = Num::of(arg)?;
        if !keep_left(best.as_f64(), candidate.as_f64()) {
            best = candidate;
        }
    }
    Ok(best.into_value())
}

fn max(args: &[Value]) -> Result<Value, Error> {
    extremum(args, |left, right| left >= right)
}

fn min(args: &[Value]) -> Result<Value, Error> {
    extremum(args, |left, right| left <= right)
}

fn not(args: &[Value]) -> Result<Value, Error> {
    Ok(Value::Bool(args[0] == Value::Bool(false)))
}

fn null_p(args: &[Value]) -> Result<Value, Error> {
    Ok(Value::Bool(args[0].is_nil()))
}

fn number_p(args: &[Value]) -> Result<Value, Error> {
    Ok(Value::Bool(matches!(
        args[0],
        Value::Integer(_) | Value::Float(_)
    )))
}

fn procedure_p(args: &[Value]) -> Result<Value, Error> {
    Ok(Value::Bool(args[0].is_procedure()))
}

/// Round half to even, producing an integer.
fn round(args: &[Value]) -> Result<Value, Error> {
    match Num::of(&args[0])? {
        Num::Int(n) => Ok(Value::Integer(n)),
        Num::Float(f) => {
            let rounded = if (f - f.trunc()).abs() == 0.5 {
                // Ties go to the even neighbor
                let lower = f.floor();
                if (lower as i64) % 2 == 0 {
                    lower
                } else {
                    lower + 1.0
                }
            } else {
                f.round()
            };
            float_to_integer(rounded, "round")
        }
    }
}

fn symbol_p(args: &[Value]) -> Result<Value, Error> {
    Ok(Value::Bool(matches!(args[0], Value::Symbol(_))))
}

static NEXT_ESCAPE_TOKEN: AtomicU64 = AtomicU64::new(0);

/// `(call/cc proc)`: call `proc` with a one-shot escape procedure.
///
/// Each invocation draws a fresh token; the escape procedure raises a
/// `ContinuationEscape` signal carrying that token, which unwinds through
/// ordinary error propagation. Only the matching `call/cc` frame intercepts
/// the signal and yields the carried value; a foreign token keeps
/// propagating to an outer frame. A signal that escapes every frame means
/// the escape procedure outlived its `call/cc` and is rejected at the
/// public evaluation boundary.
fn call_cc(args: &[Value]) -> Result<Value, Error> {
    let token = NEXT_ESCAPE_TOKEN.fetch_add(1, Ordering::Relaxed);
    let escape = Value::Primitive {
        id: format!("continuation-{token}"),
        func: Arc::new(move |escape_args: Vec<Value>| {
            let got = escape_args.len();
            match escape_args.into_iter().next() {
                Some(value) if got == 1 => Err(Error::ContinuationEscape {
                    token,
                    value: Box::new(value),
                }),
                _ => Err(Error::arity_mismatch(1, got)),
            }
        }),
    };

    match evaluator::apply(&args[0], vec![escape]) {
        Err(Error::ContinuationEscape {
            token: carried,
            value,
        }) if carried == token => Ok(*value),
        other => other,
    }
}

fn unary_float(args: &[Value], op: fn(f64) -> f64) -> Result<Value, Error> {
    Ok(Value::Float(op(Num::of(&args[0])?.as_f64())))
}

fn sqrt(args: &[Value]) -> Result<Value, Error> {
    let x = Num::of(&args[0])?.as_f64();
    if x < 0.0 {
        return Err(Error::EvalError(format!("sqrt domain error: {x}")));
    }
    Ok(Value::Float(x.sqrt()))
}

fn sin(args: &[Value]) -> Result<Value, Error> {
    unary_float(args, f64::sin)
}

fn cos(args: &[Value]) -> Result<Value, Error> {
    unary_float(args, f64::cos)
}

fn tan(args: &[Value]) -> Result<Value, Error> {
    unary_float(args, f64::tan)
}

fn atan(args: &[Value]) -> Result<Value, Error> {
    unary_float(args, f64::atan)
}

/// Natural logarithm.
fn log(args: &[Value]) -> Result<Value, Error> {
    let x = Num::of(&args[0])?.as_f64();
    if x <= 0.0 {
        return Err(Error::EvalError(format!("log domain error: {x}")));
    }
    Ok(Value::Float(x.ln()))
}

fn exp(args: &[Value]) -> Result<Value, Error> {
    unary_float(args, f64::exp)
}

/// Exponentiation; always a float, like `/`.
fn expt(args: &[Value]) -> Result<Value, Error> {
    let base = Num::of(&args[0])?.as_f64();
    let exponent = Num::of(&args[1])?.as_f64();
    Ok(Value::Float(base.powf(exponent)))
}

fn floor(args: &[Value]) -> Result<Value, Error> {
    match Num::of(&args[0])? {
        Num::Int(n) => Ok(Value::Integer(n)),
        Num::Float(f) => float_to_integer(f.floor(), "floor"),
    }
}

fn ceiling(args: &[Value]) -> Result<Value, Error> {
    match Num::of(&args[0])? {
        Num::Int(n) => Ok(Value::Integer(n)),
        Num::Float(f) => float_to_integer(f.ceil(), "ceiling"),
    }
}

fn float_to_integer(f: f64, op: &str) -> Result<Value, Error> {
    if !f.is_finite() || f < i64::MIN as f64 || f > i64::MAX as f64 {
        return Err(Error::EvalError(format!(
            "{op} result out of integer range: {f}"
        )));
    }
    Ok(Value::Integer(f as i64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{nil, sym, val};
    use crate::evaluator::create_global_env;
    use crate::reader::parse;

    fn eval_str(input: &str) -> Result<Value, Error> {
        let env = create_global_env();
        evaluator::eval(&parse(input).expect("test input must parse"), &env)
    }

    fn expect_value(input: &str, expected: Value) {
        match eval_str(input) {
            Ok(actual) => assert!(
                actual == expected,
                "'{input}': expected {expected:?}, got {actual:?}"
            ),
            Err(err) => panic!("'{input}': unexpected error {err:?}"),
        }
    }

    fn expect_error(input: &str, fragment: &str) {
        match eval_str(input) {
            Ok(value) => panic!("'{input}': expected error containing '{fragment}', got {value:?}"),
            Err(err) => {
                let message = format!("{err}");
                assert!(
                    message.contains(fragment),
                    "'{input}': error should contain '{fragment}', got: {message}"
                );
            }
        }
    }

    #[test]
    fn test_arithmetic() {
        let cases: Vec<(&str, Value)> = vec![
            ("(+ 1 2)", val(3)),
            ("(+ 1 2 3 4)", val(10)),
            ("(+ 5)", val(5)),
            ("(- 10 3)", val(7)),
            ("(- 10 3 2)", val(5)),
            ("(- 7)", val(-7)),
            ("(* 2 3 4)", val(24)),
            // Mixed operands promote to float
            ("(+ 1 2.5)", val(3.5)),
            ("(* 2 1.5)", val(3.0)),
            ("(- 1.0 1)", val(0.0)),
            // True division is always float
            ("(/ 6 3)", val(2.0)),
            ("(/ 7 2)", val(3.5)),
            ("(/ 1 3)", Value::Float(1.0 / 3.0)),
        ];
        for (input, expected) in cases {
            expect_value(input, expected);
        }

        expect_error("(/ 1 0)", "division by zero");
        expect_error("(/ 1.0 0.0)", "division by zero");
        expect_error("(+ 9223372036854775807 1)", "overflow");
        expect_error("(- -9223372036854775808)", "overflow");
        expect_error("(+ 1 \"two\")", "expected a number");
        expect_error("(+)", "ArityMismatch");
        expect_error("(/ 1)", "ArityMismatch");
        expect_error("(/ 1 2 3)", "ArityMismatch");
    }

    #[test]
    fn test_comparisons() {
        let cases: Vec<(&str, Value)> = vec![
            ("(> 3 2)", val(true)),
            ("(> 2 3)", val(false)),
            ("(> 3 2 1)", val(true)),
            ("(> 3 2 2)", val(false)),
            ("(< 1 2 3)", val(true)),
            ("(>= 2 2 1)", val(true)),
            ("(<= 1 1 2)", val(true)),
            ("(= 2 2)", val(true)),
            ("(= 2 3)", val(false)),
            // Numeric equality crosses the int/float divide
            ("(= 2 2.0)", val(true)),
            ("(< 1 1.5 2)", val(true)),
        ];
        for (input, expected) in cases {
            expect_value(input, expected);
        }
        expect_error("(> 1)", "ArityMismatch");
        expect_error("(< 1 'a)", "expected a number");
    }

    #[test]
    fn test_list_operations() {
        let cases: Vec<(&str, Value)> = vec![
            ("(car '(1 2 3))", val(1)),
            ("(cdr '(1 2 3))", val([2, 3])),
            ("(cdr '(1))", nil()),
            ("(car '(1 . 2))", val(1)),
            ("(cdr '(1 . 2))", val(2)),
            ("(cdr '(1 2 . 3))", Value::DottedList(vec![val(2)], Box::new(val(3)))),
            // cons normalization
            ("(cons 1 '(2 3))", val([1, 2, 3])),
            ("(cons 1 '())", val([1])),
            ("(cons 1 2)", Value::DottedList(vec![val(1)], Box::new(val(2)))),
            (
                "(cons 1 '(2 . 3))",
                Value::DottedList(vec![val(1), val(2)], Box::new(val(3))),
            ),
            ("(list 1 2 3)", val([1, 2, 3])),
            ("(list)", nil()),
            ("(length '(1 2 3))", val(3)),
            ("(length '())", val(0)),
            ("(append '(1 2) '(3 4))", val([1, 2, 3, 4])),
            ("(append '(1) '() '(2))", val([1, 2])),
            ("(append)", nil()),
            ("(list? '(1 2))", val(true)),
            ("(list? '())", val(true)),
            ("(list? '(1 . 2))", val(false)),
            ("(list? 5)", val(false)),
            ("(null? '())", val(true)),
            ("(null? '(1))", val(false)),
            ("(null? 0)", val(false)),
        ];
        for (input, expected) in cases {
            expect_value(input, expected);
        }

        expect_error("(car '())", "car of empty list");
        expect_error("(cdr '())", "cdr of empty list");
        expect_error("(car 5)", "car expects a pair");
        expect_error("(length '(1 . 2))", "length expects a list");
        expect_error("(append '(1) 2)", "append expects lists");
    }

    #[test]
    fn test_map() {
        let cases: Vec<(&str, Value)> = vec![
            ("(map (lambda (x) (* x x)) '(1 2 3))", val([1, 4, 9])),
            ("(map + '(1 2) '(10 20))", val([11, 22])),
            // Zips to the shortest list
            ("(map + '(1 2 3) '(10 20))", val([11, 22])),
            ("(map car '((1 2) (3 4)))", val([1, 3])),
            ("(map + '())", nil()),
        ];
        for (input, expected) in cases {
            expect_value(input, expected);
        }
        expect_error("(map + 5)", "map expects lists");
        expect_error("(map 5 '(1 2))", "Not callable");
    }

    #[test]
    fn test_predicates_and_identity() {
        let cases: Vec<(&str, Value)> = vec![
            ("(not #f)", val(true)),
            ("(not #t)", val(false)),
            ("(not 0)", val(false)),
            ("(not '())", val(false)),
            ("(number? 3)", val(true)),
            ("(number? 3.5)", val(true)),
            ("(number? \"3\")", val(false)),
            ("(symbol? 'a)", val(true)),
            ("(symbol? \"a\")", val(false)),
            ("(procedure? car)", val(true)),
            ("(procedure? (lambda (x) x))", val(true)),
            ("(procedure? 'car)", val(false)),
            // eq? is value identity on atoms only
            ("(eq? 'a 'a)", val(true)),
            ("(eq? 'a 'b)", val(false)),
            ("(eq? 1 1)", val(true)),
            ("(eq? 1 1.0)", val(false)),
            ("(eq? \"s\" \"s\")", val(true)),
            ("(eq? car car)", val(true)),
            ("(eq? '(1 2) '(1 2))", val(false)),
            ("(eq? '() '())", val(false)),
            // equal? is deep structural
            ("(equal? '(1 2) '(1 2))", val(true)),
            ("(equal? '(1 (2 3)) '(1 (2 3)))", val(true)),
            ("(equal? '(1 2) '(1 3))", val(false)),
            ("(equal? '(1 . 2) '(1 . 2))", val(true)),
            ("(equal? 1 1.0)", val(false)),
        ];
        for (input, expected) in cases {
            expect_value(input, expected);
        }
    }

    #[test]
    fn test_numeric_library() {
        let cases: Vec<(&str, Value)> = vec![
            ("(abs -5)", val(5)),
            ("(abs 5)", val(5)),
            ("(abs -2.5)", val(2.5)),
            ("(max 1 2 3)", val(3)),
            ("(max 1 2.5 2)", val(2.5)),
            ("(min 3 1 2)", val(1)),
            ("(min 1)", val(1)),
            // round is half-to-even and returns an integer
            ("(round 2.5)", val(2)),
            ("(round 3.5)", val(4)),
            ("(round -2.5)", val(-2)),
            ("(round 2.4)", val(2)),
            ("(round 2.6)", val(3)),
            ("(round 7)", val(7)),
            ("(floor 2.7)", val(2)),
            ("(floor -2.3)", val(-3)),
            ("(ceiling 2.3)", val(3)),
            ("(ceiling -2.7)", val(-2)),
            ("(floor 4)", val(4)),
            ("(sqrt 9)", val(3.0)),
            ("(sqrt 2.25)", val(1.5)),
            ("(exp 0)", val(1.0)),
            ("(log 1)", val(0.0)),
            ("(sin 0)", val(0.0)),
            ("(cos 0)", val(1.0)),
            ("(tan 0)", val(0.0)),
            ("(atan 0)", val(0.0)),
            ("(expt 2 10)", val(1024.0)),
            ("(expt 4 0.5)", val(2.0)),
        ];
        for (input, expected) in cases {
            expect_value(input, expected);
        }

        expect_error("(sqrt -1)", "sqrt domain error");
        expect_error("(log 0)", "log domain error");
        expect_error("(abs 'a)", "expected a number");
    }

    #[test]
    fn test_math_constants() {
        let env = create_global_env();
        let pi = evaluator::eval(&parse("pi").unwrap(), &env).unwrap();
        assert_eq!(pi, Value::Float(std::f64::consts::PI));
        let circumference =
            evaluator::eval(&parse("(* 2 pi 10)").unwrap(), &env).unwrap();
        assert_eq!(circumference, Value::Float(2.0 * std::f64::consts::PI * 10.0));
        let euler = evaluator::eval(&parse("e").unwrap(), &env).unwrap();
        assert_eq!(euler, Value::Float(std::f64::consts::E));
    }

    #[test]
    fn test_begin_returns_last() {
        expect_value("(begin 1 2 3)", val(3));
        expect_value("(begin 42)", val(42));
        expect_error("(begin)", "ArityMismatch");
    }

    #[test]
    fn test_call_cc_as_a_primitive_value() {
        // call/cc is an ordinary binding, usable in any operator position
        expect_value("((if #t call/cc car) (lambda (k) (k 7)))", val(7));
        expect_value("(procedure? call/cc)", val(true));
        expect_error("(call/cc (lambda (k) (k 1 2)))", "ArityMismatch");
    }

    #[test]
    fn test_arity_validation() {
        assert!(Arity::Exact(2).validate(2).is_ok());
        assert!(matches!(
            Arity::Exact(2).validate(3),
            Err(Error::ArityMismatch {
                expected: 2,
                got: 3,
                ..
            })
        ));
        assert!(Arity::AtLeast(1).validate(5).is_ok());
        assert!(Arity::AtLeast(1).validate(1).is_ok());
        assert!(matches!(
            Arity::AtLeast(2).validate(1),
            Err(Error::ArityMismatch {
                expected: 2,
                got: 1,
                ..
            })
        ));
    }

    #[test]
    fn test_every_primitive_is_installed() {
        let env = create_global_env();
        for def in primitive_defs() {
            let bound = env.get(def.name);
            assert!(
                matches!(bound, Some(Value::Primitive { .. })),
                "{} missing from the global frame",
                def.name
            );
        }
        assert_eq!(env.get("pi"), Some(Value::Float(std::f64::consts::PI)));
    }

    #[test]
    fn test_symbol_quoting_in_tests_uses_data() {
        // Symbols from quote are plain data to the predicates
        expect_value("(symbol? (car '(a b)))", val(true));
        expect_value("(eq? (car '(a b)) 'a)", val(true));
        assert_eq!(eval_str("'a").unwrap(), sym("a"));
    }
}
