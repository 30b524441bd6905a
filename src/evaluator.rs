//! The evaluator: environment chains, the special-form dispatch loop, and
//! the derived-form expander.
//!
//! Evaluation is a plain recursive descent with no persisted state between
//! calls. Special forms (`quote`, `if`, `define`, `set!`, `lambda`,
//! `quasiquote`) are dispatched on the head symbol of a list term before
//! generic application; `cond` and `let` are rewritten into primitive forms
//! by the expander and re-dispatched. Everything else is application:
//! evaluate the head to a procedure, evaluate the arguments left to right,
//! apply.
//!
//! Environment frames are shared, mutable structures (`Rc<RefCell>`): a
//! frame is created per procedure application and is jointly owned by the
//! call activation and by any closure capturing it, so `set!` through a
//! captured frame is visible to every closure sharing it.

use crate::ast::{PrimitiveFn, Value};
use crate::builtins::{self, Arity};
use crate::{Error, MAX_EVAL_DEPTH};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

/// One level of the lexical environment chain. Cloning an `Environment` is
/// cheap and aliases the same frame; use [`Environment::with_outer`] or
/// [`Environment::from_bindings`] to create a genuinely new frame.
#[derive(Clone, Default)]
pub struct Environment {
    frame: Rc<RefCell<Frame>>,
}

#[derive(Default)]
struct Frame {
    bindings: HashMap<String, Value>,
    outer: Option<Environment>,
}

impl PartialEq for Environment {
    fn eq(&self, other: &Self) -> bool {
        // Frame identity, not contents: two environments are equal only if
        // they alias the same frame
        Rc::ptr_eq(&self.frame, &other.frame)
    }
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Environment({} bindings)", self.frame.borrow().bindings.len())
    }
}

impl Environment {
    /// Create a fresh frame with no outer link (a global frame).
    pub fn new() -> Self {
        Environment::default()
    }

    /// Create an empty frame chained to `outer`.
    pub fn with_outer(outer: &Environment) -> Self {
        Environment {
            frame: Rc::new(RefCell::new(Frame {
                bindings: HashMap::new(),
                outer: Some(outer.clone()),
            })),
        }
    }

    /// Create the activation frame for a procedure application: formals are
    /// paired to arguments positionally. A length mismatch is an
    /// `ArityMismatch` error, never a silent truncation.
    pub fn from_bindings(
        params: &[String],
        args: Vec<Value>,
        outer: &Environment,
    ) -> Result<Self, Error> {
        if params.len() != args.len() {
            return Err(Error::arity_mismatch(params.len(), args.len()));
        }
        let bindings = params.iter().cloned().zip(args).collect();
        Ok(Environment {
            frame: Rc::new(RefCell::new(Frame {
                bindings,
                outer: Some(outer.clone()),
            })),
        })
    }

    /// Insert or overwrite a binding in this frame only.
    pub fn define(&self, name: impl Into<String>, value: Value) {
        self.frame.borrow_mut().bindings.insert(name.into(), value);
    }

    /// Look up a symbol through zero or more outer-frame links.
    pub fn get(&self, name: &str) -> Option<Value> {
        let frame = self.frame.borrow();
        if let Some(value) = frame.bindings.get(name) {
            return Some(value.clone());
        }
        let outer = frame.outer.clone();
        drop(frame);
        outer.and_then(|outer| outer.get(name))
    }

    /// Overwrite `name` in the innermost frame that already binds it,
    /// walking outward. Fails if no enclosing frame binds it.
    pub fn set(&self, name: &str, value: Value) -> Result<(), Error> {
        {
            let mut frame = self.frame.borrow_mut();
            if frame.bindings.contains_key(name) {
                frame.bindings.insert(name.to_owned(), value);
                return Ok(());
            }
        }
        let outer = self.frame.borrow().outer.clone();
        match outer {
            Some(outer) => outer.set(name, value),
            None => Err(Error::UndefinedSymbol(name.to_owned())),
        }
    }

    /// Register a host primitive in this frame. The provided arity is
    /// validated on every call before the function sees the arguments.
    pub fn register_primitive(
        &self,
        name: &str,
        arity: Arity,
        func: fn(&[Value]) -> Result<Value, Error>,
    ) {
        let wrapped: Arc<PrimitiveFn> = Arc::new(move |args: Vec<Value>| {
            arity.validate(args.len())?;
            func(&args)
        });
        self.define(
            name,
            Value::Primitive {
                id: name.to_owned(),
                func: wrapped,
            },
        );
    }

    /// Get all bindings in this environment and its outer frames.
    /// Returns a Vec of (name, value) pairs sorted by name.
    pub fn get_all_bindings(&self) -> Vec<(String, Value)> {
        let mut bindings = HashMap::new();

        // Start with outer bindings so local ones can override them
        let outer = self.frame.borrow().outer.clone();
        if let Some(outer) = outer {
            for (name, value) in outer.get_all_bindings() {
                bindings.insert(name, value);
            }
        }

        for (name, value) in &self.frame.borrow().bindings {
            bindings.insert(name.clone(), value.clone());
        }

        let mut result: Vec<_> = bindings.into_iter().collect();
        result.sort_by(|a, b| a.0.cmp(&b.0));
        result
    }
}

/// Create a global environment with the full primitive table and the math
/// constants installed.
pub fn create_global_env() -> Environment {
    let env = Environment::new();
    for def in builtins::primitive_defs() {
        env.register_primitive(def.name, def.arity, def.func);
    }
    env.define("pi", Value::Float(std::f64::consts::PI));
    env.define("e", Value::Float(std::f64::consts::E));
    env
}

thread_local! {
    static EVAL_DEPTH: Cell<usize> = Cell::new(0);
}

/// RAII ticket for one level of evaluation depth. The counter is
/// thread-local rather than a function argument so the depth keeps
/// accumulating across re-entry through primitives (`map`, `call/cc`)
/// that apply procedures mid-evaluation.
struct DepthGuard;

impl DepthGuard {
    fn enter() -> Result<DepthGuard, Error> {
        let depth = EVAL_DEPTH.with(Cell::get);
        if depth >= MAX_EVAL_DEPTH {
            return Err(Error::EvalError(format!(
                "evaluation depth limit exceeded (max: {MAX_EVAL_DEPTH})"
            )));
        }
        EVAL_DEPTH.with(|d| d.set(depth + 1));
        Ok(DepthGuard)
    }
}

impl Drop for DepthGuard {
    fn drop(&mut self) {
        EVAL_DEPTH.with(|d| d.set(d.get().saturating_sub(1)));
    }
}

/// Evaluate a term (public API).
///
/// A `call/cc` escape signal that reaches this boundary means the escape
/// procedure was invoked after its `call/cc` had already returned; that is
/// reported as an unsupported form, never surfaced as the raw signal.
pub fn eval(expr: &Value, env: &Environment) -> Result<Value, Error> {
    match eval_with_depth_tracking(expr, env) {
        Err(Error::ContinuationEscape { .. }) => Err(Error::UnsupportedForm(
            "escape procedure invoked outside the extent of its call/cc".to_owned(),
        )),
        other => other,
    }
}

/// Evaluate a term with depth tracking to prevent stack overflow.
fn eval_with_depth_tracking(expr: &Value, env: &Environment) -> Result<Value, Error> {
    let _depth = DepthGuard::enter()?;
    match expr {
        // Self-evaluating forms
        Value::Integer(_)
        | Value::Float(_)
        | Value::Bool(_)
        | Value::String(_)
        | Value::Function { .. }
        | Value::Primitive { .. }
        | Value::Unspecified => Ok(expr.clone()),

        // Variable lookup
        Value::Symbol(name) => env
            .get(name)
            .ok_or_else(|| Error::UndefinedSymbol(name.clone())),

        // Dotted pairs are data, not code
        Value::DottedList(..) => Err(Error::UnsupportedForm(format!(
            "dotted pair is not evaluable: {expr}"
        ))),

        Value::List(elements) => eval_list(elements, env),
    }
}

/// Evaluate a list term: special forms and derived forms are dispatched on
/// the head symbol; everything else is generic application.
fn eval_list(elements: &[Value], env: &Environment) -> Result<Value, Error> {
    match elements {
        [] => Err(Error::UnsupportedForm(
            "cannot evaluate an empty application: ()".to_owned(),
        )),

        [Value::Symbol(head), args @ ..] => match head.as_str() {
            "quote" => eval_quote(args),
            "if" => eval_if(args, env),
            "define" => eval_define(args, env),
            "set!" => eval_set(args, env),
            "lambda" => eval_lambda(args, env),
            // Scope-limited stub: the term comes back unevaluated, there is
            // no unquote/unquote-splicing expansion
            "quasiquote" => eval_quasiquote(args),
            // Derived forms: expand to primitive forms, then re-dispatch
            "cond" => {
                let rewritten = expand_cond(args)?;
                eval_with_depth_tracking(&rewritten, env)
            }
            "let" => {
                let rewritten = expand_let(args)?;
                eval_with_depth_tracking(&rewritten, env)
            }
            _ => eval_application(elements, env),
        },

        _ => eval_application(elements, env),
    }
}

/// Generic application: evaluate the head term to a procedure, evaluate
/// the remaining terms left to right, then apply.
fn eval_application(elements: &[Value], env: &Environment) -> Result<Value, Error> {
    match elements {
        [] => Err(Error::UnsupportedForm(
            "cannot evaluate an empty application: ()".to_owned(),
        )),
        [func_expr, arg_exprs @ ..] => {
            let func = eval_with_depth_tracking(func_expr, env)?;
            let args = arg_exprs
                .iter()
                .map(|arg| eval_with_depth_tracking(arg, env))
                .collect::<Result<Vec<_>, _>>()?;
            apply(&func, args)
        }
    }
}

/// Apply an already-evaluated procedure to evaluated arguments. Also used
/// by primitives that invoke procedure values (`map`, `call/cc`); the
/// thread-local depth counter continues from the in-flight evaluation, so
/// recursion routed through a primitive still hits the depth limit.
pub(crate) fn apply(func: &Value, args: Vec<Value>) -> Result<Value, Error> {
    match func {
        Value::Primitive { func, .. } => func(args),
        Value::Function {
            params,
            body,
            env: closure_env,
        } => {
            // Fresh activation frame chained to the closure's captured
            // frame, not the caller's
            let call_env = Environment::from_bindings(params, args, closure_env)?;
            eval_with_depth_tracking(body, &call_env)
        }
        _ => Err(Error::NotCallable(format!("{func}"))),
    }
}

/// `(quote expr)`: return the term unevaluated.
fn eval_quote(args: &[Value]) -> Result<Value, Error> {
    match args {
        [expr] => Ok(expr.clone()),
        _ => Err(Error::arity_mismatch(1, args.len())),
    }
}

/// `(if test consequent alternative)`: only `#f` is falsy.
fn eval_if(args: &[Value], env: &Environment) -> Result<Value, Error> {
    match args {
        [test_expr, then_expr, else_expr] => {
            let test = eval_with_depth_tracking(test_expr, env)?;
            if test == Value::Bool(false) {
                eval_with_depth_tracking(else_expr, env)
            } else {
                eval_with_depth_tracking(then_expr, env)
            }
        }
        _ => Err(Error::arity_mismatch(3, args.len())),
    }
}

/// `(define var expr)`: bind into the current frame, return no value.
fn eval_define(args: &[Value], env: &Environment) -> Result<Value, Error> {
    match args {
        [Value::Symbol(name), expr] => {
            let value = eval_with_depth_tracking(expr, env)?;
            env.define(name.clone(), value);
            Ok(Value::Unspecified)
        }
        [_, _] => Err(Error::UnsupportedForm(
            "define requires a symbol as its first argument".to_owned(),
        )),
        _ => Err(Error::arity_mismatch(2, args.len())),
    }
}

/// `(set! var expr)`: mutate the nearest enclosing frame binding `var`.
fn eval_set(args: &[Value], env: &Environment) -> Result<Value, Error> {
    match args {
        [Value::Symbol(name), expr] => {
            let value = eval_with_depth_tracking(expr, env)?;
            env.set(name, value)?;
            Ok(Value::Unspecified)
        }
        [_, _] => Err(Error::UnsupportedForm(
            "set! requires a symbol as its first argument".to_owned(),
        )),
        _ => Err(Error::arity_mismatch(2, args.len())),
    }
}

/// `(lambda (params...) body...)`: construct a closure capturing the
/// current frame by reference. A multi-term body gets an implicit `begin`.
fn eval_lambda(args: &[Value], env: &Environment) -> Result<Value, Error> {
    match args {
        [Value::List(param_list), body @ ..] if !body.is_empty() => {
            let mut params = Vec::new();
            for param in param_list {
                match param {
                    Value::Symbol(name) => {
                        if params.contains(name) {
                            return Err(Error::UnsupportedForm(format!(
                                "duplicate parameter name: {name}"
                            )));
                        }
                        params.push(name.clone());
                    }
                    _ => {
                        return Err(Error::UnsupportedForm(
                            "lambda parameters must be symbols".to_owned(),
                        ));
                    }
                }
            }

            let body = if body.len() == 1 {
                body[0].clone()
            } else {
                let mut seq = vec![Value::Symbol("begin".to_owned())];
                seq.extend_from_slice(body);
                Value::List(seq)
            };

            Ok(Value::Function {
                params,
                body: Box::new(body),
                env: env.clone(),
            })
        }
        [_, _, ..] => Err(Error::UnsupportedForm(
            "lambda parameters must be a list".to_owned(),
        )),
        _ => Err(Error::arity_mismatch(2, args.len())),
    }
}

/// `(quasiquote expr)`: stub, the term comes back unevaluated.
fn eval_quasiquote(args: &[Value]) -> Result<Value, Error> {
    match args {
        [expr] => Ok(expr.clone()),
        _ => Err(Error::arity_mismatch(1, args.len())),
    }
}

/// Rewrite `cond` clauses into nested `if` terms. The literal symbol
/// `else` in test position matches unconditionally; an exhausted clause
/// list yields the no-value marker. Pure: produces a new term, no
/// evaluation happens here.
pub fn expand_cond(clauses: &[Value]) -> Result<Value, Error> {
    match clauses {
        [] => Ok(Value::Unspecified),
        [first, rest @ ..] => {
            let clause = match first {
                Value::List(clause) if clause.len() == 2 => clause,
                _ => {
                    return Err(Error::UnsupportedForm(
                        "cond clause must be a (test expression) pair".to_owned(),
                    ));
                }
            };
            let (test, expr) = (&clause[0], &clause[1]);
            if matches!(test, Value::Symbol(s) if s == "else") {
                Ok(expr.clone())
            } else {
                Ok(Value::List(vec![
                    Value::Symbol("if".to_owned()),
                    test.clone(),
                    expr.clone(),
                    expand_cond(rest)?,
                ]))
            }
        }
    }
}

/// Rewrite `(let ((v1 e1) ...) body...)` into an immediately-applied
/// lambda: `((lambda (v1 ...) body...) e1 ...)`. Pure, like
/// [`expand_cond`].
pub fn expand_let(args: &[Value]) -> Result<Value, Error> {
    match args {
        [Value::List(bindings), body @ ..] if !body.is_empty() => {
            let mut vars = Vec::new();
            let mut exprs = Vec::new();
            for binding in bindings {
                match binding {
                    Value::List(pair) if pair.len() == 2 && matches!(pair[0], Value::Symbol(_)) => {
                        vars.push(pair[0].clone());
                        exprs.push(pair[1].clone());
                    }
                    _ => {
                        return Err(Error::UnsupportedForm(
                            "let binding must be a (variable expression) pair".to_owned(),
                        ));
                    }
                }
            }

            let mut lambda = vec![Value::Symbol("lambda".to_owned()), Value::List(vars)];
            lambda.extend_from_slice(body);

            let mut application = vec![Value::List(lambda)];
            application.extend(exprs);
            Ok(Value::List(application))
        }
        [_, _, ..] => Err(Error::UnsupportedForm(
            "let bindings must be a list".to_owned(),
        )),
        _ => Err(Error::arity_mismatch(2, args.len())),
    }
}
