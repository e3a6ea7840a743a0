//! Tree-walking evaluation over flattened call chains.
//!
//! An application is a [`Value::Cell`] whose head names the operation. The operation's
//! arguments are the following cells of the same chain, and the head symbol's recorded
//! arity says how many logical elements to take (see [`crate::arity`]). How each element
//! turns into an argument depends on the callable:
//!
//! - builtins follow their [`ArgPolicy`]
//! - a [`Value::Closure`] collects its parameter and body cells raw and becomes a
//!   [`Value::Invocation`]
//! - an invocation evaluates its arguments eagerly, binds them in a fresh frame and runs
//!   the body forms in order, returning the last result
//!
//! Name and syntax errors raised while arguments are collected reach the caller as runtime
//! errors.

use crate::arity;
use crate::ast::{CLOSE_MARKER, ListEntry, MaterializedList, OPEN_MARKER, Value, ValueId};
use crate::builtinops::{ArgPolicy, OpKind, find_scheme_op};
use crate::environment::Environment;
use crate::heap::Heap;
use crate::{Error, MAX_EVAL_DEPTH};
use tracing::{debug, trace};

/// Evaluate an expression in `env`
pub fn eval(heap: &mut Heap, expr: ValueId, env: Environment) -> Result<ValueId, Error> {
    eval_with_depth_tracking(heap, expr, env, 0)
}

/// Evaluate an expression with depth tracking to prevent stack overflow
pub(crate) fn eval_with_depth_tracking(
    heap: &mut Heap,
    expr: ValueId,
    env: Environment,
    depth: usize,
) -> Result<ValueId, Error> {
    if depth >= MAX_EVAL_DEPTH {
        return Err(Error::runtime(format!(
            "evaluation depth limit exceeded (max: {MAX_EVAL_DEPTH})"
        )));
    }
    match heap.get(expr) {
        // Self-evaluating forms produce fresh copies
        Value::Number(n) | Value::DottedNumber(n) => {
            let n = *n;
            Ok(heap.number(n))
        }
        Value::Bool(b) => {
            let b = *b;
            Ok(heap.boolean(b))
        }
        Value::List(list) => {
            let list = list.clone();
            Ok(heap.alloc(Value::List(list)))
        }
        Value::Invocation { .. } => Ok(expr),

        Value::Symbol { .. } | Value::LambdaSymbol { .. } => eval_symbol(heap, expr, env),

        Value::Cell { head, tail } => {
            let (head, tail) = (*head, *tail);
            eval_application(heap, head, tail, env, depth)
        }

        Value::LambdaCell { symbol, body } => {
            let (symbol, body) = (*symbol, *body);
            eval_lambda(heap, symbol, body, env, depth)
        }

        other @ (Value::Scope(_) | Value::Builtin { .. } | Value::Closure { .. }) => Err(
            Error::runtime(format!("cannot evaluate a {}", other.kind_name())),
        ),
    }
}

/// Resolve a symbol through the environment, falling back to the builtin table.
///
/// A binding to one of `+ - * /` is an operator alias and resolves to that builtin, with
/// the arity recorded on the symbol being evaluated.
fn eval_symbol(heap: &mut Heap, symbol: ValueId, env: Environment) -> Result<ValueId, Error> {
    let value = heap.get(symbol);
    let arity = value.symbol_arity().unwrap_or_default();
    let name = value.symbol_name().unwrap_or_default().to_owned();

    let op = match env.lookup(heap, &name) {
        Some(bound) if heap.get(bound).is_arithmetic_operator() => {
            let alias = heap.get(bound).symbol_name().unwrap_or_default();
            find_scheme_op(alias)
                .ok_or_else(|| Error::runtime(format!("unknown operator alias: {alias}")))?
        }
        Some(bound) => return Ok(bound),
        None => find_scheme_op(&name)
            .ok_or_else(|| Error::name(format!("no such name: {name}")))?,
    };
    Ok(heap.alloc(Value::Builtin { op, arity }))
}

fn eval_application(
    heap: &mut Heap,
    head: Option<ValueId>,
    tail: Option<ValueId>,
    env: Environment,
    depth: usize,
) -> Result<ValueId, Error> {
    let head = head.ok_or_else(|| Error::runtime("no function provided"))?;
    let call_site_arity = match heap.get(head) {
        Value::Symbol { arity, .. } | Value::LambdaSymbol { arity, .. } => Some(*arity),
        Value::LambdaCell { .. } | Value::Invocation { .. } => None,
        other => {
            return Err(Error::runtime(format!(
                "wrong function provided: {}",
                other.kind_name()
            )));
        }
    };

    let func = eval_with_depth_tracking(heap, head, env, depth + 1)?;
    let invocation_params = match heap.get(func) {
        Value::Invocation { params, .. } => Some(*params),
        _ => None,
    };

    // A bare name with no elements refers to the procedure itself. Otherwise a call site
    // that supplies a different number of elements than the procedure takes is a curried
    // call: apply to the first arguments, then apply the result to the rest.
    if let (Some(0), Some(params)) = (call_site_arity, invocation_params)
        && params > 0
    {
        return Ok(func);
    }
    if let (Some(site), Some(params)) = (call_site_arity, invocation_params)
        && site != params
    {
        let (args, rest) = collect_args(heap, func, tail, env, depth)?;
        let staged = apply(heap, func, &args, env, depth)?;
        if !heap.get(staged).is_callable() {
            return Err(Error::runtime(format!(
                "wrong number of arguments: procedure takes {params}, call supplies {site}"
            )));
        }
        let (args, _) = collect_args(heap, staged, rest, env, depth)?;
        return apply(heap, staged, &args, env, depth);
    }

    if heap.get(func).is_callable() {
        let (args, _) = collect_args(heap, func, tail, env, depth)?;
        apply(heap, func, &args, env, depth)
    } else {
        Ok(func)
    }
}

/// Build a closure over `env` and immediately collect the lambda's own parameter and body
/// cells, giving an invocation ready to receive arguments
fn eval_lambda(
    heap: &mut Heap,
    symbol: ValueId,
    body: Option<ValueId>,
    env: Environment,
    depth: usize,
) -> Result<ValueId, Error> {
    let (arity, params) = match heap.get(symbol) {
        Value::LambdaSymbol { arity, params } => (*arity, *params),
        other => {
            return Err(Error::runtime(format!(
                "malformed lambda term headed by a {}",
                other.kind_name()
            )));
        }
    };
    let closure = heap.alloc(Value::Closure {
        arity,
        params,
        scope: env.id(),
    });
    let (forms, _) = collect_args(heap, closure, body, env, depth)?;
    apply(heap, closure, &forms, env, depth)
}

/// Collect the arguments of `func` from the chain starting at `start`.
///
/// Returns the arguments and the chain position after the last one.
pub fn collect_args(
    heap: &mut Heap,
    func: ValueId,
    start: Option<ValueId>,
    env: Environment,
    depth: usize,
) -> Result<(Vec<ValueId>, Option<ValueId>), Error> {
    let (policy, count) = match heap.get(func) {
        Value::Builtin { op, arity } => (op.policy, *arity),
        Value::Closure { arity, .. } => (ArgPolicy::Raw, *arity),
        Value::Invocation { params, .. } => (ArgPolicy::Eager, *params),
        other => {
            return Err(Error::runtime(format!(
                "cannot apply a {}",
                other.kind_name()
            )));
        }
    };

    let collected = match policy {
        ArgPolicy::Eager => collect_eager(heap, start, count, env, depth),
        ArgPolicy::Raw => collect_raw(heap, start, count),
        ArgPolicy::Datum => collect_datum(heap, start, count),
    };
    collected.map_err(Error::into_runtime)
}

/// Step past the cell at `cursor`. Only the last argument may end the chain early.
fn next_link(heap: &Heap, cursor: Option<ValueId>, last: bool) -> Result<Option<ValueId>, Error> {
    match cursor.map(|id| heap.get(id)) {
        Some(Value::Cell { tail, .. }) => Ok(*tail),
        _ if last => Ok(None),
        _ => Err(Error::runtime("argument chain is not a list")),
    }
}

/// Position of the last cell owned by an element whose head symbol consumes `arity`
/// elements
fn element_end(
    heap: &Heap,
    link: ValueId,
    tail: Option<ValueId>,
    arity: usize,
) -> Result<Option<ValueId>, Error> {
    let cells = arity::span(heap, tail, arity)?;
    arity::advance_by(heap, Some(link), cells)
}

fn collect_eager(
    heap: &mut Heap,
    start: Option<ValueId>,
    count: usize,
    env: Environment,
    depth: usize,
) -> Result<(Vec<ValueId>, Option<ValueId>), Error> {
    let mut args = Vec::with_capacity(count);
    let mut cursor = start;
    for i in 0..count {
        let (link, head, tail) = match cursor.map(|id| (id, heap.get(id))) {
            Some((link, Value::Cell { head, tail })) => (link, *head, *tail),
            _ => return Err(Error::runtime("argument chain ended early")),
        };

        let mut end = Some(link);
        match head.map(|h| (h, heap.get(h).symbol_arity())) {
            Some((_, Some(arity))) => {
                args.push(eval_with_depth_tracking(heap, link, env, depth + 1)?);
                end = element_end(heap, link, tail, arity)?;
            }
            Some((head, None)) => args.push(eval_with_depth_tracking(heap, head, env, depth + 1)?),
            None => return Err(Error::runtime("missing argument")),
        }
        cursor = next_link(heap, end, i + 1 == count)?;
    }
    Ok((args, cursor))
}

fn collect_raw(
    heap: &Heap,
    start: Option<ValueId>,
    count: usize,
) -> Result<(Vec<ValueId>, Option<ValueId>), Error> {
    let mut args = Vec::with_capacity(count);
    let mut cursor = start;
    for i in 0..count {
        let link = cursor.ok_or_else(|| Error::runtime("argument chain ended early"))?;
        let mut end = Some(link);
        match heap.get(link) {
            Value::LambdaCell { .. } => args.push(link),
            Value::Cell { head, tail } => {
                match head.map(|h| (h, heap.get(h).symbol_arity())) {
                    Some((_, Some(arity))) => {
                        args.push(link);
                        end = element_end(heap, link, *tail, arity)?;
                    }
                    Some((head, None)) => args.push(head),
                    None => return Err(Error::runtime("missing argument")),
                }
            }
            other => {
                return Err(Error::runtime(format!(
                    "expected an argument cell, found a {}",
                    other.kind_name()
                )));
            }
        }
        cursor = next_link(heap, end, i + 1 == count)?;
    }
    Ok((args, cursor))
}

/// Take the heads of the next `count` cells literally
fn collect_datum(
    heap: &Heap,
    start: Option<ValueId>,
    count: usize,
) -> Result<(Vec<ValueId>, Option<ValueId>), Error> {
    let mut args = Vec::with_capacity(count);
    let mut cursor = start;
    for _ in 0..count {
        match cursor.map(|id| heap.get(id)) {
            Some(Value::Cell {
                head: Some(head),
                tail,
            }) => {
                args.push(*head);
                cursor = *tail;
            }
            _ => return Err(Error::runtime("quote: datum ended early")),
        }
    }
    Ok((args, cursor))
}

/// Apply a callable to collected arguments
pub fn apply(
    heap: &mut Heap,
    func: ValueId,
    args: &[ValueId],
    env: Environment,
    depth: usize,
) -> Result<ValueId, Error> {
    match heap.get(func) {
        Value::Builtin { op, .. } => {
            let kind = op.op_kind;
            match kind {
                OpKind::Primitive(f) => f(heap, args),
                OpKind::SpecialForm(f) => f(heap, args, env, depth),
            }
        }
        Value::Closure { params, scope, .. } => {
            let (params, scope) = (*params, *scope);
            Ok(heap.alloc(Value::Invocation {
                params,
                scope,
                forms: args.to_vec(),
            }))
        }
        Value::Invocation {
            params,
            scope,
            forms,
        } => {
            let (params, scope, forms) = (*params, *scope, forms.clone());
            invoke(heap, params, scope, &forms, args, depth)
        }
        other => Err(Error::runtime(format!(
            "cannot apply a {}",
            other.kind_name()
        ))),
    }
}

/// Bind `args` to the parameter cells in a new frame under `scope` and run the body forms
fn invoke(
    heap: &mut Heap,
    params: usize,
    scope: ValueId,
    forms: &[ValueId],
    args: &[ValueId],
    depth: usize,
) -> Result<ValueId, Error> {
    if args.len() != params {
        return Err(Error::arity("lambda", &params.to_string(), args.len()));
    }
    let parent = Environment::from_id(heap, scope)
        .ok_or_else(|| Error::runtime("procedure lost its environment"))?;
    let frame = Environment::child_of(heap, parent);
    trace!(
        params,
        body_forms = forms.len().saturating_sub(params),
        "entering lambda frame"
    );

    for (form, value) in forms.iter().zip(args) {
        let name = parameter_name(heap, *form)?;
        frame.force_bind(heap, &name, *value);
    }

    let mut result = None;
    for form in forms.iter().skip(params) {
        result = Some(eval_with_depth_tracking(heap, *form, frame, depth + 1)?);
    }
    result.ok_or_else(|| Error::runtime("lambda has no body"))
}

fn parameter_name(heap: &Heap, form: ValueId) -> Result<String, Error> {
    match heap.get(form) {
        Value::Cell {
            head: Some(head), ..
        } => match heap.get(*head) {
            Value::Symbol { name, .. } => Ok(name.clone()),
            other => Err(Error::runtime(format!(
                "lambda parameter must be a symbol, got {}",
                other.kind_name()
            ))),
        },
        other => Err(Error::runtime(format!(
            "lambda parameter must be a symbol, got {}",
            other.kind_name()
        ))),
    }
}

/// Name in the target cell of `define` or `set!`
fn binding_name(heap: &Heap, target: ValueId, form: &str) -> Result<String, Error> {
    match heap.get(target) {
        Value::Cell {
            head: Some(head), ..
        } => match heap.get(*head) {
            Value::Symbol { name, .. } => Ok(name.clone()),
            other => Err(Error::runtime(format!(
                "{form}: expected a name, got {}",
                other.kind_name()
            ))),
        },
        other => Err(Error::runtime(format!(
            "{form}: expected a name, got {}",
            other.kind_name()
        ))),
    }
}

/// Value stored by `define` or `set!`. Naming an operator alone binds the operator
/// symbol itself, so the new name acts as an alias.
fn binding_value(
    heap: &mut Heap,
    expr: ValueId,
    env: Environment,
    depth: usize,
) -> Result<ValueId, Error> {
    match heap.get(expr) {
        Value::Cell {
            head: Some(head),
            tail: None,
        } if heap.get(*head).is_arithmetic_operator() => Ok(*head),
        _ => eval_with_depth_tracking(heap, expr, env, depth + 1),
    }
}

//
// Special forms
//

pub(crate) fn eval_quote(
    heap: &mut Heap,
    args: &[ValueId],
    _env: Environment,
    _depth: usize,
) -> Result<ValueId, Error> {
    let entries: Vec<ListEntry> = args
        .iter()
        .map(|arg| match heap.get(*arg) {
            Value::Symbol { name, .. } if name == OPEN_MARKER => ListEntry::Open,
            Value::Symbol { name, .. } if name == CLOSE_MARKER => ListEntry::Close,
            _ => ListEntry::Item(*arg),
        })
        .collect();
    Ok(heap.list(entries))
}

pub(crate) fn eval_define(
    heap: &mut Heap,
    args: &[ValueId],
    env: Environment,
    depth: usize,
) -> Result<ValueId, Error> {
    let [target, expr] = args else {
        return Err(Error::arity("define", "2", args.len()));
    };
    let name = binding_name(heap, *target, "define")?;
    let value = binding_value(heap, *expr, env, depth)?;

    if env.define(heap, &name, value) {
        debug!(name = %name, "rebinding existing name");
    }
    Ok(heap.boolean(true))
}

pub(crate) fn eval_set(
    heap: &mut Heap,
    args: &[ValueId],
    env: Environment,
    depth: usize,
) -> Result<ValueId, Error> {
    let [target, expr] = args else {
        return Err(Error::arity("set!", "2", args.len()));
    };
    let name = binding_name(heap, *target, "set!")?;
    let value = binding_value(heap, *expr, env, depth)?;
    env.assign(heap, &name, value)?;
    Ok(heap.boolean(true))
}

pub(crate) fn eval_if(
    heap: &mut Heap,
    args: &[ValueId],
    env: Environment,
    depth: usize,
) -> Result<ValueId, Error> {
    let (condition, consequent, alternative) = match args {
        [condition, consequent] => (*condition, *consequent, None),
        [condition, consequent, alternative] => (*condition, *consequent, Some(*alternative)),
        _ => return Err(Error::arity("if", "2 or 3", args.len())),
    };

    let test = eval_with_depth_tracking(heap, condition, env, depth + 1)?;
    if heap.get(test).is_truthy() {
        eval_with_depth_tracking(heap, consequent, env, depth + 1)
    } else if let Some(alternative) = alternative {
        eval_with_depth_tracking(heap, alternative, env, depth + 1)
    } else {
        Ok(heap.alloc(Value::List(MaterializedList::empty())))
    }
}

// Short-circuiting connectives: the first value whose truthiness decides the result is
// returned as it is; otherwise the last value, or the identity when there are no arguments.
macro_rules! boolean_logic_op {
    ($name:ident, $decides_on:literal, $identity:literal) => {
        pub(crate) fn $name(
            heap: &mut Heap,
            args: &[ValueId],
            env: Environment,
            depth: usize,
        ) -> Result<ValueId, Error> {
            let mut last = None;
            for arg in args {
                let value = eval_with_depth_tracking(heap, *arg, env, depth + 1)?;
                if heap.get(value).is_truthy() == $decides_on {
                    return Ok(value);
                }
                last = Some(value);
            }
            match last {
                Some(value) => Ok(value),
                None => Ok(heap.boolean($identity)),
            }
        }
    };
}

boolean_logic_op!(eval_and, false, true);
boolean_logic_op!(eval_or, true, false);
