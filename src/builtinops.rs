//! Built-in operations registry.
//!
//! A symbol that is not bound in the environment is looked up here by name. The registry
//! entry decides how the evaluator collects the call's arguments:
//!
//! - **Eager**: each argument is evaluated before application (`+`, `car`, `cons`, ...)
//! - **Raw**: argument cells are handed over unevaluated (`if`, `and`, `or`, and the
//!   internal `define`/`set!` markers)
//! - **Datum**: the heads of the following cells are taken literally (`quote`)
//!
//! ```scheme
//! (+ 1 2 3)          ; 6
//! (< 1 2 3)          ; #t, comparisons chain
//! (/ 7 2)            ; 3
//! (cons 1 2)         ; (1 . 2)
//! (list-tail (list 1 2 3) 1) ; (2 3)
//! ```
//!
//! ## Error Handling
//!
//! Primitives check argument count and kind and report a `RuntimeError` otherwise. The
//! list predicates (`pair?`, `null?`, `list?`, `symbol?`) never fail and answer `#f`
//! for anything that is not a list. Arithmetic wraps on overflow, and dividing by zero
//! is a runtime error.
//!
//! ## Adding New Operations
//!
//! 1. **Implement the function** following [`PrimitiveFn`] or [`SpecialFormFn`]
//! 2. **Add to BUILTIN_OPS** with its identifier and argument policy

use crate::Error;
use crate::ast::{ListEntry, MaterializedList, NumberType, Value, ValueId};
use crate::environment::Environment;
use crate::evaluator::{eval_and, eval_define, eval_if, eval_or, eval_quote, eval_set};
use crate::heap::Heap;
use std::collections::HashMap;
use std::sync::LazyLock;

/// Signature of a primitive receiving already evaluated arguments
pub type PrimitiveFn = fn(&mut Heap, &[ValueId]) -> Result<ValueId, Error>;

/// Signature of a special form receiving unevaluated argument cells, the calling
/// environment and the current evaluation depth
pub type SpecialFormFn = fn(&mut Heap, &[ValueId], Environment, usize) -> Result<ValueId, Error>;

/// Represents the implementation of a built-in operation
#[derive(Clone, Copy)]
pub enum OpKind {
    /// Regular function over evaluated arguments
    Primitive(PrimitiveFn),
    /// Form that controls evaluation of its own arguments
    SpecialForm(SpecialFormFn),
}

impl std::fmt::Debug for OpKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OpKind::Primitive(_) => write!(f, "Primitive(<fn>)"),
            OpKind::SpecialForm(_) => write!(f, "SpecialForm(<fn>)"),
        }
    }
}

/// How argument cells are turned into the argument vector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgPolicy {
    Eager,
    Raw,
    Datum,
}

/// Definition of a built-in operation
#[derive(Debug)]
pub struct BuiltinOp {
    /// The identifier programs use for this operation
    pub scheme_id: &'static str,
    pub policy: ArgPolicy,
    pub op_kind: OpKind,
}

impl PartialEq for BuiltinOp {
    fn eq(&self, other: &Self) -> bool {
        self.scheme_id == other.scheme_id
    }
}

#[cfg(test)]
impl BuiltinOp {
    fn is_special_form(&self) -> bool {
        matches!(self.op_kind, OpKind::SpecialForm(_))
    }
}

//
// Argument helpers
//

fn expect_count(op: &str, args: &[ValueId], expected: usize) -> Result<(), Error> {
    if args.len() == expected {
        Ok(())
    } else {
        Err(Error::arity(op, &expected.to_string(), args.len()))
    }
}

fn expect_some(op: &str, args: &[ValueId]) -> Result<(), Error> {
    if args.is_empty() {
        Err(Error::arity(op, "at least 1", 0))
    } else {
        Ok(())
    }
}

/// Plain numeric payload; dotted numbers are list tails, not arguments
fn number_arg(heap: &Heap, op: &str, arg: ValueId) -> Result<NumberType, Error> {
    match heap.get(arg) {
        Value::Number(n) => Ok(*n),
        other => Err(Error::runtime(format!(
            "{op}: expected a number, got {}",
            other.kind_name()
        ))),
    }
}

fn numbers(heap: &Heap, op: &str, args: &[ValueId]) -> Result<Vec<NumberType>, Error> {
    args.iter().map(|arg| number_arg(heap, op, *arg)).collect()
}

fn list_arg<'h>(heap: &'h Heap, op: &str, arg: ValueId) -> Result<&'h MaterializedList, Error> {
    match heap.get(arg) {
        Value::List(list) => Ok(list),
        other => Err(Error::runtime(format!(
            "{op}: expected a list, got {}",
            other.kind_name()
        ))),
    }
}

/// A number stored as the tail of a pair keeps its dotted tag
fn as_tail(heap: &mut Heap, value: ValueId) -> ValueId {
    let plain = match heap.get(value) {
        Value::Number(n) => Some(*n),
        _ => None,
    };
    match plain {
        Some(n) => heap.alloc(Value::DottedNumber(n)),
        None => value,
    }
}

/// True when some payload element is not a plain number
fn is_malformed(heap: &Heap, list: &MaterializedList) -> bool {
    list.items()
        .any(|item| !matches!(heap.get(item), Value::Number(_)))
}

//
// Builtin Function Implementations
//

fn builtin_is_number(heap: &mut Heap, args: &[ValueId]) -> Result<ValueId, Error> {
    expect_count("number?", args, 1)?;
    let is_number = matches!(heap.get(args[0]), Value::Number(_));
    Ok(heap.boolean(is_number))
}

fn builtin_is_boolean(heap: &mut Heap, args: &[ValueId]) -> Result<ValueId, Error> {
    expect_count("boolean?", args, 1)?;
    let is_boolean = matches!(heap.get(args[0]), Value::Bool(_));
    Ok(heap.boolean(is_boolean))
}

fn builtin_not(heap: &mut Heap, args: &[ValueId]) -> Result<ValueId, Error> {
    expect_count("not", args, 1)?;
    let negated = !heap.get(args[0]).is_truthy();
    Ok(heap.boolean(negated))
}

// Chained numeric comparison: every adjacent pair must satisfy the operator.
// No arguments at all compare as true.
macro_rules! numeric_comparison {
    ($name:ident, $op:tt, $op_str:expr) => {
        fn $name(heap: &mut Heap, args: &[ValueId]) -> Result<ValueId, Error> {
            let values = numbers(heap, $op_str, args)?;
            let holds = values.windows(2).all(|pair| pair[0] $op pair[1]);
            Ok(heap.boolean(holds))
        }
    };
}

numeric_comparison!(builtin_eq, ==, "=");
numeric_comparison!(builtin_lt, <, "<");
numeric_comparison!(builtin_gt, >, ">");
numeric_comparison!(builtin_le, <=, "<=");
numeric_comparison!(builtin_ge, >=, ">=");

fn builtin_add(heap: &mut Heap, args: &[ValueId]) -> Result<ValueId, Error> {
    let sum = numbers(heap, "+", args)?
        .into_iter()
        .fold(0, NumberType::wrapping_add);
    Ok(heap.number(sum))
}

fn builtin_mul(heap: &mut Heap, args: &[ValueId]) -> Result<ValueId, Error> {
    let product = numbers(heap, "*", args)?
        .into_iter()
        .fold(1, NumberType::wrapping_mul);
    Ok(heap.number(product))
}

fn builtin_sub(heap: &mut Heap, args: &[ValueId]) -> Result<ValueId, Error> {
    expect_some("-", args)?;
    let values = numbers(heap, "-", args)?;
    let difference = values[1..]
        .iter()
        .fold(values[0], |acc, n| acc.wrapping_sub(*n));
    Ok(heap.number(difference))
}

fn builtin_div(heap: &mut Heap, args: &[ValueId]) -> Result<ValueId, Error> {
    expect_some("/", args)?;
    let values = numbers(heap, "/", args)?;
    let mut quotient = values[0];
    for divisor in &values[1..] {
        if *divisor == 0 {
            return Err(Error::runtime("/: division by zero"));
        }
        quotient = quotient.wrapping_div(*divisor);
    }
    Ok(heap.number(quotient))
}

fn builtin_max(heap: &mut Heap, args: &[ValueId]) -> Result<ValueId, Error> {
    expect_some("max", args)?;
    let values = numbers(heap, "max", args)?;
    let result = values.iter().copied().fold(values[0], NumberType::max);
    Ok(heap.number(result))
}

fn builtin_min(heap: &mut Heap, args: &[ValueId]) -> Result<ValueId, Error> {
    expect_some("min", args)?;
    let values = numbers(heap, "min", args)?;
    let result = values.iter().copied().fold(values[0], NumberType::min);
    Ok(heap.number(result))
}

fn builtin_abs(heap: &mut Heap, args: &[ValueId]) -> Result<ValueId, Error> {
    expect_count("abs", args, 1)?;
    let n = number_arg(heap, "abs", args[0])?;
    Ok(heap.number(n.wrapping_abs()))
}

/// Shared shape of the list predicates: `#f` unless called with exactly one list
fn list_predicate(
    heap: &mut Heap,
    args: &[ValueId],
    test: fn(&Heap, &MaterializedList) -> bool,
) -> Result<ValueId, Error> {
    let holds = match args {
        [arg] => match heap.get(*arg) {
            Value::List(list) => test(heap, list),
            _ => false,
        },
        _ => false,
    };
    Ok(heap.boolean(holds))
}

fn builtin_is_pair(heap: &mut Heap, args: &[ValueId]) -> Result<ValueId, Error> {
    list_predicate(heap, args, |_, list| list.len() == 2)
}

fn builtin_is_null(heap: &mut Heap, args: &[ValueId]) -> Result<ValueId, Error> {
    list_predicate(heap, args, |_, list| list.is_empty())
}

fn builtin_is_list(heap: &mut Heap, args: &[ValueId]) -> Result<ValueId, Error> {
    list_predicate(heap, args, |heap, list| !is_malformed(heap, list))
}

fn builtin_is_symbol(heap: &mut Heap, args: &[ValueId]) -> Result<ValueId, Error> {
    list_predicate(heap, args, |heap, list| {
        list.len() == 1
            && list
                .get(0)
                .is_some_and(|item| matches!(heap.get(item), Value::Symbol { .. }))
    })
}

fn builtin_cons(heap: &mut Heap, args: &[ValueId]) -> Result<ValueId, Error> {
    expect_count("cons", args, 2)?;
    let tail = as_tail(heap, args[1]);
    Ok(heap.list(vec![
        ListEntry::Open,
        ListEntry::Item(args[0]),
        ListEntry::Item(tail),
        ListEntry::Close,
    ]))
}

fn builtin_car(heap: &mut Heap, args: &[ValueId]) -> Result<ValueId, Error> {
    expect_count("car", args, 1)?;
    list_arg(heap, "car", args[0])?
        .get(0)
        .ok_or_else(|| Error::runtime("car: expected a non-empty list"))
}

fn builtin_cdr(heap: &mut Heap, args: &[ValueId]) -> Result<ValueId, Error> {
    expect_count("cdr", args, 1)?;
    let list = list_arg(heap, "cdr", args[0])?;
    if list.is_empty() {
        return Err(Error::runtime("cdr: expected a non-empty list"));
    }
    // the tail of a dotted or otherwise improper pair is returned as it is
    if list.len() == 2 && is_malformed(heap, list) {
        return list
            .get(1)
            .ok_or_else(|| Error::runtime("cdr: missing pair tail"));
    }
    let rest: Vec<ValueId> = list.items().skip(1).collect();
    Ok(heap.alloc(Value::List(MaterializedList::proper(rest))))
}

fn builtin_list(heap: &mut Heap, args: &[ValueId]) -> Result<ValueId, Error> {
    numbers(heap, "list", args)?;
    Ok(heap.alloc(Value::List(MaterializedList::proper(args.iter().copied()))))
}

/// The list and the non-negative index arguments of `list-ref`/`list-tail`
fn indexed_list<'h>(
    heap: &'h Heap,
    op: &str,
    args: &[ValueId],
) -> Result<(&'h MaterializedList, usize), Error> {
    expect_count(op, args, 2)?;
    let list = list_arg(heap, op, args[0])?;
    let index = number_arg(heap, op, args[1])?;
    let index = usize::try_from(index)
        .map_err(|_| Error::runtime(format!("{op}: index {index} is negative")))?;
    Ok((list, index))
}

fn builtin_list_ref(heap: &mut Heap, args: &[ValueId]) -> Result<ValueId, Error> {
    let (list, index) = indexed_list(heap, "list-ref", args)?;
    list.get(index).ok_or_else(|| {
        Error::runtime(format!(
            "list-ref: index {index} out of range for a list of length {}",
            list.len()
        ))
    })
}

fn builtin_list_tail(heap: &mut Heap, args: &[ValueId]) -> Result<ValueId, Error> {
    let (list, index) = indexed_list(heap, "list-tail", args)?;
    if index > list.len() {
        return Err(Error::runtime(format!(
            "list-tail: index {index} out of range for a list of length {}",
            list.len()
        )));
    }
    let rest: Vec<ValueId> = list.items().skip(index).collect();
    Ok(heap.alloc(Value::List(MaterializedList::proper(rest))))
}

fn mutable_list<'h>(
    heap: &'h mut Heap,
    op: &str,
    arg: ValueId,
) -> Result<&'h mut MaterializedList, Error> {
    match heap.get(arg) {
        Value::List(list) if !list.is_empty() => {}
        Value::List(_) => {
            return Err(Error::runtime(format!(
                "{op}: expected a non-empty list"
            )));
        }
        other => {
            return Err(Error::runtime(format!(
                "{op}: expected a list, got {}",
                other.kind_name()
            )));
        }
    }
    match heap.get_mut(arg) {
        Value::List(list) => Ok(list),
        other => unreachable!("checked list is now a {}", other.kind_name()),
    }
}

fn builtin_set_car(heap: &mut Heap, args: &[ValueId]) -> Result<ValueId, Error> {
    expect_count("set-car!", args, 2)?;
    mutable_list(heap, "set-car!", args[0])?.set(0, args[1]);
    Ok(heap.boolean(true))
}

fn builtin_set_cdr(heap: &mut Heap, args: &[ValueId]) -> Result<ValueId, Error> {
    expect_count("set-cdr!", args, 2)?;
    let tail = as_tail(heap, args[1]);
    // a one-element list has no tail slot, and is left unchanged
    mutable_list(heap, "set-cdr!", args[0])?.set(1, tail);
    Ok(heap.boolean(true))
}

/// Global registry of all built-in operations.
static BUILTIN_OPS: LazyLock<Vec<BuiltinOp>> = LazyLock::new(|| {
    fn primitive(scheme_id: &'static str, f: PrimitiveFn) -> BuiltinOp {
        BuiltinOp {
            scheme_id,
            policy: ArgPolicy::Eager,
            op_kind: OpKind::Primitive(f),
        }
    }

    fn special_form(scheme_id: &'static str, policy: ArgPolicy, f: SpecialFormFn) -> BuiltinOp {
        BuiltinOp {
            scheme_id,
            policy,
            op_kind: OpKind::SpecialForm(f),
        }
    }

    vec![
        // Special forms
        special_form("quote", ArgPolicy::Datum, eval_quote),
        special_form("if", ArgPolicy::Raw, eval_if),
        special_form("and", ArgPolicy::Raw, eval_and),
        special_form("or", ArgPolicy::Raw, eval_or),
        special_form("_define-var", ArgPolicy::Raw, eval_define),
        special_form("_set-var", ArgPolicy::Raw, eval_set),
        // Type predicates and logic
        primitive("number?", builtin_is_number),
        primitive("boolean?", builtin_is_boolean),
        primitive("not", builtin_not),
        // Comparison operations
        primitive("=", builtin_eq),
        primitive("<", builtin_lt),
        primitive(">", builtin_gt),
        primitive("<=", builtin_le),
        primitive(">=", builtin_ge),
        // Arithmetic operations
        primitive("+", builtin_add),
        primitive("-", builtin_sub),
        primitive("*", builtin_mul),
        primitive("/", builtin_div),
        primitive("max", builtin_max),
        primitive("min", builtin_min),
        primitive("abs", builtin_abs),
        // List operations
        primitive("pair?", builtin_is_pair),
        primitive("null?", builtin_is_null),
        primitive("list?", builtin_is_list),
        primitive("symbol?", builtin_is_symbol),
        primitive("cons", builtin_cons),
        primitive("car", builtin_car),
        primitive("cdr", builtin_cdr),
        primitive("list", builtin_list),
        primitive("list-ref", builtin_list_ref),
        primitive("list-tail", builtin_list_tail),
        primitive("set-car!", builtin_set_car),
        primitive("set-cdr!", builtin_set_cdr),
    ]
});

static BUILTIN_SCHEME: LazyLock<HashMap<&'static str, &'static BuiltinOp>> = LazyLock::new(|| {
    let ops: &'static [BuiltinOp] = BUILTIN_OPS.as_slice();
    ops.iter().map(|op| (op.scheme_id, op)).collect()
});

/// Get all builtin operations
pub fn get_builtin_ops() -> &'static [BuiltinOp] {
    BUILTIN_OPS.as_slice()
}

/// Find a builtin operation by the name programs use for it
pub fn find_scheme_op(id: &str) -> Option<&'static BuiltinOp> {
    BUILTIN_SCHEME.get(id).copied()
}

#[cfg(test)]
#[expect(clippy::unwrap_used)] // test code OK
mod tests {
    use super::*;
    use crate::printer::render;

    /// Argument builder for primitive tests
    #[derive(Debug, Clone)]
    enum Arg {
        N(NumberType),
        B(bool),
        Sym(&'static str),
        L(Vec<Arg>),
        /// `(a . n)`
        Dotted(NumberType, NumberType),
    }
    use Arg::*;

    fn build(heap: &mut Heap, arg: &Arg) -> ValueId {
        match arg {
            N(n) => heap.number(*n),
            B(b) => heap.boolean(*b),
            Sym(name) => heap.symbol(name),
            L(items) => {
                let items: Vec<ValueId> = items.iter().map(|item| build(heap, item)).collect();
                heap.alloc(Value::List(MaterializedList::proper(items)))
            }
            Dotted(head, tail) => {
                let head = heap.number(*head);
                let tail = heap.alloc(Value::DottedNumber(*tail));
                heap.list(vec![
                    ListEntry::Open,
                    ListEntry::Item(head),
                    ListEntry::Item(tail),
                    ListEntry::Close,
                ])
            }
        }
    }

    fn call_builtin(heap: &mut Heap, name: &str, args: &[ValueId]) -> Result<ValueId, Error> {
        let op = find_scheme_op(name).expect("builtin not found");
        match op.op_kind {
            OpKind::Primitive(f) => f(heap, args),
            OpKind::SpecialForm(_) => {
                panic!("expected primitive in tests, got special form: {name}")
            }
        }
    }

    fn ints(values: &[NumberType]) -> Vec<Arg> {
        values.iter().map(|n| N(*n)).collect()
    }

    #[test]
    fn test_builtin_ops_registry() {
        let not_op = find_scheme_op("not").unwrap();
        assert_eq!(not_op.policy, ArgPolicy::Eager);
        assert!(!not_op.is_special_form());

        let quote_op = find_scheme_op("quote").unwrap();
        assert_eq!(quote_op.policy, ArgPolicy::Datum);
        assert!(quote_op.is_special_form());

        for name in ["if", "and", "or", "_define-var", "_set-var"] {
            let op = find_scheme_op(name).unwrap();
            assert_eq!(op.policy, ArgPolicy::Raw, "{name}");
            assert!(op.is_special_form(), "{name}");
        }

        assert!(find_scheme_op("define").is_none());
        assert!(find_scheme_op("lambda").is_none());
        assert!(find_scheme_op("unknown").is_none());

        let all_ops = get_builtin_ops();
        assert_eq!(all_ops.len(), 33);
        assert!(std::ptr::eq(
            all_ops.iter().find(|op| op.scheme_id == "+").unwrap(),
            find_scheme_op("+").unwrap()
        ));
    }

    #[test]
    fn test_builtin_function_implementations() {
        // (name, arguments, expected rendering or None for a runtime error)
        let test_cases: Vec<(&str, Vec<Arg>, Option<&str>)> = vec![
            // ===== ARITHMETIC =====
            ("+", vec![], Some("0")),
            ("+", ints(&[1, 2, 3]), Some("6")),
            ("+", ints(&[i64::MAX, 1]), Some("-9223372036854775808")),
            ("+", vec![N(1), B(true)], None),
            ("*", vec![], Some("1")),
            ("*", ints(&[2, 3, 4]), Some("24")),
            ("-", ints(&[10, 1, 2]), Some("7")),
            // a single argument is returned unchanged
            ("-", ints(&[5]), Some("5")),
            ("-", vec![], None),
            ("/", ints(&[7, 2]), Some("3")),
            ("/", ints(&[-7, 2]), Some("-3")),
            ("/", ints(&[100, 5, 2]), Some("10")),
            ("/", ints(&[9]), Some("9")),
            ("/", ints(&[1, 0]), None),
            ("/", vec![], None),
            ("max", ints(&[3, 9, 2]), Some("9")),
            ("min", ints(&[3, 9, 2]), Some("2")),
            ("max", vec![], None),
            ("min", vec![Sym("x")], None),
            ("abs", ints(&[-4]), Some("4")),
            ("abs", ints(&[i64::MIN]), Some("-9223372036854775808")),
            ("abs", ints(&[1, 2]), None),
            // ===== COMPARISONS =====
            ("<", ints(&[1, 2, 3]), Some("#t")),
            ("<", ints(&[1, 3, 2]), Some("#f")),
            ("<", vec![], Some("#t")),
            ("<", ints(&[5]), Some("#t")),
            (">", ints(&[9, 6, 2]), Some("#t")),
            (">", ints(&[4, 4]), Some("#f")),
            ("<=", ints(&[1, 1, 2]), Some("#t")),
            (">=", ints(&[3, 3, 4]), Some("#f")),
            ("=", ints(&[2, 2, 2]), Some("#t")),
            ("=", ints(&[2, 2, 3]), Some("#f")),
            ("=", vec![N(1), B(true)], None),
            // ===== PREDICATES AND LOGIC =====
            ("number?", ints(&[1]), Some("#t")),
            ("number?", vec![B(false)], Some("#f")),
            ("number?", vec![], None),
            ("boolean?", vec![B(true)], Some("#t")),
            ("boolean?", ints(&[0]), Some("#f")),
            ("not", vec![B(false)], Some("#t")),
            ("not", ints(&[0]), Some("#f")),
            ("not", vec![B(true), B(true)], None),
            ("pair?", vec![L(ints(&[1, 2]))], Some("#t")),
            ("pair?", vec![Dotted(1, 2)], Some("#t")),
            ("pair?", vec![L(ints(&[1]))], Some("#f")),
            ("pair?", ints(&[1]), Some("#f")),
            ("pair?", vec![], Some("#f")),
            ("null?", vec![L(vec![])], Some("#t")),
            ("null?", vec![L(ints(&[1]))], Some("#f")),
            ("null?", vec![B(false)], Some("#f")),
            ("list?", vec![L(ints(&[1, 2, 3]))], Some("#t")),
            ("list?", vec![L(vec![])], Some("#t")),
            ("list?", vec![Dotted(1, 2)], Some("#f")),
            ("list?", vec![L(vec![N(1), Sym("a")])], Some("#f")),
            ("list?", ints(&[3]), Some("#f")),
            ("symbol?", vec![L(vec![Sym("a")])], Some("#t")),
            ("symbol?", vec![L(ints(&[1]))], Some("#f")),
            ("symbol?", vec![Sym("a")], Some("#f")),
            // ===== PAIRS AND LISTS =====
            ("cons", ints(&[1, 2]), Some("(1 . 2)")),
            ("cons", vec![N(1), L(ints(&[2, 3]))], Some("(1 (2 3))")),
            ("cons", ints(&[1]), None),
            ("car", vec![L(ints(&[1, 2, 3]))], Some("1")),
            ("car", vec![Dotted(4, 5)], Some("4")),
            ("car", vec![L(vec![])], None),
            ("car", ints(&[1]), None),
            ("cdr", vec![L(ints(&[1, 2, 3]))], Some("(2 3)")),
            ("cdr", vec![L(ints(&[1]))], Some("()")),
            ("cdr", vec![Dotted(4, 5)], Some("5")),
            ("cdr", vec![L(vec![])], None),
            ("list", vec![], Some("()")),
            ("list", ints(&[1, 2, 3]), Some("(1 2 3)")),
            ("list", vec![N(1), B(true)], None),
            ("list-ref", vec![L(ints(&[10, 20, 30])), N(1)], Some("20")),
            ("list-ref", vec![L(ints(&[10, 20, 30])), N(3)], None),
            ("list-ref", vec![L(ints(&[10, 20, 30])), N(-1)], None),
            ("list-ref", vec![N(1), N(0)], None),
            ("list-tail", vec![L(ints(&[10, 20, 30])), N(1)], Some("(20 30)")),
            ("list-tail", vec![L(ints(&[10, 20, 30])), N(3)], Some("()")),
            ("list-tail", vec![L(ints(&[10, 20, 30])), N(4)], None),
            ("set-car!", vec![L(ints(&[1, 2])), N(9)], Some("#t")),
            ("set-car!", vec![L(vec![]), N(9)], None),
            ("set-cdr!", vec![L(ints(&[1, 2])), N(9)], Some("#t")),
            ("set-cdr!", vec![N(1), N(9)], None),
        ];

        for (i, (name, args, expected)) in test_cases.into_iter().enumerate() {
            let test_id = format!("#{} ({name} {args:?})", i + 1);
            let mut heap = Heap::new();
            let args: Vec<ValueId> = args.iter().map(|arg| build(&mut heap, arg)).collect();
            match (call_builtin(&mut heap, name, &args), expected) {
                (Ok(result), Some(expected)) => {
                    assert_eq!(render(&heap, result).unwrap(), expected, "{test_id}");
                }
                (Err(Error::RuntimeError(_)), None) => {}
                (result, expected) => {
                    panic!("{test_id}: expected {expected:?}, got {result:?}");
                }
            }
        }
    }

    #[test]
    fn test_pair_mutation_in_place() {
        let mut heap = Heap::new();
        let pair = build(&mut heap, &L(ints(&[1, 2])));
        let nine = heap.number(9);
        let seven = heap.number(7);

        call_builtin(&mut heap, "set-car!", &[pair, nine]).unwrap();
        assert_eq!(render(&heap, pair).unwrap(), "(9 2)");

        // a numeric tail is stored dotted
        call_builtin(&mut heap, "set-cdr!", &[pair, seven]).unwrap();
        assert_eq!(render(&heap, pair).unwrap(), "(9 . 7)");

        let tail = call_builtin(&mut heap, "cdr", &[pair]).unwrap();
        assert!(matches!(heap.get(tail), Value::DottedNumber(7)));
    }

    #[test]
    fn test_error_messages_name_the_operation() {
        let mut heap = Heap::new();
        let flag = heap.boolean(true);
        let test_cases = vec![
            ("abs", vec![], "abs: expected 1 arguments, got 0"),
            ("+", vec![flag], "+: expected a number, got boolean"),
            ("car", vec![flag], "car: expected a list, got boolean"),
        ];

        for (name, args, message) in test_cases {
            let err = call_builtin(&mut heap, name, &args).unwrap_err();
            assert_eq!(err.message(), message);
        }
    }
}
