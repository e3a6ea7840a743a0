//! This module defines the closed set of value kinds the interpreter works with. Values
//! are stored in the [`crate::heap::Heap`] and refer to one another only through
//! [`ValueId`] handles, so pairs, environments and closures may form cycles without
//! owning each other. Code and data share the same representation: the reader produces
//! chains of [`Value::Cell`] nodes, and evaluation produces [`MaterializedList`] values
//! for anything list-shaped that a program can observe.

use crate::builtinops::BuiltinOp;
use std::collections::HashMap;

/// Type alias for number values in interpreter
pub type NumberType = i64;

/// Marker symbols wrapped around quoted list data by the reader
pub(crate) const OPEN_MARKER: &str = "(";
pub(crate) const CLOSE_MARKER: &str = ")";

pub(crate) const QUOTE_KEYWORD: &str = "quote";
pub(crate) const LAMBDA_KEYWORD: &str = "lambda";
pub(crate) const DEFINE_KEYWORD: &str = "define";
pub(crate) const SET_KEYWORD: &str = "set!";

/// Internal head symbols the reader substitutes for `define` and `set!`.
/// The lexer never produces a leading underscore, so programs cannot name them.
pub(crate) const DEFINE_MARKER: &str = "_define-var";
pub(crate) const SET_MARKER: &str = "_set-var";

/// Operator names that `define` binds as aliases instead of evaluating
pub(crate) const ARITHMETIC_OPERATORS: [&str; 4] = ["+", "-", "*", "/"];

/// Handle to a value slot in the heap
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ValueId(pub(crate) u32);

impl ValueId {
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// One position in a materialized list: a bracket marker or a payload element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListEntry {
    Open,
    Close,
    Item(ValueId),
}

/// The value form of a list, as produced by `quote`, `cons`, `list` and friends.
///
/// Quoted data keeps the bracket structure of nested lists as [`ListEntry::Open`] and
/// [`ListEntry::Close`] markers. Length, indexing and mutation only ever see the
/// [`ListEntry::Item`] payload.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MaterializedList {
    entries: Vec<ListEntry>,
}

impl MaterializedList {
    pub fn from_entries(entries: Vec<ListEntry>) -> Self {
        MaterializedList { entries }
    }

    /// A bracketed list holding exactly `items`
    pub fn proper(items: impl IntoIterator<Item = ValueId>) -> Self {
        let mut entries = vec![ListEntry::Open];
        entries.extend(items.into_iter().map(ListEntry::Item));
        entries.push(ListEntry::Close);
        MaterializedList { entries }
    }

    /// The empty list `()`
    pub fn empty() -> Self {
        MaterializedList::proper([])
    }

    pub fn entries(&self) -> &[ListEntry] {
        &self.entries
    }

    /// Payload elements in order, markers skipped
    pub fn items(&self) -> impl Iterator<Item = ValueId> + '_ {
        self.entries.iter().filter_map(|entry| match entry {
            ListEntry::Item(id) => Some(*id),
            ListEntry::Open | ListEntry::Close => None,
        })
    }

    pub fn len(&self) -> usize {
        self.items().count()
    }

    pub fn is_empty(&self) -> bool {
        self.items().next().is_none()
    }

    pub fn get(&self, index: usize) -> Option<ValueId> {
        self.items().nth(index)
    }

    /// Replace the payload element at `index`. Returns false when there is no such element.
    pub fn set(&mut self, index: usize, value: ValueId) -> bool {
        let slot = self
            .entries
            .iter_mut()
            .filter(|entry| matches!(entry, ListEntry::Item(_)))
            .nth(index);
        match slot {
            Some(entry) => {
                *entry = ListEntry::Item(value);
                true
            }
            None => false,
        }
    }
}

/// One lexical frame: its own bindings plus a link to the enclosing frame
#[derive(Debug, Clone, Default)]
pub struct Scope {
    pub(crate) bindings: HashMap<String, ValueId>,
    pub(crate) parent: Option<ValueId>,
}

/// Every kind of value the heap can hold.
///
/// Arity counts on symbols are written by the reader and only read afterwards.
#[derive(Debug, Clone)]
pub enum Value {
    /// 64-bit integer
    Number(NumberType),
    /// A number sitting in the tail position of an improper pair
    DottedNumber(NumberType),
    Bool(bool),
    /// Identifier or operator name, with the number of chain elements it consumes as a call head
    Symbol {
        name: String,
        arity: usize,
    },
    /// The `lambda` keyword: `arity` covers parameters plus body forms, `params` the parameters alone
    LambdaSymbol { arity: usize, params: usize },
    /// One link of a parsed chain
    Cell {
        head: Option<ValueId>,
        tail: Option<ValueId>,
    },
    /// A lambda literal that has not been evaluated yet
    LambdaCell {
        symbol: ValueId,
        body: Option<ValueId>,
    },
    List(MaterializedList),
    Scope(Scope),
    /// Built-in primitive or special form, bound to the arity of the call site that produced it
    Builtin {
        op: &'static BuiltinOp,
        arity: usize,
    },
    /// A lambda paired with the frame it was evaluated in; collects its parameter and body cells raw
    Closure {
        arity: usize,
        params: usize,
        scope: ValueId,
    },
    /// A closure whose parameter and body cells are known, ready to be applied to evaluated arguments
    Invocation {
        params: usize,
        scope: ValueId,
        forms: Vec<ValueId>,
    },
}

impl Value {
    pub(crate) fn symbol(name: impl Into<String>) -> Self {
        Value::Symbol {
            name: name.into(),
            arity: 0,
        }
    }

    /// Short kind name used in error messages
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Number(_) | Value::DottedNumber(_) => "number",
            Value::Bool(_) => "boolean",
            Value::Symbol { .. } | Value::LambdaSymbol { .. } => "symbol",
            Value::Cell { .. } => "pair",
            Value::LambdaCell { .. } => "lambda term",
            Value::List(_) => "list",
            Value::Scope(_) => "environment",
            Value::Builtin { .. } => "builtin",
            Value::Closure { .. } | Value::Invocation { .. } => "procedure",
        }
    }

    /// Numeric payload, dotted or not
    pub fn as_number(&self) -> Option<NumberType> {
        match self {
            Value::Number(n) | Value::DottedNumber(n) => Some(*n),
            _ => None,
        }
    }

    /// Everything except `#f` counts as true
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Bool(false))
    }

    /// Name of a symbol node; the lambda keyword answers to `lambda`
    pub fn symbol_name(&self) -> Option<&str> {
        match self {
            Value::Symbol { name, .. } => Some(name),
            Value::LambdaSymbol { .. } => Some(LAMBDA_KEYWORD),
            _ => None,
        }
    }

    /// Number of chain elements a symbol consumes when it heads an application
    pub fn symbol_arity(&self) -> Option<usize> {
        match self {
            Value::Symbol { arity, .. } | Value::LambdaSymbol { arity, .. } => Some(*arity),
            _ => None,
        }
    }

    pub fn is_cell(&self) -> bool {
        matches!(self, Value::Cell { .. })
    }

    pub fn is_callable(&self) -> bool {
        matches!(
            self,
            Value::Builtin { .. } | Value::Closure { .. } | Value::Invocation { .. }
        )
    }

    /// True for a symbol naming one of `+ - * /`
    pub(crate) fn is_arithmetic_operator(&self) -> bool {
        matches!(
            self,
            Value::Symbol { name, .. } if ARITHMETIC_OPERATORS.contains(&name.as_str())
        )
    }

    /// Push every value this one refers to onto `out`
    pub(crate) fn push_references(&self, out: &mut Vec<ValueId>) {
        match self {
            Value::Number(_)
            | Value::DottedNumber(_)
            | Value::Bool(_)
            | Value::Symbol { .. }
            | Value::LambdaSymbol { .. }
            | Value::Builtin { .. } => {}
            Value::Cell { head, tail } => out.extend(head.iter().chain(tail.iter()).copied()),
            Value::LambdaCell { symbol, body } => {
                out.push(*symbol);
                out.extend(body.iter().copied());
            }
            Value::List(list) => out.extend(list.items()),
            Value::Scope(scope) => {
                out.extend(scope.bindings.values().copied());
                out.extend(scope.parent.iter().copied());
            }
            Value::Closure { scope, .. } => out.push(*scope),
            Value::Invocation { scope, forms, .. } => {
                out.push(*scope);
                out.extend(forms.iter().copied());
            }
        }
    }
}
