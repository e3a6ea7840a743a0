//! Arity bookkeeping for flattened call chains.
//!
//! The reader splices nested applications into their parent's chain, so `(+ 1 (* 2 3))`
//! becomes the five cells `+ 1 * 2 3`. What keeps the chain unambiguous is the arity
//! written on each head symbol: `+` consumes two logical elements and `*` consumes two.
//! [`span`] turns a count of logical elements into the number of cells they occupy,
//! following nested arities recursively.
//!
//! Arities are written while the chain is built ([`annotate_application`],
//! [`reset_parameters`], [`set_lambda_counts`]) and only read afterwards.

use crate::Error;
use crate::ast::{Value, ValueId};
use crate::heap::Heap;

/// Number of cells in a chain; a bare value in tail position counts as one
pub fn chain_len(heap: &Heap, chain: Option<ValueId>) -> usize {
    let mut len = 0;
    let mut cursor = chain;
    while let Some(id) = cursor {
        len += 1;
        cursor = match heap.get(id) {
            Value::Cell { tail, .. } => *tail,
            _ => None,
        };
    }
    len
}

/// Wrap `value` in a cell unless it already is one
pub fn as_chain(heap: &mut Heap, value: Option<ValueId>) -> ValueId {
    match value {
        Some(id) if heap.get(id).is_cell() => id,
        other => heap.cell(other, None),
    }
}

/// Attach `next` after the last cell of `root`.
///
/// A bare value already sitting in tail position is wrapped in its own cell first, so
/// the chain stays linked.
pub fn append(heap: &mut Heap, root: Option<ValueId>, next: Option<ValueId>) -> Option<ValueId> {
    let Some(root) = root else {
        return next;
    };
    if !heap.get(root).is_cell() {
        return Some(heap.cell(Some(root), next));
    }

    let mut last = root;
    loop {
        match heap.get(last) {
            Value::Cell { tail: None, .. } => {
                set_tail(heap, last, next);
                break;
            }
            Value::Cell {
                tail: Some(tail), ..
            } if heap.get(*tail).is_cell() => last = *tail,
            Value::Cell {
                tail: Some(tail), ..
            } => {
                let bare = *tail;
                let wrapped = heap.cell(Some(bare), next);
                set_tail(heap, last, Some(wrapped));
                break;
            }
            other => unreachable!("chain link is a {}", other.kind_name()),
        }
    }
    Some(root)
}

fn set_tail(heap: &mut Heap, cell: ValueId, next: Option<ValueId>) {
    if let Value::Cell { tail, .. } = heap.get_mut(cell) {
        *tail = next;
    }
}

/// Increase the arity of a symbol node; other kinds are left alone
pub fn add_arity(heap: &mut Heap, symbol: ValueId, count: usize) {
    if let Value::Symbol { arity, .. } | Value::LambdaSymbol { arity, .. } = heap.get_mut(symbol) {
        *arity += count;
    }
}

/// Symbol heading `chain`, if its first cell holds one
pub fn head_symbol(heap: &Heap, chain: Option<ValueId>) -> Option<ValueId> {
    match chain.map(|id| heap.get(id)) {
        Some(Value::Cell {
            head: Some(head), ..
        }) if matches!(heap.get(*head), Value::Symbol { .. }) => Some(*head),
        _ => None,
    }
}

/// Record that the head symbol of an application consumes the elements after it.
///
/// `elements` counts every direct element of the bracketed form, head included.
pub fn annotate_application(heap: &mut Heap, chain: Option<ValueId>, elements: usize) {
    if let Some(head) = head_symbol(heap, chain) {
        add_arity(heap, head, elements.saturating_sub(1));
    }
}

/// Zero the arity of every parameter symbol in a parameter chain
pub fn reset_parameters(heap: &mut Heap, params: Option<ValueId>) -> Result<(), Error> {
    let mut cursor = params;
    while let Some(id) = cursor {
        let (head, tail) = match heap.get(id) {
            Value::Cell { head, tail } => (*head, *tail),
            other => {
                return Err(Error::syntax(format!(
                    "parameter list must be a list of symbols, found {}",
                    other.kind_name()
                )));
            }
        };
        match head {
            Some(symbol) if matches!(heap.get(symbol), Value::Symbol { .. }) => {
                if let Value::Symbol { arity, .. } = heap.get_mut(symbol) {
                    *arity = 0;
                }
            }
            _ => return Err(Error::syntax("parameters must be symbols")),
        }
        cursor = tail;
    }
    Ok(())
}

/// Store the parameter count and total consumed elements on a lambda keyword node
pub fn set_lambda_counts(heap: &mut Heap, lambda: ValueId, params: usize, body_forms: usize) {
    if let Value::LambdaSymbol {
        arity,
        params: declared,
    } = heap.get_mut(lambda)
    {
        *declared = params;
        *arity += params + body_forms;
    }
}

/// Move `steps` links along a chain
pub fn advance_by(
    heap: &Heap,
    mut cursor: Option<ValueId>,
    steps: usize,
) -> Result<Option<ValueId>, Error> {
    for _ in 0..steps {
        cursor = match cursor.map(|id| heap.get(id)) {
            Some(Value::Cell { tail, .. }) => *tail,
            _ => return Err(Error::runtime("argument chain ended early")),
        };
    }
    Ok(cursor)
}

/// Number of cells occupied by `count` logical elements starting at `start`.
///
/// Every element takes one cell. An element headed by a symbol also owns the cells its
/// own arguments occupy, found by applying the same rule to the symbol's arity.
pub fn span(heap: &Heap, start: Option<ValueId>, count: usize) -> Result<usize, Error> {
    let mut total = count;
    let mut cursor = start;
    for i in 0..count {
        let element = cursor.ok_or_else(|| Error::runtime("argument chain ended early"))?;
        if let Value::Cell {
            head: Some(head),
            tail,
        } = heap.get(element)
            && let Some(arity) = heap.get(*head).symbol_arity()
        {
            let nested = span(heap, *tail, arity)?;
            total += nested;
            cursor = advance_by(heap, cursor, nested)?;
        }

        match cursor.map(|id| heap.get(id)) {
            Some(Value::Cell { tail, .. }) => cursor = *tail,
            _ if i + 1 == count => {}
            _ => return Err(Error::runtime("argument chain is not a list")),
        }
    }
    Ok(total)
}
