//! Text rendering for values a program can observe.

use crate::Error;
use crate::ast::{ListEntry, MaterializedList, Value, ValueId};
use crate::heap::Heap;

/// Render a value the way the REPL prints it
pub fn render(heap: &Heap, id: ValueId) -> Result<String, Error> {
    let mut out = String::new();
    render_into(heap, id, &mut out)?;
    Ok(out)
}

fn render_into(heap: &Heap, id: ValueId, out: &mut String) -> Result<(), Error> {
    match heap.get(id) {
        Value::Number(n) | Value::DottedNumber(n) => out.push_str(&n.to_string()),
        Value::Bool(true) => out.push_str("#t"),
        Value::Bool(false) => out.push_str("#f"),
        Value::Symbol { name, .. } => out.push_str(name),
        Value::List(list) => render_list(heap, list, out)?,
        other => {
            return Err(Error::runtime(format!(
                "cannot print a {}",
                other.kind_name()
            )));
        }
    }
    Ok(())
}

/// Items are separated by single spaces, never directly after an opening bracket or
/// before a closing one. A dotted tail in a list of more than one element prints as `. n`.
fn render_list(heap: &Heap, list: &MaterializedList, out: &mut String) -> Result<(), Error> {
    let dotted_allowed = list.len() > 1;
    for (i, entry) in list.entries().iter().enumerate() {
        match entry {
            ListEntry::Item(item)
                if dotted_allowed && matches!(heap.get(*item), Value::DottedNumber(_)) =>
            {
                out.push_str(" . ");
                render_into(heap, *item, out)?;
            }
            ListEntry::Close => out.push(')'),
            entry => {
                if i > 0 && !out.ends_with('(') {
                    out.push(' ');
                }
                match entry {
                    ListEntry::Open => out.push('('),
                    ListEntry::Item(item) => render_into(heap, *item, out)?,
                    ListEntry::Close => {}
                }
            }
        }
    }
    Ok(())
}
