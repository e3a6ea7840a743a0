//! Lexical frames stored in the heap.
//!
//! An [`Environment`] is a copyable handle to a [`Value::Scope`] slot. Frames link to their
//! enclosing frame by handle, so a closure that captures a frame shares it rather than
//! copying it, and later mutation of outer bindings stays visible to the closure.

use crate::Error;
use crate::ast::{Scope, Value, ValueId};
use crate::heap::Heap;

/// Handle to one frame of the environment chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Environment(ValueId);

impl Environment {
    /// Allocate a frame with no enclosing scope
    pub fn new_root(heap: &mut Heap) -> Self {
        Environment(heap.alloc(Value::Scope(Scope::default())))
    }

    /// Allocate a fresh frame enclosed by `parent`
    pub fn child_of(heap: &mut Heap, parent: Environment) -> Self {
        Environment(heap.alloc(Value::Scope(Scope {
            bindings: Default::default(),
            parent: Some(parent.0),
        })))
    }

    /// Reinterpret a heap handle as a frame, if it is one
    pub fn from_id(heap: &Heap, id: ValueId) -> Option<Self> {
        matches!(heap.get(id), Value::Scope(_)).then_some(Environment(id))
    }

    pub fn id(self) -> ValueId {
        self.0
    }

    fn scope(self, heap: &Heap) -> &Scope {
        match heap.get(self.0) {
            Value::Scope(scope) => scope,
            other => unreachable!("environment handle points at a {}", other.kind_name()),
        }
    }

    fn scope_mut(self, heap: &mut Heap) -> &mut Scope {
        match heap.get_mut(self.0) {
            Value::Scope(scope) => scope,
            other => unreachable!("environment handle points at a {}", other.kind_name()),
        }
    }

    pub fn parent(self, heap: &Heap) -> Option<Environment> {
        self.scope(heap).parent.map(Environment)
    }

    /// The nearest frame, starting here, that binds `name`
    fn frame_binding(self, heap: &Heap, name: &str) -> Option<Environment> {
        let mut frame = Some(self);
        while let Some(current) = frame {
            if current.scope(heap).bindings.contains_key(name) {
                return Some(current);
            }
            frame = current.parent(heap);
        }
        None
    }

    /// Resolve `name` through the chain
    pub fn lookup(self, heap: &Heap, name: &str) -> Option<ValueId> {
        let frame = self.frame_binding(heap, name)?;
        frame.scope(heap).bindings.get(name).copied()
    }

    /// Overwrite a visible binding where it lives, or create one in this frame.
    /// Returns whether the name was already bound.
    pub fn define(self, heap: &mut Heap, name: &str, value: ValueId) -> bool {
        match self.frame_binding(heap, name) {
            Some(frame) => {
                frame.scope_mut(heap).bindings.insert(name.to_owned(), value);
                true
            }
            None => {
                self.scope_mut(heap).bindings.insert(name.to_owned(), value);
                false
            }
        }
    }

    /// Overwrite a visible binding; never creates one
    pub fn assign(self, heap: &mut Heap, name: &str, value: ValueId) -> Result<(), Error> {
        let frame = self
            .frame_binding(heap, name)
            .ok_or_else(|| Error::name(format!("variable {name} does not exist")))?;
        frame.scope_mut(heap).bindings.insert(name.to_owned(), value);
        Ok(())
    }

    /// Bind in this frame only, shadowing any outer binding
    pub fn force_bind(self, heap: &mut Heap, name: &str, value: ValueId) {
        self.scope_mut(heap).bindings.insert(name.to_owned(), value);
    }

    /// Bindings of this frame only, sorted by name
    pub fn local_bindings(self, heap: &Heap) -> Vec<(String, ValueId)> {
        let mut bindings: Vec<_> = self
            .scope(heap)
            .bindings
            .iter()
            .map(|(name, value)| (name.clone(), *value))
            .collect();
        bindings.sort_by(|a, b| a.0.cmp(&b.0));
        bindings
    }
}
