//! Arena storage for every value, with a separate mark bitmap
//!
//! - Values are addressed by [`ValueId`] and never own each other
//! - Marking uses an explicit worklist, and an already-marked slot is skipped, so cycles terminate
//! - Sweeping deletes unmarked slots first and only then clears the marks of survivors
//! - Freed slots are recycled through a free list

use crate::ast::{ListEntry, MaterializedList, NumberType, Value, ValueId};
use tracing::debug;

/// Running totals kept by the heap
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeapStats {
    /// Values ever allocated
    pub allocated: u64,
    /// Values ever freed by a sweep
    pub freed: u64,
    /// Completed sweeps
    pub collections: u64,
}

/// Owner of every value the interpreter creates
#[derive(Debug, Default)]
pub struct Heap {
    slots: Vec<Option<Value>>,
    marks: Vec<bool>,
    free_list: Vec<u32>,
    stats: HeapStats,
}

impl Heap {
    pub fn new() -> Self {
        Heap {
            slots: Vec::with_capacity(1024),
            marks: Vec::with_capacity(1024),
            free_list: Vec::new(),
            stats: HeapStats::default(),
        }
    }

    /// Store a value and return its handle
    pub fn alloc(&mut self, value: Value) -> ValueId {
        self.stats.allocated += 1;
        if let Some(index) = self.free_list.pop() {
            self.slots[index as usize] = Some(value);
            self.marks[index as usize] = false;
            ValueId(index)
        } else {
            let index = u32::try_from(self.slots.len()).expect("heap exhausted the id space");
            self.slots.push(Some(value));
            self.marks.push(false);
            ValueId(index)
        }
    }

    /// Borrow a live value.
    ///
    /// Panics when `id` refers to a collected slot; sweeps only happen between top-level
    /// evaluations, so a handle obtained during an evaluation stays valid until it ends.
    #[inline]
    pub fn get(&self, id: ValueId) -> &Value {
        self.slots[id.index()]
            .as_ref()
            .expect("value handle refers to a collected slot")
    }

    #[inline]
    pub fn get_mut(&mut self, id: ValueId) -> &mut Value {
        self.slots[id.index()]
            .as_mut()
            .expect("value handle refers to a collected slot")
    }

    pub fn is_live(&self, id: ValueId) -> bool {
        self.slots.get(id.index()).is_some_and(Option::is_some)
    }

    #[inline]
    pub fn number(&mut self, n: NumberType) -> ValueId {
        self.alloc(Value::Number(n))
    }

    #[inline]
    pub fn boolean(&mut self, b: bool) -> ValueId {
        self.alloc(Value::Bool(b))
    }

    #[inline]
    pub fn symbol(&mut self, name: &str) -> ValueId {
        self.alloc(Value::symbol(name))
    }

    #[inline]
    pub fn cell(&mut self, head: Option<ValueId>, tail: Option<ValueId>) -> ValueId {
        self.alloc(Value::Cell { head, tail })
    }

    #[inline]
    pub fn list(&mut self, entries: Vec<ListEntry>) -> ValueId {
        self.alloc(Value::List(MaterializedList::from_entries(entries)))
    }

    /// Set the mark bit on `root` and everything reachable from it
    pub fn mark(&mut self, root: ValueId) {
        let mut worklist = vec![root];
        while let Some(id) = worklist.pop() {
            let index = id.index();
            if self.marks[index] {
                continue;
            }
            self.marks[index] = true;
            if let Some(value) = &self.slots[index] {
                value.push_references(&mut worklist);
            }
        }
    }

    pub fn is_marked(&self, id: ValueId) -> bool {
        self.marks.get(id.index()).copied().unwrap_or(false)
    }

    pub fn marked_count(&self) -> usize {
        self.marks.iter().filter(|marked| **marked).count()
    }

    /// Free every unmarked value, then clear the marks of the survivors.
    /// Returns the number of values freed.
    pub fn sweep(&mut self) -> usize {
        let mut freed = 0;
        for index in 0..self.slots.len() {
            if !self.marks[index] && self.slots[index].is_some() {
                self.slots[index] = None;
                self.free_list.push(index as u32);
                freed += 1;
            }
        }
        for (slot, mark) in self.slots.iter().zip(self.marks.iter_mut()) {
            if slot.is_some() {
                *mark = false;
            }
        }

        self.stats.freed += freed as u64;
        self.stats.collections += 1;
        freed
    }

    /// Mark from `roots` and sweep
    pub fn collect(&mut self, roots: &[ValueId]) -> usize {
        for root in roots {
            self.mark(*root);
        }
        let freed = self.sweep();
        debug!(freed, live = self.live_count(), "heap swept");
        freed
    }

    /// Number of values currently stored
    pub fn live_count(&self) -> usize {
        self.slots.len() - self.free_list.len()
    }

    pub fn stats(&self) -> HeapStats {
        self.stats
    }
}
