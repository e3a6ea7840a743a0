//! Line-at-a-time front door tying the reader, evaluator, printer and heap together.

use crate::Error;
use crate::ast::ValueId;
use crate::environment::Environment;
use crate::evaluator;
use crate::heap::{Heap, HeapStats};
use crate::printer::render;
use crate::scheme::parse_scheme;
use tracing::{debug, trace};

/// Interpreter settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterpreterConfig {
    /// Sweep the heap after every top-level evaluation
    pub collect_garbage: bool,
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        InterpreterConfig {
            collect_garbage: true,
        }
    }
}

/// One interpreter session: a heap and the root environment living in it.
///
/// Bindings made by one line stay visible to the next. A failing line leaves the session
/// usable, though bindings it completed before failing are kept.
///
/// ```
/// use arilisp::Interpreter;
///
/// let mut interpreter = Interpreter::new();
/// assert_eq!(interpreter.run("(define (sq x) (* x x))").unwrap(), "#t");
/// assert_eq!(interpreter.run("(sq 7)").unwrap(), "49");
/// ```
#[derive(Debug)]
pub struct Interpreter {
    heap: Heap,
    root: Environment,
    config: InterpreterConfig,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    pub fn new() -> Self {
        Self::with_config(InterpreterConfig::default())
    }

    pub fn with_config(config: InterpreterConfig) -> Self {
        let mut heap = Heap::new();
        let root = Environment::new_root(&mut heap);
        Interpreter { heap, root, config }
    }

    /// Read, evaluate and print one line
    pub fn run(&mut self, line: &str) -> Result<String, Error> {
        trace!(line, "evaluating input");
        let result = self
            .eval_line(line)
            .and_then(|value| render(&self.heap, value));
        self.finish(&[]);
        if let Err(err) = &result {
            debug!(%err, "evaluation failed");
        }
        result
    }

    /// Read and evaluate one line, keeping the result alive for inspection through
    /// [`Interpreter::heap`] until the next call
    pub fn evaluate(&mut self, line: &str) -> Result<ValueId, Error> {
        trace!(line, "evaluating input");
        let result = self.eval_line(line);
        match &result {
            Ok(value) => self.finish(&[*value]),
            Err(err) => {
                self.finish(&[]);
                debug!(%err, "evaluation failed");
            }
        }
        result
    }

    fn eval_line(&mut self, line: &str) -> Result<ValueId, Error> {
        let expr = parse_scheme(&mut self.heap, line)?
            .ok_or_else(|| Error::runtime("no operations"))?;
        evaluator::eval(&mut self.heap, expr, self.root)
    }

    fn finish(&mut self, extra_roots: &[ValueId]) {
        if self.config.collect_garbage {
            self.collect(extra_roots);
        }
    }

    /// Sweep everything unreachable from the root environment and `extra_roots`.
    /// Returns the number of values freed.
    pub fn collect(&mut self, extra_roots: &[ValueId]) -> usize {
        let mut roots = vec![self.root.id()];
        roots.extend_from_slice(extra_roots);
        self.heap.collect(&roots)
    }

    pub fn heap(&self) -> &Heap {
        &self.heap
    }

    pub fn root_env(&self) -> Environment {
        self.root
    }

    pub fn config(&self) -> InterpreterConfig {
        self.config
    }

    pub fn stats(&self) -> HeapStats {
        self.heap.stats()
    }

    /// Global bindings with their printed values, sorted by name.
    /// Values that cannot be printed show their kind in angle brackets.
    pub fn bindings(&self) -> Vec<(String, String)> {
        self.root
            .local_bindings(&self.heap)
            .into_iter()
            .map(|(name, value)| {
                let text = render(&self.heap, value)
                    .unwrap_or_else(|_| format!("<{}>", self.heap.get(value).kind_name()));
                (name, text)
            })
            .collect()
    }
}

impl Drop for Interpreter {
    fn drop(&mut self) {
        let freed = self.heap.collect(&[]);
        debug!(freed, "interpreter shut down");
    }
}
