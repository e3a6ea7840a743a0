//! Arilisp - a small Lisp interpreter with arity-annotated call chains
//!
//! This crate reads one expression at a time, evaluates it against a mutable lexical
//! environment and renders a printable result. Every value lives in a single
//! [`heap::Heap`] owned by the [`interpreter::Interpreter`]; the heap is swept after each
//! top-level evaluation using the root environment as the only root.
//!
//! ## Flattened Call Chains
//!
//! The parser splices nested applications into one right-leaning chain of pairs and
//! records on every head symbol how many direct elements follow it. The evaluator uses
//! those counts to find argument boundaries:
//!
//! ```scheme
//! (+ 1 (* 2 3))          ; chain: + 1 * 2 3, with + consuming 2 and * consuming 2
//! (define (sq x) (* x x))
//! (sq 7)                 ; 49
//! (car '(1 2 3))         ; 1
//! (cons 1 2)             ; (1 . 2)
//! ```
//!
//! ## Modules
//!
//! - `lexer`: tokenizer built on nom
//! - `scheme`: reader turning tokens into annotated pair chains
//! - `arity`: span computation and arity bookkeeping for chains
//! - `ast`: the closed set of value kinds
//! - `heap`: arena storage with mark-and-sweep collection
//! - `environment`: chained lexical frames stored in the heap
//! - `evaluator`: argument collection, application and special forms
//! - `builtinops`: registry of primitive operations
//! - `printer`: value-to-text rendering
//! - `interpreter`: the line-at-a-time front door

use std::fmt;

/// Maximum bracket nesting accepted by the reader
pub const MAX_PARSE_DEPTH: usize = 64;

/// Maximum nesting of evaluations before a runtime error is reported
/// instead of exhausting the host stack
pub const MAX_EVAL_DEPTH: usize = 1024;

/// Error types for the interpreter
///
/// Every failure observed by callers falls into one of three categories. Name and
/// syntax errors raised while arguments are being collected are re-signaled as
/// runtime errors; see [`Error::into_runtime`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Malformed token stream: unmatched brackets, invalid token text, misplaced dot
    SyntaxError(String),
    /// Reference to an unbound symbol, or `set!` on an unbound name
    NameError(String),
    /// Wrong argument count or kind, bad call position, out-of-range index
    RuntimeError(String),
}

impl Error {
    pub(crate) fn syntax(message: impl Into<String>) -> Self {
        Error::SyntaxError(message.into())
    }

    pub(crate) fn name(message: impl Into<String>) -> Self {
        Error::NameError(message.into())
    }

    pub(crate) fn runtime(message: impl Into<String>) -> Self {
        Error::RuntimeError(message.into())
    }

    /// Create a runtime error describing a wrong argument count
    pub(crate) fn arity(op: &str, expected: &str, got: usize) -> Self {
        Error::RuntimeError(format!("{op}: expected {expected} arguments, got {got}"))
    }

    /// The message without its category prefix
    pub fn message(&self) -> &str {
        match self {
            Error::SyntaxError(msg) | Error::NameError(msg) | Error::RuntimeError(msg) => msg,
        }
    }

    /// Collapse any category into a runtime error, keeping the message
    pub fn into_runtime(self) -> Self {
        match self {
            Error::SyntaxError(msg) | Error::NameError(msg) => Error::RuntimeError(msg),
            runtime @ Error::RuntimeError(_) => runtime,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::SyntaxError(msg) => write!(f, "SyntaxError: {msg}"),
            Error::NameError(msg) => write!(f, "NameError: {msg}"),
            Error::RuntimeError(msg) => write!(f, "RuntimeError: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

pub mod arity;
pub mod ast;
pub mod builtinops;
pub mod environment;
pub mod evaluator;
pub mod heap;
pub mod interpreter;
pub mod lexer;
pub mod printer;
pub mod scheme;

pub use interpreter::{Interpreter, InterpreterConfig};
