//! Reader turning a token stream into annotated pair chains.
//!
//! Nested forms are spliced into the chain of the form that contains them, and the head
//! symbol of every application records how many elements follow it (see [`crate::arity`]).
//! The reader also rewrites the syntactic keywords:
//!
//! - `(define name expr)` and `(set! name expr)` become calls to internal marker symbols
//! - `(define (name params...) body...)` becomes a definition of a lambda term
//! - `(lambda (params...) body...)` becomes a [`Value::LambdaCell`]
//! - `'datum` and `(quote datum)` read the datum with its brackets kept as marker symbols

use crate::ast::{
    CLOSE_MARKER, DEFINE_KEYWORD, DEFINE_MARKER, LAMBDA_KEYWORD, OPEN_MARKER, QUOTE_KEYWORD,
    SET_KEYWORD, SET_MARKER, Value, ValueId,
};
use crate::heap::Heap;
use crate::lexer::{Token, TokenStream};
use crate::{Error, MAX_PARSE_DEPTH, arity};

/// Whether brackets denote applications or quoted list structure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReadMode {
    Code,
    Datum,
}

struct Reader<'h> {
    heap: &'h mut Heap,
    tokens: TokenStream,
    depth: usize,
}

/// Parse exactly one expression from `input`, allocating its nodes in `heap`.
///
/// Returns `Ok(None)` for the empty application `()`.
pub fn parse_scheme(heap: &mut Heap, input: &str) -> Result<Option<ValueId>, Error> {
    let tokens = TokenStream::new(input)?;
    if tokens.is_end() {
        return Err(Error::syntax("empty input"));
    }

    let mut reader = Reader {
        heap,
        tokens,
        depth: 0,
    };
    let expr = reader.read(ReadMode::Code)?;
    if !reader.tokens.is_end() {
        return Err(Error::syntax("unexpected input after the first expression"));
    }
    Ok(expr)
}

fn plain_number(heap: &Heap, id: ValueId) -> Option<i64> {
    match heap.get(id) {
        Value::Number(n) => Some(*n),
        _ => None,
    }
}

impl Reader<'_> {
    fn read(&mut self, mode: ReadMode) -> Result<Option<ValueId>, Error> {
        let token = self.tokens.expect_token()?.clone();
        match token {
            Token::Open => {
                self.tokens.advance();
                self.depth += 1;
                if self.depth > MAX_PARSE_DEPTH {
                    return Err(Error::syntax(format!(
                        "expression too deeply nested (max depth: {MAX_PARSE_DEPTH})"
                    )));
                }
                let list = self.read_list(mode);
                self.depth -= 1;
                list
            }
            Token::Close => Err(Error::syntax(
                "closing bracket without matching opening bracket",
            )),
            Token::Dot => Err(Error::syntax("unexpected dot")),
            Token::Quote if mode == ReadMode::Datum => {
                self.tokens.advance();
                Ok(Some(self.heap.symbol(QUOTE_KEYWORD)))
            }
            Token::Quote => {
                self.tokens.advance();
                self.read_quoted().map(Some)
            }
            Token::Boolean(b) => {
                self.tokens.advance();
                Ok(Some(self.heap.boolean(b)))
            }
            Token::Constant(n) => {
                self.tokens.advance();
                Ok(Some(self.heap.number(n)))
            }
            Token::Symbol(name) => {
                self.tokens.advance();
                Ok(Some(self.heap.symbol(&name)))
            }
        }
    }

    /// Read the elements of a bracketed form; the opening bracket is already consumed
    fn read_list(&mut self, mode: ReadMode) -> Result<Option<ValueId>, Error> {
        match self.tokens.peek() {
            None => {
                return Err(Error::syntax(
                    "opening bracket without matching closing bracket",
                ));
            }
            Some(Token::Dot) => return Err(Error::syntax("a list cannot start with a dot")),
            Some(_) => {}
        }

        let mut root = None;
        let mut elements = 0;
        loop {
            let token = match self.tokens.peek() {
                None => {
                    return Err(Error::syntax(
                        "opening bracket without matching closing bracket",
                    ));
                }
                Some(Token::Close) => break,
                Some(token) => token.clone(),
            };

            match token {
                Token::Symbol(name) if mode == ReadMode::Code && name == LAMBDA_KEYWORD => {
                    self.tokens.advance();
                    let lambda = self.read_lambda()?;
                    return Ok(Some(self.heap.cell(Some(lambda), None)));
                }
                Token::Symbol(name)
                    if mode == ReadMode::Code && (name == DEFINE_KEYWORD || name == SET_KEYWORD) =>
                {
                    self.tokens.advance();
                    let marker = if name == DEFINE_KEYWORD {
                        DEFINE_MARKER
                    } else {
                        SET_MARKER
                    };
                    let marker = self.heap.symbol(marker);
                    let marker = self.heap.cell(Some(marker), None);
                    root = arity::append(self.heap, root, Some(marker));

                    if self.tokens.at_close_or_end() {
                        return Err(Error::syntax(format!(
                            "{name} expects a name and an expression"
                        )));
                    }
                    if name == DEFINE_KEYWORD && self.tokens.peek() == Some(&Token::Open) {
                        return self.read_procedure_definition(root);
                    }
                    root = self.read_binding(&name, root)?;
                    elements += 3;
                }
                Token::Dot => {
                    self.tokens.advance();
                    let tail = self.read(ReadMode::Code)?;
                    if self.tokens.peek() != Some(&Token::Close) {
                        return Err(Error::syntax("expected exactly one expression after dot"));
                    }
                    if let Some(id) = tail
                        && let Some(n) = plain_number(self.heap, id)
                    {
                        *self.heap.get_mut(id) = Value::DottedNumber(n);
                    }
                    root = arity::append(self.heap, root, tail);
                    elements += 1;
                }
                Token::Quote if mode == ReadMode::Code => {
                    self.tokens.advance();
                    let quoted = self.read_quoted()?;
                    root = arity::append(self.heap, root, Some(quoted));
                    elements += 1;
                }
                Token::Symbol(name) if mode == ReadMode::Code && name == QUOTE_KEYWORD => {
                    self.tokens.advance();
                    let quoted = self.read_quoted()?;
                    root = arity::append(self.heap, root, Some(quoted));
                    elements += 1;
                }
                _ => {
                    let element = self.read(mode)?;
                    let element = arity::as_chain(self.heap, element);
                    root = arity::append(self.heap, root, Some(element));
                    elements += 1;
                }
            }
        }
        self.tokens.advance();

        match mode {
            ReadMode::Datum => {
                let open = self.heap.symbol(OPEN_MARKER);
                let open = self.heap.cell(Some(open), root);
                let close = self.heap.symbol(CLOSE_MARKER);
                let close = self.heap.cell(Some(close), None);
                Ok(arity::append(self.heap, Some(open), Some(close)))
            }
            ReadMode::Code => {
                arity::annotate_application(self.heap, root, elements);
                Ok(root)
            }
        }
    }

    /// A `quote` call consuming every cell of the datum that follows.
    /// The quote keyword itself is already consumed.
    fn read_quoted(&mut self) -> Result<ValueId, Error> {
        if self.tokens.at_close_or_end() {
            return Err(Error::syntax("quote expects a datum"));
        }
        let quote = self.heap.symbol(QUOTE_KEYWORD);
        let datum = self.read(ReadMode::Datum)?;
        let datum = arity::as_chain(self.heap, datum);
        let cells = arity::chain_len(self.heap, Some(datum));
        arity::add_arity(self.heap, quote, cells);
        Ok(self.heap.cell(Some(quote), Some(datum)))
    }

    /// `NAME EXPR)` of a `define` or `set!`, appended to `root`
    fn read_binding(
        &mut self,
        keyword: &str,
        root: Option<ValueId>,
    ) -> Result<Option<ValueId>, Error> {
        let target = self.read(ReadMode::Code)?;
        if let Some(id) = target
            && self.heap.get(id).is_cell()
        {
            return Err(Error::syntax(format!(
                "{keyword} expects a name, not an expression"
            )));
        }
        let target = arity::as_chain(self.heap, target);
        let root = arity::append(self.heap, root, Some(target));

        if self.tokens.at_close_or_end() {
            return Err(Error::syntax(format!("{keyword} expects an expression")));
        }
        let expr = self.read(ReadMode::Code)?;
        let expr = match expr.map(|id| self.heap.get(id)) {
            Some(Value::Cell {
                head: Some(head),
                tail: None,
            }) if matches!(self.heap.get(*head), Value::LambdaCell { .. }) => *head,
            _ => arity::as_chain(self.heap, expr),
        };
        let root = arity::append(self.heap, root, Some(expr));

        if self.tokens.peek() != Some(&Token::Close) {
            return Err(Error::syntax(format!(
                "{keyword} expects exactly two arguments"
            )));
        }
        Ok(root)
    }

    /// `(NAME PARAMS...) BODY...)` of a procedure definition, appended to `root`.
    /// Consumes the closing bracket of the whole form.
    fn read_procedure_definition(
        &mut self,
        root: Option<ValueId>,
    ) -> Result<Option<ValueId>, Error> {
        if let Some(head) = arity::head_symbol(self.heap, root) {
            arity::add_arity(self.heap, head, 2);
        }

        let signature = self
            .read(ReadMode::Code)?
            .ok_or_else(|| Error::syntax("define expects a procedure name"))?;
        arity::reset_parameters(self.heap, Some(signature))?;
        let (name, params) = match self.heap.get(signature) {
            Value::Cell { head, tail } => (*head, *tail),
            _ => return Err(Error::syntax("define expects a procedure name")),
        };
        let name = self.heap.cell(name, None);
        let root = arity::append(self.heap, root, Some(name));

        let lambda = self.read_lambda_rest(params)?;
        Ok(arity::append(self.heap, root, Some(lambda)))
    }

    /// `(PARAMS...) BODY...)` of a lambda literal; the keyword is already consumed
    fn read_lambda(&mut self) -> Result<ValueId, Error> {
        if self.tokens.at_close_or_end() {
            return Err(Error::syntax("lambda expects parameters and a body"));
        }
        let params = self.read(ReadMode::Code)?;
        arity::reset_parameters(self.heap, params)?;
        self.read_lambda_rest(params)
    }

    /// Read body forms after `params` up to and including the closing bracket
    fn read_lambda_rest(&mut self, params: Option<ValueId>) -> Result<ValueId, Error> {
        let symbol = self.heap.alloc(Value::LambdaSymbol {
            arity: 0,
            params: 0,
        });
        let param_count = arity::chain_len(self.heap, params);

        if self.tokens.at_close_or_end() {
            return Err(Error::syntax("lambda needs a body"));
        }
        let mut body = params;
        let mut forms = 0;
        while self.tokens.expect_token()? != &Token::Close {
            let form = self.read(ReadMode::Code)?;
            let form = arity::as_chain(self.heap, form);
            body = arity::append(self.heap, body, Some(form));
            forms += 1;
        }
        self.tokens.advance();

        arity::set_lambda_counts(self.heap, symbol, param_count, forms);
        Ok(self.heap.alloc(Value::LambdaCell { symbol, body }))
    }
}
