//! Tokenizer turning one line of program text into lexical tokens.
//!
//! Token rules:
//! - `(`, `)`, `.` and `'` stand alone
//! - a leading `+`, `-` or digit takes the digits that follow; a lone sign is a symbol
//! - `#t` and `#f` are booleans
//! - symbols start with a letter or one of `<=>*/#` and continue with letters, digits or `<=>*/#?!-`
//! - any other run of non-blank characters is rejected

use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::{tag, take_till1, take_while},
    character::complete::{char, multispace0, satisfy},
    combinator::{map, recognize, value},
    sequence::{pair, preceded},
};

use crate::Error;
use crate::ast::NumberType;

/// Characters that may start a symbol besides ASCII letters
const SYMBOL_START_CHARS: &str = "<=>*/#";
/// Characters that may continue a symbol besides ASCII letters and digits
const SYMBOL_CHARS: &str = "<=>*/#?!-";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Constant(NumberType),
    Boolean(bool),
    Symbol(String),
    Quote,
    Dot,
    Open,
    Close,
}

/// Raw lexeme before classification
#[derive(Debug, Clone, PartialEq)]
enum Lexeme<'a> {
    Token(Token),
    Numeric(&'a str),
    Symbol(&'a str),
    Invalid(&'a str),
}

fn is_blank(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | '\r')
}

fn is_symbol_start(c: char) -> bool {
    c.is_ascii_alphabetic() || SYMBOL_START_CHARS.contains(c)
}

fn is_symbol_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || SYMBOL_CHARS.contains(c)
}

fn punctuation(input: &str) -> IResult<&str, Token> {
    alt((
        value(Token::Open, char('(')),
        value(Token::Close, char(')')),
        value(Token::Dot, char('.')),
        value(Token::Quote, char('\'')),
    ))
    .parse(input)
}

/// A sign or digit followed by any digits
fn numeric(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        satisfy(|c: char| c == '+' || c == '-' || c.is_ascii_digit()),
        take_while(|c: char| c.is_ascii_digit()),
    ))
    .parse(input)
}

fn boolean(input: &str) -> IResult<&str, Token> {
    alt((
        value(Token::Boolean(true), tag("#t")),
        value(Token::Boolean(false), tag("#f")),
    ))
    .parse(input)
}

fn symbol(input: &str) -> IResult<&str, &str> {
    recognize(pair(satisfy(is_symbol_start), take_while(is_symbol_char))).parse(input)
}

fn invalid(input: &str) -> IResult<&str, &str> {
    take_till1(is_blank).parse(input)
}

fn next_lexeme(input: &str) -> IResult<&str, Lexeme<'_>> {
    preceded(
        multispace0,
        alt((
            map(punctuation, Lexeme::Token),
            map(numeric, Lexeme::Numeric),
            map(boolean, Lexeme::Token),
            map(symbol, Lexeme::Symbol),
            map(invalid, Lexeme::Invalid),
        )),
    )
    .parse(input)
}

fn classify(lexeme: Lexeme<'_>) -> Result<Token, Error> {
    match lexeme {
        Lexeme::Token(token) => Ok(token),
        Lexeme::Numeric(sign @ ("+" | "-")) => Ok(Token::Symbol(sign.to_owned())),
        Lexeme::Numeric(digits) => digits
            .parse::<NumberType>()
            .map(Token::Constant)
            .map_err(|_| Error::syntax(format!("integer literal out of range: {digits}"))),
        Lexeme::Symbol(name) => Ok(Token::Symbol(name.to_owned())),
        Lexeme::Invalid(text) => Err(Error::syntax(format!("invalid token: {text}"))),
    }
}

/// Split `input` into tokens
pub fn tokenize(input: &str) -> Result<Vec<Token>, Error> {
    let mut tokens = Vec::new();
    let mut rest = input;
    while !rest.trim_start_matches(is_blank).is_empty() {
        let (remaining, lexeme) = next_lexeme(rest).map_err(|_| {
            Error::syntax(format!(
                "invalid token near '{}'",
                rest.trim_start().chars().take(10).collect::<String>()
            ))
        })?;
        tokens.push(classify(lexeme)?);
        rest = remaining;
    }
    Ok(tokens)
}

/// Token sequence consumed with one token of lookahead
#[derive(Debug, Clone)]
pub struct TokenStream {
    tokens: Vec<Token>,
    position: usize,
}

impl TokenStream {
    pub fn new(input: &str) -> Result<Self, Error> {
        Ok(TokenStream {
            tokens: tokenize(input)?,
            position: 0,
        })
    }

    pub fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.position)
    }

    /// The current token, or a syntax error at end of input
    pub fn expect_token(&self) -> Result<&Token, Error> {
        self.peek()
            .ok_or_else(|| Error::syntax("unexpected end of input"))
    }

    pub fn advance(&mut self) {
        if self.position < self.tokens.len() {
            self.position += 1;
        }
    }

    pub fn is_end(&self) -> bool {
        self.position >= self.tokens.len()
    }

    /// True when the current token is `)` or the input is exhausted
    pub fn at_close_or_end(&self) -> bool {
        matches!(self.peek(), None | Some(Token::Close))
    }
}
