//! Recursive descent parser.
//!
//! Grammar, lowest precedence first:
//!
//! ```text
//! statement := DIM IDENT
//!            | PRINT expr
//!            | IF expr THEN statement* [ELSE statement*] [END]
//!            | FOR IDENT '=' expr TO expr statement* [NEXT]
//!            | expr
//! expr      := term (('+' | '-') term)*
//! term      := factor (('*' | '/') factor)*
//! factor    := NUMBER | IDENT | '(' expr ')'
//! ```
//!
//! `END` and `NEXT` are optional, so a body keeps going until its terminator
//! or the end of input.

use thiserror::Error;

use super::lexer::{Keyword, LexError, Lexer, Spanned, Token};
use crate::ir::ast::{Node, Program};
use crate::SourceLocation;

/// `END` closes an IF. It is not a keyword, so it arrives as an identifier.
const END_MARKER: &str = "END";

/// Deepest allowed nesting of parentheses, IF and FOR combined.
pub const MAX_NESTING: usize = 200;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("Unexpected token {found} at {location}. Expected {expected}")]
    UnexpectedToken {
        expected: String,
        found: Token,
        location: SourceLocation,
    },

    #[error("Unexpected end of input. Expected {expected}")]
    UnexpectedEndOfInput { expected: String },

    #[error("Nesting deeper than {limit} levels at {location}")]
    NestingTooDeep {
        limit: usize,
        location: SourceLocation,
    },

    #[error(transparent)]
    Lexical(#[from] LexError),
}

pub struct Parser<'source> {
    lexer: Lexer<'source>,
    current: Spanned,
    depth: usize,
}

impl<'source> Parser<'source> {
    pub fn new(source: &'source str) -> Result<Self, ParseError> {
        let mut lexer = Lexer::new(source);
        let current = lexer.next_token()?;
        Ok(Self {
            lexer,
            current,
            depth: 0,
        })
    }

    /// The lookahead token.
    pub fn current(&self) -> &Token {
        &self.current.token
    }

    /// Consume the lookahead and return it.
    fn advance(&mut self) -> Result<Spanned, ParseError> {
        let next = self.lexer.next_token()?;
        Ok(std::mem::replace(&mut self.current, next))
    }

    fn location(&self) -> SourceLocation {
        SourceLocation::from_offset(self.lexer.source(), self.current.span.start)
    }

    fn unexpected(&self, expected: impl Into<String>) -> ParseError {
        let expected = expected.into();
        match &self.current.token {
            Token::EndOfInput => ParseError::UnexpectedEndOfInput { expected },
            found => ParseError::UnexpectedToken {
                expected,
                found: found.clone(),
                location: self.location(),
            },
        }
    }

    /// Run `f` one nesting level deeper, failing once `MAX_NESTING` is hit.
    fn nested<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, ParseError>,
    ) -> Result<T, ParseError> {
        if self.depth >= MAX_NESTING {
            return Err(ParseError::NestingTooDeep {
                limit: MAX_NESTING,
                location: self.location(),
            });
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    /// Advance if the lookahead equals `expected`, fail otherwise.
    pub fn expect(&mut self, expected: &Token) -> Result<Spanned, ParseError> {
        if &self.current.token == expected {
            self.advance()
        } else {
            Err(self.unexpected(expected.to_string()))
        }
    }

    fn expect_identifier(&mut self) -> Result<String, ParseError> {
        match &self.current.token {
            Token::Identifier(name) => {
                let name = name.clone();
                self.advance()?;
                Ok(name)
            }
            _ => Err(self.unexpected("identifier")),
        }
    }

    fn at_keyword(&self, keyword: Keyword) -> bool {
        self.current.token == Token::Keyword(keyword)
    }

    fn at_end_marker(&self) -> bool {
        matches!(&self.current.token, Token::Identifier(name) if name == END_MARKER)
    }

    fn at_end_of_input(&self) -> bool {
        self.current.token == Token::EndOfInput
    }

    pub fn parse_program(&mut self) -> Result<Program, ParseError> {
        let mut statements = Vec::new();
        while !self.at_end_of_input() {
            statements.push(self.parse_statement()?);
        }
        Ok(Program { statements })
    }

    pub fn parse_statement(&mut self) -> Result<Node, ParseError> {
        match self.current.token {
            Token::Keyword(Keyword::Dim) => self.parse_dim(),
            Token::Keyword(Keyword::Print) => self.parse_print(),
            Token::Keyword(Keyword::If) => self.nested(Self::parse_if),
            Token::Keyword(Keyword::For) => self.nested(Self::parse_for),
            _ => self.parse_expr(),
        }
    }

    fn parse_dim(&mut self) -> Result<Node, ParseError> {
        self.expect(&Token::Keyword(Keyword::Dim))?;
        let name = self.expect_identifier()?;
        Ok(Node::Declare(name))
    }

    fn parse_print(&mut self) -> Result<Node, ParseError> {
        self.expect(&Token::Keyword(Keyword::Print))?;
        let value = self.parse_expr()?;
        Ok(Node::print(value))
    }

    fn parse_if(&mut self) -> Result<Node, ParseError> {
        self.expect(&Token::Keyword(Keyword::If))?;
        let condition = self.parse_expr()?;
        self.expect(&Token::Keyword(Keyword::Then))?;

        let then_body =
            self.parse_block(|p| p.at_keyword(Keyword::Else) || p.at_end_marker())?;

        let else_body = if self.at_keyword(Keyword::Else) {
            self.advance()?;
            Some(self.parse_block(|p| p.at_end_marker())?)
        } else {
            None
        };

        if self.at_end_marker() {
            self.advance()?;
        }

        Ok(Node::If {
            condition: Box::new(condition),
            then_body,
            else_body,
        })
    }

    fn parse_for(&mut self) -> Result<Node, ParseError> {
        self.expect(&Token::Keyword(Keyword::For))?;
        let var = self.expect_identifier()?;
        self.expect(&Token::Symbol('='))?;
        let start = self.parse_expr()?;
        self.expect(&Token::Keyword(Keyword::To))?;
        let end = self.parse_expr()?;

        let body = self.parse_block(|p| p.at_keyword(Keyword::Next))?;
        if self.at_keyword(Keyword::Next) {
            self.advance()?;
        }

        Ok(Node::For {
            var,
            start: Box::new(start),
            end: Box::new(end),
            body,
        })
    }

    /// Collect statements until `stop` holds or the input runs out.
    fn parse_block(&mut self, stop: fn(&Self) -> bool) -> Result<Vec<Node>, ParseError> {
        let mut body = Vec::new();
        while !self.at_end_of_input() && !stop(self) {
            body.push(self.parse_statement()?);
        }
        Ok(body)
    }

    pub fn parse_expr(&mut self) -> Result<Node, ParseError> {
        let mut left = self.parse_term()?;
        while let Token::Symbol(op @ ('+' | '-')) = self.current.token {
            self.advance()?;
            let right = self.parse_term()?;
            left = Node::binary(left, op, right);
        }
        Ok(left)
    }

    fn parse_term(&mut self) -> Result<Node, ParseError> {
        let mut left = self.parse_factor()?;
        while let Token::Symbol(op @ ('*' | '/')) = self.current.token {
            self.advance()?;
            let right = self.parse_factor()?;
            left = Node::binary(left, op, right);
        }
        Ok(left)
    }

    fn parse_factor(&mut self) -> Result<Node, ParseError> {
        match &self.current.token {
            Token::Number(value) => {
                let value = *value;
                self.advance()?;
                Ok(Node::Number(value))
            }
            Token::Identifier(name) => {
                let name = name.clone();
                self.advance()?;
                Ok(Node::Variable(name))
            }
            Token::Symbol('(') => {
                self.nested(|p| {
                    p.advance()?;
                    let inner = p.parse_expr()?;
                    p.expect(&Token::Symbol(')'))?;
                    Ok(inner)
                })
            }
            _ => Err(self.unexpected("number, identifier or '('")),
        }
    }
}
