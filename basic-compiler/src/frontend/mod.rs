//! Source text to AST: the token scanner and the recursive descent parser.

pub mod lexer;
pub mod parser;
