use logos::Logos;
use serde::Serialize;
use std::fmt;
use std::ops::Range;
use thiserror::Error;

use crate::SourceLocation;

/// Reserved words. Matching is case-sensitive: `dim` is an identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Keyword {
    Dim,
    Print,
    If,
    Then,
    Else,
    For,
    Next,
    To,
}

impl Keyword {
    pub const ALL: [Keyword; 8] = [
        Keyword::Dim,
        Keyword::Print,
        Keyword::If,
        Keyword::Then,
        Keyword::Else,
        Keyword::For,
        Keyword::Next,
        Keyword::To,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Keyword::Dim => "DIM",
            Keyword::Print => "PRINT",
            Keyword::If => "IF",
            Keyword::Then => "THEN",
            Keyword::Else => "ELSE",
            Keyword::For => "FOR",
            Keyword::Next => "NEXT",
            Keyword::To => "TO",
        }
    }

    pub fn from_word(word: &str) -> Option<Keyword> {
        Keyword::ALL.into_iter().find(|k| k.as_str() == word)
    }
}

impl fmt::Display for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Token {
    Number(f64),
    Identifier(String),
    Keyword(Keyword),
    Symbol(char),
    EndOfInput,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Number(n) => write!(f, "{n}"),
            Token::Identifier(s) => write!(f, "'{s}'"),
            Token::Keyword(k) => write!(f, "{k}"),
            Token::Symbol(c) => write!(f, "'{c}'"),
            Token::EndOfInput => write!(f, "end of input"),
        }
    }
}

/// A token together with the byte range it was read from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Spanned {
    pub token: Token,
    pub span: Range<usize>,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LexError {
    #[error("Unexpected character '{ch}' at {location}")]
    UnknownCharacter { ch: char, location: SourceLocation },

    #[error("Malformed number '{text}' at {location}")]
    MalformedNumber {
        text: String,
        location: SourceLocation,
    },
}

impl LexError {
    pub fn location(&self) -> SourceLocation {
        match self {
            LexError::UnknownCharacter { location, .. } => *location,
            LexError::MalformedNumber { location, .. } => *location,
        }
    }
}

// Raw scan. Numbers take every following digit and dot; `Lexer` decides
// whether the text is a valid float and whether a word is a keyword.
#[derive(Logos, Debug, Clone, Copy, PartialEq)]
#[logos(skip r"[ \t\r\n\x0B\f]+")]
enum Lexeme<'s> {
    #[regex(r"[0-9][0-9.]*", |lex| lex.slice())]
    Number(&'s str),

    #[regex(r"[A-Za-z][A-Za-z0-9]*", |lex| lex.slice())]
    Word(&'s str),

    #[regex(r"[-+*/()=<>:]", |lex| lex.slice().chars().next())]
    Symbol(char),
}

/// Convert a byte position to line and column numbers (1-based)
pub fn position_to_line_col(source: &str, position: usize) -> (usize, usize) {
    let mut line = 1;
    let mut col = 1;

    for (i, ch) in source.char_indices() {
        if i >= position {
            break;
        }
        if ch == '\n' {
            line += 1;
            col = 1;
        } else {
            col += 1;
        }
    }

    (line, col)
}

/// Get the line of source containing `position`, trimmed.
pub fn get_error_context(source: &str, position: usize) -> String {
    let position = position.min(source.len());
    let line_start = source[..position]
        .rfind('\n')
        .map(|pos| pos + 1)
        .unwrap_or(0);

    let line_end = source[position..]
        .find('\n')
        .map(|pos| position + pos)
        .unwrap_or(source.len());

    source[line_start..line_end].trim().to_string()
}

/// Pull-based tokenizer. Once the input is exhausted every further call to
/// `next_token` yields `EndOfInput`.
pub struct Lexer<'source> {
    source: &'source str,
    raw: logos::Lexer<'source, Lexeme<'source>>,
    done: bool,
}

impl<'source> Lexer<'source> {
    pub fn new(source: &'source str) -> Self {
        Self {
            source,
            raw: Lexeme::lexer(source),
            done: false,
        }
    }

    pub fn source(&self) -> &'source str {
        self.source
    }

    pub fn next_token(&mut self) -> Result<Spanned, LexError> {
        let Some(result) = self.raw.next() else {
            let end = self.source.len();
            return Ok(Spanned {
                token: Token::EndOfInput,
                span: end..end,
            });
        };
        let span = self.raw.span();

        let token = match result {
            Ok(Lexeme::Number(text)) => match text.parse::<f64>() {
                Ok(value) => Token::Number(value),
                Err(_) => {
                    return Err(LexError::MalformedNumber {
                        text: text.to_string(),
                        location: SourceLocation::from_offset(self.source, span.start),
                    })
                }
            },
            Ok(Lexeme::Word(word)) => match Keyword::from_word(word) {
                Some(keyword) => Token::Keyword(keyword),
                None => Token::Identifier(word.to_string()),
            },
            Ok(Lexeme::Symbol(c)) => Token::Symbol(c),
            Err(()) => {
                let ch = self.source[span.start..].chars().next().unwrap_or('\0');
                return Err(LexError::UnknownCharacter {
                    ch,
                    location: SourceLocation::from_offset(self.source, span.start),
                });
            }
        };

        tracing::trace!(%token, start = span.start, "token");
        Ok(Spanned { token, span })
    }
}

/// Yields every token up to and including the first `EndOfInput`, or stops
/// after the first error.
impl<'source> Iterator for Lexer<'source> {
    type Item = Result<Spanned, LexError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let item = self.next_token();
        match &item {
            Ok(Spanned {
                token: Token::EndOfInput,
                ..
            })
            | Err(_) => self.done = true,
            Ok(_) => {}
        }
        Some(item)
    }
}

/// Lex all of `source`. The last element is always `EndOfInput`.
pub fn tokenize(source: &str) -> Result<Vec<Spanned>, LexError> {
    Lexer::new(source).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn end_of_input_is_sticky() {
        let mut lexer = Lexer::new("X");
        assert_eq!(
            lexer.next_token().unwrap().token,
            Token::Identifier("X".into())
        );
        for _ in 0..3 {
            assert_eq!(lexer.next_token().unwrap().token, Token::EndOfInput);
        }
    }

    #[test]
    fn spans_cover_the_lexeme() {
        let tokens = tokenize("  PRINT 12.5").unwrap();
        assert_eq!(tokens[0].span, 2..7);
        assert_eq!(tokens[1].span, 8..12);
        assert_eq!(tokens[2].span, 12..12);
    }

    #[test]
    fn error_context_is_the_offending_line() {
        let src = "DIM X\n  PRINT $\nPRINT X";
        assert_eq!(get_error_context(src, 14), "PRINT $");
        assert_eq!(position_to_line_col(src, 14), (2, 9));
    }
}
