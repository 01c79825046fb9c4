pub mod frontend;
pub mod ir;

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

pub use frontend::lexer::{LexError, Lexer, Token};
pub use frontend::parser::{ParseError, Parser};
pub use ir::ir_generator::{CodeGenerator, CodegenError};

use ir::ir_generator::stmt::{PRINT_ROUTINE, PRINTF};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CompileError {
    #[error("Lexical error: {0}")]
    Lex(LexError),

    #[error("Parse error: {0}")]
    Parse(ParseError),

    #[error("Codegen error: {0}")]
    Codegen(#[from] CodegenError),

    #[error("Invalid {option}: {reason}")]
    InvalidOptions {
        option: &'static str,
        reason: String,
    },
}

impl From<LexError> for CompileError {
    fn from(e: LexError) -> Self {
        CompileError::Lex(e)
    }
}

// Lexical failures found while the parser pulls tokens keep their own class.
impl From<ParseError> for CompileError {
    fn from(e: ParseError) -> Self {
        match e {
            ParseError::Lexical(lex) => CompileError::Lex(lex),
            other => CompileError::Parse(other),
        }
    }
}

/// A position in the source text. `line` and `column` are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SourceLocation {
    pub line: usize,
    pub column: usize,
    pub offset: usize,
}

impl SourceLocation {
    pub fn from_offset(source: &str, offset: usize) -> Self {
        let (line, column) = frontend::lexer::position_to_line_col(source, offset);
        Self {
            line,
            column,
            offset,
        }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

fn default_module_name() -> String {
    "main".to_string()
}

fn default_entry_name() -> String {
    "main".to_string()
}

/// Options for `compile_to_ir_with`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct CompileOptions {
    /// Name given to the emitted IR module.
    #[serde(default = "default_module_name")]
    pub module_name: String,
    /// Name of the routine that wraps the top-level statements.
    #[serde(default = "default_entry_name")]
    pub entry_name: String,
}

impl CompileOptions {
    /// Reject names the generated module could not carry.
    pub fn validate(&self) -> Result<(), CompileError> {
        let invalid = |option, reason: String| CompileError::InvalidOptions { option, reason };

        if self.module_name.is_empty() {
            return Err(invalid("module name", "must not be empty".to_string()));
        }

        let entry = self.entry_name.as_str();
        let mut chars = entry.chars();
        let well_formed = chars
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || "_.$".contains(c))
            && chars.all(|c| c.is_ascii_alphanumeric() || "_.$".contains(c));
        if !well_formed {
            return Err(invalid(
                "entry name",
                format!("'{entry}' is not an identifier"),
            ));
        }
        if [PRINT_ROUTINE, PRINTF].contains(&entry) {
            return Err(invalid(
                "entry name",
                format!("'{entry}' is reserved for the print routine"),
            ));
        }
        Ok(())
    }
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            module_name: default_module_name(),
            entry_name: default_entry_name(),
        }
    }
}

/// Tokenize and parse `source` into a program.
pub fn parse_program(source: &str) -> Result<ir::ast::Program, CompileError> {
    let mut parser = Parser::new(source)?;
    Ok(parser.parse_program()?)
}

pub fn compile_to_ir(source: &str) -> Result<ir::Module, CompileError> {
    compile_to_ir_with(source, &CompileOptions::default())
}

/// Run the whole pipeline: lex, parse, generate, then verify the result.
pub fn compile_to_ir_with(
    source: &str,
    options: &CompileOptions,
) -> Result<ir::Module, CompileError> {
    options.validate()?;
    let program = parse_program(source)?;
    tracing::debug!(statements = program.statements.len(), "parsed program");

    let module = CodeGenerator::new(options).generate(&program)?;

    ir::verify::verify(&module).map_err(|e| CodegenError::Internal(e.to_string()))?;
    tracing::debug!(
        module = %module.name,
        functions = module.functions.len(),
        "generated module"
    );
    Ok(module)
}
