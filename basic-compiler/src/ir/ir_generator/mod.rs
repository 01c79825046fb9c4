//! AST to IR lowering module.
//!
//! This module handles the translation of a parsed program into an IR
//! `Module`: one entry routine holding every top-level statement, plus the
//! print routine and its `printf` declaration once a `PRINT` needs them.

pub mod context;
pub mod expr;
pub mod stmt;

use thiserror::Error;

use crate::ir::ast::Program;
use crate::ir::Module;
use crate::CompileOptions;

/// The struct that walks the AST and builds the module.
pub use context::CodeGenerator;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CodegenError {
    #[error("Undefined variable '{0}'")]
    UndefinedVariable(String),

    #[error("Undefined function '{0}'")]
    UndefinedFunction(String),

    #[error("Unsupported operator '{0}'")]
    UnsupportedOperator(char),

    #[error("Function '{name}' expects {expected} argument(s), got {found}")]
    ArgumentCountMismatch {
        name: String,
        expected: usize,
        found: usize,
    },

    #[error("Function '{0}' cannot be called from BASIC code")]
    IncompatibleCallee(String),

    #[error("{0} does not produce a value")]
    NoValue(&'static str),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Entry point for lowering a program with default options.
pub fn generate(program: &Program) -> Result<Module, CodegenError> {
    CodeGenerator::new(&CompileOptions::default()).generate(program)
}
