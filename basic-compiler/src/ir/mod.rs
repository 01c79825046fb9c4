//! Intermediate Representation (IR) module.
//!
//! This module contains the AST, the IR definitions, the AST-to-IR generator
//! and the structural IR verifier.

pub mod ir;
pub use ir::*;
pub mod ast;
pub mod ir_generator;
pub mod symbol_table;
pub mod verify;
