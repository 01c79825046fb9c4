use std::collections::HashMap;

use super::CodegenError;
use crate::ir::symbol_table::SymbolTable;
use crate::ir::*;
use crate::CompileOptions;

/// A block of the function under construction. The terminator stays empty
/// until control flow leaves the block.
#[derive(Debug)]
pub(super) struct BlockBuilder {
    pub label: String,
    pub instrs: Vec<Instr>,
    pub terminator: Option<Terminator>,
}

pub struct CodeGenerator {
    pub(super) module: Module,
    pub(super) entry_name: String,
    pub(super) symbols: SymbolTable,
    /// Name of the print routine once the first `PRINT` has created it.
    pub(super) print_routine: Option<String>,
    pub(super) blocks: Vec<BlockBuilder>,
    /// Index into `blocks` where new instructions go.
    pub(super) current: usize,
    alloca_count: usize,
    temp_count: usize,
    label_count: usize,
    reg_names: HashMap<String, usize>,
}

impl CodeGenerator {
    pub fn new(options: &CompileOptions) -> Self {
        Self {
            module: Module::new(options.module_name.clone()),
            entry_name: options.entry_name.clone(),
            symbols: SymbolTable::new(),
            print_routine: None,
            blocks: Vec::new(),
            current: 0,
            alloca_count: 0,
            temp_count: 0,
            label_count: 0,
            reg_names: HashMap::new(),
        }
    }

    pub fn new_temp(&mut self) -> Reg {
        let r = Reg(format!("t{}", self.temp_count));
        self.temp_count += 1;
        r
    }

    /// A register named after `base`, suffixed with a counter on reuse.
    pub fn new_named_reg(&mut self, base: &str) -> Reg {
        let seen = self.reg_names.entry(base.to_string()).or_insert(0);
        let name = if *seen == 0 {
            base.to_string()
        } else {
            format!("{base}{seen}")
        };
        *seen += 1;
        Reg(name)
    }

    /// A fresh suffix shared by the blocks of one IF or FOR.
    pub fn next_label_id(&mut self) -> usize {
        let id = self.label_count;
        self.label_count += 1;
        id
    }

    pub(super) fn append_block(&mut self, label: String) -> usize {
        tracing::trace!(%label, "append block");
        self.blocks.push(BlockBuilder {
            label,
            instrs: Vec::new(),
            terminator: None,
        });
        self.blocks.len() - 1
    }

    pub(super) fn position_at_end(&mut self, block: usize) {
        self.current = block;
    }

    pub(super) fn label_of(&self, block: usize) -> String {
        self.blocks[block].label.clone()
    }

    pub fn emit(&mut self, instr: Instr) {
        let block = &mut self.blocks[self.current];
        debug_assert!(
            block.terminator.is_none(),
            "emitting into terminated block {}",
            block.label
        );
        block.instrs.push(instr);
    }

    /// Allocate a stack slot at the top of the entry block, ahead of any
    /// other instruction, so loops never grow the stack.
    pub fn emit_entry_alloca(&mut self, ty: Type, base: &str) -> Reg {
        let dst = self.new_named_reg(&format!("{base}.addr"));
        self.blocks[0].instrs.insert(
            self.alloca_count,
            Instr::Alloca {
                dst: dst.clone(),
                ty,
            },
        );
        self.alloca_count += 1;
        dst
    }

    pub(super) fn terminate(&mut self, terminator: Terminator) -> Result<(), CodegenError> {
        let block = &mut self.blocks[self.current];
        if block.terminator.is_some() {
            return Err(CodegenError::Internal(format!(
                "block '{}' terminated twice",
                block.label
            )));
        }
        block.terminator = Some(terminator);
        Ok(())
    }

    /// Close the function under construction and hand back its blocks.
    pub(super) fn finish_function(
        &mut self,
        name: String,
        params: Vec<Param>,
        ret: Type,
    ) -> Result<Function, CodegenError> {
        let mut blocks = Vec::with_capacity(self.blocks.len());
        for b in self.blocks.drain(..) {
            let terminator = b.terminator.ok_or_else(|| {
                CodegenError::Internal(format!("block '{}' has no terminator", b.label))
            })?;
            blocks.push(BasicBlock {
                label: b.label,
                instrs: b.instrs,
                terminator,
            });
        }
        self.current = 0;
        self.alloca_count = 0;

        Ok(Function {
            name,
            params,
            ret,
            variadic: false,
            blocks,
        })
    }
}
