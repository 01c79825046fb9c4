use super::context::CodeGenerator;
use super::CodegenError;
use crate::ir::ast::{Node, Program};
use crate::ir::symbol_table::{SymbolInfo, SymbolKind};
use crate::ir::*;

/// Name of the shared routine every `PRINT` calls.
pub const PRINT_ROUTINE: &str = "print";
/// Host primitive the print routine is built on.
pub const PRINTF: &str = "printf";
/// Global holding the print routine's format string.
pub const PRINT_FORMAT: &str = ".fmt";

const LOOP_STEP: f64 = 1.0;

impl CodeGenerator {
    /// Lower every top-level statement, in order, into the entry routine.
    pub fn generate(mut self, program: &Program) -> Result<Module, CodegenError> {
        tracing::debug!(
            module = %self.module.name,
            statements = program.statements.len(),
            "generating IR"
        );

        let entry = self.append_block("entry".to_string());
        self.position_at_end(entry);

        self.gen_block(&program.statements)?;
        self.terminate(Terminator::Ret {
            value: Some(Operand::Int(0)),
        })?;

        let name = self.entry_name.clone();
        let main = self.finish_function(name, Vec::new(), Type::I32)?;
        self.module.functions.push(main);
        Ok(self.module)
    }

    /// Lower one node. Expressions return their value; statements return
    /// `None`.
    pub fn gen_node(&mut self, node: &Node) -> Result<Option<Operand>, CodegenError> {
        match node {
            Node::Number(v) => Ok(Some(Operand::Float(*v))),
            Node::Variable(name) => self.gen_variable(name).map(Some),
            Node::Binary { left, op, right } => self.gen_binary(left, *op, right).map(Some),
            Node::Call { name, args } => self.gen_call(name, args),
            Node::Declare(name) => {
                self.gen_declare(name);
                Ok(None)
            }
            Node::Print(value) => {
                self.gen_print(value)?;
                Ok(None)
            }
            Node::If {
                condition,
                then_body,
                else_body,
            } => {
                self.gen_if(condition, then_body, else_body.as_deref())?;
                Ok(None)
            }
            Node::For {
                var,
                start,
                end,
                body,
            } => {
                self.gen_for(var, start, end, body)?;
                Ok(None)
            }
        }
    }

    fn gen_block(&mut self, stmts: &[Node]) -> Result<(), CodegenError> {
        for s in stmts {
            self.gen_node(s)?;
        }
        Ok(())
    }

    fn gen_declare(&mut self, name: &str) {
        let slot = self.emit_entry_alloca(Type::F64, name);
        self.emit(Instr::Store {
            value: Operand::Float(0.0),
            ptr: Operand::reg(slot.clone(), Type::Ptr),
        });
        let previous = self.symbols.declare(
            name.to_string(),
            SymbolInfo {
                kind: SymbolKind::Variable,
                slot,
            },
        );
        if let Some(previous) = previous {
            tracing::debug!(
                %name,
                previous = ?previous.kind,
                "variable redeclared, later uses see the new slot"
            );
        }
    }

    fn gen_print(&mut self, value: &Node) -> Result<(), CodegenError> {
        let v = self.gen_value(value)?;
        let routine = self.print_routine();
        self.emit(Instr::Call {
            dst: None,
            ret: Type::Void,
            callee: routine,
            args: vec![v],
        });
        Ok(())
    }

    /// The shared print routine, created on first use:
    ///
    /// ```text
    /// define void @print(double %value) {
    /// entry:
    ///   %written = call i32 (ptr, ...) @printf(ptr @.fmt, double %value)
    ///   ret void
    /// }
    /// ```
    fn print_routine(&mut self) -> String {
        if let Some(name) = &self.print_routine {
            return name.clone();
        }
        tracing::debug!("creating print routine");

        self.module
            .globals
            .push(Global::c_string(PRINT_FORMAT, "%f\n"));

        if self.module.get_function(PRINTF).is_none() {
            let mut printf = Function::declaration(
                PRINTF,
                vec![Param {
                    name: Reg("fmt".to_string()),
                    ty: Type::Ptr,
                }],
                Type::I32,
            );
            printf.variadic = true;
            self.module.functions.push(printf);
        }

        let value = Reg("value".to_string());
        let print = Function {
            name: PRINT_ROUTINE.to_string(),
            params: vec![Param {
                name: value.clone(),
                ty: Type::F64,
            }],
            ret: Type::Void,
            variadic: false,
            blocks: vec![BasicBlock {
                label: "entry".to_string(),
                instrs: vec![Instr::Call {
                    dst: Some(Reg("written".to_string())),
                    ret: Type::I32,
                    callee: PRINTF.to_string(),
                    args: vec![
                        Operand::Global(PRINT_FORMAT.to_string()),
                        Operand::reg(value, Type::F64),
                    ],
                }],
                terminator: Terminator::Ret { value: None },
            }],
        };
        self.module.functions.push(print);

        self.print_routine = Some(PRINT_ROUTINE.to_string());
        PRINT_ROUTINE.to_string()
    }

    /// Nonzero is true. Both arms always exist and both fall into the merge
    /// block, which becomes the insertion point.
    fn gen_if(
        &mut self,
        condition: &Node,
        then_body: &[Node],
        else_body: Option<&[Node]>,
    ) -> Result<(), CodegenError> {
        let cond = self.gen_value(condition)?;
        let flag = self.new_temp();
        self.emit(Instr::FCmp {
            dst: flag.clone(),
            pred: FloatPredicate::One,
            lhs: cond,
            rhs: Operand::Float(0.0),
        });

        let id = self.next_label_id();
        let then_bb = self.append_block(format!("then{id}"));
        let else_bb = self.append_block(format!("else{id}"));
        let merge_bb = self.append_block(format!("ifcont{id}"));
        let merge_label = self.label_of(merge_bb);

        self.terminate(Terminator::CondBr {
            cond: Operand::reg(flag, Type::I1),
            then_dest: self.label_of(then_bb),
            else_dest: self.label_of(else_bb),
        })?;

        self.position_at_end(then_bb);
        self.gen_block(then_body)?;
        self.terminate(Terminator::Br {
            target: merge_label.clone(),
        })?;

        self.position_at_end(else_bb);
        if let Some(body) = else_body {
            self.gen_block(body)?;
        }
        self.terminate(Terminator::Br {
            target: merge_label,
        })?;

        self.position_at_end(merge_bb);
        Ok(())
    }

    /// Ascending loop with step 1.0 and the test after the body, so the body
    /// runs at least once. `end` is evaluated once, before entering the loop.
    fn gen_for(
        &mut self,
        var: &str,
        start: &Node,
        end: &Node,
        body: &[Node],
    ) -> Result<(), CodegenError> {
        let start_v = self.gen_value(start)?;

        let slot = match self.symbols.lookup(var) {
            Some(info) => {
                tracing::trace!(%var, kind = ?info.kind, "loop reuses existing slot");
                info.slot.clone()
            }
            None => {
                let slot = self.emit_entry_alloca(Type::F64, var);
                self.symbols.declare(
                    var.to_string(),
                    SymbolInfo {
                        kind: SymbolKind::LoopVariable,
                        slot: slot.clone(),
                    },
                );
                slot
            }
        };
        let slot = Operand::reg(slot, Type::Ptr);
        self.emit(Instr::Store {
            value: start_v,
            ptr: slot.clone(),
        });

        let end_v = self.gen_value(end)?;

        let id = self.next_label_id();
        let loop_bb = self.append_block(format!("loop{id}"));
        let after_bb = self.append_block(format!("afterloop{id}"));
        let loop_label = self.label_of(loop_bb);

        self.terminate(Terminator::Br {
            target: loop_label.clone(),
        })?;

        self.position_at_end(loop_bb);
        self.gen_block(body)?;

        let cur = self.new_temp();
        self.emit(Instr::Load {
            dst: cur.clone(),
            ty: Type::F64,
            ptr: slot.clone(),
        });
        let next = self.new_temp();
        self.emit(Instr::FBinary {
            dst: next.clone(),
            op: FloatOp::FAdd,
            lhs: Operand::reg(cur, Type::F64),
            rhs: Operand::Float(LOOP_STEP),
        });
        let next = Operand::reg(next, Type::F64);
        self.emit(Instr::Store {
            value: next.clone(),
            ptr: slot,
        });
        let again = self.new_temp();
        self.emit(Instr::FCmp {
            dst: again.clone(),
            pred: FloatPredicate::Ole,
            lhs: next,
            rhs: end_v,
        });
        self.terminate(Terminator::CondBr {
            cond: Operand::reg(again, Type::I1),
            then_dest: loop_label,
            else_dest: self.label_of(after_bb),
        })?;

        self.position_at_end(after_bb);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CompileOptions;

    fn generator() -> CodeGenerator {
        let mut cg = CodeGenerator::new(&CompileOptions::default());
        let entry = cg.append_block("entry".to_string());
        cg.position_at_end(entry);
        cg
    }

    fn counted_loop(var: &str) -> Node {
        Node::For {
            var: var.to_string(),
            start: Box::new(Node::number(1.0)),
            end: Box::new(Node::number(3.0)),
            body: Vec::new(),
        }
    }

    #[test]
    fn loop_introduces_a_loop_variable() {
        let mut cg = generator();
        cg.gen_node(&counted_loop("I")).unwrap();

        let info = cg.symbols.lookup("I").unwrap();
        assert_eq!(info.kind, SymbolKind::LoopVariable);
        assert_eq!(info.slot, Reg("I.addr".to_string()));
    }

    #[test]
    fn loop_keeps_a_declared_variable() {
        let mut cg = generator();
        cg.gen_node(&Node::Declare("I".to_string())).unwrap();
        cg.gen_node(&counted_loop("I")).unwrap();

        let info = cg.symbols.lookup("I").unwrap();
        assert_eq!(info.kind, SymbolKind::Variable);
        assert_eq!(cg.symbols.len(), 1);
    }
}
