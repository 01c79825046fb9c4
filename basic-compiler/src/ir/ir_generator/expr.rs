use super::context::CodeGenerator;
use super::CodegenError;
use crate::ir::ast::Node;
use crate::ir::*;

impl CodeGenerator {
    /// Generate a node whose value is needed, e.g. an operand or a PRINT
    /// argument.
    pub fn gen_value(&mut self, node: &Node) -> Result<Operand, CodegenError> {
        self.gen_node(node)?
            .ok_or(CodegenError::NoValue(node.kind_name()))
    }

    pub(super) fn gen_variable(&mut self, name: &str) -> Result<Operand, CodegenError> {
        let slot = self
            .symbols
            .lookup(name)
            .ok_or_else(|| CodegenError::UndefinedVariable(name.to_string()))?
            .slot
            .clone();

        let dst = self.new_temp();
        self.emit(Instr::Load {
            dst: dst.clone(),
            ty: Type::F64,
            ptr: Operand::reg(slot, Type::Ptr),
        });
        Ok(Operand::reg(dst, Type::F64))
    }

    pub(super) fn gen_binary(
        &mut self,
        left: &Node,
        op: char,
        right: &Node,
    ) -> Result<Operand, CodegenError> {
        let lhs = self.gen_value(left)?;
        let rhs = self.gen_value(right)?;
        let op = FloatOp::from_symbol(op).ok_or(CodegenError::UnsupportedOperator(op))?;

        let dst = self.new_temp();
        self.emit(Instr::FBinary {
            dst: dst.clone(),
            op,
            lhs,
            rhs,
        });
        Ok(Operand::reg(dst, Type::F64))
    }

    /// Call a function the module already knows. Only callees taking and
    /// returning doubles (or returning nothing) fit the language.
    pub(super) fn gen_call(
        &mut self,
        name: &str,
        args: &[Node],
    ) -> Result<Option<Operand>, CodegenError> {
        let mut values = Vec::with_capacity(args.len());
        for a in args {
            values.push(self.gen_value(a)?);
        }

        let callee = self
            .module
            .get_function(name)
            .ok_or_else(|| CodegenError::UndefinedFunction(name.to_string()))?;

        if callee.variadic
            || callee.params.iter().any(|p| p.ty != Type::F64)
            || !matches!(callee.ret, Type::F64 | Type::Void)
        {
            return Err(CodegenError::IncompatibleCallee(name.to_string()));
        }
        if callee.params.len() != values.len() {
            return Err(CodegenError::ArgumentCountMismatch {
                name: name.to_string(),
                expected: callee.params.len(),
                found: values.len(),
            });
        }
        let ret = callee.ret;

        let dst = (ret != Type::Void).then(|| self.new_temp());
        self.emit(Instr::Call {
            dst: dst.clone(),
            ret,
            callee: name.to_string(),
            args: values,
        });
        Ok(dst.map(|d| Operand::reg(d, ret)))
    }
}
