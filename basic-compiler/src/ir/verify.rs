//! Structural checks over a finished module.
//!
//! Register definitions are checked in block layout order, which is stricter
//! than dominance but matches how the generator lays blocks out.

use std::collections::HashSet;
use thiserror::Error;

use crate::ir::*;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VerifyError {
    #[error("Duplicate function '{0}'")]
    DuplicateFunction(String),

    #[error("Function '{function}': duplicate block label '{label}'")]
    DuplicateLabel { function: String, label: String },

    #[error("Function '{function}': branch from '{from}' to unknown block '{target}'")]
    UnknownBlock {
        function: String,
        from: String,
        target: String,
    },

    #[error("Function '{function}': call to unknown function '{callee}'")]
    UnknownCallee { function: String, callee: String },

    #[error("Function '{function}': '{callee}' called with {found} argument(s), expected {expected}")]
    ArgumentCount {
        function: String,
        callee: String,
        expected: usize,
        found: usize,
    },

    #[error("Function '{function}': register {reg} used before it is defined")]
    UndefinedRegister { function: String, reg: Reg },

    #[error("Function '{function}': register {reg} defined twice")]
    DuplicateRegister { function: String, reg: Reg },

    #[error("Function '{function}': unknown global '@{name}'")]
    UnknownGlobal { function: String, name: String },
}

pub fn verify(module: &Module) -> Result<(), VerifyError> {
    let mut names = HashSet::new();
    for func in &module.functions {
        if !names.insert(func.name.as_str()) {
            return Err(VerifyError::DuplicateFunction(func.name.clone()));
        }
    }

    for func in module.functions.iter().filter(|f| !f.is_declaration()) {
        verify_function(module, func)?;
    }
    Ok(())
}

fn verify_function(module: &Module, func: &Function) -> Result<(), VerifyError> {
    let mut labels = HashSet::new();
    for block in &func.blocks {
        if !labels.insert(block.label.as_str()) {
            return Err(VerifyError::DuplicateLabel {
                function: func.name.clone(),
                label: block.label.clone(),
            });
        }
    }

    let mut defined: HashSet<&Reg> = func.params.iter().map(|p| &p.name).collect();

    for block in &func.blocks {
        for instr in &block.instrs {
            for op in instr.operands() {
                check_operand(module, func, &defined, op)?;
            }
            if let Instr::Call { callee, args, .. } = instr {
                check_call(module, func, callee, args.len())?;
            }
            if let Some(reg) = instr.def() {
                if !defined.insert(reg) {
                    return Err(VerifyError::DuplicateRegister {
                        function: func.name.clone(),
                        reg: reg.clone(),
                    });
                }
            }
        }

        for op in block.terminator.operands() {
            check_operand(module, func, &defined, op)?;
        }
        for target in block.terminator.successors() {
            if !labels.contains(target) {
                return Err(VerifyError::UnknownBlock {
                    function: func.name.clone(),
                    from: block.label.clone(),
                    target: target.to_string(),
                });
            }
        }
    }
    Ok(())
}

fn check_operand(
    module: &Module,
    func: &Function,
    defined: &HashSet<&Reg>,
    op: &Operand,
) -> Result<(), VerifyError> {
    match op {
        Operand::Reg { reg, .. } if !defined.contains(reg) => {
            Err(VerifyError::UndefinedRegister {
                function: func.name.clone(),
                reg: reg.clone(),
            })
        }
        Operand::Global(name) if module.get_global(name).is_none() => {
            Err(VerifyError::UnknownGlobal {
                function: func.name.clone(),
                name: name.clone(),
            })
        }
        _ => Ok(()),
    }
}

fn check_call(
    module: &Module,
    func: &Function,
    callee: &str,
    found: usize,
) -> Result<(), VerifyError> {
    let target = module
        .get_function(callee)
        .ok_or_else(|| VerifyError::UnknownCallee {
            function: func.name.clone(),
            callee: callee.to_string(),
        })?;

    let expected = target.params.len();
    let ok = if target.variadic {
        found >= expected
    } else {
        found == expected
    };
    if !ok {
        return Err(VerifyError::ArgumentCount {
            function: func.name.clone(),
            callee: callee.to_string(),
            expected,
            found,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single_block(label: &str, terminator: Terminator) -> Function {
        Function {
            name: "main".to_string(),
            params: Vec::new(),
            ret: Type::I32,
            variadic: false,
            blocks: vec![BasicBlock {
                label: label.to_string(),
                instrs: Vec::new(),
                terminator,
            }],
        }
    }

    #[test]
    fn branch_to_missing_block_is_rejected() {
        let mut module = Module::new("m");
        module.functions.push(single_block(
            "entry",
            Terminator::Br {
                target: "nowhere".to_string(),
            },
        ));

        assert_eq!(
            verify(&module),
            Err(VerifyError::UnknownBlock {
                function: "main".to_string(),
                from: "entry".to_string(),
                target: "nowhere".to_string(),
            })
        );
    }

    #[test]
    fn use_of_undefined_register_is_rejected() {
        let mut module = Module::new("m");
        module.functions.push(single_block(
            "entry",
            Terminator::Ret {
                value: Some(Operand::reg(Reg("ghost".to_string()), Type::I32)),
            },
        ));

        assert!(matches!(
            verify(&module),
            Err(VerifyError::UndefinedRegister { .. })
        ));
    }

    #[test]
    fn minimal_module_passes() {
        let mut module = Module::new("m");
        module.functions.push(single_block(
            "entry",
            Terminator::Ret {
                value: Some(Operand::Int(0)),
            },
        ));
        assert_eq!(verify(&module), Ok(()));
    }
}
