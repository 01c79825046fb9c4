// A small LLVM-flavoured IR: functions made of labelled basic blocks, each
// closed by exactly one terminator.

use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Type {
    F64,
    I1,
    I32,
    Ptr,
    Void,
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Type::F64 => "double",
            Type::I1 => "i1",
            Type::I32 => "i32",
            Type::Ptr => "ptr",
            Type::Void => "void",
        };
        f.write_str(s)
    }
}

/// An SSA register, printed as `%name`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Reg(pub String);

impl fmt::Display for Reg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "%{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Operand {
    Float(f64),
    Int(i32),
    Reg { reg: Reg, ty: Type },
    /// Address of a module-level global, printed as `@name`.
    Global(String),
}

impl Operand {
    pub fn reg(reg: Reg, ty: Type) -> Self {
        Operand::Reg { reg, ty }
    }

    pub fn ty(&self) -> Type {
        match self {
            Operand::Float(_) => Type::F64,
            Operand::Int(_) => Type::I32,
            Operand::Reg { ty, .. } => *ty,
            Operand::Global(_) => Type::Ptr,
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Float(v) => write!(f, "{}", FloatLit(*v)),
            Operand::Int(i) => write!(f, "{i}"),
            Operand::Reg { reg, .. } => write!(f, "{reg}"),
            Operand::Global(name) => write!(f, "@{name}"),
        }
    }
}

// Integral values print as `3.0`; everything else as the exact bit pattern so
// the text never rounds.
struct FloatLit(f64);

impl fmt::Display for FloatLit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let v = self.0;
        if v.is_finite() && v.fract() == 0.0 && v.abs() < 1e15 {
            write!(f, "{v:.1}")
        } else {
            write!(f, "0x{:016X}", v.to_bits())
        }
    }
}

/// `<type> <operand>` as used in call argument lists.
struct Typed<'a>(&'a Operand);

impl fmt::Display for Typed<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.0.ty(), self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FloatOp {
    FAdd,
    FSub,
    FMul,
    FDiv,
}

impl FloatOp {
    pub fn from_symbol(op: char) -> Option<Self> {
        match op {
            '+' => Some(FloatOp::FAdd),
            '-' => Some(FloatOp::FSub),
            '*' => Some(FloatOp::FMul),
            '/' => Some(FloatOp::FDiv),
            _ => None,
        }
    }
}

impl fmt::Display for FloatOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FloatOp::FAdd => "fadd",
            FloatOp::FSub => "fsub",
            FloatOp::FMul => "fmul",
            FloatOp::FDiv => "fdiv",
        };
        f.write_str(s)
    }
}

/// Ordered floating point comparisons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FloatPredicate {
    /// Not equal; truth test of a condition.
    One,
    /// Less or equal; loop continuation test.
    Ole,
}

impl fmt::Display for FloatPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FloatPredicate::One => "one",
            FloatPredicate::Ole => "ole",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Instr {
    /// `dst = alloca ty`
    Alloca { dst: Reg, ty: Type },

    /// `dst = load ty, ptr`
    Load { dst: Reg, ty: Type, ptr: Operand },

    /// `store value, ptr`
    Store { value: Operand, ptr: Operand },

    /// `dst = fadd|fsub|fmul|fdiv lhs, rhs`
    FBinary {
        dst: Reg,
        op: FloatOp,
        lhs: Operand,
        rhs: Operand,
    },

    /// `dst = fcmp pred lhs, rhs`, an `i1`
    FCmp {
        dst: Reg,
        pred: FloatPredicate,
        lhs: Operand,
        rhs: Operand,
    },

    /// Call with an optional destination for the returned value
    Call {
        dst: Option<Reg>,
        ret: Type,
        callee: String,
        args: Vec<Operand>,
    },
}

impl Instr {
    /// The register this instruction defines, if any.
    pub fn def(&self) -> Option<&Reg> {
        match self {
            Instr::Alloca { dst, .. }
            | Instr::Load { dst, .. }
            | Instr::FBinary { dst, .. }
            | Instr::FCmp { dst, .. } => Some(dst),
            Instr::Call { dst, .. } => dst.as_ref(),
            Instr::Store { .. } => None,
        }
    }

    pub fn operands(&self) -> Vec<&Operand> {
        match self {
            Instr::Alloca { .. } => Vec::new(),
            Instr::Load { ptr, .. } => vec![ptr],
            Instr::Store { value, ptr } => vec![value, ptr],
            Instr::FBinary { lhs, rhs, .. } | Instr::FCmp { lhs, rhs, .. } => vec![lhs, rhs],
            Instr::Call { args, .. } => args.iter().collect(),
        }
    }
}

impl fmt::Display for Instr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instr::Alloca { dst, ty } => write!(f, "{dst} = alloca {ty}"),
            Instr::Load { dst, ty, ptr } => write!(f, "{dst} = load {ty}, ptr {ptr}"),
            Instr::Store { value, ptr } => write!(f, "store {}, ptr {ptr}", Typed(value)),
            Instr::FBinary { dst, op, lhs, rhs } => {
                write!(f, "{dst} = {op} {} {lhs}, {rhs}", lhs.ty())
            }
            Instr::FCmp {
                dst,
                pred,
                lhs,
                rhs,
            } => write!(f, "{dst} = fcmp {pred} {} {lhs}, {rhs}", lhs.ty()),
            Instr::Call {
                dst,
                ret,
                callee,
                args,
            } => {
                if let Some(d) = dst {
                    write!(f, "{d} = ")?;
                }
                write!(f, "call {ret} @{callee}(")?;
                write_list(f, args.iter().map(Typed))?;
                write!(f, ")")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Terminator {
    Br {
        target: String,
    },
    CondBr {
        cond: Operand,
        then_dest: String,
        else_dest: String,
    },
    Ret {
        value: Option<Operand>,
    },
}

impl Terminator {
    /// Labels control can move to, true edge first for `CondBr`.
    pub fn successors(&self) -> Vec<&str> {
        match self {
            Terminator::Br { target } => vec![target.as_str()],
            Terminator::CondBr {
                then_dest,
                else_dest,
                ..
            } => vec![then_dest.as_str(), else_dest.as_str()],
            Terminator::Ret { .. } => Vec::new(),
        }
    }

    pub fn operands(&self) -> Vec<&Operand> {
        match self {
            Terminator::CondBr { cond, .. } => vec![cond],
            Terminator::Ret { value: Some(v) } => vec![v],
            _ => Vec::new(),
        }
    }
}

impl fmt::Display for Terminator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Terminator::Br { target } => write!(f, "br label %{target}"),
            Terminator::CondBr {
                cond,
                then_dest,
                else_dest,
            } => write!(
                f,
                "br {} {cond}, label %{then_dest}, label %{else_dest}",
                cond.ty()
            ),
            Terminator::Ret { value: Some(v) } => write!(f, "ret {}", Typed(v)),
            Terminator::Ret { value: None } => write!(f, "ret void"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BasicBlock {
    pub label: String,
    pub instrs: Vec<Instr>,
    pub terminator: Terminator,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Param {
    pub name: Reg,
    pub ty: Type,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Function {
    pub name: String,
    pub params: Vec<Param>,
    pub ret: Type,
    pub variadic: bool,
    /// Empty for external declarations.
    pub blocks: Vec<BasicBlock>,
}

impl Function {
    pub fn declaration(name: impl Into<String>, params: Vec<Param>, ret: Type) -> Self {
        Self {
            name: name.into(),
            params,
            ret,
            variadic: false,
            blocks: Vec::new(),
        }
    }

    pub fn is_declaration(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn block(&self, label: &str) -> Option<&BasicBlock> {
        self.blocks.iter().find(|b| b.label == label)
    }

    /// Labels of the blocks whose terminator can jump to `label`.
    pub fn predecessors(&self, label: &str) -> Vec<&str> {
        self.blocks
            .iter()
            .filter(|b| b.terminator.successors().contains(&label))
            .map(|b| b.label.as_str())
            .collect()
    }

    fn write_signature(&self, f: &mut fmt::Formatter<'_>, with_names: bool) -> fmt::Result {
        write!(f, "{} @{}(", self.ret, self.name)?;
        for (i, p) in self.params.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            if with_names {
                write!(f, "{} {}", p.ty, p.name)?;
            } else {
                write!(f, "{}", p.ty)?;
            }
        }
        if self.variadic {
            if self.params.is_empty() {
                write!(f, "...")?;
            } else {
                write!(f, ", ...")?;
            }
        }
        write!(f, ")")
    }
}

/// A constant, NUL-terminated byte string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Global {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl Global {
    pub fn c_string(name: impl Into<String>, text: &str) -> Self {
        let mut bytes = text.as_bytes().to_vec();
        bytes.push(0);
        Self {
            name: name.into(),
            bytes,
        }
    }
}

impl fmt::Display for Global {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "@{} = private unnamed_addr constant [{} x i8] c\"",
            self.name,
            self.bytes.len()
        )?;
        for &b in &self.bytes {
            if (b.is_ascii_graphic() && b != b'"' && b != b'\\') || b == b' ' {
                write!(f, "{}", b as char)?;
            } else {
                write!(f, "\\{b:02X}")?;
            }
        }
        write!(f, "\"")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Module {
    pub name: String,
    pub globals: Vec<Global>,
    pub functions: Vec<Function>,
}

impl Module {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            globals: Vec::new(),
            functions: Vec::new(),
        }
    }

    pub fn get_function(&self, name: &str) -> Option<&Function> {
        self.functions.iter().find(|f| f.name == name)
    }

    pub fn get_global(&self, name: &str) -> Option<&Global> {
        self.globals.iter().find(|g| g.name == name)
    }

    pub fn to_lines(&self) -> Vec<String> {
        self.to_string().lines().map(str::to_string).collect()
    }

    fn write_call(&self, f: &mut fmt::Formatter<'_>, instr: &Instr) -> fmt::Result {
        // Variadic callees need their full type spelled out at the call site.
        if let Instr::Call {
            dst,
            ret,
            callee,
            args,
        } = instr
        {
            if let Some(func) = self.get_function(callee).filter(|func| func.variadic) {
                if let Some(d) = dst {
                    write!(f, "{d} = ")?;
                }
                write!(f, "call {ret} (")?;
                write_list(f, func.params.iter().map(|p| p.ty))?;
                if func.params.is_empty() {
                    write!(f, "...")?;
                } else {
                    write!(f, ", ...")?;
                }
                write!(f, ") @{callee}(")?;
                write_list(f, args.iter().map(Typed))?;
                return write!(f, ")");
            }
        }
        write!(f, "{instr}")
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "; ModuleID = '{}'", self.name)?;
        writeln!(f, "source_filename = \"{}\"", self.name)?;

        for g in &self.globals {
            writeln!(f)?;
            writeln!(f, "{g}")?;
        }

        for func in &self.functions {
            writeln!(f)?;
            if func.is_declaration() {
                write!(f, "declare ")?;
                func.write_signature(f, false)?;
                writeln!(f)?;
                continue;
            }
            write!(f, "define ")?;
            func.write_signature(f, true)?;
            writeln!(f, " {{")?;
            for (i, block) in func.blocks.iter().enumerate() {
                if i > 0 {
                    writeln!(f)?;
                }
                writeln!(f, "{}:", block.label)?;
                for instr in &block.instrs {
                    write!(f, "  ")?;
                    self.write_call(f, instr)?;
                    writeln!(f)?;
                }
                writeln!(f, "  {}", block.terminator)?;
            }
            writeln!(f, "}}")?;
        }
        Ok(())
    }
}

fn write_list<T: fmt::Display>(
    f: &mut fmt::Formatter<'_>,
    items: impl Iterator<Item = T>,
) -> fmt::Result {
    for (i, item) in items.enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}
