//! Instruction IR between the compiler driver and target assembly.
//!
//! Registers are named by role, not by target name; a `Lowering` resolves
//! roles to concrete registers and picks mnemonics by register class.

pub mod lower;

use std::fmt;

use crate::value::{Data, Type};

// ─── Registers ────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RegClass {
    Int,
    Float,
}

/// Register roles. Two scratch registers per class stage operands; the
/// rest are fixed by the service-trap convention.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Reg {
    Lhs,
    Rhs,
    FloatLhs,
    FloatRhs,
    Selector,
    IntArg,
    FloatArg,
    FloatResult,
}

/// Which operand a scratch register stages.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Side {
    Lhs,
    Rhs,
}

impl Reg {
    pub fn class(self) -> RegClass {
        match self {
            Reg::Lhs | Reg::Rhs | Reg::Selector | Reg::IntArg => RegClass::Int,
            Reg::FloatLhs | Reg::FloatRhs | Reg::FloatArg | Reg::FloatResult => RegClass::Float,
        }
    }

    /// Scratch register for `side` holding a value of type `ty`.
    pub fn scratch(side: Side, ty: Type) -> Reg {
        match (side, ty) {
            (Side::Lhs, Type::F32) => Reg::FloatLhs,
            (Side::Rhs, Type::F32) => Reg::FloatRhs,
            (Side::Lhs, _) => Reg::Lhs,
            (Side::Rhs, _) => Reg::Rhs,
        }
    }

    /// Service argument register for a value of type `ty`.
    pub fn arg(ty: Type) -> Reg {
        match ty {
            Type::F32 => Reg::FloatArg,
            Type::I32 | Type::Str => Reg::IntArg,
        }
    }

    /// Register a read service leaves its result in.
    pub fn result(ty: Type) -> Reg {
        match ty {
            Type::F32 => Reg::FloatResult,
            Type::I32 | Type::Str => Reg::Selector,
        }
    }
}

impl fmt::Display for Reg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Reg::Lhs => "lhs",
            Reg::Rhs => "rhs",
            Reg::FloatLhs => "flhs",
            Reg::FloatRhs => "frhs",
            Reg::Selector => "sel",
            Reg::IntArg => "arg",
            Reg::FloatArg => "farg",
            Reg::FloatResult => "fres",
        };
        write!(f, "%{}", name)
    }
}

// ─── Instructions ─────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl ArithOp {
    pub fn mnemonic(self) -> &'static str {
        match self {
            ArithOp::Add => "add",
            ArithOp::Sub => "sub",
            ArithOp::Mul => "mul",
            ArithOp::Div => "div",
        }
    }
}

impl fmt::Display for ArithOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}

/// A single target-independent instruction.
#[derive(Debug, Clone, PartialEq)]
pub enum Instr {
    /// `dst <- value`
    LoadImm { dst: Reg, value: Data },
    /// `dst <- &label`
    LoadAddr { dst: Reg, label: String },
    /// `dst <- [name]`
    Load { dst: Reg, name: String },
    /// `[name] <- src`
    Store { src: Reg, name: String },
    /// `dst <- dst op rhs`
    Arith { op: ArithOp, dst: Reg, rhs: Reg },
    /// `dst <- src`, bit-for-bit, possibly across register classes.
    Move { dst: Reg, src: Reg },
    /// Convert the integer word in a float register to a float, in place.
    IntToFloat { reg: Reg },
    /// Truncate the float in a float register to an integer word, in place.
    FloatToInt { reg: Reg },
    /// Invoke the service selected by the selector register.
    Syscall,
}

impl fmt::Display for Instr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instr::LoadImm { dst, value } => write!(f, "load_imm {}, {}", dst, value),
            Instr::LoadAddr { dst, label } => write!(f, "load_addr {}, {}", dst, label),
            Instr::Load { dst, name } => write!(f, "load {}, {}", dst, name),
            Instr::Store { src, name } => write!(f, "store {}, {}", name, src),
            Instr::Arith { op, dst, rhs } => write!(f, "{} {}, {}", op, dst, rhs),
            Instr::Move { dst, src } => write!(f, "move {}, {}", dst, src),
            Instr::IntToFloat { reg } => write!(f, "itof {}", reg),
            Instr::FloatToInt { reg } => write!(f, "ftoi {}", reg),
            Instr::Syscall => write!(f, "syscall"),
        }
    }
}
