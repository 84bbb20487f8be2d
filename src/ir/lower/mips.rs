//! MIPS32 lowering: MARS/SPIM assembly from IR.

use super::Lowering;
use crate::config::target::RegisterNames;
use crate::ir::{Instr, Reg, RegClass};
use crate::value::{Data, Type};

/// MIPS32 lowering.
///
/// Integer-class registers use the core instructions (`li`, `lw`, `add`,
/// ...); float-class registers use coprocessor 1 (`li.s`, `l.s`,
/// `add.s`, ...). Arithmetic is always the three-register form.
pub struct MipsLowering {
    registers: RegisterNames,
}

impl MipsLowering {
    pub fn new(registers: RegisterNames) -> Self {
        Self { registers }
    }

    fn reg(&self, reg: Reg) -> &str {
        self.registers.name(reg)
    }
}

impl Lowering for MipsLowering {
    fn lower_instr(&self, instr: &Instr) -> String {
        match instr {
            Instr::LoadImm { dst, value } => match (dst.class(), value) {
                (RegClass::Int, Data::I32(v)) => format!("li {}, {}", self.reg(*dst), v),
                // Raw float word into an integer register.
                (RegClass::Int, Data::F32(_)) => {
                    format!("li {}, 0x{:08x}", self.reg(*dst), value.to_bits())
                }
                (RegClass::Float, _) => {
                    let value = value.cast(Type::F32).unwrap_or(*value);
                    format!("li.s {}, {}", self.reg(*dst), value)
                }
            },
            Instr::LoadAddr { dst, label } => format!("la {}, {}", self.reg(*dst), label),
            Instr::Load { dst, name } => match dst.class() {
                RegClass::Int => format!("lw {}, {}", self.reg(*dst), name),
                RegClass::Float => format!("l.s {}, {}", self.reg(*dst), name),
            },
            Instr::Store { src, name } => match src.class() {
                RegClass::Int => format!("sw {}, {}", self.reg(*src), name),
                RegClass::Float => format!("s.s {}, {}", self.reg(*src), name),
            },
            Instr::Arith { op, dst, rhs } => {
                let suffix = match dst.class() {
                    RegClass::Int => "",
                    RegClass::Float => ".s",
                };
                format!(
                    "{}{} {}, {}, {}",
                    op.mnemonic(),
                    suffix,
                    self.reg(*dst),
                    self.reg(*dst),
                    self.reg(*rhs)
                )
            }
            Instr::Move { dst, src } => {
                let (d, s) = (self.reg(*dst), self.reg(*src));
                match (dst.class(), src.class()) {
                    (RegClass::Int, RegClass::Int) => format!("move {}, {}", d, s),
                    (RegClass::Float, RegClass::Float) => format!("mov.s {}, {}", d, s),
                    (RegClass::Float, RegClass::Int) => format!("mtc1 {}, {}", s, d),
                    (RegClass::Int, RegClass::Float) => format!("mfc1 {}, {}", d, s),
                }
            }
            Instr::IntToFloat { reg } => {
                let r = self.reg(*reg);
                format!("cvt.s.w {}, {}", r, r)
            }
            Instr::FloatToInt { reg } => {
                let r = self.reg(*reg);
                format!("trunc.w.s {}, {}", r, r)
            }
            Instr::Syscall => "syscall".to_string(),
        }
    }
}
