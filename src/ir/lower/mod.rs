//! Lowering: consumes `Instr`s and produces target assembly text.
//!
//! Each target implements `Lowering` to control register naming and
//! instruction selection. Lines carry no indentation; layout belongs to
//! the emitter.

mod mips;

use super::Instr;

pub use mips::MipsLowering;

/// Lowers IR instructions into target assembly lines.
pub trait Lowering {
    /// Convert one instruction into one line of assembly.
    fn lower_instr(&self, instr: &Instr) -> String;

    /// Convert a sequence of instructions, one line each, in order.
    fn lower(&self, instrs: &[Instr]) -> Vec<String> {
        instrs.iter().map(|i| self.lower_instr(i)).collect()
    }
}
