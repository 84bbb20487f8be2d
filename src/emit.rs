//! Code emitter: an append-only instruction list plus its text section.
//!
//! Each builder method appends exactly one instruction. Nothing is ever
//! reordered, merged or removed; `flush` serializes the list as-is.

use std::io::Write;

use crate::config::target::TargetConfig;
use crate::error::CompileError;
use crate::ir::lower::{Lowering, MipsLowering};
use crate::ir::{ArithOp, Instr, Reg};
use crate::value::Data;

pub struct Emitter {
    instrs: Vec<Instr>,
    lowering: Box<dyn Lowering>,
    header: String,
    indent: String,
}

impl Emitter {
    pub fn new(config: &TargetConfig) -> Self {
        Self::with_lowering(
            Box::new(MipsLowering::new(config.registers.clone())),
            &config.text_header,
            &config.indent,
        )
    }

    pub fn with_lowering(lowering: Box<dyn Lowering>, header: &str, indent: &str) -> Self {
        Self {
            instrs: Vec::new(),
            lowering,
            header: header.to_string(),
            indent: indent.to_string(),
        }
    }

    // --- Instruction builders ---

    pub fn load_imm(&mut self, dst: Reg, value: Data) {
        self.emit(Instr::LoadImm { dst, value });
    }

    pub fn load_addr(&mut self, dst: Reg, label: &str) {
        self.emit(Instr::LoadAddr {
            dst,
            label: label.to_string(),
        });
    }

    pub fn load(&mut self, dst: Reg, name: &str) {
        self.emit(Instr::Load {
            dst,
            name: name.to_string(),
        });
    }

    pub fn store(&mut self, src: Reg, name: &str) {
        self.emit(Instr::Store {
            src,
            name: name.to_string(),
        });
    }

    pub fn arith(&mut self, op: ArithOp, dst: Reg, rhs: Reg) {
        self.emit(Instr::Arith { op, dst, rhs });
    }

    pub fn mov(&mut self, dst: Reg, src: Reg) {
        self.emit(Instr::Move { dst, src });
    }

    pub fn int_to_float(&mut self, reg: Reg) {
        self.emit(Instr::IntToFloat { reg });
    }

    pub fn float_to_int(&mut self, reg: Reg) {
        self.emit(Instr::FloatToInt { reg });
    }

    pub fn syscall(&mut self) {
        self.emit(Instr::Syscall);
    }

    fn emit(&mut self, instr: Instr) {
        self.instrs.push(instr);
    }

    // --- Output ---

    pub fn instructions(&self) -> &[Instr] {
        &self.instrs
    }

    pub fn len(&self) -> usize {
        self.instrs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instrs.is_empty()
    }

    /// The instruction section: header, then one indented line per
    /// instruction in emission order.
    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str(&self.header);
        out.push('\n');
        for line in self.lowering.lower(&self.instrs) {
            out.push_str(&self.indent);
            out.push_str(&line);
            out.push('\n');
        }
        out
    }

    /// Append the instruction section to `sink`.
    pub fn flush(&self, sink: &mut dyn Write) -> Result<(), CompileError> {
        sink.write_all(self.render().as_bytes())
            .and_then(|_| sink.flush())
            .map_err(|e| CompileError::output("instruction section", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    struct BrokenSink;

    impl Write for BrokenSink {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_one_instruction_per_call_in_order() {
        let mut e = Emitter::new(&TargetConfig::mips());
        e.load_imm(Reg::Selector, Data::I32(1));
        e.load(Reg::IntArg, "x");
        e.syscall();
        assert_eq!(e.len(), 3);
        assert_eq!(e.instructions()[2], Instr::Syscall);
        assert_eq!(
            e.render(),
            ".text\n    li $v0, 1\n    lw $a0, x\n    syscall\n"
        );
    }

    #[test]
    fn test_no_deduplication() {
        let mut e = Emitter::new(&TargetConfig::mips());
        e.syscall();
        e.syscall();
        assert_eq!(e.len(), 2);
    }

    #[test]
    fn test_empty_section_has_header() {
        let e = Emitter::new(&TargetConfig::mips());
        assert!(e.is_empty());
        assert_eq!(e.render(), ".text\n");
    }

    #[test]
    fn test_flush_appends_after_existing_content() {
        let mut e = Emitter::new(&TargetConfig::mips());
        e.store(Reg::Lhs, "y");
        let mut out: Vec<u8> = b".data\n    y: .word 0\n\n".to_vec();
        e.flush(&mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            ".data\n    y: .word 0\n\n.text\n    sw $t0, y\n"
        );
    }

    #[test]
    fn test_flush_reports_unavailable_output() {
        let mut e = Emitter::new(&TargetConfig::mips());
        e.syscall();
        let err = e.flush(&mut BrokenSink).unwrap_err();
        assert!(matches!(err, CompileError::OutputUnavailable { .. }));
        assert_eq!(e.len(), 1);
    }

    #[test]
    fn test_configured_layout() {
        let mut config = TargetConfig::mips();
        config.indent = "\t\t".to_string();
        config.text_header = ".text # code".to_string();
        let mut e = Emitter::new(&config);
        e.mov(Reg::IntArg, Reg::Lhs);
        assert_eq!(e.render(), ".text # code\n\t\tmove $a0, $t0\n");
    }
}
