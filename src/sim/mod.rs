//! Reference interpreter for generated artifacts.
//!
//! Executes the straight-line MIPS subset the lowering produces against
//! untyped 32-bit memory, so tests can check what a program prints rather
//! than how it is spelled. Not a MIPS simulator: no branches, no stack
//! pointer, and only the services the compiler selects (plus exit).


use std::collections::{HashMap, VecDeque};
use std::fmt;

use thiserror::Error;

use crate::config::target::{RegisterNames, Services, TargetConfig};
use crate::value::{Data, Type};

/// Where the data segment starts (the MARS default).
pub const DATA_BASE: u32 = 0x1001_0000;

/// Exit service selector.
pub const EXIT_SERVICE: i32 = 10;

#[derive(Debug, Error, PartialEq)]
pub enum SimError {
    #[error("line {line}: {message}")]
    Parse { line: usize, message: String },
    #[error("undefined label: {0}")]
    UndefinedLabel(String),
    #[error("duplicate label: {0}")]
    DuplicateLabel(String),
    #[error("integer overflow in `{0}`")]
    Overflow(String),
    #[error("division by zero")]
    DivisionByZero,
    #[error("unaligned or out-of-range address 0x{0:08x}")]
    BadAddress(u32),
    #[error("unknown service {0}")]
    UnknownService(i32),
    #[error("input exhausted")]
    InputExhausted,
    #[error("invalid {ty} input: {text:?}")]
    InvalidInput { ty: Type, text: String },
}

/// What a run produced.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Output {
    pub stdout: String,
    /// Instructions executed, including the one that exited.
    pub steps: usize,
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Arith {
    Add,
    Sub,
    Mul,
    Div,
}

#[derive(Clone, Debug, PartialEq)]
enum Inst {
    /// `li` (decimal or hex word) and `li.s`; both just set bits.
    SetBits { dst: String, bits: u32 },
    La { dst: String, label: String },
    Load { dst: String, label: String },
    Store { src: String, label: String },
    Int { op: Arith, dst: String, lhs: String, rhs: String },
    Float { op: Arith, dst: String, lhs: String, rhs: String },
    /// `move`, `mov.s`, `mtc1`, `mfc1`: raw bit copies.
    Copy { dst: String, src: String },
    IntToFloat { dst: String, src: String },
    FloatToInt { dst: String, src: String },
    Syscall,
}

/// What a `syscall` does, resolved from the selector register.
#[derive(Clone, Copy, Debug, PartialEq)]
enum Service {
    PrintInt,
    PrintFloat,
    PrintString,
    ReadInt,
    ReadFloat,
    Exit,
}

/// A loaded artifact.
#[derive(Clone, Debug)]
pub struct Machine {
    memory: Vec<u8>,
    labels: HashMap<String, u32>,
    program: Vec<(usize, Inst)>,
    registers: RegisterNames,
    services: Services,
}

/// Per-run mutable state.
struct State {
    memory: Vec<u8>,
    regs: HashMap<String, u32>,
    input: VecDeque<String>,
    stdout: String,
}

impl Machine {
    /// Parse both sections of `artifact` using the layout and register
    /// names from `config`.
    pub fn load(artifact: &str, config: &TargetConfig) -> Result<Self, SimError> {
        enum Section {
            None,
            Data,
            Text,
        }

        let data_header = config.data_header.trim();
        let text_header = config.text_header.trim();
        let mut section = Section::None;
        let mut machine = Machine {
            memory: Vec::new(),
            labels: HashMap::new(),
            program: Vec::new(),
            registers: config.registers.clone(),
            services: config.services.clone(),
        };

        for (idx, raw) in artifact.lines().enumerate() {
            let line_no = idx + 1;
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if line == data_header {
                section = Section::Data;
                continue;
            }
            if line == text_header {
                section = Section::Text;
                continue;
            }
            match section {
                Section::Data => machine.declare(line_no, line)?,
                Section::Text => {
                    let inst = parse_inst(line_no, line)?;
                    machine.program.push((line_no, inst));
                }
                Section::None => {
                    return Err(parse_error(line_no, "content outside any section"));
                }
            }
        }

        for (line_no, inst) in &machine.program {
            if let Inst::La { label, .. } | Inst::Load { label, .. } | Inst::Store { label, .. } =
                inst
            {
                if !machine.labels.contains_key(label) {
                    return Err(SimError::UndefinedLabel(format!(
                        "{} (line {})",
                        label, line_no
                    )));
                }
            }
        }
        Ok(machine)
    }

    /// Number of loaded instructions.
    pub fn len(&self) -> usize {
        self.program.len()
    }

    pub fn is_empty(&self) -> bool {
        self.program.is_empty()
    }

    /// Address of a data label.
    pub fn address_of(&self, label: &str) -> Option<u32> {
        self.labels.get(label).copied()
    }

    /// Initial value of the word at `label`, read as `ty`.
    pub fn initial(&self, label: &str, ty: Type) -> Option<Data> {
        let addr = self.address_of(label)?;
        let bits = read_word(&self.memory, addr).ok()?;
        Data::from_bits(ty, bits)
    }

    /// Run from a fresh copy of the initial memory. `input` feeds the read
    /// services, one entry per read.
    pub fn run(&self, input: &[&str]) -> Result<Output, SimError> {
        let mut state = State {
            memory: self.memory.clone(),
            regs: HashMap::new(),
            input: input.iter().map(|s| s.to_string()).collect(),
            stdout: String::new(),
        };
        let mut steps = 0;
        for (_, inst) in &self.program {
            steps += 1;
            if !self.step(&mut state, inst)? {
                break;
            }
        }
        Ok(Output {
            stdout: state.stdout,
            steps,
        })
    }

    /// Execute one instruction. `Ok(false)` means the program exited.
    fn step(&self, state: &mut State, inst: &Inst) -> Result<bool, SimError> {
        match inst {
            Inst::SetBits { dst, bits } => state.set(dst, *bits),
            Inst::La { dst, label } => {
                let addr = self.label(label)?;
                state.set(dst, addr);
            }
            Inst::Load { dst, label } => {
                let bits = read_word(&state.memory, self.label(label)?)?;
                state.set(dst, bits);
            }
            Inst::Store { src, label } => {
                let addr = self.label(label)?;
                let bits = state.get(src);
                write_word(&mut state.memory, addr, bits)?;
            }
            Inst::Int { op, dst, lhs, rhs } => {
                let (a, b) = (state.get(lhs) as i32, state.get(rhs) as i32);
                let mnemonic = || op_name(*op).to_string();
                let value = match op {
                    Arith::Add => a.checked_add(b).ok_or_else(|| SimError::Overflow(mnemonic()))?,
                    Arith::Sub => a.checked_sub(b).ok_or_else(|| SimError::Overflow(mnemonic()))?,
                    Arith::Mul => a.wrapping_mul(b),
                    Arith::Div => {
                        if b == 0 {
                            return Err(SimError::DivisionByZero);
                        }
                        a.wrapping_div(b)
                    }
                };
                state.set(dst, value as u32);
            }
            Inst::Float { op, dst, lhs, rhs } => {
                let (a, b) = (f32::from_bits(state.get(lhs)), f32::from_bits(state.get(rhs)));
                let value = match op {
                    Arith::Add => a + b,
                    Arith::Sub => a - b,
                    Arith::Mul => a * b,
                    Arith::Div => a / b,
                };
                state.set(dst, value.to_bits());
            }
            Inst::Copy { dst, src } => {
                let bits = state.get(src);
                state.set(dst, bits);
            }
            Inst::IntToFloat { dst, src } => {
                let v = state.get(src) as i32;
                state.set(dst, (v as f32).to_bits());
            }
            Inst::FloatToInt { dst, src } => {
                // Unrepresentable values saturate to the MIPS "invalid" word.
                let v = Data::F32(f32::from_bits(state.get(src)))
                    .cast(Type::I32)
                    .unwrap_or(Data::I32(i32::MAX));
                state.set(dst, v.to_bits());
            }
            Inst::Syscall => return self.service(state),
        }
        Ok(true)
    }

    fn service(&self, state: &mut State) -> Result<bool, SimError> {
        let regs = &self.registers;
        let selector = state.get(&regs.selector) as i32;
        let service = self
            .service_for(selector)
            .ok_or(SimError::UnknownService(selector))?;
        match service {
            Service::PrintInt => {
                let v = state.get(&regs.int_arg) as i32;
                state.stdout.push_str(&v.to_string());
            }
            Service::PrintFloat => {
                let v = f32::from_bits(state.get(&regs.float_arg));
                state.stdout.push_str(&format_float(v));
            }
            Service::PrintString => {
                let text = read_cstr(&state.memory, state.get(&regs.int_arg))?;
                state.stdout.push_str(&text);
            }
            Service::ReadInt => {
                let text = state.next_input()?;
                let v = text.trim().parse::<i32>().map_err(|_| SimError::InvalidInput {
                    ty: Type::I32,
                    text: text.clone(),
                })?;
                state.set(&regs.selector, v as u32);
            }
            Service::ReadFloat => {
                let text = state.next_input()?;
                let v = text.trim().parse::<f32>().map_err(|_| SimError::InvalidInput {
                    ty: Type::F32,
                    text: text.clone(),
                })?;
                state.set(&regs.float_result, v.to_bits());
            }
            Service::Exit => return Ok(false),
        }
        Ok(true)
    }

    /// Configured selectors win over the fixed exit selector.
    fn service_for(&self, selector: i32) -> Option<Service> {
        let s = &self.services;
        let service = if selector == s.print_int {
            Service::PrintInt
        } else if selector == s.print_float {
            Service::PrintFloat
        } else if Some(selector) == s.print_string {
            Service::PrintString
        } else if selector == s.read_int {
            Service::ReadInt
        } else if selector == s.read_float {
            Service::ReadFloat
        } else if selector == EXIT_SERVICE {
            Service::Exit
        } else {
            return None;
        };
        Some(service)
    }

    fn label(&self, label: &str) -> Result<u32, SimError> {
        self.address_of(label)
            .ok_or_else(|| SimError::UndefinedLabel(label.to_string()))
    }

    /// `label: .word N` / `.float F` / `.asciiz "text"`
    fn declare(&mut self, line_no: usize, line: &str) -> Result<(), SimError> {
        let (label, rest) = line
            .split_once(':')
            .ok_or_else(|| parse_error(line_no, "expected `label: directive`"))?;
        let label = label.trim();
        let rest = rest.trim();
        let (directive, arg) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
        let arg = arg.trim();

        let bytes = match directive {
            ".word" => {
                let v = parse_int(arg)
                    .ok_or_else(|| parse_error(line_no, format!("invalid word `{}`", arg)))?;
                v.to_le_bytes().to_vec()
            }
            ".float" => {
                let v = arg
                    .parse::<f32>()
                    .map_err(|_| parse_error(line_no, format!("invalid float `{}`", arg)))?;
                Data::F32(v).to_le_bytes().to_vec()
            }
            ".asciiz" => {
                let mut bytes = unquote(arg)
                    .ok_or_else(|| parse_error(line_no, format!("invalid string `{}`", arg)))?
                    .into_bytes();
                bytes.push(0);
                bytes
            }
            other => {
                return Err(parse_error(
                    line_no,
                    format!("unsupported directive `{}`", other),
                ))
            }
        };

        let addr = DATA_BASE + self.memory.len() as u32;
        if self.labels.insert(label.to_string(), addr).is_some() {
            return Err(SimError::DuplicateLabel(label.to_string()));
        }
        self.memory.extend_from_slice(&bytes);
        while self.memory.len() % 4 != 0 {
            self.memory.push(0);
        }
        Ok(())
    }
}

impl State {
    fn get(&self, reg: &str) -> u32 {
        self.regs.get(reg).copied().unwrap_or(0)
    }

    fn set(&mut self, reg: &str, bits: u32) {
        self.regs.insert(reg.to_string(), bits);
    }

    fn next_input(&mut self) -> Result<String, SimError> {
        self.input.pop_front().ok_or(SimError::InputExhausted)
    }
}

fn parse_error(line: usize, message: impl Into<String>) -> SimError {
    SimError::Parse {
        line,
        message: message.into(),
    }
}

fn op_name(op: Arith) -> &'static str {
    match op {
        Arith::Add => "add",
        Arith::Sub => "sub",
        Arith::Mul => "mul",
        Arith::Div => "div",
    }
}

fn parse_inst(line_no: usize, line: &str) -> Result<Inst, SimError> {
    let (mnemonic, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    let args: Vec<String> = rest
        .split(',')
        .map(|a| a.trim().to_string())
        .filter(|a| !a.is_empty())
        .collect();
    let arity = |n: usize| -> Result<(), SimError> {
        if args.len() == n {
            Ok(())
        } else {
            Err(parse_error(
                line_no,
                format!("`{}` takes {} operands, found {}", mnemonic, n, args.len()),
            ))
        }
    };
    let arith = |m: &str| match m {
        "add" => Some(Arith::Add),
        "sub" => Some(Arith::Sub),
        "mul" => Some(Arith::Mul),
        "div" => Some(Arith::Div),
        _ => None,
    };

    let inst = match mnemonic {
        "li" => {
            arity(2)?;
            let bits = parse_int(&args[1])
                .ok_or_else(|| parse_error(line_no, format!("invalid immediate `{}`", args[1])))?;
            Inst::SetBits {
                dst: args[0].clone(),
                bits,
            }
        }
        "li.s" => {
            arity(2)?;
            let v = args[1]
                .parse::<f32>()
                .map_err(|_| parse_error(line_no, format!("invalid float `{}`", args[1])))?;
            Inst::SetBits {
                dst: args[0].clone(),
                bits: v.to_bits(),
            }
        }
        "la" | "lw" | "l.s" => {
            arity(2)?;
            let (dst, label) = (args[0].clone(), args[1].clone());
            if mnemonic == "la" {
                Inst::La { dst, label }
            } else {
                Inst::Load { dst, label }
            }
        }
        "sw" | "s.s" => {
            arity(2)?;
            Inst::Store {
                src: args[0].clone(),
                label: args[1].clone(),
            }
        }
        "move" | "mov.s" | "mfc1" => {
            arity(2)?;
            Inst::Copy {
                dst: args[0].clone(),
                src: args[1].clone(),
            }
        }
        // Source first.
        "mtc1" => {
            arity(2)?;
            Inst::Copy {
                dst: args[1].clone(),
                src: args[0].clone(),
            }
        }
        "cvt.s.w" | "trunc.w.s" => {
            arity(2)?;
            let (dst, src) = (args[0].clone(), args[1].clone());
            if mnemonic == "cvt.s.w" {
                Inst::IntToFloat { dst, src }
            } else {
                Inst::FloatToInt { dst, src }
            }
        }
        "syscall" => {
            arity(0)?;
            Inst::Syscall
        }
        other => {
            let (base, float) = match other.strip_suffix(".s") {
                Some(base) => (base, true),
                None => (other, false),
            };
            let op = arith(base).ok_or_else(|| {
                parse_error(line_no, format!("unsupported instruction `{}`", other))
            })?;
            arity(3)?;
            let (dst, lhs, rhs) = (args[0].clone(), args[1].clone(), args[2].clone());
            if float {
                Inst::Float { op, dst, lhs, rhs }
            } else {
                Inst::Int { op, dst, lhs, rhs }
            }
        }
    };
    Ok(inst)
}

/// Decimal `i32` or `0x` hex word.
fn parse_int(text: &str) -> Option<u32> {
    match text.strip_prefix("0x") {
        Some(hex) => u32::from_str_radix(hex, 16).ok(),
        None => text.parse::<i32>().ok().map(|v| v as u32),
    }
}

fn unquote(text: &str) -> Option<String> {
    let inner = text.strip_prefix('"')?.strip_suffix('"')?;
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next()? {
            'n' => out.push('\n'),
            't' => out.push('\t'),
            '"' => out.push('"'),
            '\\' => out.push('\\'),
            _ => return None,
        }
    }
    Some(out)
}

fn offset(memory: &[u8], addr: u32, len: usize) -> Result<usize, SimError> {
    let start = addr
        .checked_sub(DATA_BASE)
        .ok_or(SimError::BadAddress(addr))? as usize;
    if start + len > memory.len() {
        return Err(SimError::BadAddress(addr));
    }
    Ok(start)
}

fn read_word(memory: &[u8], addr: u32) -> Result<u32, SimError> {
    if addr % 4 != 0 {
        return Err(SimError::BadAddress(addr));
    }
    let at = offset(memory, addr, 4)?;
    let mut word = [0u8; 4];
    word.copy_from_slice(&memory[at..at + 4]);
    Ok(u32::from_le_bytes(word))
}

fn write_word(memory: &mut [u8], addr: u32, bits: u32) -> Result<(), SimError> {
    if addr % 4 != 0 {
        return Err(SimError::BadAddress(addr));
    }
    let at = offset(memory, addr, 4)?;
    memory[at..at + 4].copy_from_slice(&bits.to_le_bytes());
    Ok(())
}

fn read_cstr(memory: &[u8], addr: u32) -> Result<String, SimError> {
    let at = offset(memory, addr, 0)?;
    let end = memory[at..]
        .iter()
        .position(|&b| b == 0)
        .ok_or(SimError::BadAddress(addr))?;
    Ok(String::from_utf8_lossy(&memory[at..at + end]).into_owned())
}

/// Float text as the MARS console prints it: always a fractional part,
/// scientific notation outside `[1e-3, 1e7)`.
pub fn format_float(v: f32) -> String {
    if v.is_nan() {
        return "NaN".to_string();
    }
    if v.is_infinite() {
        return if v > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    let magnitude = v.abs();
    if magnitude == 0.0 || (1e-3..1e7).contains(&magnitude) {
        return Data::F32(v).to_string();
    }
    let sci = format!("{:e}", v);
    match sci.split_once('e') {
        Some((mantissa, exp)) if mantissa.contains('.') => format!("{}E{}", mantissa, exp),
        Some((mantissa, exp)) => format!("{}.0E{}", mantissa, exp),
        None => sci,
    }
}

impl fmt::Display for Output {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.stdout)
    }
}
