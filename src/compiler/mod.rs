//! Compiler driver: runs push / triplet / assign / print / read against the
//! evaluation stack and symbol table, and drives the emitter.
//!
//! Every operation validates first and mutates second. A failing operation
//! returns its error (and reports it to the diagnostic sink) with the
//! stack, symbol table and instruction list exactly as they were.
//!
//! `compile` is the terminal step: declarations, then instructions.

mod names;

use std::collections::HashSet;
use std::io::Write;
use std::path::Path;

use crate::config::target::{RedeclarePolicy, TargetConfig};
use crate::diagnostic::{Diagnostic, DiagnosticSink};
use crate::emit::Emitter;
use crate::error::CompileError;
use crate::ir::{ArithOp, Instr, Reg, Side};
use crate::span::Span;
use crate::stack::EvalStack;
use crate::symbols::SymbolTable;
use crate::value::{Data, Symbol, Type};

pub use names::{Counter, NameSource};

/// One operation of the input protocol.
#[derive(Clone, Debug, PartialEq)]
pub enum Op {
    Push(Symbol),
    Triplet(ArithOp),
    Assign(String),
    Print,
    Read(String, Type),
}

/// A validated operand, ready to be loaded into a scratch register.
enum Operand {
    Imm(Data),
    Var { name: String, ty: Type },
}

pub struct Compiler<D: DiagnosticSink = Vec<Diagnostic>> {
    config: TargetConfig,
    stack: EvalStack,
    symbols: SymbolTable,
    /// String pool: (label, text) in first-use order.
    strings: Vec<(String, String)>,
    /// Declared by a read before any store; the first store may claim them.
    implicit: HashSet<String>,
    emitter: Emitter,
    temps: Box<dyn NameSource>,
    string_labels: Counter,
    /// Attached to every diagnostic reported from now on.
    span: Span,
    sink: D,
}

impl<D: DiagnosticSink> std::fmt::Debug for Compiler<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Compiler")
            .field("config", &self.config)
            .field("stack", &self.stack)
            .field("symbols", &self.symbols)
            .field("strings", &self.strings)
            .field("implicit", &self.implicit)
            .field("span", &self.span)
            .finish_non_exhaustive()
    }
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new()
    }
}

impl Compiler {
    /// A compiler for the built-in MIPS target collecting diagnostics.
    pub fn new() -> Self {
        Self::with_config(TargetConfig::mips())
    }

    pub fn with_config(config: TargetConfig) -> Self {
        Self::with_sink(config, Vec::new())
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.sink
    }

    /// Remove and return the diagnostics collected so far.
    pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.sink)
    }
}

impl<D: DiagnosticSink> Compiler<D> {
    pub fn with_sink(config: TargetConfig, sink: D) -> Self {
        Self {
            emitter: Emitter::new(&config),
            temps: Box::new(Counter::new(&config.temp_prefix)),
            string_labels: Counter::new(&config.string_prefix),
            config,
            stack: EvalStack::new(),
            symbols: SymbolTable::new(),
            strings: Vec::new(),
            implicit: HashSet::new(),
            span: Span::dummy(),
            sink,
        }
    }

    /// Replace the temporary-name source.
    pub fn with_names(mut self, names: impl NameSource + 'static) -> Self {
        self.temps = Box::new(names);
        self
    }

    // ─── Accessors ────────────────────────────────────────────────

    pub fn config(&self) -> &TargetConfig {
        &self.config
    }

    pub fn stack(&self) -> &EvalStack {
        &self.stack
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    pub fn instructions(&self) -> &[Instr] {
        self.emitter.instructions()
    }

    pub fn sink(&self) -> &D {
        &self.sink
    }

    /// Source location of the operations that follow, for diagnostics.
    pub fn set_span(&mut self, span: Span) {
        self.span = span;
    }

    // ─── Operations ───────────────────────────────────────────────

    /// Apply one protocol operation.
    pub fn apply(&mut self, op: &Op) -> Result<(), CompileError> {
        match op {
            Op::Push(symbol) => {
                self.push(symbol.clone());
                Ok(())
            }
            Op::Triplet(arith) => self.triplet(*arith),
            Op::Assign(name) => self.assign(name),
            Op::Print => self.print(),
            Op::Read(name, ty) => self.read(name, *ty),
        }
    }

    pub fn push(&mut self, symbol: impl Into<Symbol>) {
        self.stack.push(symbol.into());
    }

    /// `lhs op rhs` into a fresh temporary, which is pushed.
    pub fn triplet(&mut self, op: ArithOp) -> Result<(), CompileError> {
        let result = self.try_triplet(op);
        self.report(result)
    }

    /// Pop a value and store it into `name`.
    pub fn assign(&mut self, name: &str) -> Result<(), CompileError> {
        let result = self.try_assign(name);
        self.report(result)
    }

    /// Pop a value and print it through the service matching its type.
    pub fn print(&mut self) -> Result<(), CompileError> {
        let result = self.try_print();
        self.report(result)
    }

    /// Read a value of type `ty` from input into `name`. The stack is not
    /// involved.
    pub fn read(&mut self, name: &str, ty: Type) -> Result<(), CompileError> {
        let result = self.try_read(name, ty);
        self.report(result)
    }

    fn try_triplet(&mut self, op: ArithOp) -> Result<(), CompileError> {
        const OP: &str = "triplet";
        self.stack.require(OP, 2)?;
        let (lhs, rhs) = match (self.stack.peek(1), self.stack.peek(0)) {
            (Some(lhs), Some(rhs)) => (lhs.clone(), rhs.clone()),
            _ => return Err(self.underflow(OP, 2)),
        };

        let (lt, rt) = (self.type_of(&lhs), self.type_of(&rhs));
        if !lt.is_numeric() || !rt.is_numeric() {
            return Err(CompileError::unsupported(
                OP,
                format!("cannot {} {} and {} values", op, lt, rt),
            ));
        }
        let result_ty = if lt == Type::I32 && rt == Type::I32 {
            Type::I32
        } else {
            Type::F32
        };
        let lhs_operand = self.prepare(OP, &lhs, result_ty)?;
        let rhs_operand = self.prepare(OP, &rhs, result_ty)?;

        self.stack.take(OP)?;
        self.stack.take(OP)?;

        self.load_into(Side::Lhs, lhs_operand, result_ty);
        self.load_into(Side::Rhs, rhs_operand, result_ty);
        let dst = Reg::scratch(Side::Lhs, result_ty);
        self.emitter.arith(op, dst, Reg::scratch(Side::Rhs, result_ty));

        let temp = self.fresh_temp();
        self.emitter.store(dst, &temp);
        self.declare(&temp, result_ty);
        self.stack.push(Symbol::Ident(temp));
        Ok(())
    }

    fn try_assign(&mut self, name: &str) -> Result<(), CompileError> {
        const OP: &str = "assign";
        self.stack.require(OP, 1)?;
        let existing = self.check_redeclare(name)?;
        let value = match self.stack.peek(0) {
            Some(value) => value.clone(),
            None => return Err(self.underflow(OP, 1)),
        };

        let value_ty = self.type_of(&value);
        if !value_ty.is_numeric() {
            return Err(CompileError::unsupported(
                OP,
                format!("cannot store a {} value in `{}`", value_ty, name),
            ));
        }
        let target_ty = existing.unwrap_or(value_ty);
        let operand = self.prepare(OP, &value, target_ty)?;

        self.stack.take(OP)?;
        self.load_into(Side::Lhs, operand, target_ty);
        self.emitter.store(Reg::scratch(Side::Lhs, target_ty), name);
        if existing.is_none() {
            self.declare(name, target_ty);
        }
        self.implicit.remove(name);
        Ok(())
    }

    fn try_print(&mut self) -> Result<(), CompileError> {
        const OP: &str = "print";
        self.stack.require(OP, 1)?;
        let value = match self.stack.peek(0) {
            Some(value) => value.clone(),
            None => return Err(self.underflow(OP, 1)),
        };

        let ty = self.type_of(&value);
        let selector = self.config.services.print(ty).ok_or_else(|| {
            CompileError::unsupported(OP, format!("target has no print service for {} values", ty))
        })?;
        match &value {
            Symbol::Literal(data) if !data.is_encodable() => {
                return Err(CompileError::unsupported(
                    OP,
                    format!("{} has no immediate encoding", data),
                ));
            }
            Symbol::Text(text) => {
                if let Some(c) = text.chars().find(|&c| !is_escapable(c)) {
                    return Err(CompileError::unsupported(
                        OP,
                        format!("string contains control character {:?}", c),
                    ));
                }
            }
            _ => {}
        }

        self.stack.take(OP)?;
        self.emitter.load_imm(Reg::Selector, Data::I32(selector));
        match value {
            Symbol::Ident(label) if ty == Type::Str => {
                self.emitter.load_addr(Reg::IntArg, &label);
            }
            Symbol::Ident(name) => {
                self.note_use(&name);
                self.emitter.load(Reg::arg(ty), &name);
            }
            Symbol::Literal(data) => self.emitter.load_imm(Reg::arg(ty), data),
            Symbol::Text(text) => {
                let label = self.intern(&text);
                self.emitter.load_addr(Reg::IntArg, &label);
            }
        }
        self.emitter.syscall();
        Ok(())
    }

    fn try_read(&mut self, name: &str, ty: Type) -> Result<(), CompileError> {
        const OP: &str = "read";
        let existing = self.check_redeclare(name)?;
        let ty = existing.unwrap_or(ty);
        let selector = self.config.services.read(ty).ok_or_else(|| {
            CompileError::unsupported(OP, format!("target has no read service for {} values", ty))
        })?;

        self.emitter.load_imm(Reg::Selector, Data::I32(selector));
        self.emitter.syscall();
        self.emitter.store(Reg::result(ty), name);
        if existing.is_none() {
            self.declare(name, ty);
        }
        self.implicit.remove(name);
        Ok(())
    }

    // ─── Helpers ──────────────────────────────────────────────────

    fn report(&mut self, result: Result<(), CompileError>) -> Result<(), CompileError> {
        if let Err(err) = &result {
            self.sink.report(err.to_diagnostic(self.span));
        }
        result
    }

    fn underflow(&self, op: &'static str, needed: usize) -> CompileError {
        CompileError::StackUnderflow {
            op,
            needed,
            depth: self.stack.depth(),
        }
    }

    /// Runtime type of a stack symbol. Identifiers naming a pooled string
    /// are strings; identifiers that were never stored are int words.
    fn type_of(&self, symbol: &Symbol) -> Type {
        match symbol {
            Symbol::Ident(name) if self.is_string_label(name) => Type::Str,
            Symbol::Ident(name) => self.symbols.get(name).map_or(Type::I32, |v| v.ty),
            Symbol::Literal(data) => data.ty(),
            Symbol::Text(_) => Type::Str,
        }
    }

    /// The recorded type of `name` if it exists and may be stored to again.
    /// An implicit declaration is not a store, so under `Reject` the first
    /// store still claims it (keeping its int type and slot).
    fn check_redeclare(&self, name: &str) -> Result<Option<Type>, CompileError> {
        if self.is_string_label(name) {
            return Err(CompileError::DuplicateDeclaration {
                name: name.to_string(),
                ty: Type::Str,
            });
        }
        match (self.symbols.get(name), self.config.redeclare) {
            (None, _) => Ok(None),
            (Some(var), RedeclarePolicy::Overwrite) => Ok(Some(var.ty)),
            (Some(var), RedeclarePolicy::Reject) if self.implicit.contains(name) => {
                Ok(Some(var.ty))
            }
            (Some(var), RedeclarePolicy::Reject) => Err(CompileError::DuplicateDeclaration {
                name: name.to_string(),
                ty: var.ty,
            }),
        }
    }

    /// Validate `symbol` as a numeric operand that will be used as `to`.
    fn prepare(&self, op: &'static str, symbol: &Symbol, to: Type) -> Result<Operand, CompileError> {
        match symbol {
            Symbol::Ident(name) => Ok(Operand::Var {
                name: name.clone(),
                ty: self.type_of(symbol),
            }),
            Symbol::Literal(data) => {
                if !data.is_encodable() {
                    return Err(CompileError::unsupported(
                        op,
                        format!("{} has no immediate encoding", data),
                    ));
                }
                data.cast(to).map(Operand::Imm).ok_or_else(|| {
                    CompileError::unsupported(op, format!("{} does not fit in {}", data, to))
                })
            }
            Symbol::Text(_) => Err(CompileError::unsupported(
                op,
                "string literals can only be printed",
            )),
        }
    }

    /// Load `operand` into the `side` scratch register for type `to`,
    /// converting between register classes when needed.
    fn load_into(&mut self, side: Side, operand: Operand, to: Type) {
        let dst = Reg::scratch(side, to);
        match operand {
            Operand::Imm(data) => self.emitter.load_imm(dst, data),
            Operand::Var { name, ty } => {
                self.note_use(&name);
                match (ty, to) {
                    (Type::I32, Type::F32) => {
                        let int = Reg::scratch(side, Type::I32);
                        self.emitter.load(int, &name);
                        self.emitter.mov(dst, int);
                        self.emitter.int_to_float(dst);
                    }
                    (Type::F32, Type::I32) => {
                        let float = Reg::scratch(side, Type::F32);
                        self.emitter.load(float, &name);
                        self.emitter.float_to_int(float);
                        self.emitter.mov(dst, float);
                    }
                    _ => self.emitter.load(dst, &name),
                }
            }
        }
    }

    /// Declare an identifier read before it was ever stored to.
    fn note_use(&mut self, name: &str) {
        if self.symbols.contains(name) {
            return;
        }
        self.declare(name, Type::I32);
        self.implicit.insert(name.to_string());
        self.sink.report(
            Diagnostic::warning(
                format!("`{}` is read before it is assigned; declaring it as int", name),
                self.span,
            )
            .with_note("its storage is zero-initialized".to_string()),
        );
    }

    fn declare(&mut self, name: &str, ty: Type) {
        // Insert-once: an existing entry keeps its type and slot.
        let _ = self.symbols.insert(name, ty);
    }

    fn is_string_label(&self, name: &str) -> bool {
        self.strings.iter().any(|(label, _)| label == name)
    }

    fn is_taken(&self, name: &str) -> bool {
        self.symbols.contains(name) || self.is_string_label(name)
    }

    fn fresh_temp(&mut self) -> String {
        loop {
            let name = self.temps.next_name();
            if !self.is_taken(&name) {
                return name;
            }
        }
    }

    /// Label of the pooled string `text`, adding it on first use.
    fn intern(&mut self, text: &str) -> String {
        if let Some((label, _)) = self.strings.iter().find(|(_, t)| t == text) {
            return label.clone();
        }
        let label = loop {
            let label = self.string_labels.next_name();
            if !self.is_taken(&label) {
                break label;
            }
        };
        self.strings.push((label.clone(), text.to_string()));
        label
    }

    // ─── Emission ─────────────────────────────────────────────────

    /// The declarations section: header, one zero-initialized entry per
    /// variable in insertion order, the string pool, then a blank line.
    pub fn render_declarations(&self) -> String {
        let indent = &self.config.indent;
        let mut out = String::new();
        out.push_str(&self.config.data_header);
        out.push('\n');
        for (name, var) in self.symbols.iter() {
            out.push_str(&format!("{}{}: {}\n", indent, name, directive(var.ty)));
        }
        for (label, text) in &self.strings {
            out.push_str(&format!(
                "{}{}: .asciiz \"{}\"\n",
                indent,
                label,
                escape(text)
            ));
        }
        out.push('\n');
        out
    }

    /// The complete artifact.
    pub fn compile_to_string(&self) -> String {
        let mut out = self.render_declarations();
        out.push_str(&self.emitter.render());
        out
    }

    /// Write the artifact to `sink`: declarations, then instructions.
    ///
    /// Only reads compiler state, so calling it again writes the same
    /// bytes.
    pub fn compile(&mut self, sink: &mut dyn Write) -> Result<(), CompileError> {
        let result = self.write_artifact(sink);
        self.report(result)
    }

    /// Write the artifact to `path`, replacing any previous artifact in a
    /// single write.
    pub fn compile_to_path(&mut self, path: &Path) -> Result<(), CompileError> {
        let mut buf = Vec::new();
        let result = self.write_artifact(&mut buf).and_then(|_| {
            std::fs::write(path, &buf)
                .map_err(|e| CompileError::output(path.display().to_string(), e))
        });
        self.report(result)
    }

    fn write_artifact(&self, sink: &mut dyn Write) -> Result<(), CompileError> {
        sink.write_all(self.render_declarations().as_bytes())
            .map_err(|e| CompileError::output("declaration section", e))?;
        self.emitter.flush(sink)
    }
}

fn directive(ty: Type) -> &'static str {
    match ty {
        Type::F32 => ".float 0.0",
        Type::I32 | Type::Str => ".word 0",
    }
}

/// Control characters other than newline and tab have no `.asciiz` escape.
fn is_escapable(c: char) -> bool {
    !c.is_control() || c == '\n' || c == '\t'
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out
}
