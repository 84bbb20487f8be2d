//! stackc: lowers stack-machine operations (push, arithmetic triplets,
//! assign, print, read) to MIPS32 assembly for MARS/SPIM.

pub mod compiler;
pub mod config;
pub mod diagnostic;
pub mod emit;
pub mod error;
pub mod ir;
pub mod script;
pub mod sim;
pub mod span;
pub mod stack;
pub mod symbols;
pub mod value;

pub use compiler::{Compiler, Counter, NameSource, Op};
pub use config::target;
pub use config::target::{RedeclarePolicy, TargetConfig};
pub use error::CompileError;
pub use ir::ArithOp;
pub use value::{Data, Symbol, Type};

use diagnostic::{render_diagnostics, Diagnostic};

/// Parse and apply a script without rendering anything.
///
/// On success the returned compiler holds the program and any warnings;
/// on failure every diagnostic (errors and warnings) is returned.
pub fn lower_script(source: &str, config: &TargetConfig) -> Result<Compiler, Vec<Diagnostic>> {
    let ops = script::parse(source)?;
    let mut compiler = Compiler::with_config(config.clone());
    if script::apply(&ops, &mut compiler) > 0 {
        return Err(compiler.take_diagnostics());
    }
    Ok(compiler)
}

/// Compile a script for the built-in MIPS target.
pub fn compile_script(source: &str, filename: &str) -> Result<String, Vec<Diagnostic>> {
    compile_script_with_config(source, filename, &TargetConfig::mips())
}

/// Compile a script to an artifact, rendering diagnostics to stderr.
pub fn compile_script_with_config(
    source: &str,
    filename: &str,
    config: &TargetConfig,
) -> Result<String, Vec<Diagnostic>> {
    match lower_script(source, config) {
        Ok(compiler) => {
            render_diagnostics(compiler.diagnostics(), filename, source);
            Ok(compiler.compile_to_string())
        }
        Err(diagnostics) => {
            render_diagnostics(&diagnostics, filename, source);
            Err(diagnostics)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_script_artifact() {
        let artifact = compile_script("push 1\npush 2\nadd\nprint\n", "t.stk").unwrap();
        assert!(artifact.starts_with(".data\n    temp_1: .word 0\n\n.text\n"));
        assert!(artifact.ends_with("    li $v0, 1\n    lw $a0, temp_1\n    syscall\n"));
    }

    #[test]
    fn test_lower_script_keeps_warnings() {
        let compiler = lower_script("push y\nprint\n", &TargetConfig::mips()).unwrap();
        assert_eq!(compiler.diagnostics().len(), 1);
        assert!(!compiler.diagnostics()[0].is_error());
    }

    #[test]
    fn test_lower_script_reports_every_failure() {
        let errors = lower_script("print\nadd\npush 1\n", &TargetConfig::mips()).unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(errors.iter().all(|d| d.is_error()));
        assert_eq!(errors[1].span, span::Span::new(6, 9));
    }

    #[test]
    fn test_reject_policy_through_config() {
        let config = TargetConfig::mips().with_redeclare(RedeclarePolicy::Reject);
        let source = "push 1\nassign a\npush 2\nassign a\n";
        assert!(lower_script(source, &TargetConfig::mips()).is_ok());
        let errors = lower_script(source, &config).unwrap_err();
        assert!(errors[0].message.contains("already declared"));
    }

    #[test]
    fn test_parse_errors_short_circuit() {
        let errors = compile_script("push\n", "bad.stk").unwrap_err();
        assert_eq!(errors.len(), 1);
    }
}
