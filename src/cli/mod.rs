pub mod build;
pub mod check;
pub mod run;

use std::path::{Path, PathBuf};
use std::process;

use clap::Args;

use stackc::diagnostic::render_diagnostics;
use stackc::{Compiler, RedeclarePolicy, TargetConfig};

/// Target selection shared by every subcommand.
#[derive(Args)]
pub struct TargetArgs {
    /// Target configuration file (default: built-in MIPS32)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
    /// Fail when an identifier is declared twice
    #[arg(long)]
    pub reject_redeclare: bool,
}

/// Resolve `--config` and `--reject-redeclare` to a target configuration.
pub fn resolve_config(args: &TargetArgs) -> TargetConfig {
    let config = match &args.config {
        Some(path) => match TargetConfig::load(path) {
            Ok(config) => config,
            Err(diag) => {
                diag.render_plain();
                process::exit(1);
            }
        },
        None => TargetConfig::mips(),
    };
    if args.reject_redeclare {
        config.with_redeclare(RedeclarePolicy::Reject)
    } else {
        config
    }
}

pub fn read_source(input: &Path) -> String {
    if !input.extension().is_some_and(|e| e == "stk") {
        eprintln!("warning: '{}' does not have a .stk extension", input.display());
    }
    match std::fs::read_to_string(input) {
        Ok(source) => source,
        Err(e) => {
            eprintln!("error: cannot read '{}': {}", input.display(), e);
            process::exit(1);
        }
    }
}

/// Read, parse and apply `input`. Renders every diagnostic; exits on
/// errors.
pub fn lower_input(input: &Path, config: &TargetConfig) -> Compiler {
    let source = read_source(input);
    let filename = input.display().to_string();
    match stackc::lower_script(&source, config) {
        Ok(compiler) => {
            render_diagnostics(compiler.diagnostics(), &filename, &source);
            compiler
        }
        Err(diagnostics) => {
            render_diagnostics(&diagnostics, &filename, &source);
            let count = diagnostics.iter().filter(|d| d.is_error()).count();
            eprintln!(
                "error: {} failed with {} error{}",
                filename,
                count,
                if count == 1 { "" } else { "s" }
            );
            process::exit(1);
        }
    }
}
