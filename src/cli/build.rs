use std::path::PathBuf;
use std::process;

use clap::Args;

use super::{lower_input, resolve_config, TargetArgs};

#[derive(Args)]
pub struct BuildArgs {
    /// Input .stk script
    pub input: PathBuf,
    /// Output .asm file (default: <input>.asm)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
    #[command(flatten)]
    pub target: TargetArgs,
}

pub fn cmd_build(args: BuildArgs) {
    let config = resolve_config(&args.target);
    let mut compiler = lower_input(&args.input, &config);
    let out_path = args
        .output
        .unwrap_or_else(|| args.input.with_extension("asm"));

    if let Err(e) = compiler.compile_to_path(&out_path) {
        eprintln!("error: {}", e);
        process::exit(1);
    }

    eprintln!(
        "Compiled -> {} ({} instructions, {} variables)",
        out_path.display(),
        compiler.instructions().len(),
        compiler.symbols().len()
    );
}
