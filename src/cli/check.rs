use std::path::PathBuf;

use clap::Args;

use super::{lower_input, resolve_config, TargetArgs};

#[derive(Args)]
pub struct CheckArgs {
    /// Input .stk script
    pub input: PathBuf,
    #[command(flatten)]
    pub target: TargetArgs,
}

pub fn cmd_check(args: CheckArgs) {
    let config = resolve_config(&args.target);
    let compiler = lower_input(&args.input, &config);
    let leftover = compiler.stack().depth();
    if leftover > 0 {
        eprintln!(
            "warning: {} value(s) left on the stack are never used",
            leftover
        );
    }
    eprintln!("OK: {}", args.input.display());
}
