mod cli;

use clap::{Parser, Subcommand};

use cli::build::BuildArgs;
use cli::check::CheckArgs;
use cli::run::RunArgs;

#[derive(Parser)]
#[command(
    name = "stackc",
    version,
    about = "Lower stack-machine operation scripts to MIPS32 assembly"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compile a .stk script to a .asm artifact
    Build(BuildArgs),
    /// Validate a script without writing an artifact
    Check(CheckArgs),
    /// Compile a script and execute it in the reference interpreter
    Run(RunArgs),
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Command::Build(args) => cli::build::cmd_build(args),
        Command::Check(args) => cli::check::cmd_check(args),
        Command::Run(args) => cli::run::cmd_run(args),
    }
}
