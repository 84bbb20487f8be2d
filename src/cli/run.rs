use std::path::PathBuf;
use std::process;

use clap::Args;

use stackc::sim::Machine;

use super::{lower_input, resolve_config, TargetArgs};

#[derive(Args)]
pub struct RunArgs {
    /// Input .stk script
    pub input: PathBuf,
    /// Values for the read operations, in order (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub input_values: Vec<String>,
    #[command(flatten)]
    pub target: TargetArgs,
}

pub fn cmd_run(args: RunArgs) {
    let config = resolve_config(&args.target);
    let compiler = lower_input(&args.input, &config);
    let artifact = compiler.compile_to_string();

    let machine = match Machine::load(&artifact, &config) {
        Ok(machine) => machine,
        Err(e) => {
            eprintln!("error: generated artifact does not load: {}", e);
            process::exit(1);
        }
    };
    let input: Vec<&str> = args.input_values.iter().map(String::as_str).collect();
    match machine.run(&input) {
        Ok(output) => {
            print!("{}", output);
            eprintln!("\n({} instructions executed)", output.steps);
        }
        Err(e) => {
            eprintln!("error: {}", e);
            process::exit(1);
        }
    }
}
