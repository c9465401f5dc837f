use std::process::ExitCode;

use canvasfe::cli::{self, CliArgs};
use canvasfe::logger;
use clap::Parser;

fn main() -> ExitCode {
    // Initialize session log (overwrites previous session log)
    logger::init();

    let args = CliArgs::parse();
    cli::run(args)
}
