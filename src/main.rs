use std::process::ExitCode;

use clap::Parser;
use colored::Colorize;
use totoro::cli::{self, Cli};

fn main() -> ExitCode {
    let cli = Cli::parse();
    totoro::logging::init(cli.verbose);

    match cli::run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) if e.is_cancellation() => {
            eprintln!("{}", e.to_string().yellow());
            ExitCode::from(130)
        }
        Err(e) => {
            eprintln!("{} {e}", "error:".red().bold());
            ExitCode::FAILURE
        }
    }
}
