//! archlens CLI entry point.

use archlens::cli::{self, Cli, Commands, EXIT_ERROR};
use clap::Parser;

fn main() {
    let cli = Cli::parse();

    let exit_code = match cli.command {
        Commands::Analyze(args) => match cli::run_analyze(&args) {
            Ok(code) => code,
            Err(e) => {
                cli::print_error(&e, args.debug);
                EXIT_ERROR
            }
        },
        Commands::Limits(args) => match cli::run_limits(&args) {
            Ok(code) => code,
            Err(e) => {
                cli::print_error(&e, false);
                EXIT_ERROR
            }
        },
    };

    std::process::exit(exit_code);
}
