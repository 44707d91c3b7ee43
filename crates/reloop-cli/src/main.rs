//! reloop CLI - rebuild and restart a server binary whenever its sources change.
//!
//! This is the main entry point. It parses arguments, initializes logging and
//! dispatches to the selected command.

use clap::Parser;
use miette::Result;
use reloop_cli::{cli, commands, error, logger, ui};

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();

    let no_color = args.no_color || !logger::should_use_colors();
    logger::init_logger(args.verbose, args.quiet, no_color);
    ui::init_colors(no_color);

    let result = match args.command {
        cli::Command::Run(run_args) => commands::run_execute(run_args).await,
        cli::Command::Check(check_args) => commands::check_execute(check_args).await,
    };

    // Convert CLI errors to miette diagnostics for readable error reporting
    result.map_err(error::cli_error_to_miette)
}
