//! Command-line interface definition.
//!
//! # Command Structure
//!
//! - `reloop run` - Build, start and (in the dev profile) hot-reload the application
//! - `reloop check` - Validate `reloop.toml` without building anything

mod commands;
mod tests;

use clap::Parser;

pub use commands::{CheckArgs, Command, RunArgs};

/// reloop - rebuild and restart your server on the next request after a change
#[derive(Parser, Debug)]
#[command(
    name = "reloop",
    version,
    about = "Rebuild and restart a server binary when its sources change",
    long_about = "reloop sits in front of your application as a reverse proxy.\n\
                  After a source change, the next request triggers a rebuild and restart\n\
                  before it is forwarded, so the browser always sees the current code."
)]
pub struct Cli {
    /// Enable verbose logging (debug level)
    ///
    /// Shows watcher events, proxied requests and child lifecycle details.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}
