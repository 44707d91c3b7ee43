use clap::{Args, Subcommand};
use std::path::PathBuf;

/// Available reloop subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build and run the application
    ///
    /// In the dev profile the application runs behind a reloading proxy:
    /// source changes trigger a rebuild on the next request. Other profiles
    /// build once and run the binary in the foreground.
    Run(RunArgs),

    /// Validate configuration
    ///
    /// Loads reloop.toml with the selected profile, checks it and reports
    /// whether hot reload would be active.
    Check(CheckArgs),
}

/// Arguments for the run command
#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    /// Project directory containing reloop.toml
    #[arg(short = 'C', long, value_name = "DIR")]
    pub cwd: Option<PathBuf>,

    /// Environment profile to activate (overrides app.profile)
    #[arg(short, long, value_name = "NAME")]
    pub profile: Option<String>,

    /// Port clients connect to (overrides server.port)
    #[arg(long, value_name = "PORT", value_parser = clap::value_parser!(u16).range(1..))]
    pub port: Option<u16>,

    /// Build once and run in the foreground even in the dev profile
    #[arg(long)]
    pub no_hot_reload: bool,
}

/// Arguments for the check command
#[derive(Args, Debug, Clone, Default)]
pub struct CheckArgs {
    /// Project directory containing reloop.toml
    #[arg(short = 'C', long, value_name = "DIR")]
    pub cwd: Option<PathBuf>,

    /// Environment profile to validate
    #[arg(short, long, value_name = "NAME")]
    pub profile: Option<String>,
}
