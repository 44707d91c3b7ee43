//! Miette diagnostic conversion for CLI errors.

use crate::error::{CliError, ConfigError, EngineError};
use miette::Report;

/// Convert CliError to miette Report
pub fn cli_error_to_miette(err: CliError) -> Report {
    match err {
        CliError::Config(e) => config_error_to_miette(e),
        CliError::Engine(e) => engine_error_to_miette(e),
        CliError::FileNotFound(path) => miette::miette!(
            help = "Pass the project directory with --cwd",
            "File not found: {}",
            path.display()
        ),
        _ => miette::miette!("{}", err),
    }
}

/// Convert ConfigError to miette Report, carrying its hint as help text
pub fn config_error_to_miette(err: ConfigError) -> Report {
    let detail = match &err {
        ConfigError::InvalidValue {
            field,
            hint: Some(hint),
        } if field == "toml" || field == "config" => format!("{err}\n{hint}"),
        _ => err.to_string(),
    };

    match err.hint() {
        Some(hint) if !detail.contains(hint) => {
            miette::miette!(help = hint.to_string(), "Configuration error: {}", detail)
        }
        _ => miette::miette!("Configuration error: {}", detail),
    }
}

/// Convert EngineError to miette Report
pub fn engine_error_to_miette(err: EngineError) -> Report {
    match err {
        EngineError::Bind { addr, source } => miette::miette!(
            help = "Another process may be using this port; pick one with --port",
            "Failed to listen on {}: {}",
            addr,
            source
        ),
        EngineError::RebuildFailure(e) => miette::miette!(
            help = "Fix the build error and run reloop again",
            "Initial build failed:\n{}",
            e.detail()
        ),
        EngineError::StartupFailure { program, status } => miette::miette!(
            help = "Run the binary directly to see why it exits during startup",
            "{} exited before it was ready ({})",
            program,
            status
        ),
        EngineError::BackendUnavailable { addr, waited_ms } => miette::miette!(
            help = "Make sure run.args passes {port} to the application",
            "Application never accepted connections on {} (waited {}ms)",
            addr,
            waited_ms
        ),
        other => miette::miette!("{}", other),
    }
}
