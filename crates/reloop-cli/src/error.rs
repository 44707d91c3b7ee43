//! Error handling for the reloop CLI.
//!
//! `CliError` wraps the domain errors from `reloop-config` and the `reloop`
//! engine. Conversion is automatic via `#[from]`, and [`ResultExt`] attaches
//! paths, hints or context at call sites.
//!
//! # Example
//!
//! ```rust,no_run
//! use reloop_cli::error::{Result, ResultExt};
//! use std::path::Path;
//!
//! fn read_marker(path: &Path) -> Result<String> {
//!     std::fs::read_to_string(path)
//!         .with_path(path)
//!         .with_hint("The marker file is written by the build step")
//! }
//! ```

mod diagnostic;

use std::path::PathBuf;
use thiserror::Error;

pub use diagnostic::cli_error_to_miette;
pub use reloop::EngineError;
pub use reloop_config::ConfigError;

/// Top-level CLI error type.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration errors (missing file, invalid values, failed validation)
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Engine errors (build failure, startup failure, bind failure, ...)
    #[error("{0}")]
    Engine(#[from] EngineError),

    /// Invalid command-line arguments or options
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// File or directory not found
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// I/O errors from file system operations
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The application exited on its own in foreground mode
    #[error("{program} exited with {status}")]
    ChildExited {
        /// Binary that was running
        program: String,
        /// Exit status as reported by the OS
        status: String,
    },

    /// Generic errors with custom messages
    #[error("{0}")]
    Custom(String),
}

impl From<reloop::RebuildError> for CliError {
    fn from(err: reloop::RebuildError) -> Self {
        CliError::Engine(EngineError::from(err))
    }
}

/// Result type alias using `CliError` as the default error type.
pub type Result<T, E = CliError> = std::result::Result<T, E>;

/// Extension trait for adding context to `Result` types.
pub trait ResultExt<T> {
    /// Turn a not-found I/O error into [`CliError::FileNotFound`] for `path`.
    fn with_path(self, path: impl AsRef<std::path::Path>) -> Result<T>;

    /// Append a hint to the error message.
    fn with_hint(self, hint: impl std::fmt::Display) -> Result<T>;

    /// Prefix the error message with `msg`.
    fn context(self, msg: impl std::fmt::Display) -> Result<T>;
}

impl<T, E: Into<CliError>> ResultExt<T> for std::result::Result<T, E> {
    fn with_path(self, path: impl AsRef<std::path::Path>) -> Result<T> {
        self.map_err(|e| {
            let err: CliError = e.into();
            match err {
                CliError::Io(io_err) if io_err.kind() == std::io::ErrorKind::NotFound => {
                    CliError::FileNotFound(path.as_ref().to_path_buf())
                }
                other => other,
            }
        })
    }

    fn with_hint(self, hint: impl std::fmt::Display) -> Result<T> {
        self.map_err(|e| {
            let err: CliError = e.into();
            CliError::Custom(format!("{}\n\nHint: {}", err, hint))
        })
    }

    fn context(self, msg: impl std::fmt::Display) -> Result<T> {
        self.map_err(|e| {
            let err: CliError = e.into();
            CliError::Custom(format!("{}: {}", msg, err))
        })
    }
}
