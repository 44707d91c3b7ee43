//! Error types for configuration validation and loading.

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Error)]
pub enum ConfigError {
    // Config parsing/loading errors
    #[error("config not found in {0}")]
    NotFound(PathBuf),

    #[error("invalid config value: {field}")]
    InvalidValue {
        field: String,
        hint: Option<String>,
    },

    #[error("invalid profile override: {message}")]
    InvalidProfileOverride { message: String },

    // Schema validation errors (no filesystem checks)
    #[error("no build command specified")]
    NoBuildCommand,

    #[error("schema validation failed: {message}")]
    SchemaValidation {
        message: String,
        hint: Option<String>,
    },

    // Filesystem validation errors (for CLI use)
    #[error("entry directory not found: {0}")]
    EntryDirNotFound(PathBuf),

    #[error("TLS file not found: {0}")]
    TlsFileNotFound(PathBuf),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConfigError {
    /// Suggested fix, when one is known.
    pub fn hint(&self) -> Option<&str> {
        match self {
            ConfigError::InvalidValue { hint, .. } | ConfigError::SchemaValidation { hint, .. } => {
                hint.as_deref()
            }
            ConfigError::NotFound(_) => Some("Create a reloop.toml in the project root"),
            ConfigError::NoBuildCommand => {
                Some("Add a command to [build], e.g. command = [\"go\", \"build\", \"-o\", \"build/bin/app\", \".\"]")
            }
            _ => None,
        }
    }
}
