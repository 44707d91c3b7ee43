//! Pluggable config validation strategies
//!
//! Separates filesystem validation (for CLI use) from schema validation.

use std::path::{Path, PathBuf};

use globset::Glob;

use crate::config::ReloopConfig;
use crate::error::{ConfigError, Result};

/// Trait for pluggable config validation strategies
pub trait ConfigValidator {
    fn validate(&self, config: &ReloopConfig) -> Result<()>;
}

/// Schema-only validation (no filesystem checks)
pub struct SchemaValidator;

impl ConfigValidator for SchemaValidator {
    fn validate(&self, config: &ReloopConfig) -> Result<()> {
        match config.build.command.first() {
            None => return Err(ConfigError::NoBuildCommand),
            Some(program) if program.trim().is_empty() => return Err(ConfigError::NoBuildCommand),
            Some(_) => {}
        }

        if config.build.binary.as_os_str().is_empty() {
            return Err(ConfigError::SchemaValidation {
                message: "build.binary is not set".to_string(),
                hint: Some("Point build.binary at the file your build command writes".to_string()),
            });
        }

        if config.server.port == 0 {
            return Err(ConfigError::SchemaValidation {
                message: "server.port must be greater than 0".to_string(),
                hint: None,
            });
        }

        if config.server.address.trim().is_empty() {
            return Err(ConfigError::SchemaValidation {
                message: "server.address cannot be empty".to_string(),
                hint: Some("Use \"127.0.0.1\" to listen on loopback only".to_string()),
            });
        }

        if let Some(tls) = &config.server.tls {
            if tls.cert.is_none() || tls.key.is_none() {
                return Err(ConfigError::SchemaValidation {
                    message: "server.tls needs both cert and key".to_string(),
                    hint: Some("Set server.tls.cert and server.tls.key, or remove [server.tls]".to_string()),
                });
            }
        }

        if config.run.grace_period_ms == 0 {
            return Err(ConfigError::SchemaValidation {
                message: "run.grace_period_ms must be greater than 0".to_string(),
                hint: Some("The default is 300".to_string()),
            });
        }

        if config.run.port_wait_ms == 0 {
            return Err(ConfigError::SchemaValidation {
                message: "run.port_wait_ms must be greater than 0".to_string(),
                hint: Some("The default is 10000".to_string()),
            });
        }

        for pattern in &config.hot_reload.exclude_files {
            if let Err(err) = Glob::new(pattern) {
                return Err(ConfigError::SchemaValidation {
                    message: format!("invalid exclude pattern '{pattern}': {err}"),
                    hint: Some("Patterns use glob syntax, e.g. \"*_test.go\"".to_string()),
                });
            }
        }

        for dir in &config.hot_reload.exclude_dirs {
            if dir.trim_matches('/').is_empty() {
                return Err(ConfigError::SchemaValidation {
                    message: "hot_reload.exclude_dirs cannot contain empty entries".to_string(),
                    hint: None,
                });
            }
        }

        Ok(())
    }
}

/// Filesystem validator (for CLI use)
///
/// Runs the schema checks, then makes sure referenced paths exist.
pub struct FsValidator {
    root: PathBuf,
}

impl FsValidator {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }
}

impl ConfigValidator for FsValidator {
    fn validate(&self, config: &ReloopConfig) -> Result<()> {
        SchemaValidator.validate(config)?;

        let entry_dir = self.root.join(&config.build.entry_dir);
        if !entry_dir.is_dir() {
            return Err(ConfigError::EntryDirNotFound(entry_dir));
        }

        if let Some(tls) = &config.server.tls {
            for path in [&tls.cert, &tls.key].into_iter().flatten() {
                let path = self.root.join(path);
                if !path.is_file() {
                    return Err(ConfigError::TlsFileNotFound(path));
                }
            }
        }

        Ok(())
    }
}

/// Validate config schema only
pub fn validate_schema(config: &ReloopConfig) -> Result<()> {
    SchemaValidator.validate(config)
}

/// Validate config including filesystem checks
pub fn validate_fs(config: &ReloopConfig, root: impl AsRef<Path>) -> Result<()> {
    FsValidator::new(root).validate(config)
}
