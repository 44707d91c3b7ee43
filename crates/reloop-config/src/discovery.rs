//! File-based config discovery for CLI use
//!
//! Handles finding and loading `reloop.toml` from the filesystem.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::ReloopConfig;
use crate::error::{ConfigError, Result};

/// Conventional config file name.
pub const CONFIG_FILE: &str = "reloop.toml";

/// File-based configuration discovery
///
/// # Example
///
/// ```no_run
/// use reloop_config::ConfigDiscovery;
///
/// let discovery = ConfigDiscovery::new(".");
/// let config = discovery.load().unwrap();
/// ```
pub struct ConfigDiscovery {
    root: PathBuf,
}

impl ConfigDiscovery {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Find `reloop.toml` in the root directory
    pub fn find(&self) -> Option<PathBuf> {
        let path = self.root.join(CONFIG_FILE);
        path.is_file().then_some(path)
    }

    /// Load config from the discovered file
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::NotFound` if no config file is found.
    pub fn load(&self) -> Result<ReloopConfig> {
        let path = self
            .find()
            .ok_or_else(|| ConfigError::NotFound(self.root.clone()))?;
        self.load_from(&path)
    }

    /// Load config with profile merging
    pub fn load_with_profile(&self, profile: &str) -> Result<ReloopConfig> {
        self.load()?.materialize_profile(Some(profile))
    }

    /// Raw document as JSON, before deserialization into [`ReloopConfig`].
    ///
    /// Used by callers that layer further sources (environment, flags)
    /// over the file.
    pub fn load_value(&self) -> Result<serde_json::Value> {
        let path = self
            .find()
            .ok_or_else(|| ConfigError::NotFound(self.root.clone()))?;
        read_toml(&path)
    }

    /// Load config from a specific file path
    pub fn load_from(&self, path: &Path) -> Result<ReloopConfig> {
        ReloopConfig::from_value(read_toml(path)?)
    }
}

fn read_toml(path: &Path) -> Result<serde_json::Value> {
    debug!(path = %path.display(), "loading config");
    let content = fs::read_to_string(path)?;

    let toml_val: toml::Value = toml::from_str(&content).map_err(|e| ConfigError::InvalidValue {
        field: "toml".to_string(),
        hint: Some(format!("Invalid TOML syntax: {}", e)),
    })?;

    serde_json::to_value(toml_val).map_err(|e| ConfigError::InvalidValue {
        field: "toml".to_string(),
        hint: Some(format!("TOML to JSON conversion failed: {}", e)),
    })
}

/// Discover and load config from current directory (convenience function)
pub fn discover() -> Result<ReloopConfig> {
    let root = std::env::current_dir()?;
    ConfigDiscovery::new(&root).load()
}

/// Discover and load config with profile (convenience function)
pub fn discover_with_profile(profile: &str) -> Result<ReloopConfig> {
    let root = std::env::current_dir()?;
    ConfigDiscovery::new(&root).load_with_profile(profile)
}
