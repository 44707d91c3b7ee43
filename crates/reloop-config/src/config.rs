//! Top-level `reloop.toml` structure and profile merging.
//!
//! For file discovery, see the `discovery` module.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ConfigError, Result as ConfigResult};
use crate::process::{BuildConfig, HotReloadConfig, RunConfig};
use crate::server::ServerConfig;
use crate::validation::{ConfigValidator, SchemaValidator};

/// The only profile in which hot reload runs.
pub const DEV_PROFILE: &str = "dev";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReloopConfig {
    #[serde(default)]
    pub app: AppConfig,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub build: BuildConfig,

    #[serde(default)]
    pub run: RunConfig,

    #[serde(default)]
    pub hot_reload: HotReloadConfig,

    /// Per-profile overrides, merged over the whole document
    #[serde(default)]
    #[serde(skip_serializing)]
    pub profiles: HashMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub name: Option<String>,

    /// Active environment profile
    #[serde(default = "default_profile")]
    pub profile: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            name: None,
            profile: default_profile(),
        }
    }
}

fn default_profile() -> String {
    DEV_PROFILE.into()
}

impl ReloopConfig {
    /// Create from serde_json::Value
    ///
    /// # Example
    ///
    /// ```
    /// use reloop_config::ReloopConfig;
    /// use serde_json::json;
    ///
    /// let value = json!({
    ///     "build": { "command": ["go", "build", "-o", "build/bin/blog", "."], "binary": "build/bin/blog" },
    ///     "server": { "port": 3000 }
    /// });
    ///
    /// let config = ReloopConfig::from_value(value).unwrap();
    /// assert_eq!(config.server.port, 3000);
    /// assert!(config.hot_reload_active());
    /// ```
    pub fn from_value(value: Value) -> ConfigResult<Self> {
        serde_json::from_value(value).map_err(|e| ConfigError::InvalidValue {
            field: "config".to_string(),
            hint: Some(e.to_string()),
        })
    }

    /// Convert to serde_json::Value (profiles are not included)
    pub fn to_value(&self) -> ConfigResult<Value> {
        serde_json::to_value(self).map_err(|e| ConfigError::InvalidValue {
            field: "config".to_string(),
            hint: Some(e.to_string()),
        })
    }

    /// Activate `profile`, merging its overrides over the base document.
    ///
    /// A profile without an override table only changes `app.profile`.
    pub fn materialize_profile(mut self, profile: Option<&str>) -> ConfigResult<Self> {
        let Some(name) = profile else {
            return Ok(self);
        };

        if let Some(overrides) = self.profiles.get(name).filter(|v| !v.is_null()) {
            if !overrides.is_object() {
                return Err(ConfigError::InvalidProfileOverride {
                    message: format!("profile '{name}' must be a table"),
                });
            }

            let mut base = serde_json::to_value(&self).map_err(|err| {
                ConfigError::InvalidProfileOverride {
                    message: err.to_string(),
                }
            })?;
            merge_values(&mut base, overrides);

            let profiles = std::mem::take(&mut self.profiles);
            self = serde_json::from_value(base).map_err(|err| {
                ConfigError::InvalidProfileOverride {
                    message: format!("profile '{name}': {err}"),
                }
            })?;
            self.profiles = profiles;
        }

        self.app.profile = name.to_string();
        Ok(self)
    }

    /// Hot reload runs only when enabled and the active profile is `dev`.
    pub fn hot_reload_active(&self) -> bool {
        self.hot_reload.enable && self.app.profile == DEV_PROFILE
    }

    /// Schema validation, no filesystem access.
    pub fn validate(&self) -> ConfigResult<()> {
        SchemaValidator.validate(self)
    }
}

fn merge_values(target: &mut Value, update: &Value) {
    match (target, update) {
        (Value::Object(target_map), Value::Object(update_map)) => {
            for (key, value) in update_map {
                merge_values(target_map.entry(key.clone()).or_insert(Value::Null), value);
            }
        }
        (target_slot, _) => {
            *target_slot = update.clone();
        }
    }
}
