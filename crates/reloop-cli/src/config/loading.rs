use std::path::Path;

use figment::{
    providers::{Env, Serialized},
    Figment,
};
use reloop_config::{ConfigDiscovery, ConfigError, ReloopConfig};
use serde_json::{json, Value};
use tracing::debug;

use crate::cli::{CheckArgs, RunArgs};
use crate::error::Result;

/// Prefix for environment overrides; `__` separates nested keys, so
/// `RELOOP_SERVER__PORT=9000` sets `server.port`.
pub const ENV_PREFIX: &str = "RELOOP_";

/// Values given on the command line.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub profile: Option<String>,
    pub port: Option<u16>,
    pub no_hot_reload: bool,
}

impl From<&RunArgs> for Overrides {
    fn from(args: &RunArgs) -> Self {
        Self {
            profile: args.profile.clone(),
            port: args.port,
            no_hot_reload: args.no_hot_reload,
        }
    }
}

impl From<&CheckArgs> for Overrides {
    fn from(args: &CheckArgs) -> Self {
        Self {
            profile: args.profile.clone(),
            ..Self::default()
        }
    }
}

impl Overrides {
    fn to_value(&self) -> Value {
        let mut value = json!({});
        if let Some(port) = self.port {
            value["server"] = json!({ "port": port });
        }
        if self.no_hot_reload {
            value["hot_reload"] = json!({ "enable": false });
        }
        value
    }
}

fn env_provider() -> Env {
    Env::prefixed(ENV_PREFIX).split("__")
}

/// Load `reloop.toml` from `root` and apply profile, environment and flags.
///
/// The profile is chosen by `--profile`, then `RELOOP_APP__PROFILE`, then
/// `app.profile` in the file.
pub fn load_config(root: &Path, overrides: &Overrides) -> Result<ReloopConfig> {
    let document = ConfigDiscovery::new(root).load_value()?;
    let base = ReloopConfig::from_value(document)?;

    let profile = overrides
        .profile
        .clone()
        .or_else(|| {
            Figment::from(env_provider())
                .extract_inner::<String>("app.profile")
                .ok()
        })
        .unwrap_or_else(|| base.app.profile.clone());

    let profiled = base.materialize_profile(Some(&profile))?;
    let profiles = profiled.profiles.clone();

    let mut config: ReloopConfig = Figment::new()
        .merge(Serialized::defaults(&profiled))
        .merge(env_provider())
        .merge(Serialized::defaults(overrides.to_value()))
        .extract()
        .map_err(|e| ConfigError::InvalidValue {
            field: "configuration".to_string(),
            hint: Some(format!(
                "{e}\nCheck reloop.toml and any {ENV_PREFIX}* environment variables"
            )),
        })?;

    config.profiles = profiles;
    config.app.profile = profile;

    debug!(
        profile = %config.app.profile,
        hot_reload = config.hot_reload_active(),
        "configuration loaded"
    );
    Ok(config)
}
