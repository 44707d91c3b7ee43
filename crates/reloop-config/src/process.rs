//! Build and run configuration for the supervised application.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// How to produce the application binary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Program and arguments, run in `entry_dir`
    #[serde(default)]
    pub command: Vec<String>,

    /// Binary produced by `command`, relative to the project root
    #[serde(default)]
    pub binary: PathBuf,

    #[serde(default = "default_entry_dir")]
    pub entry_dir: PathBuf,

    /// Build output, never watched
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Source file regenerated by every build, never watched
    #[serde(default)]
    pub generated_entry: Option<PathBuf>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            command: Vec::new(),
            binary: PathBuf::new(),
            entry_dir: default_entry_dir(),
            output_dir: default_output_dir(),
            generated_entry: None,
        }
    }
}

/// How to start and stop the application binary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Arguments passed to the binary; `{port}`, `{profile}` and `{address}`
    /// are substituted at start
    #[serde(default)]
    pub args: Vec<String>,

    #[serde(default)]
    pub ready_marker: String,

    #[serde(default)]
    pub shutdown_marker: String,

    #[serde(default = "default_grace_period_ms")]
    pub grace_period_ms: u64,

    #[serde(default = "default_port_wait_ms")]
    pub port_wait_ms: u64,

    #[serde(default)]
    pub env: HashMap<String, String>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            args: Vec::new(),
            ready_marker: String::new(),
            shutdown_marker: String::new(),
            grace_period_ms: default_grace_period_ms(),
            port_wait_ms: default_port_wait_ms(),
            env: HashMap::new(),
        }
    }
}

impl RunConfig {
    /// Arguments with placeholders filled in.
    pub fn render_args(&self, port: u16, profile: &str, address: &str) -> Vec<String> {
        let port = port.to_string();
        self.args
            .iter()
            .map(|arg| {
                arg.replace("{port}", &port)
                    .replace("{profile}", profile)
                    .replace("{address}", address)
            })
            .collect()
    }
}

/// Watch settings for the hot-reload loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HotReloadConfig {
    #[serde(default = "default_enable")]
    pub enable: bool,

    /// Directory names, or root-relative paths, to ignore
    #[serde(default)]
    pub exclude_dirs: Vec<String>,

    /// File globs to ignore
    #[serde(default)]
    pub exclude_files: Vec<String>,
}

impl Default for HotReloadConfig {
    fn default() -> Self {
        Self {
            enable: default_enable(),
            exclude_dirs: Vec::new(),
            exclude_files: Vec::new(),
        }
    }
}

fn default_entry_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("build")
}

fn default_grace_period_ms() -> u64 {
    300
}

fn default_port_wait_ms() -> u64 {
    10_000
}

fn default_enable() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_args_substitutes_placeholders() {
        let run = RunConfig {
            args: vec![
                "-profile".into(),
                "{profile}".into(),
                "-listen".into(),
                "{address}:{port}".into(),
                "-v".into(),
            ],
            ..RunConfig::default()
        };

        let args = run.render_args(40123, "dev", "127.0.0.1");
        assert_eq!(args, ["-profile", "dev", "-listen", "127.0.0.1:40123", "-v"]);
    }

    #[test]
    fn render_args_without_placeholders_is_identity() {
        let run = RunConfig {
            args: vec!["--config".into(), "conf/app.toml".into()],
            ..RunConfig::default()
        };
        assert_eq!(run.render_args(1, "prod", "0.0.0.0"), run.args);
    }
}
