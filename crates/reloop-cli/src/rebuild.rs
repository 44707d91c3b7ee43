//! The build step handed to the engine: run the configured command.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Instant;

use async_trait::async_trait;
use reloop::{Rebuild, RebuildError};
use reloop_config::ReloopConfig;
use tokio::process::Command;
use tracing::{debug, info};

use crate::config::binary_path;

/// Runs `build.command` and reports `build.binary` on success.
///
/// The command's combined output becomes the failure detail, so a compile
/// error shows up verbatim in the browser and on the terminal.
#[derive(Debug, Clone)]
pub struct CommandRebuilder {
    command: Vec<String>,
    binary: PathBuf,
}

impl CommandRebuilder {
    pub fn new(command: Vec<String>, binary: impl Into<PathBuf>) -> Self {
        Self {
            command,
            binary: binary.into(),
        }
    }

    pub fn from_config(config: &ReloopConfig, root: &Path) -> Self {
        Self::new(config.build.command.clone(), binary_path(config, root))
    }
}

#[async_trait]
impl Rebuild for CommandRebuilder {
    async fn rebuild(&self, entry_dir: &Path) -> Result<PathBuf, RebuildError> {
        let (program, args) = self
            .command
            .split_first()
            .ok_or_else(|| RebuildError::new("build command is empty"))?;

        debug!(command = %self.command.join(" "), dir = %entry_dir.display(), "running build");
        let started = Instant::now();
        let output = Command::new(program)
            .args(args)
            .current_dir(entry_dir)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| RebuildError::new(format!("failed to run {program}: {e}")))?;

        if !output.status.success() {
            let mut detail = String::from_utf8_lossy(&output.stderr).trim_end().to_string();
            let stdout = String::from_utf8_lossy(&output.stdout);
            let stdout = stdout.trim_end();
            if !stdout.is_empty() {
                if !detail.is_empty() {
                    detail.push('\n');
                }
                detail.push_str(stdout);
            }
            if detail.is_empty() {
                detail = format!("{program} exited with {}", output.status);
            }
            return Err(RebuildError::new(detail));
        }

        if !self.binary.is_file() {
            return Err(RebuildError::new(format!(
                "build succeeded but {} was not produced",
                self.binary.display()
            )));
        }

        info!(elapsed_ms = started.elapsed().as_millis() as u64, "build finished");
        Ok(self.binary.clone())
    }
}
