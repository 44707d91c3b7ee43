//! Translation from `ReloopConfig` into engine types.

use std::net::{SocketAddr, ToSocketAddrs};
use std::path::{Path, PathBuf};
use std::time::Duration;

use reloop::{ProcessSpec, SessionConfig, TlsFiles};
use reloop_config::{ConfigError, ReloopConfig};

use crate::error::Result;

/// Loopback address handed to the application in hot-reload mode.
const BACKEND_ADDRESS: &str = "127.0.0.1";

/// Socket address clients connect to.
pub fn listen_addr(config: &ReloopConfig) -> Result<SocketAddr> {
    let server = &config.server;
    let invalid = |detail: String| ConfigError::InvalidValue {
        field: "server.address".to_string(),
        hint: Some(detail),
    };

    let mut addrs = (server.address.as_str(), server.port)
        .to_socket_addrs()
        .map_err(|e| invalid(format!("cannot resolve {}: {e}", server.display_addr())))?;
    addrs
        .next()
        .ok_or_else(|| invalid(format!("{} resolves to no address", server.address)).into())
}

/// Directory the build command runs in.
pub fn entry_dir(config: &ReloopConfig, root: &Path) -> PathBuf {
    root.join(&config.build.entry_dir)
}

/// Where the build command leaves the binary.
pub fn binary_path(config: &ReloopConfig, root: &Path) -> PathBuf {
    root.join(&config.build.binary)
}

pub fn tls_files(config: &ReloopConfig, root: &Path) -> Option<TlsFiles> {
    let tls = config.server.tls.as_ref()?;
    Some(TlsFiles {
        cert: root.join(tls.cert.as_ref()?),
        key: root.join(tls.key.as_ref()?),
    })
}

/// Launch template for the application listening on `address:port`.
///
/// The program is the configured binary; in hot-reload mode the engine
/// swaps in whatever path each rebuild reports.
pub fn process_spec(config: &ReloopConfig, root: &Path, address: &str, port: u16) -> ProcessSpec {
    let run = &config.run;
    let mut envs: Vec<_> = run.env.iter().collect();
    envs.sort();

    let mut spec = ProcessSpec::new(binary_path(config, root))
        .args(run.render_args(port, &config.app.profile, address))
        .working_dir(root)
        .ready_marker(run.ready_marker.clone())
        .shutdown_marker(run.shutdown_marker.clone())
        .grace_period(Duration::from_millis(run.grace_period_ms));
    for (key, value) in envs {
        spec = spec.env(key.clone(), value.clone());
    }
    spec
}

/// Directory exclusions for the watcher: configured ones plus the build
/// output directory.
pub fn watch_excludes(config: &ReloopConfig) -> Vec<String> {
    let mut dirs = config.hot_reload.exclude_dirs.clone();
    let output = config.build.output_dir.to_string_lossy();
    let output = output.trim_start_matches("./").trim_matches('/');
    if !output.is_empty() && output != "." && !dirs.iter().any(|d| d == output) {
        dirs.push(output.to_string());
    }
    dirs
}

/// Everything the hot-reload session needs, with the application on
/// `backend_port`.
pub fn session_config(
    config: &ReloopConfig,
    root: &Path,
    backend_port: u16,
) -> Result<SessionConfig> {
    let mut session = SessionConfig::new(listen_addr(config)?, backend_port, root);
    session.tls = tls_files(config, root);
    session.entry_dir = entry_dir(config, root);
    session.process = process_spec(config, root, BACKEND_ADDRESS, backend_port);
    session.exclude_dirs = watch_excludes(config);
    session.exclude_files = config.hot_reload.exclude_files.clone();
    session.exclude_paths = config
        .build
        .generated_entry
        .iter()
        .chain(std::iter::once(&config.build.binary))
        .cloned()
        .collect();
    session.port_wait = Duration::from_millis(config.run.port_wait_ms);
    Ok(session)
}
