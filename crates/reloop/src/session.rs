//! One `run` invocation: listener, child, watcher and their teardown.

use std::future::Future;
use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;
use tracing::{info, warn};

use crate::change::ChangeSignal;
use crate::error::Result;
use crate::process::ProcessSpec;
use crate::proxy::{self, Backend, FrontEnd, TlsFiles};
use crate::reload::{Rebuild, Reloader, DEFAULT_PORT_WAIT};
use crate::watcher::{FileWatcher, WatchFilter};

/// Everything a [`Session`] needs, resolved from project configuration.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Address clients connect to
    pub address: SocketAddr,
    /// Loopback port the child listens on
    pub backend_port: u16,
    /// Serve (and talk to the child over) TLS
    pub tls: Option<TlsFiles>,
    /// Project root; the watcher observes this tree
    pub base_dir: PathBuf,
    /// Directory handed to the rebuild collaborator
    pub entry_dir: PathBuf,
    /// Child template: args, env, markers and grace period
    pub process: ProcessSpec,
    /// Extra directory exclusions (names or root-relative prefixes)
    pub exclude_dirs: Vec<String>,
    /// Extra file exclusion globs
    pub exclude_files: Vec<String>,
    /// Files rewritten by every rebuild (generated entry point, the binary)
    pub exclude_paths: Vec<PathBuf>,
    /// Bound on the post-start port poll
    pub port_wait: Duration,
}

impl SessionConfig {
    pub fn new(address: SocketAddr, backend_port: u16, base_dir: impl Into<PathBuf>) -> Self {
        let base_dir = base_dir.into();
        Self {
            address,
            backend_port,
            tls: None,
            entry_dir: base_dir.clone(),
            base_dir,
            process: ProcessSpec::new(""),
            exclude_dirs: Vec::new(),
            exclude_files: Vec::new(),
            exclude_paths: Vec::new(),
            port_wait: DEFAULT_PORT_WAIT,
        }
    }
}

pub struct Session {
    config: SessionConfig,
    rebuilder: Arc<dyn Rebuild>,
}

impl Session {
    pub fn new(config: SessionConfig, rebuilder: Arc<dyn Rebuild>) -> Self {
        Self { config, rebuilder }
    }

    /// Run until `shutdown` resolves.
    ///
    /// The listener is bound before the first build so a busy port fails
    /// fast. A failing initial build ends the session; later failures are
    /// reported to the requesting client instead.
    pub async fn run<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let config = self.config;
        tokio::pin!(shutdown);

        let (acceptor, backend) = match &config.tls {
            Some(files) => (
                Some(proxy::acceptor(files)?),
                Backend::new(config.backend_port).with_tls(proxy::backend_connector()?),
            ),
            None => (None, Backend::new(config.backend_port)),
        };

        let front = FrontEnd::bind(config.address, acceptor).await?;
        let scheme = front.scheme();
        info!(
            url = %format!("{scheme}://{}", front.local_addr()),
            backend = %backend.addr(),
            "proxy listening"
        );

        let signal = ChangeSignal::new();
        let reloader = Arc::new(
            Reloader::new(
                self.rebuilder,
                config.process.clone(),
                config.entry_dir.clone(),
                backend,
                signal.clone(),
            )
            .port_wait(config.port_wait),
        );

        tokio::select! {
            res = reloader.launch() => {
                if let Err(err) = res {
                    reloader.shutdown().await;
                    return Err(err);
                }
            }
            _ = &mut shutdown => {
                info!("interrupted during initial build");
                reloader.shutdown().await;
                return Ok(());
            }
        }

        let mut filter = WatchFilter::new(
            &config.base_dir,
            &config.exclude_dirs,
            &config.exclude_files,
        )?;
        for path in &config.exclude_paths {
            filter = filter.exclude_path(path);
        }
        let watcher = match FileWatcher::start(filter, signal) {
            Ok(watcher) => watcher,
            Err(err) => {
                reloader.shutdown().await;
                return Err(err);
            }
        };

        let (close_tx, close_rx) = oneshot::channel::<()>();
        let router = proxy::router(reloader.clone(), scheme);
        let server = tokio::spawn(front.serve(router, async move {
            let _ = close_rx.await;
        }));

        shutdown.await;
        info!("shutting down");

        watcher.stop().await;
        let outcome = reloader.shutdown().await;
        info!(?outcome, "child stopped");
        let _ = close_tx.send(());
        if let Err(err) = server.await {
            warn!(%err, "listener task ended abnormally");
        }
        Ok(())
    }

    /// Run until Ctrl+C or, on Unix, SIGTERM.
    pub async fn run_until_signal(self) -> Result<()> {
        self.run(shutdown_signal()).await
    }
}

/// Resolves on the first interrupt or termination request.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(%err, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                warn!(%err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

/// Reserve an unused loopback port for the child.
///
/// The port is released before the child binds it, so another process could
/// grab it in between; on a developer machine that is rare enough to accept.
pub fn pick_backend_port() -> Result<u16> {
    let listener = std::net::TcpListener::bind((Ipv4Addr::LOCALHOST, 0))?;
    Ok(listener.local_addr()?.port())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pick_backend_port_is_usable() {
        let port = pick_backend_port().unwrap();
        assert_ne!(port, 0);
        std::net::TcpListener::bind((Ipv4Addr::LOCALHOST, port)).unwrap();
    }

    #[test]
    fn test_config_defaults() {
        let config = SessionConfig::new("127.0.0.1:8080".parse().unwrap(), 4000, "/srv/blog");
        assert_eq!(config.entry_dir, PathBuf::from("/srv/blog"));
        assert_eq!(config.port_wait, DEFAULT_PORT_WAIT);
        assert!(config.tls.is_none());
    }
}
