//! The rebuild-restart critical section.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, error, info};

use crate::change::ChangeSignal;
use crate::error::{EngineError, Result};
use crate::process::{ProcessSpec, StopOutcome, Supervisor};
use crate::proxy::Backend;

const PORT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Default bound on how long a restarted child may take to open its port.
pub const DEFAULT_PORT_WAIT: Duration = Duration::from_secs(10);

/// Failure reported by a [`Rebuild`] implementation, usually compiler output.
#[derive(Debug, Clone, Error)]
#[error("{detail}")]
pub struct RebuildError {
    detail: String,
}

impl RebuildError {
    pub fn new(detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
        }
    }

    pub fn detail(&self) -> &str {
        &self.detail
    }
}

/// Produces a fresh binary from the project sources.
///
/// Called once at session start and again for every consumed change. Must
/// tolerate being called repeatedly, and must regenerate anything derived
/// from the sources before compiling.
#[async_trait]
pub trait Rebuild: Send + Sync {
    async fn rebuild(&self, entry_dir: &Path) -> std::result::Result<PathBuf, RebuildError>;
}

/// Serializes rebuilds and owns the supervised child.
pub struct Reloader {
    supervisor: Mutex<Supervisor>,
    rebuilder: Arc<dyn Rebuild>,
    signal: ChangeSignal,
    template: ProcessSpec,
    entry_dir: PathBuf,
    backend: Backend,
    port_wait: Duration,
    /// Set under the supervisor lock by [`Reloader::shutdown`]
    closed: AtomicBool,
}

impl Reloader {
    /// `template` carries everything about the child except the binary,
    /// which comes from each rebuild.
    pub fn new(
        rebuilder: Arc<dyn Rebuild>,
        template: ProcessSpec,
        entry_dir: impl Into<PathBuf>,
        backend: Backend,
        signal: ChangeSignal,
    ) -> Self {
        Self {
            supervisor: Mutex::new(Supervisor::new()),
            rebuilder,
            signal,
            template,
            entry_dir: entry_dir.into(),
            backend,
            port_wait: DEFAULT_PORT_WAIT,
            closed: AtomicBool::new(false),
        }
    }

    pub fn port_wait(mut self, limit: Duration) -> Self {
        self.port_wait = limit;
        self
    }

    pub fn signal(&self) -> &ChangeSignal {
        &self.signal
    }

    pub fn backend(&self) -> &Backend {
        &self.backend
    }

    /// Initial build and start. Errors here are not retried.
    pub async fn launch(&self) -> Result<()> {
        let mut supervisor = self.supervisor.lock().await;
        if self.closed.load(Ordering::SeqCst) {
            return Err(EngineError::ShuttingDown);
        }
        self.restart(&mut supervisor).await
    }

    /// Make sure the child reflects the latest sources before a request is
    /// served.
    ///
    /// Without a pending change this returns at once, unless a rebuild is
    /// in flight, in which case it waits for that rebuild instead of
    /// starting another. On failure the change stays pending so the next
    /// request tries again. After [`Reloader::shutdown`] no child is ever
    /// started again and a pending change yields [`EngineError::ShuttingDown`].
    pub async fn ensure_fresh(&self) -> Result<()> {
        if !self.signal.is_raised() && self.supervisor.try_lock().is_ok() {
            return Ok(());
        }

        let mut supervisor = self.supervisor.lock().await;
        if self.closed.load(Ordering::SeqCst) {
            return Err(EngineError::ShuttingDown);
        }
        if !self.signal.take() {
            // Rebuilt by whoever held the lock before us
            return Ok(());
        }

        match self.restart(&mut supervisor).await {
            Ok(()) => Ok(()),
            Err(err) => {
                self.signal.raise();
                error!(error = %err, "reload failed, will retry on next request");
                Err(err)
            }
        }
    }

    async fn restart(&self, supervisor: &mut Supervisor) -> Result<()> {
        let started = Instant::now();

        let outcome = supervisor.stop().await;
        if outcome != StopOutcome::NotRunning {
            debug!(?outcome, "previous child stopped");
        }

        info!(entry_dir = %self.entry_dir.display(), "rebuilding");
        let binary = self.rebuilder.rebuild(&self.entry_dir).await?;
        debug!(
            binary = %binary.display(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "rebuild finished"
        );

        let spec = self.template.with_program(&binary);
        supervisor.start(spec).await?;

        let accepting = self
            .backend
            .wait_until_accepting(PORT_POLL_INTERVAL, self.port_wait);
        tokio::select! {
            res = accepting => res?,
            status = supervisor.wait_exit() => {
                return Err(EngineError::StartupFailure {
                    program: binary.display().to_string(),
                    status: status.map_or_else(|| "unknown status".to_string(), |s| s.to_string()),
                });
            }
        }

        info!(
            backend = %self.backend.addr(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "child ready"
        );
        Ok(())
    }

    /// Stop the child for good. Later [`Reloader::launch`] and
    /// [`Reloader::ensure_fresh`] calls refuse to start a new one.
    pub async fn shutdown(&self) -> StopOutcome {
        let mut supervisor = self.supervisor.lock().await;
        self.closed.store(true, Ordering::SeqCst);
        supervisor.stop().await
    }
}
