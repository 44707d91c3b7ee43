//! Child process lifecycle: start, readiness detection and graceful stop.

use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

use super::sink::OutputSink;
use super::terminate::Terminate;
use crate::error::{EngineError, Result};

/// Grace period between the interrupt and the forced kill.
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_millis(300);

/// Everything needed to launch the child once.
#[derive(Debug, Clone)]
pub struct ProcessSpec {
    /// Binary to execute
    pub program: PathBuf,
    /// Arguments, passed through unchanged
    pub args: Vec<String>,
    /// Extra environment variables
    pub envs: Vec<(String, String)>,
    /// Working directory for the child
    pub working_dir: Option<PathBuf>,
    /// Output substring announcing a completed startup (empty: ready at spawn)
    pub ready_marker: String,
    /// Output substring announcing a completed shutdown (empty: wait for exit)
    pub shutdown_marker: String,
    /// Time allowed between the interrupt and the forced kill
    pub grace_period: Duration,
}

impl ProcessSpec {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            envs: Vec::new(),
            working_dir: None,
            ready_marker: String::new(),
            shutdown_marker: String::new(),
            grace_period: DEFAULT_GRACE_PERIOD,
        }
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }

    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn ready_marker(mut self, marker: impl Into<String>) -> Self {
        self.ready_marker = marker.into();
        self
    }

    pub fn shutdown_marker(mut self, marker: impl Into<String>) -> Self {
        self.shutdown_marker = marker.into();
        self
    }

    pub fn grace_period(mut self, grace: Duration) -> Self {
        self.grace_period = grace;
        self
    }

    /// Same launch settings, different binary (used after each rebuild).
    pub fn with_program(&self, program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            ..self.clone()
        }
    }

    fn display_name(&self) -> String {
        self.program.display().to_string()
    }
}

/// Lifecycle state of one child process handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
    NotStarted,
    Starting,
    Ready,
    Stopping,
    Stopped,
    /// Exited before readiness was observed
    Failed,
}

/// How a call to [`Supervisor::stop`] completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    /// There was no live process
    NotRunning,
    /// The shutdown marker was seen within the grace period and the process
    /// exited within a second grace period after that, so a graceful stop
    /// can take up to twice the grace period
    Graceful,
    /// The process exited within the grace period without printing the marker
    Exited,
    /// The grace period expired and the process was killed
    Forced,
}

/// The live OS process plus the sink attached to its output.
///
/// Never reused: every restart builds a new handle and the old one is
/// dropped after it has been stopped.
#[derive(Debug)]
struct ChildProcess {
    child: Child,
    sink: OutputSink,
    spec: ProcessSpec,
    state: ProcessState,
}

enum Startup {
    Ready,
    Exited(std::io::Result<ExitStatus>),
}

/// Owns at most one running child process.
#[derive(Debug, Default)]
pub struct Supervisor {
    current: Option<ChildProcess>,
}

impl Supervisor {
    pub fn new() -> Self {
        Self::default()
    }

    /// State of the current handle, `NotStarted` when there is none.
    pub fn state(&self) -> ProcessState {
        self.current
            .as_ref()
            .map_or(ProcessState::NotStarted, |handle| handle.state)
    }

    /// OS pid of the live child.
    pub fn pid(&self) -> Option<u32> {
        self.current.as_ref().and_then(|handle| handle.child.id())
    }

    /// Launch the child and wait until it is ready.
    ///
    /// Resolves when either the ready marker appears in the child's output
    /// or the child exits, whichever happens first. There is deliberately no
    /// timeout: compile-and-link time is the developer's business.
    pub async fn start(&mut self, spec: ProcessSpec) -> Result<()> {
        if self.current.is_some() {
            self.stop().await;
        }

        let program = spec.display_name();
        let mut command = Command::new(&spec.program);
        command
            .args(&spec.args)
            .envs(spec.envs.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &spec.working_dir {
            command.current_dir(dir);
        }

        debug!(program = %program, args = ?spec.args, "starting child process");
        let mut child = command.spawn().map_err(|source| EngineError::Spawn {
            program: program.clone(),
            source,
        })?;

        let sink = OutputSink::new();
        let ready = sink.arm(&spec.ready_marker);
        if let Some(stdout) = child.stdout.take() {
            tokio::spawn(sink.clone().forward(stdout, tokio::io::stdout()));
        }
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(sink.clone().forward(stderr, tokio::io::stderr()));
        }

        let mut handle = ChildProcess {
            child,
            sink,
            spec,
            state: ProcessState::Starting,
        };

        let startup = tokio::select! {
            _ = ready.seen() => Startup::Ready,
            status = handle.child.wait() => Startup::Exited(status),
        };

        match startup {
            Startup::Ready => {
                handle.state = ProcessState::Ready;
                info!(program = %program, pid = ?handle.child.id(), "child process ready");
                self.current = Some(handle);
                Ok(())
            }
            Startup::Exited(status) => {
                handle.state = ProcessState::Failed;
                let status = match status {
                    Ok(status) => status.to_string(),
                    Err(err) => err.to_string(),
                };
                warn!(program = %program, %status, "child process exited during startup");
                Err(EngineError::StartupFailure { program, status })
            }
        }
    }

    /// Stop the child: interrupt, wait for the shutdown marker for at most
    /// the grace period, then kill.
    ///
    /// A child that prints the marker gets one more grace period to exit, so
    /// the worst case before the kill is twice the grace period.
    pub async fn stop(&mut self) -> StopOutcome {
        let Some(mut handle) = self.current.take() else {
            return StopOutcome::NotRunning;
        };

        if let Ok(Some(status)) = handle.child.try_wait() {
            debug!(%status, "child process had already exited");
            handle.state = ProcessState::Stopped;
            return StopOutcome::NotRunning;
        }

        handle.state = ProcessState::Stopping;
        let grace = handle.spec.grace_period;
        let marker = handle.spec.shutdown_marker.clone();
        let done = handle.sink.arm(&marker);

        match handle.child.graceful_stop() {
            Ok(true) => {}
            Ok(false) => {
                debug!("no graceful stop on this platform, child killed");
                let _ = handle.child.wait().await;
                handle.state = ProcessState::Stopped;
                return StopOutcome::Forced;
            }
            Err(err) => warn!(%err, "failed to interrupt child process"),
        }

        let acknowledged = async {
            if marker.is_empty() {
                std::future::pending::<()>().await;
            }
            done.seen().await;
        };

        let mut outcome = tokio::select! {
            _ = acknowledged => StopOutcome::Graceful,
            _ = handle.child.wait() => StopOutcome::Exited,
            _ = tokio::time::sleep(grace) => StopOutcome::Forced,
        };

        // The marker only says cleanup is done; give the process the same
        // grace period to actually exit before pulling the plug.
        if outcome == StopOutcome::Graceful
            && tokio::time::timeout(grace, handle.child.wait()).await.is_err()
        {
            outcome = StopOutcome::Forced;
        }

        if outcome == StopOutcome::Forced {
            warn!(grace_ms = grace.as_millis() as u64, "child did not stop in time, killing it");
            if let Err(err) = handle.child.force_stop() {
                warn!(%err, "failed to kill child process");
            }
            let _ = handle.child.wait().await;
        }

        handle.state = ProcessState::Stopped;
        info!(outcome = ?outcome, "child process stopped");
        outcome
    }

    /// Wait for the live child to exit on its own.
    ///
    /// Pends forever when nothing is running, which suits `select!` loops.
    pub async fn wait_exit(&mut self) -> Option<ExitStatus> {
        match self.current.as_mut() {
            Some(handle) => {
                let status = handle.child.wait().await.ok();
                handle.state = ProcessState::Stopped;
                status
            }
            None => std::future::pending().await,
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::time::Instant;

    fn sh(script: &str) -> ProcessSpec {
        ProcessSpec::new("/bin/sh").args(["-c", script])
    }

    #[tokio::test]
    async fn test_start_waits_for_ready_marker() {
        let mut supervisor = Supervisor::new();
        let spec = sh("echo booting; sleep 0.1; echo server ready; exec sleep 30")
            .ready_marker("server ready");

        supervisor.start(spec).await.expect("child should become ready");
        assert_eq!(supervisor.state(), ProcessState::Ready);
        assert!(supervisor.pid().is_some());

        supervisor.stop().await;
        assert_eq!(supervisor.state(), ProcessState::NotStarted);
    }

    #[tokio::test]
    async fn test_start_reports_premature_exit() {
        let mut supervisor = Supervisor::new();
        let spec = sh("echo panic: boom >&2; exit 3").ready_marker("server ready");

        let started = Instant::now();
        let err = supervisor.start(spec).await.unwrap_err();
        assert!(matches!(err, EngineError::StartupFailure { .. }));
        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(supervisor.state(), ProcessState::NotStarted);
    }

    #[tokio::test]
    async fn test_start_missing_binary() {
        let mut supervisor = Supervisor::new();
        let err = supervisor
            .start(ProcessSpec::new("/definitely/not/here"))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Spawn { .. }));
    }

    #[tokio::test]
    async fn test_stop_without_process_is_noop() {
        let mut supervisor = Supervisor::new();
        assert_eq!(supervisor.stop().await, StopOutcome::NotRunning);
    }

    #[tokio::test]
    async fn test_stop_graceful_on_shutdown_marker() {
        let mut supervisor = Supervisor::new();
        let spec = sh(
            "trap 'echo shutdown complete; exit 0' INT; echo ready; while :; do sleep 0.05; done",
        )
        .ready_marker("ready")
        .shutdown_marker("shutdown complete")
        .grace_period(Duration::from_secs(2));

        supervisor.start(spec).await.unwrap();
        let outcome = supervisor.stop().await;
        assert_eq!(outcome, StopOutcome::Graceful);
    }

    #[tokio::test]
    async fn test_stop_forces_after_grace_period() {
        let mut supervisor = Supervisor::new();
        let grace = Duration::from_millis(300);
        let spec = sh("trap '' INT; echo ready; exec sleep 30")
            .ready_marker("ready")
            .shutdown_marker("shutdown complete")
            .grace_period(grace);

        supervisor.start(spec).await.unwrap();
        let started = Instant::now();
        let outcome = supervisor.stop().await;
        let elapsed = started.elapsed();

        assert_eq!(outcome, StopOutcome::Forced);
        assert!(elapsed >= grace);
        assert!(elapsed < grace + Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_marker_without_exit_is_killed_within_two_grace_periods() {
        let mut supervisor = Supervisor::new();
        let grace = Duration::from_millis(1000);
        let spec = sh(
            "trap 'echo shutdown complete' INT; echo ready; while :; do sleep 0.05; done",
        )
        .ready_marker("ready")
        .shutdown_marker("shutdown complete")
        .grace_period(grace);

        supervisor.start(spec).await.unwrap();
        let started = Instant::now();
        let outcome = supervisor.stop().await;
        let elapsed = started.elapsed();

        assert_eq!(outcome, StopOutcome::Forced);
        assert!(elapsed >= grace, "{elapsed:?}");
        assert!(elapsed < grace * 2, "{elapsed:?}");
    }

    #[tokio::test]
    async fn test_stop_when_child_exits_without_marker() {
        let mut supervisor = Supervisor::new();
        let spec = sh("echo ready; exec sleep 30")
            .ready_marker("ready")
            .shutdown_marker("shutdown complete")
            .grace_period(Duration::from_secs(2));

        supervisor.start(spec).await.unwrap();
        // Default SIGINT disposition terminates sleep
        assert_eq!(supervisor.stop().await, StopOutcome::Exited);
    }

    #[tokio::test]
    async fn test_restart_replaces_handle() {
        let mut supervisor = Supervisor::new();
        let spec = sh("echo ready; exec sleep 30").ready_marker("ready");

        supervisor.start(spec.clone()).await.unwrap();
        let first = supervisor.pid();
        supervisor.start(spec).await.unwrap();
        let second = supervisor.pid();

        assert!(first.is_some() && second.is_some());
        assert_ne!(first, second);
        supervisor.stop().await;
    }
}
