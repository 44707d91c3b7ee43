//! Error taxonomy for the hot-reload engine.
//!
//! Only the variants raised inside the rebuild-restart critical section
//! (`RebuildFailure`, `StartupFailure`, `BackendUnavailable`) are expected
//! during normal development; the proxy turns them into client-visible
//! responses instead of ending the session.

use std::io;
use std::net::SocketAddr;

use thiserror::Error;

use crate::reload::RebuildError;

/// Errors produced by the engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The child exited before announcing readiness
    #[error("{program} exited before it was ready ({status})")]
    StartupFailure {
        /// Program that was started
        program: String,
        /// Exit status as reported by the OS
        status: String,
    },

    /// The rebuild collaborator reported an error (typically a compile error)
    #[error("rebuild failed:\n{0}")]
    RebuildFailure(#[from] RebuildError),

    /// The child started but its port never accepted connections
    #[error("backend at {addr} did not accept connections within {waited_ms}ms")]
    BackendUnavailable { addr: SocketAddr, waited_ms: u64 },

    /// The session is ending; no child will be started again
    #[error("session is shutting down")]
    ShuttingDown,

    /// The accepted connection cannot be taken over as a raw stream
    #[error("tunneling is not supported on this connection")]
    TunnelUnsupported,

    /// The child binary could not be spawned at all
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    /// The front-end listener could not be bound
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    /// File watcher errors
    #[error("file watcher error: {0}")]
    Watch(#[from] notify::Error),

    /// Invalid file exclusion glob
    #[error("invalid exclude pattern: {0}")]
    Pattern(#[from] globset::Error),

    /// Certificate loading or handshake setup failed
    #[error("TLS error: {0}")]
    Tls(String),

    /// HTTP protocol errors talking to the backend
    #[error("proxy error: {0}")]
    Proxy(#[from] hyper::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl EngineError {
    /// Whether the error came out of a rebuild-restart cycle and should be
    /// retried on the next request rather than treated as fatal.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            EngineError::StartupFailure { .. }
                | EngineError::RebuildFailure(_)
                | EngineError::BackendUnavailable { .. }
                | EngineError::Spawn { .. }
        )
    }
}

pub type Result<T, E = EngineError> = std::result::Result<T, E>;
