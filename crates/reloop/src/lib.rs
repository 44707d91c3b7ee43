//! # reloop
//!
//! Hot-reload engine for compiled applications.
//!
//! A [`Session`] keeps one locally running child binary in sync with the
//! developer's edits. It puts a reverse proxy in front of the binary, watches
//! the project tree, and rebuilds/restarts the child lazily: the first request
//! that arrives after a change pays for the rebuild, every other request is
//! forwarded straight through.
//!
//! Components, leaves first:
//!
//! - [`process::OutputSink`] - write-through child output with marker detection
//! - [`process::Supervisor`] - start/readiness/graceful-stop of the child
//! - [`watcher::FileWatcher`] - directory watches feeding the [`ChangeSignal`]
//! - [`proxy::FrontEnd`] - HTTP reverse proxy plus raw tunnels for upgrades
//! - [`Session`] - wires everything together for one `run` invocation

pub mod change;
pub mod error;
pub mod process;
pub mod proxy;
pub mod reload;
pub mod session;
pub mod watcher;

pub use change::ChangeSignal;
pub use error::{EngineError, Result};
pub use process::{OutputSink, ProcessSpec, ProcessState, StopOutcome, Supervisor};
pub use proxy::{Backend, FrontEnd, TlsFiles};
pub use reload::{Rebuild, RebuildError, Reloader};
pub use session::{pick_backend_port, shutdown_signal, Session, SessionConfig};
pub use watcher::{FileWatcher, WatchFilter, DEFAULT_EXCLUDE_DIRS};
