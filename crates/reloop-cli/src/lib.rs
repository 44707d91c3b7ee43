//! reloop CLI - a hot-reload dev loop for compiled server applications.
//!
//! The CLI wires project configuration (`reloop.toml`) to the `reloop`
//! engine: a front-end proxy that rebuilds and restarts the server binary
//! on the first request after a source change.
//!
//! # Architecture
//!
//! - [`cli`] - Argument parsing with clap
//! - [`config`] - Layered configuration loading (file, profile, environment, flags)
//! - [`commands`] - `run` and `check` implementations
//! - [`rebuild`] - The build-command collaborator handed to the engine
//! - [`error`] - CLI error type and miette conversion
//! - [`logger`] - tracing subscriber setup
//! - [`ui`] - Terminal status output

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod logger;
pub mod rebuild;
pub mod ui;

pub use error::{CliError, Result, ResultExt};
pub use rebuild::CommandRebuilder;
