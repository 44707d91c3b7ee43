//! Configuration for the CLI.
//!
//! Sources are layered in this order, later ones winning:
//! `reloop.toml` → the active profile's overrides → `RELOOP_*` environment
//! variables → command-line flags.
//!
//! The resolved [`ReloopConfig`] is then translated into the engine's types
//! (`SessionConfig`, `ProcessSpec`) by the helpers in this module.

mod engine;
mod loading;
mod tests;

pub use engine::{
    binary_path, entry_dir, listen_addr, process_spec, session_config, tls_files, watch_excludes,
};
pub use loading::{load_config, Overrides, ENV_PREFIX};
pub use reloop_config::{ReloopConfig, CONFIG_FILE, DEV_PROFILE};
