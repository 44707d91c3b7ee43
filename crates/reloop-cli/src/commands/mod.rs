//! Command implementations.
//!
//! - [`run`] - Build and run the application, hot-reloading in the dev profile
//! - [`check`] - Configuration validation
//!
//! Each command exposes an `execute` function taking its parsed arguments.

pub mod check;
pub mod run;
pub(crate) mod utils;

pub use check::execute as check_execute;
pub use run::execute as run_execute;
