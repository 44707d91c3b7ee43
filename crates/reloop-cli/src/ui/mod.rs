//! Terminal status output.
//!
//! Human-facing lines (`✓ Build finished`, `ℹ Proxy on http://...`) go to
//! stderr so the application's own stdout stays clean. Structured engine
//! events go through `tracing` instead, see [`crate::logger`].

mod messages;
mod spinner;

use std::sync::atomic::{AtomicBool, Ordering};

pub use messages::{error, info, success, warning};
pub use spinner::{format_elapsed, Spinner};

static COLORS: AtomicBool = AtomicBool::new(true);

/// Check if running in a CI environment.
pub fn is_ci() -> bool {
    ["CI", "GITHUB_ACTIONS", "GITLAB_CI", "CIRCLECI", "TRAVIS"]
        .iter()
        .any(|var| std::env::var_os(var).is_some())
}

/// Record the color decision made in `main`.
///
/// Also switches off `console` styling so the spinner follows suit.
pub fn init_colors(no_color: bool) {
    COLORS.store(!no_color, Ordering::Relaxed);
    if no_color {
        console::set_colors_enabled_stderr(false);
    }
}

pub(crate) fn colors_enabled() -> bool {
    COLORS.load(Ordering::Relaxed)
}

/// Spinners only make sense on an interactive terminal.
pub(crate) fn is_interactive() -> bool {
    console::user_attended_stderr() && !is_ci()
}
