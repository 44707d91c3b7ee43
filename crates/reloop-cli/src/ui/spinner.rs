//! Spinner for the initial build.

use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use std::time::Duration;

use super::{colors_enabled, is_interactive};

/// Spinner for tasks without a known duration.
///
/// Hidden when stderr is not a terminal or when running in CI, so piped
/// output only carries the final line.
///
/// # Examples
///
/// ```no_run
/// use reloop_cli::ui::Spinner;
///
/// let spinner = Spinner::new("Building...");
/// spinner.finish("Build finished");
/// ```
pub struct Spinner {
    pb: ProgressBar,
}

impl Spinner {
    /// Create and start a new spinner.
    pub fn new(message: &str) -> Self {
        let pb = if is_interactive() {
            ProgressBar::new_spinner()
        } else {
            ProgressBar::hidden()
        };
        let style = ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg} {elapsed:.dim}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["◐", "◓", "◑", "◒", "●"]);
        pb.set_style(style);
        pb.set_message(message.to_string());
        pb.enable_steady_tick(Duration::from_millis(100));

        Self { pb }
    }

    /// Update spinner message while it's running.
    pub fn set_message(&self, message: &str) {
        self.pb.set_message(message.to_string());
    }

    /// Clear the spinner and print a success line.
    pub fn finish(&self, message: &str) {
        self.pb.finish_and_clear();
        super::success(message);
    }

    /// Clear the spinner and print an error line.
    pub fn fail(&self, message: &str) {
        self.pb.finish_and_clear();
        super::error(message);
    }

    /// Whether the spinner is drawn at all.
    pub fn is_visible(&self) -> bool {
        !self.pb.is_hidden()
    }
}

impl Drop for Spinner {
    fn drop(&mut self) {
        if !self.pb.is_finished() {
            self.pb.finish_and_clear();
        }
    }
}

/// Format an elapsed build time the way status lines show it.
pub fn format_elapsed(elapsed: Duration) -> String {
    let ms = elapsed.as_millis();
    let text = if ms < 1000 {
        format!("{ms}ms")
    } else {
        format!("{:.2}s", elapsed.as_secs_f64())
    };
    if colors_enabled() {
        text.dimmed().to_string()
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spinner_lifecycle() {
        let spinner = Spinner::new("Building...");
        spinner.set_message("Still building...");
        spinner.finish("Build finished");
    }

    #[test]
    fn test_spinner_fail() {
        let spinner = Spinner::new("Building...");
        spinner.fail("Build failed");
    }

    #[test]
    #[serial_test::serial]
    fn test_spinner_hidden_in_ci() {
        std::env::set_var("CI", "true");
        let spinner = Spinner::new("Building...");
        assert!(!spinner.is_visible());
        std::env::remove_var("CI");
    }

    #[test]
    #[serial_test::serial]
    fn test_format_elapsed() {
        super::super::init_colors(true);
        assert_eq!(format_elapsed(Duration::from_millis(250)), "250ms");
        assert_eq!(format_elapsed(Duration::from_millis(1500)), "1.50s");
    }
}
