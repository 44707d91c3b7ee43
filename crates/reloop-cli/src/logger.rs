//! Logging setup for the reloop CLI.
//!
//! Engine lifecycle events (`proxy listening`, `change detected`, `rebuilding`,
//! child start and stop) are emitted through `tracing`; this module installs
//! the subscriber that prints them.
//!
//! # Example
//!
//! ```rust,no_run
//! use reloop_cli::logger::init_logger;
//!
//! init_logger(false, false, false);
//! tracing::info!("ready");
//! ```

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const VERBOSE_FILTER: &str = "reloop=debug,reloop_config=debug,reloop_cli=debug,tower_http=debug";
const QUIET_FILTER: &str = "reloop=error,reloop_cli=error";
const DEFAULT_FILTER: &str = "reloop=info,reloop_config=info,reloop_cli=info";

/// Initialize the tracing subscriber.
///
/// The level is chosen in this order:
/// 1. `--verbose`: DEBUG for reloop crates, plus request traces
/// 2. `--quiet`: errors only
/// 3. `RUST_LOG` if set
/// 4. INFO for reloop crates
pub fn init_logger(verbose: bool, quiet: bool, no_color: bool) {
    init_logger_with_filter(filter_for(verbose, quiet), no_color);
}

/// Initialize logger with a custom environment filter.
pub fn init_logger_with_filter(filter: EnvFilter, no_color: bool) {
    let fmt_layer = fmt::layer()
        .with_target(false)
        .with_level(true)
        .with_ansi(!no_color)
        .with_writer(std::io::stderr)
        .compact();

    // A second init (tests, embedding) keeps the first subscriber
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init();
}

fn filter_for(verbose: bool, quiet: bool) -> EnvFilter {
    if verbose {
        EnvFilter::new(VERBOSE_FILTER)
    } else if quiet {
        EnvFilter::new(QUIET_FILTER)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
    }
}

/// Whether colored output should be used, honoring `NO_COLOR` and `FORCE_COLOR`.
pub fn should_use_colors() -> bool {
    if std::env::var_os("NO_COLOR").is_some() {
        return false;
    }
    if std::env::var_os("FORCE_COLOR").is_some() {
        return true;
    }
    console::Term::stderr().features().colors_supported()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_filters_parse() {
        let _ = EnvFilter::new(VERBOSE_FILTER);
        let _ = EnvFilter::new(QUIET_FILTER);
        let _ = EnvFilter::new(DEFAULT_FILTER);
    }

    #[test]
    fn test_verbose_wins_over_rust_log() {
        let filter = filter_for(true, false);
        assert!(filter.to_string().contains("reloop=debug"));
    }

    #[test]
    fn test_quiet_filter() {
        let filter = filter_for(false, true);
        assert!(filter.to_string().contains("reloop=error"));
    }

    #[test]
    #[serial]
    fn test_should_use_colors_respects_env() {
        std::env::remove_var("NO_COLOR");
        std::env::set_var("FORCE_COLOR", "1");
        assert!(should_use_colors());

        std::env::set_var("NO_COLOR", "1");
        assert!(!should_use_colors());

        std::env::remove_var("NO_COLOR");
        std::env::remove_var("FORCE_COLOR");
    }

    #[test]
    fn test_double_init_does_not_panic() {
        init_logger(false, true, true);
        init_logger(true, false, true);
    }
}
