//! Logging infrastructure for the glance CLI.
//!
//! The harness logs through `tracing`; this module installs the subscriber
//! that prints those events to stderr, next to the run summary.
//!
//! # Example
//!
//! ```rust,no_run
//! use glance_cli::logger::init_logger;
//! use tracing::info;
//!
//! init_logger(false, false, false);
//! info!("Running 3 scenarios");
//! ```

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Crates whose events are shown by default.
const CRATES: &[&str] = &["glance", "glance_cli", "glance_harness"];

/// Builds a filter directive setting every glance crate to `level`.
fn directives(level: &str) -> String {
    CRATES
        .iter()
        .map(|krate| format!("{krate}={level}"))
        .collect::<Vec<_>>()
        .join(",")
}

/// Selects the log filter.
///
/// The level is determined in this order:
/// 1. `--verbose`: DEBUG for glance crates
/// 2. `--quiet`: ERROR only
/// 3. `RUST_LOG`: custom filter
/// 4. Default: INFO for glance crates
pub fn filter(verbose: bool, quiet: bool) -> EnvFilter {
    if verbose {
        EnvFilter::new(directives("debug"))
    } else if quiet {
        EnvFilter::new(directives("error"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directives("info")))
    }
}

/// Initialize the tracing subscriber with the specified options.
///
/// Call once at the start of the program, before any logging occurs.
pub fn init_logger(verbose: bool, quiet: bool, no_color: bool) {
    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_level(true)
        .with_ansi(!no_color && crate::ui::should_use_color())
        .compact();

    tracing_subscriber::registry()
        .with(filter(verbose, quiet))
        .with(fmt_layer)
        .init();
}
