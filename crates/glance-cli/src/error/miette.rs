//! Miette diagnostic conversion for CLI errors.

use crate::error::CliError;
use glance_harness::HarnessError;
use miette::Report;

/// Convert CliError to miette Report
pub fn cli_error_to_miette(err: CliError) -> Report {
    match err {
        CliError::Config(e) => miette::miette!("Configuration error: {}", e),
        CliError::Harness(e) => harness_error_to_miette(e),
        _ => miette::miette!("{}", err),
    }
}

/// Convert a fatal harness error to a report with a remedy where one is known.
pub fn harness_error_to_miette(err: HarnessError) -> Report {
    match err {
        HarnessError::LaunchFailed { reason, .. } => miette::miette!(
            "Failed to launch the browser: {}\n\nHint: Install Chrome or Chromium, or set chromePath in glance.config.json",
            reason
        ),
        HarnessError::TargetUnreachable { url, reason } => miette::miette!(
            "Target {} is unreachable: {}\n\nHint: Start the dashboard first or pass the right --base-url",
            url,
            reason
        ),
        HarnessError::InvalidScenario { name, reason } => {
            miette::miette!("Invalid scenario '{}': {}", name, reason)
        }
        other => miette::miette!("{}", other),
    }
}
