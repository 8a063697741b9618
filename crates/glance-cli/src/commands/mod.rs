//! Command implementations for the glance CLI.
//!
//! - [`run`] - Run scenarios against a dashboard
//! - [`list`] - List the built-in scenario sets
//! - [`show`] - Summarize a persisted report
//!
//! Each command provides an `execute` function that returns the
//! [`Outcome`] the process exits with. Errors are framework failures and
//! exit with [`EXIT_FATAL`].

pub mod list;
pub mod run;
pub mod show;

use glance_harness::Report;
use std::process::ExitCode;

pub use list::execute as list_execute;
pub use run::execute as run_execute;
pub use show::execute as show_execute;

/// Exit code for runs that could not complete (launch failure, unreachable
/// target, configuration error).
pub const EXIT_FATAL: u8 = 2;

/// Verdict of a completed command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Every scenario passed (or nothing was run).
    Passed,
    /// At least one scenario failed.
    Failed,
}

impl Outcome {
    /// Process exit code: 0 or 1.
    pub fn exit_code(self) -> ExitCode {
        match self {
            Outcome::Passed => ExitCode::SUCCESS,
            Outcome::Failed => ExitCode::FAILURE,
        }
    }
}

impl From<&Report> for Outcome {
    fn from(report: &Report) -> Self {
        if report.exit_code() == 0 {
            Outcome::Passed
        } else {
            Outcome::Failed
        }
    }
}
