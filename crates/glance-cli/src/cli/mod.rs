//! Command-line interface definition for glance.
//!
//! # Command Structure
//!
//! - `glance run [SET]` - Run a scenario set against a running dashboard
//! - `glance list` - List the built-in scenario sets
//! - `glance show <REPORT>` - Summarize a persisted `report.json`

mod commands;
mod tests;

use clap::Parser;

pub use commands::{Command, RunArgs, ShowArgs};

/// Glance - browser-driven verification for dashboards
#[derive(Parser, Debug)]
#[command(
    name = "glance",
    version,
    about = "Browser-driven verification for single-page dashboards",
    long_about = "Glance drives a headless Chrome against an already running dashboard,\n\
                  tracks its loading milestones, asserts on DOM, state and console output,\n\
                  and writes a machine-readable report with screenshots.\n\n\
                  Exit codes: 0 all scenarios passed, 1 a scenario failed, 2 the run could not complete."
)]
pub struct Cli {
    /// Enable verbose logging (debug level)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}
