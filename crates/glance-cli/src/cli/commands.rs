use clap::{Args, Subcommand};
use std::path::PathBuf;

/// Available glance subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a scenario set against a running dashboard
    ///
    /// Launches one browser per scenario, evaluates milestones and
    /// assertions, and writes report.json plus screenshots to the output
    /// directory.
    Run(RunArgs),

    /// List the built-in scenario sets
    List,

    /// Print the summary of a persisted report
    Show(ShowArgs),
}

/// Arguments for the run command
#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// Built-in scenario set (see `glance list`)
    ///
    /// Defaults to `all` unless --scenario-file is given, in which case only
    /// the file's scenarios run.
    #[arg(value_name = "SET")]
    pub set: Option<String>,

    /// Base URL of the running dashboard
    ///
    /// Examples:
    ///   glance run --base-url http://127.0.0.1:8080
    #[arg(long, value_name = "URL")]
    pub base_url: Option<String>,

    /// Run the browser without a window (the default)
    #[arg(long, conflicts_with = "headful")]
    pub headless: bool,

    /// Run the browser with a visible window
    #[arg(long)]
    pub headful: bool,

    /// Directory for report.json and screenshots
    #[arg(short = 'o', long, value_name = "DIR")]
    pub out_dir: Option<PathBuf>,

    /// Deadline for skeleton placeholders to appear
    #[arg(long, value_name = "MS")]
    pub skeleton_deadline_ms: Option<u64>,

    /// Deadline for the first data section to load
    #[arg(long, value_name = "MS")]
    pub first_data_deadline_ms: Option<u64>,

    /// Deadline for every section to load
    #[arg(long, value_name = "MS")]
    pub full_load_deadline_ms: Option<u64>,

    /// Poll interval for milestone predicates
    #[arg(long, value_name = "MS")]
    pub poll_interval_ms: Option<u64>,

    /// Maximum number of scenarios (and browsers) at once
    #[arg(short = 'j', long, value_name = "N")]
    pub parallel: Option<usize>,

    /// Config file (defaults to ./glance.config.json when present)
    #[arg(short = 'c', long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// JSON file with additional scenarios
    #[arg(long, value_name = "FILE")]
    pub scenario_file: Option<PathBuf>,
}

impl RunArgs {
    /// The headless override implied by `--headless`/`--headful`.
    pub fn headless_override(&self) -> Option<bool> {
        match (self.headless, self.headful) {
            (true, _) => Some(true),
            (_, true) => Some(false),
            _ => None,
        }
    }
}

/// Arguments for the show command
#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Path to a report.json, or the directory containing it
    #[arg(value_name = "REPORT")]
    pub report: PathBuf,

    /// List every assertion and milestone, not only failures
    #[arg(long)]
    pub all: bool,
}
