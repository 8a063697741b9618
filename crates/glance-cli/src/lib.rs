//! glance CLI - run browser verification scenarios against a dashboard.
//!
//! This crate is the command-line surface of `glance-harness`: it loads
//! configuration, installs logging, runs scenario sets and prints a summary.
//!
//! # Architecture
//!
//! - [`cli`] - Argument definitions (clap derive)
//! - [`config`] - `glance.config.json` + `GLANCE_*` + flags, merged by figment
//! - [`commands`] - `run`, `list` and `show`
//! - [`error`] - Error types with actionable hints
//! - [`logger`] - `tracing` subscriber setup
//! - [`ui`] - Status messages and the run summary
//!
//! # Example
//!
//! ```rust,no_run
//! use glance_cli::{cli::RunArgs, commands, logger};
//!
//! # async fn example() -> glance_cli::Result<()> {
//! logger::init_logger(false, false, true);
//! let outcome = commands::run_execute(RunArgs {
//!     set: Some("smoke".into()),
//!     base_url: Some("http://127.0.0.1:8080".into()),
//!     ..RunArgs::default()
//! })
//! .await?;
//! std::process::exit(if outcome == commands::Outcome::Passed { 0 } else { 1 });
//! # }
//! ```

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod logger;
pub mod ui;

pub use error::{CliError, ConfigError, Result, ResultExt};
