//! # glance-harness
//!
//! Browser-driven verification of single-page dashboards, built on
//! chromiumoxide.
//!
//! The harness opens a Chrome page per scenario, captures console and
//! network telemetry, waits for ordered loading milestones under
//! deadlines, evaluates DOM and application-state assertions, and folds
//! everything into a persisted JSON report with a process exit code.
//!
//! ## Architecture
//!
//! - **Session**: one page bound to a base URL, opened through a
//!   [`Launcher`] and driven through a [`PageDriver`]
//! - **TelemetryCollector**: append-only console/network log per session
//! - **MilestoneTracker**: sequential, deadline-bounded polling of checks
//! - **AssertionEngine**: turns [`Expectation`]s into immutable
//!   [`Assertion`] records
//! - **Harness**: runs [`Scenario`]s and feeds the [`ReportAggregator`]
//!
//! Every read of page or application state goes through [`AppProbe`] with
//! an expression-as-data [`ProbeExpr`], so tests can answer probes without
//! a browser.
//!
//! ## Example Usage
//!
//! ```ignore
//! use std::sync::Arc;
//! use glance_harness::{
//!     ChromeLauncher, DashboardContract, Harness, HarnessOptions, MilestoneOptions,
//!     StaticTarget, scenario_set,
//! };
//!
//! #[tokio::main]
//! async fn main() -> glance_harness::Result<()> {
//!     let scenarios = scenario_set(
//!         "dashboard",
//!         &DashboardContract::default(),
//!         &MilestoneOptions::default(),
//!     )?;
//!
//!     let harness = Harness::new(
//!         Arc::new(ChromeLauncher::new()),
//!         Arc::new(StaticTarget::new("http://localhost:3000")),
//!         HarnessOptions::default(),
//!     );
//!
//!     let report = harness.run(scenarios).await?;
//!     std::process::exit(report.exit_code());
//! }
//! ```
//!
//! ## Testing Strategy
//!
//! 1. **Unit tests**: scripted probes and drivers, paused tokio time
//! 2. **Integration tests**: a scripted dashboard driver in `tests/`, plus
//!    real-browser tests marked `#[ignore]` (require Chrome installed)
//!
//! Run with `cargo test` (unit) or `cargo test -- --ignored` (browser).

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod artifacts;
pub mod assertion;
pub mod browser;
pub mod contract;
pub mod error;
pub mod milestone;
pub mod page;
pub mod policy;
pub mod probe;
pub mod report;
pub mod runner;
pub mod scenario;
pub mod scenarios;
pub mod session;
pub mod target;
pub mod telemetry;
pub mod wait;

// Re-export main types for convenience
pub use artifacts::ArtifactStore;
pub use assertion::{
    Assertion, AssertionEngine, Check, Comparator, CustomCheck, Expectation, Observation,
    StateSource,
};
pub use browser::ChromeLauncher;
pub use contract::DashboardContract;
pub use error::{HarnessError, Result};
pub use milestone::{Milestone, MilestoneOptions, MilestoneRecord, MilestoneTracker};
pub use policy::{TelemetryAnomaly, TelemetryPolicy, WarningPolicy};
pub use probe::{Action, AppProbe, ProbeExpr, TextMode};
pub use report::{REPORT_FILE, Report, ReportAggregator, ScenarioResult, Summary};
pub use runner::{Harness, HarnessOptions};
pub use scenario::{NavigationPolicy, Scenario, ScenarioBuilder, Step, load_scenarios, parse_scenarios};
pub use scenarios::{SETS, scenario_set};
pub use session::{
    Launcher, NavigationWait, PageDriver, Session, SessionOptions, Viewport, with_session,
};
pub use target::{StaticTarget, Target};
pub use telemetry::{
    Channel, Severity, TelemetryCollector, TelemetryMark, TelemetryQuery, TelemetryRecord,
    TelemetrySnapshot,
};
pub use wait::{DEFAULT_POLL_INTERVAL, DEFAULT_TIMEOUT, WaitConfig, WaitOutcome, wait_for};
