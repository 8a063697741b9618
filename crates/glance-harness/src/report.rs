//! Scenario results and the run-level report.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use crate::assertion::Assertion;
use crate::error::Result;
use crate::milestone::MilestoneRecord;
use crate::telemetry::TelemetryRecord;

/// File name of the persisted report inside the output directory.
pub const REPORT_FILE: &str = "report.json";

/// Everything one scenario produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioResult {
    /// Scenario name.
    pub name: String,

    /// Scenario description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Assertions in evaluation order.
    pub assertions: Vec<Assertion>,

    /// Milestone outcomes in declaration order.
    pub milestones: Vec<MilestoneRecord>,

    /// Console records plus network warnings and errors.
    pub telemetry: Vec<TelemetryRecord>,

    /// Screenshot paths.
    pub screenshots: Vec<PathBuf>,

    /// Scenario-level errors (navigation failures, failed interactions).
    pub errors: Vec<String>,

    /// Derived verdict, see [`ScenarioResult::evaluate_passed`].
    pub passed: bool,

    /// Wall time of the scenario.
    pub duration_ms: u64,

    /// When the scenario started.
    pub started_at: DateTime<Utc>,
}

impl ScenarioResult {
    /// An empty, not-yet-passed result.
    pub fn new(name: impl Into<String>, description: Option<String>) -> Self {
        Self {
            name: name.into(),
            description,
            assertions: Vec::new(),
            milestones: Vec::new(),
            telemetry: Vec::new(),
            screenshots: Vec::new(),
            errors: Vec::new(),
            passed: false,
            duration_ms: 0,
            started_at: Utc::now(),
        }
    }

    /// The verdict implied by the recorded data: every non-optional
    /// assertion passed, every required milestone was detected within its
    /// budget, and no scenario-level error occurred.
    #[must_use]
    pub fn evaluate_passed(&self) -> bool {
        self.errors.is_empty()
            && !self.assertions.iter().any(Assertion::is_blocking_failure)
            && !self.milestones.iter().any(MilestoneRecord::is_failure)
    }

    /// Sets `passed` from the recorded data.
    pub fn seal(&mut self) {
        self.passed = self.evaluate_passed();
    }

    /// Non-optional failed assertions.
    pub fn failed_assertions(&self) -> impl Iterator<Item = &Assertion> {
        self.assertions.iter().filter(|a| a.is_blocking_failure())
    }

    /// Required milestones that were missed or late.
    pub fn failed_milestones(&self) -> impl Iterator<Item = &MilestoneRecord> {
        self.milestones.iter().filter(|m| m.is_failure())
    }
}

/// Aggregate counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    /// Scenarios run.
    pub total: usize,
    /// Scenarios that passed.
    pub passed: usize,
    /// Scenarios that failed.
    pub failed: usize,
}

impl Summary {
    /// Folds the `passed` flags of `results`.
    #[must_use]
    pub fn from_results(results: &[ScenarioResult]) -> Self {
        let passed = results.iter().filter(|r| r.passed).count();
        Self {
            total: results.len(),
            passed,
            failed: results.len() - passed,
        }
    }
}

/// The terminal artifact of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    /// Results in completion order.
    pub scenarios: Vec<ScenarioResult>,
    /// Aggregate counts.
    pub summary: Summary,
    /// When the report was built.
    pub generated_at: DateTime<Utc>,
}

impl Report {
    /// Builds a report from finished results.
    #[must_use]
    pub fn new(scenarios: Vec<ScenarioResult>) -> Self {
        Self {
            summary: Summary::from_results(&scenarios),
            scenarios,
            generated_at: Utc::now(),
        }
    }

    /// Process exit code: 0 when nothing failed, 1 otherwise.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        i32::from(self.summary.failed != 0)
    }

    /// Writes the report as pretty JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub fn write(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Reads a persisted report.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing or not a report.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

/// Collects scenario results from concurrently running scenarios.
///
/// Cloneable; all clones append to the same list, in completion order.
#[derive(Debug, Clone, Default)]
pub struct ReportAggregator {
    results: Arc<Mutex<Vec<ScenarioResult>>>,
}

impl ReportAggregator {
    /// Creates an empty aggregator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a finished scenario.
    pub fn add_scenario(&self, result: ScenarioResult) {
        tracing::info!(
            "scenario '{}' {} in {}ms",
            result.name,
            if result.passed { "passed" } else { "failed" },
            result.duration_ms
        );
        self.results
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(result);
    }

    /// Number of results collected so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.results
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns true if nothing was collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Builds the report and writes it to `output_dir/report.json`.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or file cannot be written.
    pub fn finalize(&self, output_dir: &Path) -> Result<Report> {
        let results = self
            .results
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        let report = Report::new(results);

        fs::create_dir_all(output_dir)?;
        let path = output_dir.join(REPORT_FILE);
        report.write(&path)?;
        tracing::info!(
            "{} of {} scenarios passed; report written to {}",
            report.summary.passed,
            report.summary.total,
            path.display()
        );

        Ok(report)
    }
}
