//! Ordered loading milestones.
//!
//! A milestone is a named [`Check`] with a deadline measured from the
//! tracker origin, normally the moment the navigated document finished
//! loading and the application began its own asynchronous loading.
//! Milestones are evaluated strictly in declared order, so detection times
//! are non-decreasing by construction. A milestone that times out does not
//! stop the ones after it.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::Instant;

use crate::assertion::Check;
use crate::error::Result;
use crate::probe::AppProbe;
use crate::wait::{DEFAULT_POLL_INTERVAL, WaitConfig, wait_for};

/// A named, deadline-bounded point in the loading sequence.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Milestone {
    /// Name shown in the report (`skeleton-rendered`, ...).
    pub name: String,

    /// Predicate that marks the milestone as reached.
    pub check: Check,

    /// Hard deadline from the tracker origin.
    pub deadline_ms: u64,

    /// Tighter target within the deadline.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub budget_ms: Option<u64>,

    /// Whether missing the milestone fails the scenario.
    #[serde(default = "default_required")]
    pub required: bool,
}

fn default_required() -> bool {
    true
}

impl Milestone {
    /// A required milestone without a budget.
    pub fn new(name: impl Into<String>, check: Check, deadline_ms: u64) -> Self {
        Self {
            name: name.into(),
            check,
            deadline_ms,
            budget_ms: None,
            required: true,
        }
    }

    /// Sets the "within N ms" target.
    #[must_use]
    pub fn with_budget(mut self, budget_ms: u64) -> Self {
        self.budget_ms = Some(budget_ms);
        self
    }

    /// Marks the milestone informational.
    #[must_use]
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }
}

/// Outcome of one milestone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MilestoneRecord {
    /// Milestone name.
    pub name: String,
    /// Copied from the milestone.
    pub required: bool,
    /// Whether the predicate held before the deadline.
    pub detected: bool,
    /// Time from the origin to detection.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detected_at_ms: Option<u64>,
    /// Detection time, or the deadline when not detected.
    pub elapsed_ms: u64,
    /// Hard deadline.
    pub deadline_ms: u64,
    /// Budget, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub budget_ms: Option<u64>,
    /// Detected and, when a budget is set, detected within it.
    pub within_budget: bool,
}

impl MilestoneRecord {
    /// Returns true if this outcome fails its scenario.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        self.required && !(self.detected && self.within_budget)
    }
}

/// Loading-sequence deadlines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MilestoneOptions {
    /// Skeleton placeholders must appear within this.
    pub skeleton_deadline_ms: u64,
    /// Hard ceiling for the first data section.
    pub first_data_deadline_ms: u64,
    /// Hard ceiling for every section to be loaded.
    pub full_load_deadline_ms: u64,
    /// Poll interval while waiting.
    pub poll_interval_ms: u64,
    /// Target for the first data section.
    pub first_data_budget_ms: Option<u64>,
    /// Target for the full load.
    pub full_load_budget_ms: Option<u64>,
}

impl Default for MilestoneOptions {
    fn default() -> Self {
        Self {
            skeleton_deadline_ms: 200,
            first_data_deadline_ms: 6_000,
            full_load_deadline_ms: 12_000,
            poll_interval_ms: 100,
            first_data_budget_ms: Some(2_000),
            full_load_budget_ms: Some(3_000),
        }
    }
}

impl MilestoneOptions {
    /// Poll interval as a duration.
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Evaluates milestones in order against one origin.
#[derive(Debug, Clone, Copy)]
pub struct MilestoneTracker {
    origin: Instant,
    poll_interval: Duration,
}

impl MilestoneTracker {
    /// A tracker whose origin is now.
    #[must_use]
    pub fn start() -> Self {
        Self::from_origin(Instant::now())
    }

    /// A tracker anchored at an earlier instant.
    #[must_use]
    pub fn from_origin(origin: Instant) -> Self {
        Self {
            origin,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Sets the poll interval.
    #[must_use]
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// The instant deadlines are measured from.
    #[must_use]
    pub fn origin(&self) -> Instant {
        self.origin
    }

    /// Evaluates `milestones` in declared order.
    ///
    /// Each milestone is polled until it is detected or its deadline (from
    /// the origin) passes. A milestone whose deadline already passed while
    /// earlier ones were tracked is recorded as missed without polling.
    /// Only fatal errors are returned.
    pub async fn track(
        &self,
        probe: &dyn AppProbe,
        milestones: &[Milestone],
    ) -> Result<Vec<MilestoneRecord>> {
        let mut records = Vec::with_capacity(milestones.len());

        for milestone in milestones {
            let deadline = Duration::from_millis(milestone.deadline_ms);
            let started = self.origin.elapsed();
            let check = &milestone.check;

            // detection time is capped at the deadline even when the
            // final probe itself runs past it
            let detected_at = if started > deadline {
                None
            } else {
                let outcome = wait_for(
                    move || async move { check.evaluate(probe).await.map(|o| o.passed) },
                    WaitConfig::new(deadline - started, self.poll_interval),
                )
                .await?;
                outcome.detected.then(|| (started + outcome.elapsed).min(deadline))
            };

            let record = if let Some(detected_at) = detected_at {
                let at = millis(detected_at);
                MilestoneRecord {
                    name: milestone.name.clone(),
                    required: milestone.required,
                    detected: true,
                    detected_at_ms: Some(at),
                    elapsed_ms: at,
                    deadline_ms: milestone.deadline_ms,
                    budget_ms: milestone.budget_ms,
                    within_budget: milestone.budget_ms.is_none_or(|budget| at <= budget),
                }
            } else {
                MilestoneRecord {
                    name: milestone.name.clone(),
                    required: milestone.required,
                    detected: false,
                    detected_at_ms: None,
                    elapsed_ms: milestone.deadline_ms,
                    deadline_ms: milestone.deadline_ms,
                    budget_ms: milestone.budget_ms,
                    within_budget: false,
                }
            };

            match (record.detected, record.within_budget) {
                (true, true) => tracing::debug!(
                    "milestone '{}' detected at {}ms",
                    record.name,
                    record.elapsed_ms
                ),
                (true, false) => tracing::debug!(
                    "milestone '{}' detected at {}ms, over its {}ms budget",
                    record.name,
                    record.elapsed_ms,
                    record.budget_ms.unwrap_or_default()
                ),
                _ => tracing::debug!(
                    "milestone '{}' not detected within {}ms",
                    record.name,
                    record.deadline_ms
                ),
            }

            records.push(record);
        }

        Ok(records)
    }
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
