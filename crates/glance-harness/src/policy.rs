//! Which telemetry counts as an automatic scenario failure.

use serde::{Deserialize, Serialize};

use crate::telemetry::{Channel, Severity, TelemetryRecord, TelemetrySnapshot};

/// How warning-level records are treated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WarningPolicy {
    /// Warnings never fail a scenario.
    #[default]
    Ignore,
    /// Warnings are anomalies, same as errors.
    Fail,
}

/// Rules for turning telemetry into anomalies.
///
/// The default flags console errors and any console message mentioning
/// "timeout", and ignores favicon noise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TelemetryPolicy {
    /// Treat error-severity records as anomalies.
    pub fail_on_errors: bool,

    /// Treatment of warning-severity records.
    pub warnings: WarningPolicy,

    /// Case-insensitive substrings that make any record an anomaly.
    pub disallowed_patterns: Vec<String>,

    /// Case-insensitive substrings that exempt a record entirely.
    pub ignore_patterns: Vec<String>,

    /// Channels the policy inspects.
    pub channels: Vec<Channel>,
}

impl Default for TelemetryPolicy {
    fn default() -> Self {
        Self {
            fail_on_errors: true,
            warnings: WarningPolicy::Ignore,
            disallowed_patterns: vec!["timeout".to_string()],
            ignore_patterns: vec!["favicon".to_string()],
            channels: vec![Channel::Console],
        }
    }
}

/// Why a record was flagged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", content = "detail", rename_all = "camelCase")]
pub enum AnomalyReason {
    /// Severity is disallowed by the policy.
    Severity(Severity),
    /// Text contains a disallowed pattern.
    Pattern(String),
}

/// A record that violates the policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetryAnomaly {
    /// Sequence number of the offending record.
    pub seq: u64,
    /// Channel of the offending record.
    pub channel: Channel,
    /// Why it was flagged.
    pub reason: AnomalyReason,
    /// Record text.
    pub text: String,
}

impl TelemetryPolicy {
    /// A policy that flags nothing. Scenarios opt into this explicitly when
    /// telemetry must not influence their verdict.
    #[must_use]
    pub fn permissive() -> Self {
        Self {
            fail_on_errors: false,
            warnings: WarningPolicy::Ignore,
            disallowed_patterns: Vec::new(),
            ignore_patterns: Vec::new(),
            channels: Vec::new(),
        }
    }

    /// Sets the warning treatment.
    #[must_use]
    pub fn with_warnings(mut self, warnings: WarningPolicy) -> Self {
        self.warnings = warnings;
        self
    }

    /// Adds an ignore pattern.
    #[must_use]
    pub fn ignoring(mut self, pattern: impl Into<String>) -> Self {
        self.ignore_patterns.push(pattern.into());
        self
    }

    /// Checks one record against the policy.
    #[must_use]
    pub fn classify(&self, record: &TelemetryRecord) -> Option<AnomalyReason> {
        if !self.channels.contains(&record.channel) {
            return None;
        }

        let text = record.text().to_lowercase();
        if self
            .ignore_patterns
            .iter()
            .any(|p| text.contains(&p.to_lowercase()))
        {
            return None;
        }

        let severity_flagged = match record.severity {
            Severity::Error => self.fail_on_errors,
            Severity::Warning => self.warnings == WarningPolicy::Fail,
            _ => false,
        };
        if severity_flagged {
            return Some(AnomalyReason::Severity(record.severity));
        }

        self.disallowed_patterns
            .iter()
            .find(|p| text.contains(&p.to_lowercase()))
            .map(|p| AnomalyReason::Pattern(p.clone()))
    }

    /// Returns every anomaly in `snapshot`, in arrival order.
    #[must_use]
    pub fn anomalies(&self, snapshot: &TelemetrySnapshot) -> Vec<TelemetryAnomaly> {
        snapshot
            .iter()
            .filter_map(|record| {
                self.classify(record).map(|reason| TelemetryAnomaly {
                    seq: record.seq,
                    channel: record.channel,
                    reason,
                    text: record.text(),
                })
            })
            .collect()
    }
}
