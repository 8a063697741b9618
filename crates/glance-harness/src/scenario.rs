//! Scenarios: named step sequences run against one session.
//!
//! Scenarios are built in code with [`Scenario::builder`] or loaded from a
//! JSON file whose top level is either a list of scenarios or an object
//! with a `scenarios` list.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;

use crate::assertion::Expectation;
use crate::error::{HarnessError, Result};
use crate::milestone::Milestone;
use crate::policy::TelemetryPolicy;
use crate::session::NavigationWait;

/// What happens after a navigation or interaction step fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NavigationPolicy {
    /// Skip the remaining steps.
    #[default]
    Abort,
    /// Record the error and keep going.
    Continue,
}

/// One step of a scenario.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Step {
    /// Navigate to a path under the base URL.
    Navigate {
        path: String,
        #[serde(default)]
        wait: NavigationWait,
    },
    /// Reload the current path.
    Reload {
        #[serde(default)]
        wait: NavigationWait,
    },
    /// Click the first match.
    Click { selector: String },
    /// Set a form control's value.
    Fill { selector: String, value: String },
    /// Call the application's request function.
    Request {
        name: String,
        #[serde(default)]
        payload: Value,
        /// Record an assertion that the response reports success.
        #[serde(default = "default_true")]
        expect_success: bool,
    },
    /// Sleep.
    Pause { ms: u64 },
    /// Track milestones from the load of the last navigated document.
    Milestones {
        milestones: Vec<Milestone>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        poll_interval_ms: Option<u64>,
    },
    /// Evaluate an expectation.
    Assert(Expectation),
    /// Save a screenshot.
    Screenshot { label: String },
    /// Drop the telemetry collected so far.
    ClearTelemetry,
}

fn default_true() -> bool {
    true
}

impl Step {
    /// Short label for logs.
    #[must_use]
    pub fn label(&self) -> String {
        match self {
            Step::Navigate { path, .. } => format!("navigate {path}"),
            Step::Reload { .. } => "reload".to_string(),
            Step::Click { selector } => format!("click {selector}"),
            Step::Fill { selector, .. } => format!("fill {selector}"),
            Step::Request { name, .. } => format!("request {name}"),
            Step::Pause { ms } => format!("pause {ms}ms"),
            Step::Milestones { milestones, .. } => format!(
                "milestones [{}]",
                milestones
                    .iter()
                    .map(|m| m.name.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            Step::Assert(expectation) => format!(
                "assert {}",
                expectation
                    .description
                    .clone()
                    .unwrap_or_else(|| expectation.check.summary())
            ),
            Step::Screenshot { label } => format!("screenshot {label}"),
            Step::ClearTelemetry => "clear telemetry".to_string(),
        }
    }
}

/// A named sequence of steps with its failure policies.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scenario {
    /// Unique name; also the screenshot file prefix.
    pub name: String,

    /// What the scenario verifies.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Steps in order.
    pub steps: Vec<Step>,

    /// Which telemetry fails the scenario.
    #[serde(default)]
    pub telemetry: TelemetryPolicy,

    /// Behaviour after a failed navigation or interaction.
    #[serde(default)]
    pub navigation: NavigationPolicy,

    /// Capture a screenshot before teardown when the scenario failed.
    #[serde(default = "default_true")]
    pub screenshot_on_failure: bool,
}

impl Scenario {
    /// Starts building a scenario.
    pub fn builder(name: impl Into<String>) -> ScenarioBuilder {
        ScenarioBuilder {
            scenario: Scenario {
                name: name.into(),
                description: None,
                steps: Vec::new(),
                telemetry: TelemetryPolicy::default(),
                navigation: NavigationPolicy::Abort,
                screenshot_on_failure: true,
            },
        }
    }

    /// Checks that the scenario can run.
    ///
    /// # Errors
    ///
    /// `InvalidScenario` for an empty name, no steps, or an unnamed
    /// milestone.
    pub fn validate(&self) -> Result<()> {
        let invalid = |reason: &str| HarnessError::InvalidScenario {
            name: self.name.clone(),
            reason: reason.to_string(),
        };

        if self.name.trim().is_empty() {
            return Err(invalid("name must not be empty"));
        }
        if self.steps.is_empty() {
            return Err(invalid("no steps"));
        }
        for step in &self.steps {
            if let Step::Milestones { milestones, .. } = step {
                if milestones.iter().any(|m| m.name.trim().is_empty()) {
                    return Err(invalid("milestone without a name"));
                }
            }
        }
        Ok(())
    }
}

/// Fluent scenario construction.
#[derive(Debug, Clone)]
pub struct ScenarioBuilder {
    scenario: Scenario,
}

impl ScenarioBuilder {
    /// Sets the description.
    #[must_use]
    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.scenario.description = Some(description.into());
        self
    }

    /// Appends a step.
    #[must_use]
    pub fn step(mut self, step: Step) -> Self {
        self.scenario.steps.push(step);
        self
    }

    /// Appends a navigation that waits for network idle.
    #[must_use]
    pub fn navigate(self, path: impl Into<String>) -> Self {
        self.navigate_with(path, NavigationWait::NetworkIdle)
    }

    /// Appends a navigation with an explicit wait mode.
    #[must_use]
    pub fn navigate_with(self, path: impl Into<String>, wait: NavigationWait) -> Self {
        self.step(Step::Navigate {
            path: path.into(),
            wait,
        })
    }

    /// Appends a reload that waits for network idle.
    #[must_use]
    pub fn reload(self) -> Self {
        self.reload_with(NavigationWait::NetworkIdle)
    }

    /// Appends a reload with an explicit wait mode.
    #[must_use]
    pub fn reload_with(self, wait: NavigationWait) -> Self {
        self.step(Step::Reload { wait })
    }

    /// Appends a click.
    #[must_use]
    pub fn click(self, selector: impl Into<String>) -> Self {
        self.step(Step::Click {
            selector: selector.into(),
        })
    }

    /// Appends a fill.
    #[must_use]
    pub fn fill(self, selector: impl Into<String>, value: impl Into<String>) -> Self {
        self.step(Step::Fill {
            selector: selector.into(),
            value: value.into(),
        })
    }

    /// Appends a request that must succeed.
    #[must_use]
    pub fn request(self, name: impl Into<String>, payload: Value) -> Self {
        self.step(Step::Request {
            name: name.into(),
            payload,
            expect_success: true,
        })
    }

    /// Appends a pause.
    #[must_use]
    pub fn pause(self, ms: u64) -> Self {
        self.step(Step::Pause { ms })
    }

    /// Appends milestone tracking with the session's poll interval.
    #[must_use]
    pub fn milestones(self, milestones: Vec<Milestone>) -> Self {
        self.step(Step::Milestones {
            milestones,
            poll_interval_ms: None,
        })
    }

    /// Appends milestone tracking with an explicit poll interval.
    #[must_use]
    pub fn milestones_every(self, milestones: Vec<Milestone>, poll_interval_ms: u64) -> Self {
        self.step(Step::Milestones {
            milestones,
            poll_interval_ms: Some(poll_interval_ms),
        })
    }

    /// Appends an assertion.
    #[must_use]
    pub fn expect(self, expectation: Expectation) -> Self {
        self.step(Step::Assert(expectation))
    }

    /// Appends a screenshot.
    #[must_use]
    pub fn screenshot(self, label: impl Into<String>) -> Self {
        self.step(Step::Screenshot {
            label: label.into(),
        })
    }

    /// Appends a telemetry reset.
    #[must_use]
    pub fn clear_telemetry(self) -> Self {
        self.step(Step::ClearTelemetry)
    }

    /// Sets the telemetry policy.
    #[must_use]
    pub fn telemetry_policy(mut self, policy: TelemetryPolicy) -> Self {
        self.scenario.telemetry = policy;
        self
    }

    /// Sets the navigation policy.
    #[must_use]
    pub fn navigation_policy(mut self, policy: NavigationPolicy) -> Self {
        self.scenario.navigation = policy;
        self
    }

    /// Enables or disables the failure screenshot.
    #[must_use]
    pub fn screenshot_on_failure(mut self, enabled: bool) -> Self {
        self.scenario.screenshot_on_failure = enabled;
        self
    }

    /// Finishes the scenario.
    ///
    /// # Errors
    ///
    /// See [`Scenario::validate`].
    pub fn build(self) -> Result<Scenario> {
        self.scenario.validate()?;
        Ok(self.scenario)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ScenarioFile {
    List(Vec<Scenario>),
    Wrapped { scenarios: Vec<Scenario> },
}

/// Parses scenarios from JSON text.
///
/// # Errors
///
/// Returns a JSON error or `InvalidScenario`.
pub fn parse_scenarios(json: &str) -> Result<Vec<Scenario>> {
    let scenarios = match serde_json::from_str::<ScenarioFile>(json)? {
        ScenarioFile::List(scenarios) | ScenarioFile::Wrapped { scenarios } => scenarios,
    };
    for scenario in &scenarios {
        scenario.validate()?;
    }
    Ok(scenarios)
}

/// Loads scenarios from a JSON file.
///
/// # Errors
///
/// Returns an I/O error, a JSON error, or `InvalidScenario`.
pub fn load_scenarios(path: impl AsRef<Path>) -> Result<Vec<Scenario>> {
    let content = std::fs::read_to_string(path)?;
    parse_scenarios(&content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assertion::{Check, Comparator};

    #[test]
    fn builder_collects_steps() {
        let scenario = Scenario::builder("settings")
            .describe("host persists across reloads")
            .navigate("/settings")
            .fill("[data-field=\"host\"]", "127.0.0.1")
            .click("[data-action=\"save\"]")
            .reload()
            .expect(Expectation::new(Check::field_value(
                "[data-field=\"host\"]",
                "127.0.0.1",
            )))
            .build()
            .unwrap();

        assert_eq!(scenario.steps.len(), 5);
        assert_eq!(scenario.navigation, NavigationPolicy::Abort);
        assert!(scenario.screenshot_on_failure);
        assert_eq!(scenario.steps[2].label(), "click [data-action=\"save\"]");
    }

    #[test]
    fn empty_scenarios_are_rejected() {
        let err = Scenario::builder("empty").build().unwrap_err();
        assert!(matches!(err, HarnessError::InvalidScenario { .. }));

        let err = Scenario::builder(" ").navigate("/").build().unwrap_err();
        assert!(err.to_string().contains("name"));
    }

    #[test]
    fn parses_both_file_shapes() {
        let list = r##"[
            {"name": "root", "steps": [
                {"step": "navigate", "path": "/", "wait": "load"},
                {"step": "assert", "check": {"kind": "elementCount", "selector": "#app", "comparator": "=", "n": 1}, "critical": true},
                {"step": "milestones", "milestones": [
                    {"name": "app", "deadlineMs": 500, "check": {"kind": "elementCount", "selector": "#app", "comparator": ">=", "n": 1}}
                ]}
            ]}
        ]"##;
        let scenarios = parse_scenarios(list).unwrap();
        assert_eq!(scenarios.len(), 1);
        assert!(matches!(
            &scenarios[0].steps[0],
            Step::Navigate {
                wait: NavigationWait::Load,
                ..
            }
        ));
        let Step::Assert(expectation) = &scenarios[0].steps[1] else {
            panic!("expected an assert step");
        };
        assert!(expectation.critical);
        let Step::Milestones { milestones, .. } = &scenarios[0].steps[2] else {
            panic!("expected a milestones step");
        };
        assert!(milestones[0].required);

        let wrapped = r#"{"scenarios": [
            {"name": "cfg", "navigation": "continue", "screenshotOnFailure": false,
             "telemetry": {"warnings": "fail"},
             "steps": [{"step": "request", "name": "config:get"}, {"step": "reload"}, {"step": "pause", "ms": 10}]}
        ]}"#;
        let scenarios = parse_scenarios(wrapped).unwrap();
        assert_eq!(scenarios[0].navigation, NavigationPolicy::Continue);
        assert!(!scenarios[0].screenshot_on_failure);
        assert!(matches!(
            scenarios[0].steps[0],
            Step::Request {
                expect_success: true,
                ..
            }
        ));
        assert!(matches!(
            scenarios[0].steps[1],
            Step::Reload {
                wait: NavigationWait::NetworkIdle
            }
        ));
    }

    #[test]
    fn invalid_files_are_rejected() {
        assert!(parse_scenarios(r#"[{"name": "x", "steps": []}]"#).is_err());
        assert!(parse_scenarios(r#"{"nope": true}"#).is_err());
        assert!(parse_scenarios(r#"[{"name": "x", "steps": [{"step": "teleport"}]}]"#).is_err());
    }

    #[test]
    fn step_labels() {
        let step = Step::Assert(Expectation::new(Check::count(".card", Comparator::Ge, 2)));
        assert_eq!(step.label(), "assert count(.card) >= 2");
    }
}
