//! Declarative checks and the assertion records they produce.
//!
//! A [`Check`] is evaluated through an [`AppProbe`] and yields an
//! [`Observation`]. The [`AssertionEngine`] wraps that into an immutable
//! [`Assertion`] carrying expected and actual values for the report. The
//! same `Check` type doubles as the milestone predicate.

use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::error::{HarnessError, Result};
use crate::policy::TelemetryAnomaly;
use crate::probe::{AppProbe, ProbeExpr, lookup_path};

/// Numeric comparison for element counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Comparator {
    #[serde(rename = "=", alias = "==")]
    Eq,
    #[serde(rename = ">=")]
    Ge,
    #[serde(rename = "<=")]
    Le,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = "<")]
    Lt,
}

impl Comparator {
    /// Applies the comparison `actual <op> expected`.
    #[must_use]
    pub fn apply(self, actual: u64, expected: u64) -> bool {
        match self {
            Comparator::Eq => actual == expected,
            Comparator::Ge => actual >= expected,
            Comparator::Le => actual <= expected,
            Comparator::Gt => actual > expected,
            Comparator::Lt => actual < expected,
        }
    }

    /// Operator symbol.
    #[must_use]
    pub fn symbol(self) -> &'static str {
        match self {
            Comparator::Eq => "=",
            Comparator::Ge => ">=",
            Comparator::Le => "<=",
            Comparator::Gt => ">",
            Comparator::Lt => "<",
        }
    }
}

impl FromStr for Comparator {
    type Err = HarnessError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "=" | "==" => Ok(Comparator::Eq),
            ">=" => Ok(Comparator::Ge),
            "<=" => Ok(Comparator::Le),
            ">" => Ok(Comparator::Gt),
            "<" => Ok(Comparator::Lt),
            other => Err(HarnessError::InvalidScenario {
                name: "comparator".into(),
                reason: format!("unknown comparator '{other}'"),
            }),
        }
    }
}

/// Where a state check reads its value from.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "from", rename_all = "camelCase")]
pub enum StateSource {
    /// The application state store; the first path segment is the key.
    #[default]
    Store,
    /// The response of a client-side request.
    Request {
        name: String,
        #[serde(default)]
        payload: Value,
    },
}

/// Author-supplied predicate over a probed value.
#[derive(Clone)]
pub struct CustomCheck {
    /// Required; this is what the report shows.
    pub description: String,
    /// Value handed to the evaluator (`null` when absent).
    pub probe: Option<ProbeExpr>,
    evaluator: Arc<dyn Fn(&Value) -> bool + Send + Sync>,
}

impl CustomCheck {
    /// Creates a custom check.
    pub fn new(
        description: impl Into<String>,
        probe: Option<ProbeExpr>,
        evaluator: impl Fn(&Value) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            description: description.into(),
            probe,
            evaluator: Arc::new(evaluator),
        }
    }
}

impl fmt::Debug for CustomCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomCheck")
            .field("description", &self.description)
            .field("probe", &self.probe)
            .finish_non_exhaustive()
    }
}

/// A declarative predicate over DOM or application state.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Check {
    /// `count(selector) <comparator> n`
    ElementCount {
        selector: String,
        comparator: Comparator,
        n: u64,
    },
    /// Text of the first match contains `substring`.
    TextContains { selector: String, substring: String },
    /// Attribute of the first match equals `value`.
    AttributeEquals {
        selector: String,
        name: String,
        value: String,
    },
    /// Attribute of the first match contains `substring`.
    AttributeContains {
        selector: String,
        name: String,
        substring: String,
    },
    /// Form control value equals `value`.
    FieldValueEquals { selector: String, value: String },
    /// Value at `path` in application state or a request response.
    StateEquals {
        #[serde(default)]
        source: StateSource,
        path: String,
        value: Value,
    },
    /// Negation.
    Not { check: Box<Check> },
    /// Conjunction; true for an empty list.
    All { checks: Vec<Check> },
    /// Escape hatch; cannot be loaded from files.
    #[serde(skip)]
    Custom(CustomCheck),
}

/// Result of evaluating a check once.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    /// Whether the predicate held.
    pub passed: bool,
    /// What was actually observed.
    pub actual: Value,
}

impl Check {
    /// `count(selector) <comparator> n`
    pub fn count(selector: impl Into<String>, comparator: Comparator, n: u64) -> Self {
        Check::ElementCount {
            selector: selector.into(),
            comparator,
            n,
        }
    }

    /// Text of the first match contains `substring`.
    pub fn text_contains(selector: impl Into<String>, substring: impl Into<String>) -> Self {
        Check::TextContains {
            selector: selector.into(),
            substring: substring.into(),
        }
    }

    /// Attribute equals `value`.
    pub fn attribute_equals(
        selector: impl Into<String>,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Check::AttributeEquals {
            selector: selector.into(),
            name: name.into(),
            value: value.into(),
        }
    }

    /// Attribute contains `substring`.
    pub fn attribute_contains(
        selector: impl Into<String>,
        name: impl Into<String>,
        substring: impl Into<String>,
    ) -> Self {
        Check::AttributeContains {
            selector: selector.into(),
            name: name.into(),
            substring: substring.into(),
        }
    }

    /// Form control value equals `value`.
    pub fn field_value(selector: impl Into<String>, value: impl Into<String>) -> Self {
        Check::FieldValueEquals {
            selector: selector.into(),
            value: value.into(),
        }
    }

    /// Application state at `path` equals `value`.
    pub fn state_equals(path: impl Into<String>, value: Value) -> Self {
        Check::StateEquals {
            source: StateSource::Store,
            path: path.into(),
            value,
        }
    }

    /// Response of request `name` at `path` equals `value`.
    pub fn response_equals(
        name: impl Into<String>,
        payload: Value,
        path: impl Into<String>,
        value: Value,
    ) -> Self {
        Check::StateEquals {
            source: StateSource::Request {
                name: name.into(),
                payload,
            },
            path: path.into(),
            value,
        }
    }

    /// Negates `check`.
    #[allow(clippy::should_implement_trait)]
    pub fn not(check: Check) -> Self {
        Check::Not {
            check: Box::new(check),
        }
    }

    /// All of `checks`.
    pub fn all(checks: impl IntoIterator<Item = Check>) -> Self {
        Check::All {
            checks: checks.into_iter().collect(),
        }
    }

    /// Custom predicate.
    pub fn custom(
        description: impl Into<String>,
        probe: Option<ProbeExpr>,
        evaluator: impl Fn(&Value) -> bool + Send + Sync + 'static,
    ) -> Self {
        Check::Custom(CustomCheck::new(description, probe, evaluator))
    }

    /// Predicate kind as reported.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Check::ElementCount { .. } => "elementCount",
            Check::TextContains { .. } => "textContains",
            Check::AttributeEquals { .. } => "attributeEquals",
            Check::AttributeContains { .. } => "attributeContains",
            Check::FieldValueEquals { .. } => "fieldValueEquals",
            Check::StateEquals { .. } => "stateEquals",
            Check::Not { .. } => "not",
            Check::All { .. } => "all",
            Check::Custom(_) => "customPredicate",
        }
    }

    /// What the check looks at.
    #[must_use]
    pub fn target(&self) -> String {
        match self {
            Check::ElementCount { selector, .. }
            | Check::TextContains { selector, .. }
            | Check::FieldValueEquals { selector, .. } => selector.clone(),
            Check::AttributeEquals { selector, name, .. }
            | Check::AttributeContains { selector, name, .. } => format!("{selector}@{name}"),
            Check::StateEquals { source, path, .. } => match source {
                StateSource::Store => format!("state.{path}"),
                StateSource::Request { name, .. } => format!("request({name}).{path}"),
            },
            Check::Not { check } => check.target(),
            Check::All { checks } => checks
                .iter()
                .map(Check::target)
                .collect::<Vec<_>>()
                .join(", "),
            Check::Custom(custom) => custom
                .probe
                .as_ref()
                .map_or_else(|| custom.description.clone(), ProbeExpr::describe),
        }
    }

    /// What the check expects, as reported.
    #[must_use]
    pub fn expected(&self) -> Value {
        match self {
            Check::ElementCount { comparator, n, .. } => {
                json!(format!("{} {n}", comparator.symbol()))
            }
            Check::TextContains { substring, .. } | Check::AttributeContains { substring, .. } => {
                json!({ "contains": substring })
            }
            Check::AttributeEquals { value, .. } | Check::FieldValueEquals { value, .. } => {
                json!(value)
            }
            Check::StateEquals { value, .. } => value.clone(),
            Check::Not { check } => json!({ "not": check.expected() }),
            Check::All { checks } => Value::Array(checks.iter().map(Check::expected).collect()),
            Check::Custom(_) => json!(true),
        }
    }

    /// One-line summary used when no description is given.
    #[must_use]
    pub fn summary(&self) -> String {
        match self {
            Check::ElementCount {
                selector,
                comparator,
                n,
            } => format!("count({selector}) {} {n}", comparator.symbol()),
            Check::TextContains {
                selector,
                substring,
            } => format!("text({selector}) contains {substring:?}"),
            Check::AttributeEquals {
                selector,
                name,
                value,
            } => format!("{selector}@{name} == {value:?}"),
            Check::AttributeContains {
                selector,
                name,
                substring,
            } => format!("{selector}@{name} contains {substring:?}"),
            Check::FieldValueEquals { selector, value } => {
                format!("value({selector}) == {value:?}")
            }
            Check::StateEquals { value, .. } => format!("{} == {value}", self.target()),
            Check::Not { check } => format!("not({})", check.summary()),
            Check::All { checks } => format!(
                "all({})",
                checks
                    .iter()
                    .map(Check::summary)
                    .collect::<Vec<_>>()
                    .join("; ")
            ),
            Check::Custom(custom) => custom.description.clone(),
        }
    }

    /// Evaluates the check once against the current page.
    pub fn evaluate<'a>(&'a self, probe: &'a dyn AppProbe) -> BoxFuture<'a, Result<Observation>> {
        Box::pin(async move {
            match self {
                Check::ElementCount {
                    selector,
                    comparator,
                    n,
                } => {
                    let expr = ProbeExpr::count(selector.clone());
                    let value = probe.probe(&expr).await?;
                    let count = value.as_u64().ok_or_else(|| HarnessError::ProbeFailed {
                        probe: expr.describe(),
                        reason: format!("expected a count, got {value}"),
                    })?;
                    Ok(Observation {
                        passed: comparator.apply(count, *n),
                        actual: json!(count),
                    })
                }
                Check::TextContains {
                    selector,
                    substring,
                } => {
                    let actual = probe.probe(&ProbeExpr::text(selector.clone())).await?;
                    let passed = actual
                        .as_str()
                        .is_some_and(|text| text.contains(substring.as_str()));
                    Ok(Observation { passed, actual })
                }
                Check::AttributeEquals {
                    selector,
                    name,
                    value,
                } => {
                    let actual = probe
                        .probe(&ProbeExpr::attribute(selector.clone(), name.clone()))
                        .await?;
                    Ok(Observation {
                        passed: actual.as_str() == Some(value.as_str()),
                        actual,
                    })
                }
                Check::AttributeContains {
                    selector,
                    name,
                    substring,
                } => {
                    let actual = probe
                        .probe(&ProbeExpr::attribute(selector.clone(), name.clone()))
                        .await?;
                    let passed = actual
                        .as_str()
                        .is_some_and(|attr| attr.contains(substring.as_str()));
                    Ok(Observation { passed, actual })
                }
                Check::FieldValueEquals { selector, value } => {
                    let actual = probe
                        .probe(&ProbeExpr::FieldValue {
                            selector: selector.clone(),
                        })
                        .await?;
                    Ok(Observation {
                        passed: actual.as_str() == Some(value.as_str()),
                        actual,
                    })
                }
                Check::StateEquals {
                    source,
                    path,
                    value,
                } => {
                    let actual = read_state(probe, source, path).await?;
                    Ok(Observation {
                        passed: &actual == value,
                        actual,
                    })
                }
                Check::Not { check } => {
                    let inner = check.evaluate(probe).await?;
                    Ok(Observation {
                        passed: !inner.passed,
                        actual: inner.actual,
                    })
                }
                Check::All { checks } => {
                    let mut passed = true;
                    let mut actuals = Vec::with_capacity(checks.len());
                    for check in checks {
                        let inner = check.evaluate(probe).await?;
                        passed &= inner.passed;
                        actuals.push(inner.actual);
                    }
                    Ok(Observation {
                        passed,
                        actual: Value::Array(actuals),
                    })
                }
                Check::Custom(custom) => {
                    let actual = match &custom.probe {
                        Some(expr) => probe.probe(expr).await?,
                        None => Value::Null,
                    };
                    Ok(Observation {
                        passed: (custom.evaluator)(&actual),
                        actual,
                    })
                }
            }
        })
    }
}

async fn read_state(probe: &dyn AppProbe, source: &StateSource, path: &str) -> Result<Value> {
    match source {
        StateSource::Store => {
            let (key, rest) = path.split_once('.').unwrap_or((path, ""));
            let root = probe.probe(&ProbeExpr::State { key: key.into() }).await?;
            Ok(lookup_path(&root, rest).cloned().unwrap_or(Value::Null))
        }
        StateSource::Request { name, payload } => {
            let response = probe
                .probe(&ProbeExpr::request(name.clone(), payload.clone()))
                .await?;
            Ok(lookup_path(&response, path).cloned().unwrap_or(Value::Null))
        }
    }
}

/// A check plus how its failure is treated.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Expectation {
    /// Report text; defaults to the check summary.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// The predicate.
    pub check: Check,

    /// Failure aborts the rest of the scenario.
    #[serde(default)]
    pub critical: bool,

    /// Failure does not fail the scenario.
    #[serde(default)]
    pub optional: bool,
}

impl Expectation {
    /// A soft, non-optional expectation.
    #[must_use]
    pub fn new(check: Check) -> Self {
        Self {
            description: None,
            check,
            critical: false,
            optional: false,
        }
    }

    /// Sets the report text.
    #[must_use]
    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Marks the expectation critical.
    #[must_use]
    pub fn critical(mut self) -> Self {
        self.critical = true;
        self
    }

    /// Marks the expectation optional.
    #[must_use]
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    fn description_or_summary(&self) -> String {
        self.description
            .clone()
            .unwrap_or_else(|| self.check.summary())
    }
}

/// An immutable pass/fail record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assertion {
    /// What was checked, in words.
    pub description: String,
    /// Check kind (`elementCount`, `stateEquals`, ...).
    pub predicate_kind: String,
    /// Selector or state path.
    pub target: String,
    /// Expected value.
    pub expected: Value,
    /// Observed value (`null` when nothing matched or the probe failed).
    pub actual: Value,
    /// Verdict.
    pub passed: bool,
    /// Failure aborted the scenario.
    #[serde(default)]
    pub critical: bool,
    /// Failure does not count against the scenario.
    #[serde(default)]
    pub optional: bool,
    /// Probe error, if evaluation itself failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Evaluation time.
    pub captured_at: DateTime<Utc>,
}

impl Assertion {
    /// Returns true if this assertion fails its scenario.
    #[must_use]
    pub fn is_blocking_failure(&self) -> bool {
        !self.passed && !self.optional
    }

    /// The automatic assertion derived from telemetry anomalies.
    #[must_use]
    pub fn from_anomalies(anomalies: &[TelemetryAnomaly]) -> Self {
        Self {
            description: "no disallowed telemetry".to_string(),
            predicate_kind: "telemetry".to_string(),
            target: "console".to_string(),
            expected: json!([]),
            actual: Value::Array(anomalies.iter().map(|a| json!(a.text)).collect()),
            passed: anomalies.is_empty(),
            critical: false,
            optional: false,
            error: None,
            captured_at: Utc::now(),
        }
    }
}

/// Evaluates expectations into assertions.
#[derive(Debug, Clone, Copy, Default)]
pub struct AssertionEngine;

impl AssertionEngine {
    /// Evaluates `expectation` once.
    ///
    /// Non-fatal probe errors become a failed assertion with the error text
    /// attached. Only framework errors are returned as `Err`.
    pub async fn assert(
        &self,
        probe: &dyn AppProbe,
        expectation: &Expectation,
    ) -> Result<Assertion> {
        let check = &expectation.check;
        let (passed, actual, error) = match check.evaluate(probe).await {
            Ok(observation) => (observation.passed, observation.actual, None),
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => (false, Value::Null, Some(e.to_string())),
        };

        let assertion = Assertion {
            description: expectation.description_or_summary(),
            predicate_kind: check.kind().to_string(),
            target: check.target(),
            expected: check.expected(),
            actual,
            passed,
            critical: expectation.critical,
            optional: expectation.optional,
            error,
            captured_at: Utc::now(),
        };

        if assertion.passed {
            tracing::debug!("assertion passed: {}", assertion.description);
        } else {
            tracing::debug!(
                "assertion failed: {} (expected {}, actual {})",
                assertion.description,
                assertion.expected,
                assertion.actual
            );
        }

        Ok(assertion)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;

    /// Answers probes from a fixed table; unknown probes return the
    /// "nothing matched" value.
    #[derive(Default)]
    struct TableProbe {
        answers: HashMap<String, Value>,
        fail_with: Option<fn() -> HarnessError>,
    }

    impl TableProbe {
        fn with(mut self, expr: ProbeExpr, value: Value) -> Self {
            self.answers.insert(expr.describe(), value);
            self
        }
    }

    #[async_trait]
    impl AppProbe for TableProbe {
        async fn probe(&self, expr: &ProbeExpr) -> Result<Value> {
            if let Some(make) = self.fail_with {
                return Err(make());
            }
            Ok(self
                .answers
                .get(&expr.describe())
                .cloned()
                .unwrap_or_else(|| match expr {
                    ProbeExpr::ElementCount { .. } => json!(0),
                    _ => Value::Null,
                }))
        }
    }

    #[test]
    fn comparators() {
        assert!(Comparator::Eq.apply(2, 2));
        assert!(Comparator::Ge.apply(3, 2));
        assert!(Comparator::Le.apply(2, 2));
        assert!(Comparator::Gt.apply(3, 2));
        assert!(!Comparator::Lt.apply(2, 2));
        assert_eq!(">=".parse::<Comparator>().unwrap(), Comparator::Ge);
        assert_eq!("==".parse::<Comparator>().unwrap(), Comparator::Eq);
        assert!("~".parse::<Comparator>().is_err());
    }

    #[tokio::test]
    async fn missing_selector_fails_with_zero_count() {
        let probe = TableProbe::default();
        let expectation = Expectation::new(Check::count(".dialog", Comparator::Ge, 1));

        let assertion = AssertionEngine.assert(&probe, &expectation).await.unwrap();
        assert!(!assertion.passed);
        assert_eq!(assertion.actual, json!(0));
        assert_eq!(assertion.predicate_kind, "elementCount");
        assert_eq!(assertion.expected, json!(">= 1"));
        assert!(assertion.error.is_none());
    }

    #[tokio::test]
    async fn text_and_attribute_checks() {
        let probe = TableProbe::default()
            .with(ProbeExpr::text(".status"), json!("Connected to router"))
            .with(
                ProbeExpr::attribute("[data-section=\"gpu\"]", "class"),
                json!("section loading-skeleton"),
            );

        let text = AssertionEngine
            .assert(&probe, &Expectation::new(Check::text_contains(".status", "Connected")))
            .await
            .unwrap();
        assert!(text.passed);

        let attr = AssertionEngine
            .assert(
                &probe,
                &Expectation::new(Check::not(Check::attribute_contains(
                    "[data-section=\"gpu\"]",
                    "class",
                    "loading-skeleton",
                ))),
            )
            .await
            .unwrap();
        assert!(!attr.passed);
        assert_eq!(attr.actual, json!("section loading-skeleton"));

        let missing = AssertionEngine
            .assert(
                &probe,
                &Expectation::new(Check::attribute_equals(".nope", "id", "x")),
            )
            .await
            .unwrap();
        assert!(!missing.passed);
        assert_eq!(missing.actual, Value::Null);
    }

    #[tokio::test]
    async fn state_equals_reads_nested_paths() {
        let probe = TableProbe::default()
            .with(
                ProbeExpr::State {
                    key: "config".into(),
                },
                json!({"host": "127.0.0.1", "port": 8080}),
            )
            .with(
                ProbeExpr::request("config:get", json!({})),
                json!({"success": true, "data": {"config": {"host": "127.0.0.1"}}}),
            );

        let store = AssertionEngine
            .assert(
                &probe,
                &Expectation::new(Check::state_equals("config.port", json!(8080))),
            )
            .await
            .unwrap();
        assert!(store.passed);
        assert_eq!(store.target, "state.config.port");

        let response = AssertionEngine
            .assert(
                &probe,
                &Expectation::new(Check::all([
                    Check::response_equals("config:get", json!({}), "success", json!(true)),
                    Check::response_equals(
                        "config:get",
                        json!({}),
                        "data.config.host",
                        json!("127.0.0.1"),
                    ),
                ])),
            )
            .await
            .unwrap();
        assert!(response.passed);
        assert_eq!(response.actual, json!([true, "127.0.0.1"]));
    }

    #[tokio::test]
    async fn custom_predicate_uses_description() {
        let probe = TableProbe::default().with(ProbeExpr::count(".card"), json!(4));
        let check = Check::custom(
            "an even number of cards",
            Some(ProbeExpr::count(".card")),
            |v| v.as_u64().is_some_and(|n| n % 2 == 0),
        );

        let assertion = AssertionEngine
            .assert(&probe, &Expectation::new(check))
            .await
            .unwrap();
        assert!(assertion.passed);
        assert_eq!(assertion.description, "an even number of cards");
        assert_eq!(assertion.predicate_kind, "customPredicate");
    }

    #[tokio::test]
    async fn script_errors_become_failed_assertions() {
        let probe = TableProbe {
            fail_with: Some(|| HarnessError::ScriptExecutionFailed("SyntaxError".into())),
            ..TableProbe::default()
        };

        let assertion = AssertionEngine
            .assert(
                &probe,
                &Expectation::new(Check::count("div[", Comparator::Eq, 0)).optional(),
            )
            .await
            .unwrap();
        assert!(!assertion.passed);
        assert!(assertion.optional);
        assert!(!assertion.is_blocking_failure());
        assert!(assertion.error.as_deref().unwrap().contains("SyntaxError"));
    }

    #[tokio::test]
    async fn fatal_errors_propagate() {
        let probe = TableProbe {
            fail_with: Some(|| HarnessError::ProcessTerminated),
            ..TableProbe::default()
        };

        let result = AssertionEngine
            .assert(&probe, &Expectation::new(Check::count("#app", Comparator::Eq, 1)))
            .await;
        assert!(matches!(result, Err(HarnessError::ProcessTerminated)));
    }

    #[test]
    fn checks_deserialize_from_json() {
        let expectation: Expectation = serde_json::from_str(
            r#"{
                "description": "skeleton visible",
                "critical": true,
                "check": {
                    "kind": "elementCount",
                    "selector": "[class*=\"loading-skeleton\"]",
                    "comparator": ">=",
                    "n": 1
                }
            }"#,
        )
        .unwrap();
        assert!(expectation.critical);
        assert_eq!(expectation.check.kind(), "elementCount");

        let check: Check = serde_json::from_str(
            r#"{"kind": "stateEquals", "source": {"from": "request", "name": "config:get"},
                "path": "data.config.host", "value": "127.0.0.1"}"#,
        )
        .unwrap();
        assert_eq!(check.target(), "request(config:get).data.config.host");
    }

    #[test]
    fn anomaly_assertion_lists_offending_text() {
        let passing = Assertion::from_anomalies(&[]);
        assert!(passing.passed);

        let failing = Assertion::from_anomalies(&[TelemetryAnomaly {
            seq: 3,
            channel: crate::telemetry::Channel::Console,
            reason: crate::policy::AnomalyReason::Severity(crate::telemetry::Severity::Error),
            text: "Uncaught ReferenceError".into(),
        }]);
        assert!(!failing.passed);
        assert_eq!(failing.actual, json!(["Uncaught ReferenceError"]));
    }
}
