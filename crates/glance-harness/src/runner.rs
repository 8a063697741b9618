//! Runs scenarios and aggregates their results.
//!
//! Every scenario gets its own [`Session`]. Scenarios run one at a time by
//! default or, with `parallelism > 1`, on a [`JoinSet`] bounded by a
//! semaphore. Scenario-scoped problems (failed navigation, missing element,
//! failed assertion, even a panic) end up in the scenario's
//! result. Framework errors abort the run and are returned.

use futures::FutureExt;
use serde_json::{Value, json};
use std::any::Any;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::{Instant, sleep};
use tracing::{debug, error, info, warn};

use crate::artifacts::ArtifactStore;
use crate::assertion::{Assertion, AssertionEngine};
use crate::error::{HarnessError, Result};
use crate::probe::Action;
use crate::report::{Report, ReportAggregator, ScenarioResult};
use crate::scenario::{NavigationPolicy, Scenario, Step};
use crate::session::{Launcher, Session, SessionOptions};
use crate::target::Target;
use crate::telemetry::{Channel, TelemetryQuery, TelemetryRecord};

/// Run-wide settings.
#[derive(Debug, Clone)]
pub struct HarnessOptions {
    /// Options for every session.
    pub session: SessionOptions,
    /// Maximum number of scenarios (and browsers) at once.
    pub parallelism: usize,
    /// Where `report.json` and screenshots go.
    pub output_dir: PathBuf,
}

impl Default for HarnessOptions {
    fn default() -> Self {
        Self {
            session: SessionOptions::default(),
            parallelism: 1,
            output_dir: PathBuf::from("glance-results"),
        }
    }
}

/// Runs scenarios against one target.
pub struct Harness {
    launcher: Arc<dyn Launcher>,
    target: Arc<dyn Target>,
    options: HarnessOptions,
}

impl Harness {
    /// Creates a harness.
    pub fn new(
        launcher: Arc<dyn Launcher>,
        target: Arc<dyn Target>,
        options: HarnessOptions,
    ) -> Self {
        Self {
            launcher,
            target,
            options,
        }
    }

    /// Run-wide settings.
    #[must_use]
    pub fn options(&self) -> &HarnessOptions {
        &self.options
    }

    /// Runs `scenarios` and writes the report.
    ///
    /// # Errors
    ///
    /// `InvalidScenario` before anything starts, a failed target health
    /// check, a framework error from any scenario (remaining scenarios are
    /// cancelled), or a report write failure.
    pub async fn run(&self, scenarios: Vec<Scenario>) -> Result<Report> {
        for scenario in &scenarios {
            scenario.validate()?;
        }

        self.target.health_check().await?;
        let store = Arc::new(ArtifactStore::open(&self.options.output_dir)?);
        let aggregator = ReportAggregator::new();
        let permits = Arc::new(Semaphore::new(self.options.parallelism.max(1)));

        info!(
            "Running {} scenario(s) against {} (parallelism {})",
            scenarios.len(),
            self.target.base_url(),
            self.options.parallelism.max(1)
        );

        let mut tasks = JoinSet::new();
        let mut names = HashMap::new();
        for scenario in scenarios {
            let runner = ScenarioRunner {
                launcher: self.launcher.clone(),
                base_url: self.target.base_url().to_string(),
                options: self.options.session.clone(),
                store: store.clone(),
            };
            let permits = permits.clone();
            let identity = (scenario.name.clone(), scenario.description.clone());

            let handle = tasks.spawn(async move {
                let _permit = permits
                    .acquire_owned()
                    .await
                    .map_err(|_| HarnessError::ScenarioAborted(scenario.name.clone()))?;
                match AssertUnwindSafe(runner.run(&scenario)).catch_unwind().await {
                    Ok(outcome) => outcome,
                    Err(panic) => Ok(crashed(&scenario, &panic_message(panic.as_ref()))),
                }
            });
            names.insert(handle.id(), identity);
        }

        while let Some(joined) = tasks.join_next_with_id().await {
            match joined {
                Ok((id, Ok(result))) => {
                    names.remove(&id);
                    aggregator.add_scenario(result);
                }
                Ok((_, Err(e))) => {
                    error!("Aborting run: {e}");
                    tasks.abort_all();
                    while tasks.join_next().await.is_some() {}
                    return Err(e);
                }
                Err(join_error) => {
                    let Some((name, description)) = names.remove(&join_error.id()) else {
                        warn!("Unknown scenario task did not complete: {join_error}");
                        continue;
                    };
                    error!("Scenario '{name}' task did not complete: {join_error}");
                    let mut result = ScenarioResult::new(name, description);
                    result.errors.push(format!("scenario task failed: {join_error}"));
                    result.seal();
                    aggregator.add_scenario(result);
                }
            }
        }

        aggregator.finalize(&self.options.output_dir)
    }
}

/// Everything one scenario task needs.
struct ScenarioRunner {
    launcher: Arc<dyn Launcher>,
    base_url: String,
    options: SessionOptions,
    store: Arc<ArtifactStore>,
}

/// Whether the step loop keeps going.
enum Flow {
    Next,
    Stop,
}

impl ScenarioRunner {
    /// Runs one scenario on a fresh session. Only framework errors are
    /// returned; everything else is recorded in the result.
    async fn run(&self, scenario: &Scenario) -> Result<ScenarioResult> {
        let started = Instant::now();
        let mut result = ScenarioResult::new(&scenario.name, scenario.description.clone());
        info!("Starting scenario '{}'", scenario.name);

        let mut session =
            Session::open(self.launcher.as_ref(), &self.base_url, self.options.clone()).await?;

        let outcome = AssertUnwindSafe(self.execute(&mut session, scenario, &mut result))
            .catch_unwind()
            .await;

        let fatal = match outcome {
            Ok(Ok(())) => None,
            Ok(Err(e)) => Some(e),
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                error!("Scenario '{}' panicked: {message}", scenario.name);
                result.errors.push(format!("scenario panicked: {message}"));
                None
            }
        };

        if fatal.is_none() {
            let finished = AssertUnwindSafe(self.finish(&session, scenario, &mut result))
                .catch_unwind()
                .await;
            if let Err(panic) = finished {
                let message = panic_message(panic.as_ref());
                error!("Scenario '{}' panicked while finishing: {message}", scenario.name);
                result.errors.push(format!("scenario panicked: {message}"));
            }
        }

        if let Err(e) = session.close().await {
            warn!("Failed to close session for '{}': {e}", scenario.name);
        }
        if let Some(e) = fatal {
            return Err(e);
        }

        result.duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        result.seal();
        Ok(result)
    }

    async fn execute(
        &self,
        session: &mut Session,
        scenario: &Scenario,
        result: &mut ScenarioResult,
    ) -> Result<()> {
        for (index, step) in scenario.steps.iter().enumerate() {
            debug!(
                "[{}] step {}/{}: {}",
                scenario.name,
                index + 1,
                scenario.steps.len(),
                step.label()
            );

            match self.step(session, scenario, step, result).await {
                Ok(Flow::Next) => {}
                Ok(Flow::Stop) => {
                    info!(
                        "[{}] critical assertion failed; skipping {} remaining step(s)",
                        scenario.name,
                        scenario.steps.len() - index - 1
                    );
                    break;
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    warn!("[{}] {} failed: {e}", scenario.name, step.label());
                    result.errors.push(format!("{}: {e}", step.label()));
                    if scenario.navigation == NavigationPolicy::Abort {
                        break;
                    }
                }
            }
        }
        Ok(())
    }

    async fn step(
        &self,
        session: &mut Session,
        scenario: &Scenario,
        step: &Step,
        result: &mut ScenarioResult,
    ) -> Result<Flow> {
        match step {
            Step::Navigate { path, wait } => session.navigate_with(path, *wait).await?,
            Step::Reload { wait } => session.reload(*wait).await?,
            Step::Click { selector } => {
                session
                    .act(&Action::Click {
                        selector: selector.clone(),
                    })
                    .await?;
            }
            Step::Fill { selector, value } => {
                session
                    .act(&Action::Fill {
                        selector: selector.clone(),
                        value: value.clone(),
                    })
                    .await?;
            }
            Step::Request {
                name,
                payload,
                expect_success,
            } => {
                let response = session.request(name, payload.clone()).await?;
                if *expect_success {
                    result.assertions.push(request_succeeded(name, &response));
                }
            }
            Step::Pause { ms } => sleep(Duration::from_millis(*ms)).await,
            Step::Milestones {
                milestones,
                poll_interval_ms,
            } => {
                let records = session
                    .track(milestones, poll_interval_ms.map(Duration::from_millis))
                    .await?;
                for record in &records {
                    debug!(
                        "[{}] milestone {}: detected={} elapsed={}ms",
                        scenario.name, record.name, record.detected, record.elapsed_ms
                    );
                }
                result.milestones.extend(records);
            }
            Step::Assert(expectation) => {
                let assertion = AssertionEngine.assert(&*session, expectation).await?;
                let stop = expectation.critical && !assertion.passed;
                result.assertions.push(assertion);
                if stop {
                    return Ok(Flow::Stop);
                }
            }
            Step::Screenshot { label } => self.capture(session, &scenario.name, label, result).await,
            Step::ClearTelemetry => session.telemetry().clear(),
        }
        Ok(Flow::Next)
    }

    /// Telemetry verdict, telemetry slice and the failure screenshot.
    async fn finish(&self, session: &Session, scenario: &Scenario, result: &mut ScenarioResult) {
        let snapshot = session.telemetry().query(TelemetryQuery::new());
        let anomalies = scenario.telemetry.anomalies(&snapshot);
        for anomaly in &anomalies {
            debug!("[{}] telemetry anomaly: {}", scenario.name, anomaly.text);
        }
        result.assertions.push(Assertion::from_anomalies(&anomalies));
        result.telemetry = snapshot.iter().filter(|r| reportable(r)).cloned().collect();

        if scenario.screenshot_on_failure && !result.evaluate_passed() {
            self.capture(session, &scenario.name, "failure", result).await;
        }
    }

    /// Screenshot failures never fail the scenario.
    async fn capture(&self, session: &Session, scenario: &str, label: &str, result: &mut ScenarioResult) {
        let saved = match session.screenshot().await {
            Ok(png) => self.store.save(scenario, label, &png),
            Err(e) => Err(e),
        };
        match saved {
            Ok(path) => result.screenshots.push(path),
            Err(e) => warn!("[{scenario}] screenshot '{label}' failed: {e}"),
        }
    }
}

/// Console records plus network records worth reading.
fn reportable(record: &TelemetryRecord) -> bool {
    record.channel == Channel::Console || record.severity.is_warning_or_error()
}

fn request_succeeded(name: &str, response: &Value) -> Assertion {
    let actual = response.get("success").cloned().unwrap_or(Value::Null);
    Assertion {
        description: format!("request {name} succeeds"),
        predicate_kind: "requestSucceeds".to_string(),
        target: format!("request({name})"),
        expected: json!(true),
        passed: actual == Value::Bool(true),
        actual,
        critical: false,
        optional: false,
        error: response
            .get("error")
            .filter(|e| !e.is_null())
            .map(|e| e.as_str().map_or_else(|| e.to_string(), str::to_string)),
        captured_at: chrono::Utc::now(),
    }
}

/// The result of a scenario whose task panicked outside its steps.
fn crashed(scenario: &Scenario, message: &str) -> ScenarioResult {
    error!("Scenario '{}' panicked: {message}", scenario.name);
    let mut result = ScenarioResult::new(&scenario.name, scenario.description.clone());
    result.errors.push(format!("scenario panicked: {message}"));
    result.seal();
    result
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    panic
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic payload".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_assertions_read_the_success_flag() {
        let ok = request_succeeded("config:get", &json!({"success": true, "data": {}}));
        assert!(ok.passed);
        assert_eq!(ok.error, None);

        let failed = request_succeeded(
            "config:get",
            &json!({"success": false, "error": "not allowed"}),
        );
        assert!(!failed.passed);
        assert_eq!(failed.error.as_deref(), Some("not allowed"));

        let garbage = request_succeeded("config:get", &Value::Null);
        assert!(!garbage.passed);
        assert_eq!(garbage.actual, Value::Null);
    }

    #[test]
    fn only_console_and_problem_network_records_are_reported() {
        use crate::telemetry::Severity;

        assert!(reportable(&TelemetryRecord::console(Severity::Log, "ready")));
        assert!(!reportable(&TelemetryRecord::network(
            Severity::Info,
            "GET",
            "http://localhost:3000/api/metrics"
        )));
        assert!(reportable(&TelemetryRecord::network(
            Severity::Error,
            "GET",
            "http://localhost:3000/api/gpu"
        )));
    }

    #[test]
    fn panic_messages() {
        let boxed: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(boxed.as_ref()), "boom");
        let boxed: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(boxed.as_ref()), "bang");
        let boxed: Box<dyn Any + Send> = Box::new(7_u8);
        assert_eq!(panic_message(boxed.as_ref()), "unknown panic payload");
    }
}
