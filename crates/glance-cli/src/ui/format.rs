//! Formatting of durations, scenario sets and reports.

use super::paint;
use glance_harness::{Assertion, MilestoneRecord, Report, ScenarioResult};
use owo_colors::OwoColorize;
use serde_json::Value;
use std::fmt::Write as _;
use std::time::Duration;

const RULE_WIDTH: usize = 60;

/// Format duration in human-readable format.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use glance_cli::ui::format_duration;
///
/// assert_eq!(format_duration(Duration::from_millis(50)), "50ms");
/// assert_eq!(format_duration(Duration::from_millis(1500)), "1.50s");
/// assert_eq!(format_duration(Duration::from_secs(90)), "1m 30s");
/// ```
pub fn format_duration(duration: Duration) -> String {
    let total_ms = duration.as_millis();

    if total_ms < 1000 {
        format!("{total_ms}ms")
    } else if total_ms < 60_000 {
        format!("{:.2}s", duration.as_secs_f64())
    } else {
        let secs = duration.as_secs();
        format!("{}m {}s", secs / 60, secs % 60)
    }
}

fn ms(value: u64) -> String {
    format_duration(Duration::from_millis(value))
}

fn rule() -> String {
    paint("─".repeat(RULE_WIDTH), |t| t.dimmed().to_string())
}

fn mark(passed: bool) -> String {
    if passed {
        paint("✓", |t| t.green().bold().to_string())
    } else {
        paint("✗", |t| t.red().bold().to_string())
    }
}

/// Renders a JSON value compactly; strings keep their quotes.
fn compact(value: &Value) -> String {
    match value {
        Value::Null => "nothing".to_string(),
        other => other.to_string(),
    }
}

/// One line describing a milestone outcome.
fn milestone_line(record: &MilestoneRecord) -> String {
    let outcome = match (record.detected_at_ms, record.budget_ms) {
        (None, _) => format!("not detected within {}", ms(record.deadline_ms)),
        (Some(at), Some(budget)) if !record.within_budget => {
            format!("detected at {}, over its {} budget", ms(at), ms(budget))
        }
        (Some(at), Some(budget)) => format!("detected at {} (budget {})", ms(at), ms(budget)),
        (Some(at), None) => format!("detected at {}", ms(at)),
    };
    let optional = if record.required { "" } else { " (optional)" };
    format!(
        "{} {}{} {}",
        mark(!record.is_failure()),
        record.name,
        optional,
        paint(outcome, |t| t.dimmed().to_string())
    )
}

/// One line describing an assertion outcome.
fn assertion_line(assertion: &Assertion) -> String {
    let mut line = format!("{} {}", mark(assertion.passed), assertion.description);
    if assertion.optional {
        line.push_str(" (optional)");
    }
    if !assertion.passed {
        let detail = match &assertion.error {
            Some(error) => error.clone(),
            None => format!(
                "expected {}, got {}",
                compact(&assertion.expected),
                compact(&assertion.actual)
            ),
        };
        let _ = write!(line, ": {}", paint(detail, |t| t.red().to_string()));
    }
    line
}

fn render_scenario(out: &mut String, result: &ScenarioResult, all: bool) {
    let _ = writeln!(
        out,
        "  {} {} {}",
        mark(result.passed),
        paint(&result.name, |t| t.bold().to_string()),
        paint(format!("({})", ms(result.duration_ms)), |t| t.dimmed().to_string())
    );

    for record in &result.milestones {
        if all || record.is_failure() {
            let _ = writeln!(out, "      {}", milestone_line(record));
        }
    }
    for assertion in &result.assertions {
        if all || !assertion.passed {
            let _ = writeln!(out, "      {}", assertion_line(assertion));
        }
    }
    for error in &result.errors {
        let _ = writeln!(
            out,
            "      {} {}",
            mark(false),
            paint(error, |t| t.red().to_string())
        );
    }
    if all {
        for screenshot in &result.screenshots {
            let _ = writeln!(
                out,
                "      {}",
                paint(screenshot.display(), |t| t.dimmed().to_string())
            );
        }
    }
}

/// Renders the human-readable summary of a report.
///
/// Failing scenarios list their failed milestones, assertions and errors;
/// with `all`, every record and screenshot is listed.
pub fn render_report(report: &Report, all: bool) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "\n{}",
        paint("Scenario Results", |t| t.bold().underline().to_string())
    );
    let _ = writeln!(out, "{}", rule());

    for result in &report.scenarios {
        render_scenario(&mut out, result, all);
    }

    let _ = writeln!(out, "{}", rule());
    let summary = &report.summary;
    let passed = paint(format!("{} passed", summary.passed), |t| t.green().to_string());
    let failed = if summary.failed == 0 {
        format!("{} failed", summary.failed)
    } else {
        paint(format!("{} failed", summary.failed), |t| t.red().bold().to_string())
    };
    let _ = writeln!(
        out,
        "  {} {} scenario{}: {passed}, {failed}",
        paint("Total:", |t| t.bold().to_string()),
        summary.total,
        if summary.total == 1 { "" } else { "s" }
    );
    out
}

/// Renders the list of built-in scenario sets.
pub fn render_sets(sets: &[(&str, &str)]) -> String {
    let width = sets.iter().map(|(name, _)| name.len()).max().unwrap_or(0);
    let mut out = String::new();
    for (name, description) in sets {
        let _ = writeln!(
            out,
            "  {}  {}",
            paint(format!("{name:<width$}"), |t| t.bold().to_string()),
            description
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    fn assertion(description: &str, passed: bool, expected: Value, actual: Value) -> Assertion {
        Assertion {
            description: description.to_string(),
            predicate_kind: "count".to_string(),
            target: "#app".to_string(),
            expected,
            actual,
            passed,
            critical: false,
            optional: false,
            error: None,
            captured_at: Utc::now(),
        }
    }

    fn milestone(name: &str, detected_at_ms: Option<u64>, within_budget: bool) -> MilestoneRecord {
        MilestoneRecord {
            name: name.to_string(),
            required: true,
            detected: detected_at_ms.is_some(),
            detected_at_ms,
            elapsed_ms: detected_at_ms.unwrap_or(6_000),
            deadline_ms: 6_000,
            budget_ms: Some(2_000),
            within_budget,
        }
    }

    fn report() -> Report {
        let mut loading = ScenarioResult::new("dashboard-loading", None);
        loading.milestones = vec![
            milestone("skeleton-rendered", Some(80), true),
            milestone("first-data-visible", Some(2_600), false),
        ];
        loading.assertions = vec![assertion("no skeleton left", false, json!(0), json!(2))];
        loading.duration_ms = 3_120;
        loading.seal();

        let mut smoke = ScenarioResult::new("smoke", None);
        smoke.assertions = vec![assertion("application root rendered once", true, json!(1), json!(1))];
        smoke.duration_ms = 420;
        smoke.seal();

        Report::new(vec![loading, smoke])
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_millis(0)), "0ms");
        assert_eq!(format_duration(Duration::from_millis(999)), "999ms");
        assert_eq!(format_duration(Duration::from_millis(1000)), "1.00s");
        assert_eq!(format_duration(Duration::from_secs(125)), "2m 5s");
    }

    #[test]
    fn test_milestone_lines() {
        assert_eq!(
            milestone_line(&milestone("first-data-visible", Some(1_200), true)),
            "✓ first-data-visible detected at 1.20s (budget 2.00s)"
        );
        assert_eq!(
            milestone_line(&milestone("first-data-visible", Some(2_600), false)),
            "✗ first-data-visible detected at 2.60s, over its 2.00s budget"
        );
        assert_eq!(
            milestone_line(&milestone("full-load-complete", None, false)),
            "✗ full-load-complete not detected within 6.00s"
        );
    }

    #[test]
    fn test_assertion_lines() {
        assert_eq!(
            assertion_line(&assertion("no skeleton left", false, json!(0), json!(2))),
            "✗ no skeleton left: expected 0, got 2"
        );

        let mut errored = assertion("config:get succeeds", false, json!(true), Value::Null);
        errored.error = Some("not allowed".to_string());
        assert_eq!(assertion_line(&errored), "✗ config:get succeeds: not allowed");

        let mut missing = assertion("host persists", false, json!("10.0.0.5"), Value::Null);
        missing.optional = true;
        assert_eq!(
            assertion_line(&missing),
            "✗ host persists (optional): expected \"10.0.0.5\", got nothing"
        );
    }

    #[test]
    fn test_render_report_lists_failures_only() {
        let text = render_report(&report(), false);

        assert!(text.contains("✗ dashboard-loading (3.12s)"));
        assert!(text.contains("first-data-visible detected at 2.60s, over its 2.00s budget"));
        assert!(!text.contains("skeleton-rendered"));
        assert!(text.contains("no skeleton left: expected 0, got 2"));
        assert!(text.contains("✓ smoke (420ms)"));
        assert!(!text.contains("application root rendered once"));
        assert!(text.contains("Total: 2 scenarios: 1 passed, 1 failed"));
    }

    #[test]
    fn test_render_report_all() {
        let text = render_report(&report(), true);
        assert!(text.contains("✓ skeleton-rendered detected at 80ms"));
        assert!(text.contains("✓ application root rendered once"));
    }

    #[test]
    fn test_render_sets_aligns_names() {
        let text = render_sets(&[("smoke", "quick"), ("dashboard", "loading")]);
        assert_eq!(text, "  smoke      quick\n  dashboard  loading\n");
    }
}
