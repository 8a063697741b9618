//! Run command implementation.

use crate::cli::RunArgs;
use crate::commands::Outcome;
use crate::config::GlanceConfig;
use crate::error::{CliError, ConfigError, Result, ResultExt};
use crate::ui;
use glance_harness::{
    ChromeLauncher, Harness, REPORT_FILE, Scenario, parse_scenarios, scenario_set,
};
use std::collections::HashSet;
use std::sync::Arc;

/// Set run when neither a set nor a scenario file is given.
pub const DEFAULT_SET: &str = "all";

/// Resolves the scenarios to run.
///
/// The named set (or `all` when no scenario file is configured) comes first,
/// followed by the scenario file's scenarios. Names must be unique across
/// both.
///
/// # Errors
///
/// Unknown set names, unreadable or invalid scenario files, and duplicate
/// scenario names.
pub fn select_scenarios(set: Option<&str>, config: &GlanceConfig) -> Result<Vec<Scenario>> {
    let milestones = config.milestone_options();
    let set = match (set, &config.scenario_file) {
        (Some(name), _) => Some(name),
        (None, None) => Some(DEFAULT_SET),
        (None, Some(_)) => None,
    };

    let mut scenarios = match set {
        Some(name) => scenario_set(name, &config.contract, &milestones)
            .with_hint("Run `glance list` to see the available sets")?,
        None => Vec::new(),
    };

    if let Some(path) = &config.scenario_file {
        let content = std::fs::read_to_string(path).with_path(path)?;
        let from_file = parse_scenarios(&content)
            .context(format!("Invalid scenario file {}", path.display()))?;
        tracing::debug!(
            "Loaded {} scenario(s) from {}",
            from_file.len(),
            path.display()
        );
        scenarios.extend(from_file);
    }

    let mut seen = HashSet::new();
    if let Some(duplicate) = scenarios.iter().find(|s| !seen.insert(s.name.as_str())) {
        return Err(CliError::InvalidArgument(format!(
            "scenario '{}' is defined more than once",
            duplicate.name
        )));
    }

    Ok(scenarios)
}

/// Execute the run command.
///
/// # Steps
///
/// 1. Load and validate configuration
/// 2. Resolve the scenario set and scenario file
/// 3. Run every scenario (health check first, then one browser per scenario)
/// 4. Print the summary; report.json and screenshots are in the output dir
///
/// # Errors
///
/// Configuration errors and framework failures (browser launch, unreachable
/// target). Failing scenarios are not errors; they yield
/// [`Outcome::Failed`].
pub async fn execute(args: RunArgs) -> Result<Outcome> {
    let config = GlanceConfig::load(&args)?;
    config.validate()?;

    let scenarios = select_scenarios(args.set.as_deref(), &config)?;
    let target = config.target().ok_or_else(|| ConfigError::MissingField {
        field: "baseUrl".to_string(),
        hint: "Pass --base-url or set baseUrl in glance.config.json".to_string(),
    })?;

    ui::info(&format!(
        "Running {} scenario{} against {}",
        scenarios.len(),
        if scenarios.len() == 1 { "" } else { "s" },
        config.base_url.as_deref().unwrap_or_default()
    ));
    tracing::debug!(
        "Parallelism {}, output in {}",
        config.parallel,
        config.out_dir.display()
    );

    let harness = Harness::new(
        Arc::new(ChromeLauncher::new()),
        Arc::new(target),
        config.harness_options(),
    );

    let report = tokio::select! {
        report = harness.run(scenarios) => report?,
        _ = tokio::signal::ctrl_c() => {
            return Err(CliError::Custom("Interrupted; no report was written".to_string()));
        }
    };

    print!("{}", ui::render_report(&report, false));
    println!(
        "  Report: {}",
        config.out_dir.join(REPORT_FILE).display()
    );

    let outcome = Outcome::from(&report);
    match outcome {
        Outcome::Passed => ui::success("All scenarios passed"),
        Outcome::Failed => ui::error(&format!(
            "{} of {} scenarios failed",
            report.summary.failed, report.summary.total
        )),
    }
    Ok(outcome)
}
