//! Built-in scenario sets for the dashboard.
//!
//! | set         | verifies                                                       |
//! |-------------|----------------------------------------------------------------|
//! | `dashboard` | skeleton, first data and full load milestones; clean console   |
//! | `settings`  | the host setting survives a reload and is served by the server |
//! | `smoke`     | app root present, live connection up, clean console            |
//! | `all`       | every set above, in that order                                 |

use serde_json::{Value, json};

use crate::assertion::{Check, Comparator, Expectation};
use crate::contract::DashboardContract;
use crate::error::{HarnessError, Result};
use crate::milestone::{Milestone, MilestoneOptions};
use crate::probe::ProbeExpr;
use crate::scenario::Scenario;
use crate::session::NavigationWait;

/// Name and one-line description of every built-in set.
pub const SETS: &[(&str, &str)] = &[
    (
        "dashboard",
        "Asynchronous loading milestones of the dashboard view and a clean console",
    ),
    (
        "settings",
        "Host setting persists across a reload and matches the server's config",
    ),
    (
        "smoke",
        "Application root renders, live connection is up, console is clean",
    ),
    ("all", "dashboard, settings and smoke"),
];

/// How long the settings view waits for the save to reach the server.
const SAVE_SETTLE_MS: u64 = 500;

/// Returns the scenarios of set `name`.
///
/// # Errors
///
/// `InvalidScenario` for an unknown set name.
pub fn scenario_set(
    name: &str,
    contract: &DashboardContract,
    milestones: &MilestoneOptions,
) -> Result<Vec<Scenario>> {
    match name {
        "dashboard" => Ok(vec![dashboard(contract, milestones)?]),
        "settings" => Ok(vec![settings(contract, milestones)?]),
        "smoke" => Ok(vec![smoke(contract)?]),
        "all" => Ok(vec![
            dashboard(contract, milestones)?,
            settings(contract, milestones)?,
            smoke(contract)?,
        ]),
        other => Err(HarnessError::InvalidScenario {
            name: other.to_string(),
            reason: format!(
                "unknown scenario set (expected one of: {})",
                SETS.iter().map(|(n, _)| *n).collect::<Vec<_>>().join(", ")
            ),
        }),
    }
}

/// The dashboard's asynchronous loading sequence.
///
/// Navigation only waits for the load event: the skeleton deadline is
/// shorter than any network-idle window.
///
/// # Errors
///
/// Never in practice; the scenario is validated like any other.
pub fn dashboard(contract: &DashboardContract, milestones: &MilestoneOptions) -> Result<Scenario> {
    Scenario::builder("dashboard-loading")
        .describe("Skeleton placeholders appear, then data replaces them section by section")
        .navigate_with(&contract.dashboard_path, NavigationWait::Load)
        .milestones_every(
            contract.loading_milestones(milestones),
            milestones.poll_interval_ms,
        )
        .expect(
            Expectation::new(Check::count(&contract.app_root, Comparator::Eq, 1))
                .describe("application root rendered once"),
        )
        .expect(
            Expectation::new(Check::count(
                contract.skeleton_selector(),
                Comparator::Eq,
                0,
            ))
            .describe("no skeleton placeholders left"),
        )
        .screenshot("loaded")
        .build()
}

/// The host-setting persistence round-trip.
///
/// # Errors
///
/// Never in practice; the scenario is validated like any other.
pub fn settings(contract: &DashboardContract, milestones: &MilestoneOptions) -> Result<Scenario> {
    let host = contract.field(&contract.host_field);
    let form_ready = || {
        vec![Milestone::new(
            "settings-form-ready",
            Check::count(host.clone(), Comparator::Ge, 1),
            milestones.first_data_deadline_ms,
        )]
    };

    Scenario::builder("settings-persistence")
        .describe("A saved host survives a reload and is returned by the config request")
        .navigate(&contract.settings_path)
        .milestones_every(form_ready(), milestones.poll_interval_ms)
        .fill(host.clone(), &contract.host_value)
        .click(contract.action(&contract.save_action))
        .pause(SAVE_SETTLE_MS)
        .reload()
        .milestones_every(form_ready(), milestones.poll_interval_ms)
        .expect(
            Expectation::new(Check::field_value(host.clone(), &contract.host_value))
                .describe(format!("{} persists across reload", contract.host_field)),
        )
        .expect(
            Expectation::new(Check::response_equals(
                &contract.config_request,
                Value::Null,
                "success",
                json!(true),
            ))
            .describe(format!("{} succeeds", contract.config_request))
            .critical(),
        )
        .expect(
            Expectation::new(Check::response_equals(
                &contract.config_request,
                Value::Null,
                format!("data.config.{}", contract.host_field),
                json!(contract.host_value),
            ))
            .describe(format!(
                "{} returns the saved {}",
                contract.config_request, contract.host_field
            )),
        )
        .build()
}

/// Minimal liveness check.
///
/// # Errors
///
/// Never in practice; the scenario is validated like any other.
pub fn smoke(contract: &DashboardContract) -> Result<Scenario> {
    Scenario::builder("smoke")
        .describe("The application renders and connects")
        .navigate(&contract.dashboard_path)
        .expect(
            Expectation::new(Check::count(&contract.app_root, Comparator::Eq, 1))
                .describe("application root rendered once")
                .critical(),
        )
        .expect(
            Expectation::new(Check::custom(
                "live connection established",
                Some(ProbeExpr::Script {
                    source: contract.connection_probe.clone(),
                }),
                |value| value == &Value::Bool(true),
            ))
            .describe("live connection established"),
        )
        .screenshot("smoke")
        .build()
}
