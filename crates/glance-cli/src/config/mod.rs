//! Configuration system for glance with multi-source loading.
//!
//! Merges settings from CLI args, environment variables, and config files.
//! Priority: CLI > Environment (`GLANCE_*`) > File > Defaults

mod loading;
mod validation;

use glance_harness::{
    DashboardContract, HarnessOptions, MilestoneOptions, SessionOptions, StaticTarget, Viewport,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub use loading::{CONFIG_FILE, ENV_PREFIX};

/// Glance configuration - loaded from glance.config.json, `GLANCE_*`
/// environment variables and CLI args.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct GlanceConfig {
    /// Base URL of the running dashboard (required to run)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Run the browser without a window
    pub headless: bool,

    /// Where report.json and screenshots go
    pub out_dir: PathBuf,

    /// Maximum number of scenarios at once
    pub parallel: usize,

    /// Skeleton placeholders must appear within this
    pub skeleton_deadline_ms: u64,

    /// Hard ceiling for the first data section
    pub first_data_deadline_ms: u64,

    /// Hard ceiling for every section
    pub full_load_deadline_ms: u64,

    /// Poll interval for milestone predicates and waits
    pub poll_interval_ms: u64,

    /// Target for the first data section (`null` disables it)
    pub first_data_budget_ms: Option<u64>,

    /// Target for the full load (`null` disables it)
    pub full_load_budget_ms: Option<u64>,

    /// Upper bound for a navigation to load and settle
    pub navigation_timeout_ms: u64,

    /// How long the network must stay quiet after load
    pub network_idle_ms: u64,

    /// Timeout of the pre-run reachability check
    pub connect_timeout_ms: u64,

    /// Browser executable (auto-detected when absent)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chrome_path: Option<String>,

    /// Browser viewport
    pub viewport: Viewport,

    /// JSON file with additional scenarios
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scenario_file: Option<PathBuf>,

    /// Selectors, paths and request names of the dashboard
    pub contract: DashboardContract,
}

impl Default for GlanceConfig {
    fn default() -> Self {
        let milestones = MilestoneOptions::default();
        let session = SessionOptions::default();
        Self {
            base_url: None,
            headless: session.headless,
            out_dir: HarnessOptions::default().output_dir,
            parallel: 1,
            skeleton_deadline_ms: milestones.skeleton_deadline_ms,
            first_data_deadline_ms: milestones.first_data_deadline_ms,
            full_load_deadline_ms: milestones.full_load_deadline_ms,
            poll_interval_ms: milestones.poll_interval_ms,
            first_data_budget_ms: milestones.first_data_budget_ms,
            full_load_budget_ms: milestones.full_load_budget_ms,
            navigation_timeout_ms: session.navigation_timeout_ms,
            network_idle_ms: session.network_idle_ms,
            connect_timeout_ms: 5_000,
            chrome_path: None,
            viewport: session.viewport,
            scenario_file: None,
            contract: DashboardContract::default(),
        }
    }
}

impl GlanceConfig {
    /// Milestone deadlines and budgets.
    pub fn milestone_options(&self) -> MilestoneOptions {
        MilestoneOptions {
            skeleton_deadline_ms: self.skeleton_deadline_ms,
            first_data_deadline_ms: self.first_data_deadline_ms,
            full_load_deadline_ms: self.full_load_deadline_ms,
            poll_interval_ms: self.poll_interval_ms,
            first_data_budget_ms: self.first_data_budget_ms,
            full_load_budget_ms: self.full_load_budget_ms,
        }
    }

    /// Options for every browser session.
    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            headless: self.headless,
            viewport: self.viewport,
            navigation_timeout_ms: self.navigation_timeout_ms,
            default_poll_interval_ms: self.poll_interval_ms,
            network_idle_ms: self.network_idle_ms,
            chrome_path: self.chrome_path.clone(),
            ..SessionOptions::default()
        }
    }

    /// Run-wide harness options.
    pub fn harness_options(&self) -> HarnessOptions {
        HarnessOptions {
            session: self.session_options(),
            parallelism: self.parallel,
            output_dir: self.out_dir.clone(),
        }
    }

    /// The dashboard to run against, if a base URL is configured.
    pub fn target(&self) -> Option<StaticTarget> {
        self.base_url.as_ref().map(|url| {
            StaticTarget::new(url.clone())
                .with_connect_timeout(Duration::from_millis(self.connect_timeout_ms))
        })
    }

    /// Example glance.config.json content.
    pub fn example_config() -> String {
        let example = Self {
            base_url: Some("http://127.0.0.1:8080".to_string()),
            parallel: 2,
            ..Self::default()
        };
        serde_json::to_string_pretty(&example).unwrap_or_default()
    }
}
