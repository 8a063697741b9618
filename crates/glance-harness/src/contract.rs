//! The dashboard's DOM and request contract.
//!
//! Everything the built-in scenarios know about the application lives here
//! as configuration: the root container, the skeleton marker class, the
//! section, field and action names, and the request names. A dashboard that
//! renames any of them is verified by overriding the matching field rather
//! than by editing scenarios.

use serde::{Deserialize, Serialize};

use crate::assertion::{Check, Comparator};
use crate::milestone::{Milestone, MilestoneOptions};

/// Milestone names used by [`DashboardContract::loading_milestones`].
pub const SKELETON_RENDERED: &str = "skeleton-rendered";
/// Emitted once the first data section has lost its skeleton.
pub const FIRST_DATA_VISIBLE: &str = "first-data-visible";
/// Emitted once every section has lost its skeleton.
pub const FULL_LOAD_COMPLETE: &str = "full-load-complete";

/// Selectors, paths and request names of the application under test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DashboardContract {
    /// Root container selector.
    pub app_root: String,

    /// Class carried by every placeholder while data is loading.
    pub skeleton_class: String,

    /// `data-section` names that load asynchronously, in display order.
    pub sections: Vec<String>,

    /// Section whose arrival counts as "first data visible".
    pub first_data_section: String,

    /// Path of the dashboard view.
    pub dashboard_path: String,

    /// Path of the settings view.
    pub settings_path: String,

    /// `data-field` name of the host setting.
    pub host_field: String,

    /// Value written during the persistence round-trip.
    pub host_value: String,

    /// `data-action` name of the save button.
    pub save_action: String,

    /// Expression that evaluates to `true` while the live connection is up.
    pub connection_probe: String,

    /// Request that returns the persisted configuration.
    pub config_request: String,
}

impl Default for DashboardContract {
    fn default() -> Self {
        Self {
            app_root: "#app".to_string(),
            skeleton_class: "loading-skeleton".to_string(),
            sections: ["metrics", "charts", "gpu", "router"]
                .into_iter()
                .map(String::from)
                .collect(),
            first_data_section: "metrics".to_string(),
            dashboard_path: "/dashboard".to_string(),
            settings_path: "/settings".to_string(),
            host_field: "host".to_string(),
            host_value: "127.0.0.1".to_string(),
            save_action: "save".to_string(),
            connection_probe: "window.socketClient?.isConnected === true".to_string(),
            config_request: "config:get".to_string(),
        }
    }
}

impl DashboardContract {
    /// Matches every skeleton placeholder.
    #[must_use]
    pub fn skeleton_selector(&self) -> String {
        format!("[class*=\"{}\"]", self.skeleton_class)
    }

    /// Matches one section.
    #[must_use]
    pub fn section(&self, name: &str) -> String {
        format!("[data-section=\"{name}\"]")
    }

    /// Matches one form field.
    #[must_use]
    pub fn field(&self, name: &str) -> String {
        format!("[data-field=\"{name}\"]")
    }

    /// Matches one action control.
    #[must_use]
    pub fn action(&self, name: &str) -> String {
        format!("[data-action=\"{name}\"]")
    }

    /// A section that is present and no longer a skeleton.
    ///
    /// A missing section is *not* loaded for the first-data milestone, but
    /// [`DashboardContract::section_settled`] accepts it for the full load,
    /// since optional panels are not rendered on every deployment.
    #[must_use]
    pub fn section_loaded(&self, name: &str) -> Check {
        let selector = self.section(name);
        Check::all([
            Check::count(selector.clone(), Comparator::Ge, 1),
            self.section_settled(name),
        ])
    }

    /// The section does not carry the skeleton class.
    #[must_use]
    pub fn section_settled(&self, name: &str) -> Check {
        Check::not(Check::attribute_contains(
            self.section(name),
            "class",
            self.skeleton_class.clone(),
        ))
    }

    /// The three-phase loading sequence of the dashboard view.
    #[must_use]
    pub fn loading_milestones(&self, options: &MilestoneOptions) -> Vec<Milestone> {
        let skeleton = Milestone::new(
            SKELETON_RENDERED,
            Check::count(self.skeleton_selector(), Comparator::Ge, 1),
            options.skeleton_deadline_ms,
        );

        let mut first_data = Milestone::new(
            FIRST_DATA_VISIBLE,
            self.section_loaded(&self.first_data_section),
            options.first_data_deadline_ms,
        );
        if let Some(budget) = options.first_data_budget_ms {
            first_data = first_data.with_budget(budget);
        }

        let mut full_load = Milestone::new(
            FULL_LOAD_COMPLETE,
            Check::all(self.sections.iter().map(|name| self.section_settled(name))),
            options.full_load_deadline_ms,
        );
        if let Some(budget) = options.full_load_budget_ms {
            full_load = full_load.with_budget(budget);
        }

        vec![skeleton, first_data, full_load]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selectors() {
        let contract = DashboardContract::default();
        assert_eq!(contract.skeleton_selector(), "[class*=\"loading-skeleton\"]");
        assert_eq!(contract.section("gpu"), "[data-section=\"gpu\"]");
        assert_eq!(contract.field("host"), "[data-field=\"host\"]");
        assert_eq!(contract.action("save"), "[data-action=\"save\"]");
    }

    #[test]
    fn loading_milestones_follow_the_options() {
        let contract = DashboardContract::default();
        let options = MilestoneOptions {
            skeleton_deadline_ms: 300,
            full_load_budget_ms: None,
            ..MilestoneOptions::default()
        };

        let milestones = contract.loading_milestones(&options);
        let names: Vec<_> = milestones.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, [SKELETON_RENDERED, FIRST_DATA_VISIBLE, FULL_LOAD_COMPLETE]);

        assert_eq!(milestones[0].deadline_ms, 300);
        assert_eq!(milestones[0].budget_ms, None);
        assert_eq!(milestones[1].deadline_ms, 6_000);
        assert_eq!(milestones[1].budget_ms, Some(2_000));
        assert_eq!(milestones[2].deadline_ms, 12_000);
        assert_eq!(milestones[2].budget_ms, None);
        assert!(milestones.iter().all(|m| m.required));

        let Check::All { checks } = &milestones[2].check else {
            panic!("full load should be a conjunction");
        };
        assert_eq!(checks.len(), 4);
    }

    #[test]
    fn partial_overrides_keep_defaults() {
        let contract: DashboardContract =
            serde_json::from_str(r#"{"sections": ["metrics"], "dashboardPath": "/"}"#).unwrap();
        assert_eq!(contract.sections, ["metrics"]);
        assert_eq!(contract.dashboard_path, "/");
        assert_eq!(contract.app_root, "#app");
    }
}
