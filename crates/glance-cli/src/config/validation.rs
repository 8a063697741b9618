use crate::config::GlanceConfig;
use crate::error::{ConfigError, Result};

fn invalid(field: &str, value: impl ToString, hint: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
        hint: hint.into(),
    }
}

/// Validate that a base URL is an absolute http(s) URL with a host.
pub fn validate_base_url(url: &str) -> Result<()> {
    let rest = url
        .strip_prefix("http://")
        .or_else(|| url.strip_prefix("https://"))
        .ok_or_else(|| invalid("baseUrl", url, "Use an http:// or https:// URL"))?;

    if rest.is_empty() || rest.starts_with('/') {
        return Err(invalid("baseUrl", url, "The URL needs a host, e.g. http://127.0.0.1:8080").into());
    }
    Ok(())
}

impl GlanceConfig {
    /// Validate configuration for logical consistency.
    pub fn validate(&self) -> Result<()> {
        match &self.base_url {
            None => {
                return Err(ConfigError::MissingField {
                    field: "baseUrl".to_string(),
                    hint: "Pass --base-url or set baseUrl in glance.config.json".to_string(),
                }
                .into());
            }
            Some(url) => validate_base_url(url)?,
        }

        if self.parallel == 0 {
            return Err(invalid("parallel", 0, "Run at least one scenario at a time").into());
        }

        if self.poll_interval_ms == 0 {
            return Err(invalid("pollIntervalMs", 0, "Poll at least every few milliseconds").into());
        }

        if self.navigation_timeout_ms == 0 {
            return Err(invalid("navigationTimeoutMs", 0, "Navigations need a positive timeout").into());
        }

        if self.skeleton_deadline_ms > self.first_data_deadline_ms {
            return Err(invalid(
                "skeletonDeadlineMs",
                self.skeleton_deadline_ms,
                format!(
                    "Must not exceed firstDataDeadlineMs ({})",
                    self.first_data_deadline_ms
                ),
            )
            .into());
        }

        if self.first_data_deadline_ms > self.full_load_deadline_ms {
            return Err(invalid(
                "firstDataDeadlineMs",
                self.first_data_deadline_ms,
                format!(
                    "Must not exceed fullLoadDeadlineMs ({})",
                    self.full_load_deadline_ms
                ),
            )
            .into());
        }

        if let Some(budget) = self.first_data_budget_ms {
            if budget > self.first_data_deadline_ms {
                return Err(invalid(
                    "firstDataBudgetMs",
                    budget,
                    "A budget is a target within its deadline; raise firstDataDeadlineMs or lower the budget",
                )
                .into());
            }
        }

        if let Some(budget) = self.full_load_budget_ms {
            if budget > self.full_load_deadline_ms {
                return Err(invalid(
                    "fullLoadBudgetMs",
                    budget,
                    "A budget is a target within its deadline; raise fullLoadDeadlineMs or lower the budget",
                )
                .into());
            }
        }

        let contract = &self.contract;
        if contract.sections.is_empty() {
            return Err(ConfigError::MissingField {
                field: "contract.sections".to_string(),
                hint: "List the data-section names the dashboard loads".to_string(),
            }
            .into());
        }

        if !contract.sections.contains(&contract.first_data_section) {
            return Err(invalid(
                "contract.firstDataSection",
                &contract.first_data_section,
                format!("Must be one of: {}", contract.sections.join(", ")),
            )
            .into());
        }

        Ok(())
    }
}
