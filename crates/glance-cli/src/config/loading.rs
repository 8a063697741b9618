use crate::cli::RunArgs;
use crate::config::GlanceConfig;
use crate::error::{ConfigError, Result};
use figment::{
    Figment,
    providers::{Env, Format as _, Json, Serialized},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Config file picked up from the working directory.
pub const CONFIG_FILE: &str = "glance.config.json";

/// Prefix of configuration environment variables (`GLANCE_BASE_URL`, ...).
pub const ENV_PREFIX: &str = "GLANCE_";

/// Scalar settings that environment variables and CLI flags may override.
///
/// Environment keys arrive lowercased and snake_cased; they are re-emitted
/// in the camelCase the config file uses.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all(serialize = "camelCase", deserialize = "snake_case"))]
struct Overrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    base_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    headless: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    out_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    parallel: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    skeleton_deadline_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    first_data_deadline_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    full_load_deadline_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    poll_interval_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    navigation_timeout_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    network_idle_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    connect_timeout_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    chrome_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    scenario_file: Option<PathBuf>,
}

impl From<&RunArgs> for Overrides {
    fn from(args: &RunArgs) -> Self {
        Self {
            base_url: args.base_url.clone(),
            headless: args.headless_override(),
            out_dir: args.out_dir.clone(),
            parallel: args.parallel,
            skeleton_deadline_ms: args.skeleton_deadline_ms,
            first_data_deadline_ms: args.first_data_deadline_ms,
            full_load_deadline_ms: args.full_load_deadline_ms,
            poll_interval_ms: args.poll_interval_ms,
            scenario_file: args.scenario_file.clone(),
            ..Self::default()
        }
    }
}

impl GlanceConfig {
    /// Load configuration from multiple sources, looking for
    /// glance.config.json in the current directory.
    /// Priority: CLI args > environment variables > config file > defaults
    pub fn load(args: &RunArgs) -> Result<Self> {
        Self::load_from(args, Path::new("."))
    }

    /// Like [`GlanceConfig::load`], resolving the default config file in `dir`.
    pub fn load_from(args: &RunArgs, dir: &Path) -> Result<Self> {
        let mut figment = Figment::new().merge(Serialized::defaults(Self::default()));

        let config_file = match &args.config {
            Some(path) if !path.exists() => {
                return Err(ConfigError::NotFound(path.clone()).into());
            }
            Some(path) => Some(path.clone()),
            None => {
                let default_path = dir.join(CONFIG_FILE);
                default_path.exists().then_some(default_path)
            }
        };

        if let Some(path) = config_file {
            tracing::debug!("Loading config from {}", path.display());
            figment = figment.merge(Json::file(path));
        }

        // GLANCE_BASE_URL, GLANCE_PARALLEL, ...
        let env: Overrides = Figment::from(Env::prefixed(ENV_PREFIX))
            .extract()
            .map_err(ConfigError::from)?;
        figment = figment.merge(Serialized::defaults(env));

        figment = figment.merge(Serialized::defaults(Overrides::from(args)));

        Ok(figment.extract().map_err(ConfigError::from)?)
    }
}
