//! Chrome process launch.
//!
//! [`ChromeLauncher`] is the production [`Launcher`]: every session gets its
//! own Chrome process with a private profile directory, so scenarios running
//! in parallel never share cookies, storage or a `ProcessSingleton` lock.

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::emulation::SetDeviceMetricsOverrideParams;
use chromiumoxide::page::Page;
use futures::StreamExt;
use std::path::{Path, PathBuf};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::{HarnessError, Result};
use crate::page::ChromeDriver;
use crate::session::{Launcher, PageDriver, SessionOptions};
use crate::telemetry::TelemetryCollector;

/// Arguments every session starts with.
///
/// `--no-sandbox` is required where user namespaces are unavailable
/// (containers, most CI runners). Only point the harness at applications you
/// trust.
pub const DEFAULT_ARGS: &[&str] = &["--no-sandbox", "--disable-dev-shm-usage"];

/// Launches one Chrome process per session.
#[derive(Debug, Clone, Default)]
pub struct ChromeLauncher {
    _private: (),
}

impl ChromeLauncher {
    /// Creates a launcher.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

/// Builds the chromiumoxide configuration for a session.
fn browser_config(options: &SessionOptions, profile_dir: &Path) -> Result<BrowserConfig> {
    let mut config = BrowserConfig::builder()
        .window_size(options.viewport.width, options.viewport.height)
        .arg(format!("--user-data-dir={}", profile_dir.display()));

    if !options.headless {
        config = config.with_head();
    }

    for arg in DEFAULT_ARGS {
        config = config.arg(*arg);
    }
    for arg in &options.extra_args {
        config = config.arg(arg.clone());
    }

    if let Some(path) = &options.chrome_path {
        config = config.chrome_executable(path.clone());
    }

    config.build().map_err(|e| HarnessError::LaunchFailed {
        reason: format!("invalid browser configuration: {e}"),
        source: None,
    })
}

/// A fresh profile directory under the system temp dir.
fn profile_dir() -> PathBuf {
    std::env::temp_dir().join(format!("glance-profile-{}", uuid::Uuid::new_v4()))
}

/// Removes a session's profile directory. Missing directories are fine.
pub(crate) async fn remove_profile(profile_dir: &Path) {
    if let Err(e) = tokio::fs::remove_dir_all(profile_dir).await {
        debug!("Could not remove {}: {e}", profile_dir.display());
    }
}

/// Tears down a browser whose session never became ready.
async fn abandon(mut browser: Browser, handler_task: JoinHandle<()>, profile_dir: &Path) {
    if let Err(e) = browser.close().await {
        warn!("Failed to close browser after a setup error: {e}");
    }
    if let Err(e) = browser.wait().await {
        warn!("Failed to reap browser process: {e}");
    }
    handler_task.abort();
    remove_profile(profile_dir).await;
}

/// Viewport override and telemetry listeners for a fresh page.
async fn prepare(
    page: &Page,
    metrics: SetDeviceMetricsOverrideParams,
    telemetry: &TelemetryCollector,
) -> Result<Vec<JoinHandle<()>>> {
    page.execute(metrics).await?;
    telemetry.attach(page).await
}

#[async_trait]
impl Launcher for ChromeLauncher {
    async fn launch(
        &self,
        options: &SessionOptions,
        telemetry: TelemetryCollector,
    ) -> Result<Box<dyn PageDriver>> {
        let profile = profile_dir();
        let config = browser_config(options, &profile)?;
        let metrics = SetDeviceMetricsOverrideParams::builder()
            .width(i64::from(options.viewport.width))
            .height(i64::from(options.viewport.height))
            .device_scale_factor(1.0)
            .mobile(false)
            .build()
            .map_err(|e| HarnessError::LaunchFailed {
                reason: format!("invalid viewport: {e}"),
                source: None,
            })?;
        debug!(
            "Launching Chrome (headless: {}, viewport: {}x{})",
            options.headless, options.viewport.width, options.viewport.height
        );

        let (browser, mut handler) = match Browser::launch(config).await {
            Ok(launched) => launched,
            Err(e) => {
                remove_profile(&profile).await;
                return Err(HarnessError::LaunchFailed {
                    reason: "failed to launch Chrome process".to_string(),
                    source: Some(Box::new(e)),
                });
            }
        };

        // chromiumoxide only processes CDP messages while the handler is polled.
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    warn!("Browser handler error: {e}");
                }
            }
        });

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => {
                abandon(browser, handler_task, &profile).await;
                return Err(HarnessError::ConnectionFailed(e.to_string()));
            }
        };

        let listeners = match prepare(&page, metrics, &telemetry).await {
            Ok(listeners) => listeners,
            Err(e) => {
                abandon(browser, handler_task, &profile).await;
                return Err(e);
            }
        };
        debug!("Chrome session ready");

        Ok(Box::new(ChromeDriver::new(
            browser,
            page,
            handler_task,
            listeners,
            profile,
        )))
    }
}
