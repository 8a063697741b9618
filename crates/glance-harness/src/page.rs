//! The Chrome-backed page driver.

use async_trait::async_trait;
use chromiumoxide::browser::Browser;
use chromiumoxide::cdp::js_protocol::runtime::EvaluateParams;
use chromiumoxide::error::CdpError;
use chromiumoxide::page::{Page as ChromePage, ScreenshotParams};
use serde_json::Value;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::browser::remove_profile;
use crate::error::{HarnessError, Result};
use crate::session::PageDriver;
use crate::wait::{WaitConfig, wait_for};

/// One Chrome process with one page.
///
/// Owns the CDP handler task and the telemetry listener tasks; all of them
/// are stopped by [`PageDriver::close`].
pub struct ChromeDriver {
    browser: Mutex<Option<Browser>>,
    page: ChromePage,
    handler_task: JoinHandle<()>,
    listeners: Vec<JoinHandle<()>>,
    profile_dir: PathBuf,
}

impl ChromeDriver {
    pub(crate) fn new(
        browser: Browser,
        page: ChromePage,
        handler_task: JoinHandle<()>,
        listeners: Vec<JoinHandle<()>>,
        profile_dir: PathBuf,
    ) -> Self {
        Self {
            browser: Mutex::new(Some(browser)),
            page,
            handler_task,
            listeners,
            profile_dir,
        }
    }

    fn cdp_error(&self, e: CdpError) -> HarnessError {
        classify(e, !self.handler_task.is_finished())
    }

    async fn ready_state(&self) -> Result<bool> {
        let state = self.evaluate("document.readyState").await?;
        Ok(state.as_str() == Some("complete"))
    }
}

/// Maps CDP failures during page work to scenario or framework errors.
///
/// Once the handler task has ended the browser is gone, whatever the
/// individual command reported.
fn classify(e: CdpError, handler_alive: bool) -> HarnessError {
    if !handler_alive {
        return HarnessError::ProcessTerminated;
    }
    match e {
        CdpError::Ws(_) | CdpError::ChannelSendError(_) | CdpError::NoResponse => {
            HarnessError::ConnectionFailed(e.to_string())
        }
        other => HarnessError::ScriptExecutionFailed(other.to_string()),
    }
}

#[async_trait]
impl PageDriver for ChromeDriver {
    async fn goto(&self, url: &str, timeout: Duration) -> Result<()> {
        let started = tokio::time::Instant::now();

        match tokio::time::timeout(timeout, self.page.goto(url)).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => {
                return Err(HarnessError::NavigationFailed {
                    url: url.to_string(),
                    reason: e.to_string(),
                });
            }
            Err(_) => {
                return Err(HarnessError::NavigationFailed {
                    url: url.to_string(),
                    reason: format!("no load event within {}ms", timeout.as_millis()),
                });
            }
        }

        let remaining = timeout.saturating_sub(started.elapsed());
        let outcome = wait_for(
            move || self.ready_state(),
            WaitConfig::new(remaining, Duration::from_millis(50)),
        )
        .await?;

        if outcome.detected {
            debug!("{url} loaded in {}ms", started.elapsed().as_millis());
            Ok(())
        } else {
            Err(HarnessError::NavigationFailed {
                url: url.to_string(),
                reason: format!("document not complete within {}ms", timeout.as_millis()),
            })
        }
    }

    async fn evaluate(&self, script: &str) -> Result<Value> {
        let params = EvaluateParams::builder()
            .expression(script)
            .await_promise(true)
            .return_by_value(true)
            .build()
            .map_err(HarnessError::ScriptExecutionFailed)?;

        let result = self
            .page
            .evaluate_expression(params)
            .await
            .map_err(|e| self.cdp_error(e))?;

        Ok(result.value().cloned().unwrap_or(Value::Null))
    }

    async fn screenshot(&self) -> Result<Vec<u8>> {
        self.page
            .screenshot(ScreenshotParams::builder().full_page(true).build())
            .await
            .map_err(|e| self.cdp_error(e))
    }

    async fn close(&mut self) -> Result<()> {
        for listener in self.listeners.drain(..) {
            listener.abort();
        }

        let result = match self.browser.get_mut().take() {
            Some(mut browser) => {
                debug!("Closing browser");
                let closed = browser
                    .close()
                    .await
                    .map_err(|e| HarnessError::ConnectionFailed(e.to_string()));
                if let Err(e) = browser.wait().await {
                    warn!("Failed to reap browser process: {e}");
                }
                closed.map(|_| ())
            }
            None => Ok(()),
        };

        self.handler_task.abort();
        remove_profile(&self.profile_dir).await;

        result
    }
}

impl Drop for ChromeDriver {
    fn drop(&mut self) {
        if self.browser.get_mut().is_some() {
            // chromiumoxide's Browser::drop kills the process.
            warn!("ChromeDriver dropped without close() - forcing shutdown via Drop");
            self.handler_task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dead_handler_means_the_process_is_gone() {
        assert!(matches!(
            classify(CdpError::NoResponse, false),
            HarnessError::ProcessTerminated
        ));
        assert!(matches!(
            classify(CdpError::NotFound, false),
            HarnessError::ProcessTerminated
        ));
    }

    #[test]
    fn live_handler_splits_connection_and_script_errors() {
        let dropped = classify(CdpError::NoResponse, true);
        assert!(matches!(dropped, HarnessError::ConnectionFailed(_)));
        assert!(dropped.is_fatal());

        let script = classify(CdpError::ChromeMessage("Cannot find context".into()), true);
        assert!(matches!(script, HarnessError::ScriptExecutionFailed(_)));
        assert!(!script.is_fatal());
    }
}
