//! One browser page bound to a base URL, open for exactly one scenario.
//!
//! The browser itself sits behind two traits. A [`Launcher`] produces a
//! [`PageDriver`] for a fresh page; the driver performs the raw work
//! (go to a URL, evaluate a script, take a screenshot). [`Session`] adds
//! URL joining, the network-idle wait, telemetry ownership and the
//! [`AppProbe`] implementation on top.
//!
//! # Resource safety
//!
//! [`with_session`] closes the session on every exit path, including a
//! panic inside the body. A `Session` dropped without `close()` logs a
//! warning; the driver's own `Drop` is then responsible for the process.

use async_trait::async_trait;
use futures::FutureExt;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::panic::AssertUnwindSafe;
use std::time::Duration;
use tokio::time::{Instant, sleep};
use tracing::{debug, warn};

use crate::error::{HarnessError, Result};
use crate::milestone::{Milestone, MilestoneRecord, MilestoneTracker};
use crate::probe::{Action, AppProbe, ProbeExpr};
use crate::target::join_url;
use crate::telemetry::TelemetryCollector;

/// Browser viewport size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    /// Width in CSS pixels.
    pub width: u32,
    /// Height in CSS pixels.
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
        }
    }
}

/// Options for opening a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionOptions {
    /// Run without a visible window.
    pub headless: bool,

    /// Viewport size.
    pub viewport: Viewport,

    /// Upper bound for a navigation to load and settle.
    pub navigation_timeout_ms: u64,

    /// Poll interval for waits that do not specify their own.
    pub default_poll_interval_ms: u64,

    /// How long the network must stay quiet after load.
    pub network_idle_ms: u64,

    /// Browser executable (auto-detected when absent).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chrome_path: Option<String>,

    /// Extra browser command-line arguments.
    pub extra_args: Vec<String>,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            headless: !cfg!(feature = "visible"),
            viewport: Viewport::default(),
            navigation_timeout_ms: 30_000,
            default_poll_interval_ms: 100,
            network_idle_ms: 500,
            chrome_path: None,
            extra_args: Vec::new(),
        }
    }
}

impl SessionOptions {
    /// Navigation timeout as a duration.
    #[must_use]
    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_millis(self.navigation_timeout_ms)
    }

    /// Default poll interval as a duration.
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.default_poll_interval_ms)
    }

    /// Network idle window as a duration.
    #[must_use]
    pub fn network_idle(&self) -> Duration {
        Duration::from_millis(self.network_idle_ms)
    }
}

/// What a navigation waits for before returning.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NavigationWait {
    /// The document load event.
    Load,
    /// The load event, then a quiet network for `network_idle_ms`.
    #[default]
    NetworkIdle,
}

/// Low-level operations on one browser page.
#[async_trait]
pub trait PageDriver: Send + Sync {
    /// Loads `url` and waits for the document to finish loading.
    async fn goto(&self, url: &str, timeout: Duration) -> Result<()>;

    /// Evaluates a JavaScript expression, awaiting promises, and returns
    /// its JSON value (`null` for `undefined`).
    async fn evaluate(&self, script: &str) -> Result<Value>;

    /// Captures the page as PNG bytes.
    async fn screenshot(&self) -> Result<Vec<u8>>;

    /// Releases the page and its browser.
    async fn close(&mut self) -> Result<()>;
}

/// Produces pages.
#[async_trait]
pub trait Launcher: Send + Sync {
    /// Starts a browser page configured by `options` whose console and
    /// network events are appended to `telemetry`.
    async fn launch(
        &self,
        options: &SessionOptions,
        telemetry: TelemetryCollector,
    ) -> Result<Box<dyn PageDriver>>;
}

/// One page, used by one scenario.
pub struct Session {
    driver: Option<Box<dyn PageDriver>>,
    base_url: String,
    options: SessionOptions,
    telemetry: TelemetryCollector,
    current_path: Option<String>,
    navigation_origin: Instant,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("base_url", &self.base_url)
            .field("current_path", &self.current_path)
            .field("closed", &self.driver.is_none())
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Launches a page for `base_url`.
    ///
    /// # Errors
    ///
    /// Launch failures are fatal (`LaunchFailed`, `ConnectionFailed`).
    pub async fn open<L: Launcher + ?Sized>(
        launcher: &L,
        base_url: impl Into<String>,
        options: SessionOptions,
    ) -> Result<Self> {
        let base_url = base_url.into();
        let telemetry = TelemetryCollector::new();
        debug!("Opening session for {base_url}");

        let driver = launcher.launch(&options, telemetry.clone()).await?;

        Ok(Self {
            driver: Some(driver),
            base_url,
            options,
            telemetry,
            current_path: None,
            navigation_origin: Instant::now(),
        })
    }

    fn driver(&self) -> Result<&dyn PageDriver> {
        self.driver.as_deref().ok_or(HarnessError::AlreadyClosed)
    }

    /// Base URL the session navigates relative to.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Options the session was opened with.
    #[must_use]
    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    /// The session's telemetry log.
    #[must_use]
    pub fn telemetry(&self) -> &TelemetryCollector {
        &self.telemetry
    }

    /// Path of the last navigation.
    #[must_use]
    pub fn current_path(&self) -> Option<&str> {
        self.current_path.as_deref()
    }

    /// When the document of the last navigation finished loading.
    #[must_use]
    pub fn navigation_origin(&self) -> Instant {
        self.navigation_origin
    }

    /// Returns true once `close()` has run.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.driver.is_none()
    }

    /// Navigates to `path` under the base URL and waits for network idle.
    ///
    /// # Errors
    ///
    /// `NavigationFailed` when the page does not load in time.
    pub async fn navigate(&mut self, path: &str) -> Result<()> {
        self.navigate_with(path, NavigationWait::NetworkIdle).await
    }

    /// Navigates to `path` under the base URL.
    ///
    /// Waits for the load event and, for [`NavigationWait::NetworkIdle`],
    /// for the network to stay quiet for `network_idle_ms`, all within
    /// `navigation_timeout_ms`. The milestone origin is set when the load
    /// event has fired. An idle wait that runs out after a successful load
    /// is logged and tolerated.
    ///
    /// # Errors
    ///
    /// `NavigationFailed` when the page does not load in time.
    pub async fn navigate_with(&mut self, path: &str, wait: NavigationWait) -> Result<()> {
        let url = join_url(&self.base_url, path);
        let timeout = self.options.navigation_timeout();
        let started = Instant::now();
        debug!("Navigating to {url}");

        self.current_path = Some(path.to_string());

        match self.driver()?.goto(&url, timeout).await {
            Ok(()) => {}
            Err(e) if e.is_fatal() => return Err(e),
            Err(HarnessError::NavigationFailed { url, reason }) => {
                return Err(HarnessError::NavigationFailed { url, reason });
            }
            Err(e) => {
                return Err(HarnessError::NavigationFailed {
                    url,
                    reason: e.to_string(),
                });
            }
        }
        self.navigation_origin = Instant::now();

        if wait == NavigationWait::NetworkIdle {
            let remaining = timeout.saturating_sub(started.elapsed());
            if !self.wait_for_network_idle(remaining).await {
                warn!(
                    "{url} loaded but the network did not go idle ({} requests in flight)",
                    self.telemetry.in_flight()
                );
            }
        }
        Ok(())
    }

    /// Reloads the current path (the root when nothing was loaded yet).
    ///
    /// # Errors
    ///
    /// Same as [`Session::navigate_with`].
    pub async fn reload(&mut self, wait: NavigationWait) -> Result<()> {
        let path = self.current_path.clone().unwrap_or_else(|| "/".to_string());
        self.navigate_with(&path, wait).await
    }

    /// Waits until no request has been in flight for the idle window.
    async fn wait_for_network_idle(&self, budget: Duration) -> bool {
        let idle = self.options.network_idle();
        let poll = self.options.poll_interval().min(idle.max(Duration::from_millis(1)));
        let start = Instant::now();
        let mut quiet_since: Option<Instant> = None;

        loop {
            let now = Instant::now();
            if self.telemetry.in_flight() == 0 {
                let since = *quiet_since.get_or_insert(now);
                if now - since >= idle {
                    return true;
                }
            } else {
                quiet_since = None;
            }

            if now - start >= budget {
                return false;
            }
            sleep(poll.min(budget - (now - start))).await;
        }
    }

    /// Performs a click or fill.
    ///
    /// # Errors
    ///
    /// `ElementNotFound` when the selector matches nothing.
    pub async fn act(&self, action: &Action) -> Result<()> {
        debug!("Performing {action:?}");
        let found = self.driver()?.evaluate(&action.to_script()).await?;
        if found.as_bool() == Some(true) {
            Ok(())
        } else {
            Err(HarnessError::ElementNotFound {
                selector: action.selector().to_string(),
            })
        }
    }

    /// Issues a request through the application's request client and
    /// returns its `{success, data?, error?}` response.
    ///
    /// # Errors
    ///
    /// Script failures only; an unsuccessful response is returned as data.
    pub async fn request(&self, name: &str, payload: Value) -> Result<Value> {
        self.probe(&ProbeExpr::request(name, payload)).await
    }

    /// Captures the page as PNG bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the capture fails.
    pub async fn screenshot(&self) -> Result<Vec<u8>> {
        self.driver()?.screenshot().await
    }

    /// Tracks `milestones` from the load of the last navigated document.
    ///
    /// # Errors
    ///
    /// Fatal errors only.
    pub async fn track(
        &self,
        milestones: &[Milestone],
        poll_interval: Option<Duration>,
    ) -> Result<Vec<MilestoneRecord>> {
        MilestoneTracker::from_origin(self.navigation_origin)
            .with_poll_interval(poll_interval.unwrap_or_else(|| self.options.poll_interval()))
            .track(self, milestones)
            .await
    }

    /// Releases the page and browser. Closing twice is a no-op.
    ///
    /// # Errors
    ///
    /// Returns the driver's error if the browser refused to close.
    pub async fn close(&mut self) -> Result<()> {
        if let Some(mut driver) = self.driver.take() {
            debug!("Closing session for {}", self.base_url);
            driver.close().await?;
        }
        Ok(())
    }
}

#[async_trait]
impl AppProbe for Session {
    async fn probe(&self, expr: &ProbeExpr) -> Result<Value> {
        self.driver()?.evaluate(&expr.to_script()).await
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if self.driver.is_some() {
            warn!("Session for {} dropped without close()", self.base_url);
        }
    }
}

/// Opens a session, runs `body`, and closes the session whatever happens.
///
/// A panic inside `body` is caught, the session is closed, and the panic
/// resumes. When both `body` and `close()` fail, the body's error wins.
///
/// # Errors
///
/// Launch errors, the body's error, or the close error.
pub async fn with_session<L, T, F>(
    launcher: &L,
    base_url: impl Into<String>,
    options: SessionOptions,
    body: F,
) -> Result<T>
where
    L: Launcher + ?Sized,
    F: for<'s> FnOnce(&'s mut Session) -> BoxFuture<'s, Result<T>>,
{
    let mut session = Session::open(launcher, base_url, options).await?;

    let outcome = AssertUnwindSafe(body(&mut session)).catch_unwind().await;
    let closed = session.close().await;

    match outcome {
        Ok(Ok(value)) => closed.map(|()| value),
        Ok(Err(e)) => {
            if let Err(close_err) = closed {
                warn!("Failed to close session after error: {close_err}");
            }
            Err(e)
        }
        Err(panic) => {
            if let Err(close_err) = closed {
                warn!("Failed to close session after panic: {close_err}");
            }
            std::panic::resume_unwind(panic)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct Recorder {
        urls: Mutex<Vec<String>>,
        closed: AtomicBool,
        fail_goto: AtomicBool,
    }

    struct RecordingDriver(Arc<Recorder>);

    #[async_trait]
    impl PageDriver for RecordingDriver {
        async fn goto(&self, url: &str, _timeout: Duration) -> Result<()> {
            self.0.urls.lock().unwrap().push(url.to_string());
            if self.0.fail_goto.load(Ordering::SeqCst) {
                return Err(HarnessError::ScriptExecutionFailed(
                    "net::ERR_CONNECTION_REFUSED".into(),
                ));
            }
            Ok(())
        }

        async fn evaluate(&self, script: &str) -> Result<Value> {
            Ok(Value::Bool(script.contains("#present")))
        }

        async fn screenshot(&self) -> Result<Vec<u8>> {
            Ok(vec![0x89, b'P', b'N', b'G'])
        }

        async fn close(&mut self) -> Result<()> {
            self.0.closed.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingLauncher {
        recorder: Arc<Recorder>,
        launches: AtomicUsize,
    }

    #[async_trait]
    impl Launcher for RecordingLauncher {
        async fn launch(
            &self,
            _options: &SessionOptions,
            _telemetry: TelemetryCollector,
        ) -> Result<Box<dyn PageDriver>> {
            self.launches.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(RecordingDriver(self.recorder.clone())))
        }
    }

    fn fast_options() -> SessionOptions {
        SessionOptions {
            network_idle_ms: 0,
            ..SessionOptions::default()
        }
    }

    #[test]
    fn defaults() {
        let options = SessionOptions::default();
        assert_eq!(options.viewport, Viewport { width: 1920, height: 1080 });
        assert_eq!(options.navigation_timeout_ms, 30_000);
        assert_eq!(options.default_poll_interval_ms, 100);
        assert_eq!(options.network_idle_ms, 500);
    }

    #[tokio::test(start_paused = true)]
    async fn navigate_joins_paths_and_reload_repeats() {
        let launcher = RecordingLauncher::default();
        let mut session = Session::open(&launcher, "http://localhost:3000/", fast_options())
            .await
            .unwrap();

        session.navigate("/settings").await.unwrap();
        session.reload(NavigationWait::Load).await.unwrap();
        session.close().await.unwrap();

        assert_eq!(
            *launcher.recorder.urls.lock().unwrap(),
            vec![
                "http://localhost:3000/settings".to_string(),
                "http://localhost:3000/settings".to_string()
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn load_only_navigation_skips_the_idle_wait() {
        let launcher = RecordingLauncher::default();
        let mut session = Session::open(&launcher, "http://localhost:3000", SessionOptions::default())
            .await
            .unwrap();
        session.telemetry().request_started(
            "socket".into(),
            "GET".into(),
            "http://localhost:3000/socket.io/".into(),
        );

        let start = Instant::now();
        session.navigate_with("/dashboard", NavigationWait::Load).await.unwrap();
        assert_eq!(start.elapsed(), Duration::ZERO);
        assert_eq!(session.navigation_origin(), start);
        session.close().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn driver_errors_become_navigation_failures() {
        let launcher = RecordingLauncher::default();
        launcher.recorder.fail_goto.store(true, Ordering::SeqCst);
        let mut session = Session::open(&launcher, "http://localhost:3000", fast_options())
            .await
            .unwrap();

        let err = session.navigate("/").await.unwrap_err();
        assert!(matches!(err, HarnessError::NavigationFailed { .. }));
        assert!(!err.is_fatal());
        session.close().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn navigation_waits_for_idle_network() {
        let launcher = RecordingLauncher::default();
        let mut session = Session::open(&launcher, "http://localhost:3000", SessionOptions::default())
            .await
            .unwrap();

        let telemetry = session.telemetry().clone();
        telemetry.request_started(
            "1".into(),
            "GET".into(),
            "http://localhost:3000/api/metrics".into(),
        );
        tokio::spawn(async move {
            sleep(Duration::from_millis(300)).await;
            telemetry.request_finished("1");
        });

        let start = Instant::now();
        session.navigate("/").await.unwrap();
        // 300ms until the request settles plus the 500ms idle window.
        assert!(start.elapsed() >= Duration::from_millis(800));
        session.close().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn act_reports_missing_elements() {
        let launcher = RecordingLauncher::default();
        let mut session = Session::open(&launcher, "http://localhost:3000", fast_options())
            .await
            .unwrap();

        session
            .act(&Action::Click {
                selector: "#present".into(),
            })
            .await
            .unwrap();
        let err = session
            .act(&Action::Click {
                selector: "#absent".into(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, HarnessError::ElementNotFound { .. }));
        session.close().await.unwrap();
    }

    #[tokio::test]
    async fn closed_session_rejects_operations() {
        let launcher = RecordingLauncher::default();
        let mut session = Session::open(&launcher, "http://localhost:3000", fast_options())
            .await
            .unwrap();

        session.close().await.unwrap();
        session.close().await.unwrap();
        assert!(session.is_closed());
        assert!(matches!(
            session.probe(&ProbeExpr::count("#app")).await,
            Err(HarnessError::AlreadyClosed)
        ));
    }

    #[tokio::test]
    async fn with_session_closes_after_error() {
        let launcher = RecordingLauncher::default();
        let result: Result<()> = with_session(
            &launcher,
            "http://localhost:3000",
            fast_options(),
            |_session| {
                Box::pin(async {
                    Err(HarnessError::ScriptExecutionFailed("boom".into()))
                })
            },
        )
        .await;

        assert!(result.is_err());
        assert!(launcher.recorder.closed.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn with_session_closes_after_panic() {
        let launcher = Arc::new(RecordingLauncher::default());
        let task_launcher = launcher.clone();

        let joined = tokio::spawn(async move {
            with_session(
                task_launcher.as_ref(),
                "http://localhost:3000",
                fast_options(),
                |session| {
                    Box::pin(async move {
                        let ready = session.probe(&ProbeExpr::count("#app")).await?;
                        assert_eq!(ready, Value::Bool(true), "scenario body panicked");
                        Ok(())
                    })
                },
            )
            .await
        })
        .await;

        assert!(joined.unwrap_err().is_panic());
        assert!(launcher.recorder.closed.load(Ordering::SeqCst));
        assert_eq!(launcher.launches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn with_session_returns_body_value() {
        let launcher = RecordingLauncher::default();
        let png = with_session(
            &launcher,
            "http://localhost:3000",
            fast_options(),
            |session| Box::pin(async move { session.screenshot().await }),
        )
        .await
        .unwrap();

        assert_eq!(&png[1..], b"PNG");
        assert!(launcher.recorder.closed.load(Ordering::SeqCst));
    }
}
