//! A scripted dashboard that answers the harness' probes without a browser.
//!
//! The page recognises the exact scripts the harness renders for the
//! dashboard contract and answers them from a timeline measured from the
//! last navigation. Server-side state (the saved host) lives in
//! [`Dashboard`] and survives reloads and sessions.

#![allow(dead_code)]

use async_trait::async_trait;
use glance_harness::{
    Action, DashboardContract, HarnessError, Launcher, PageDriver, ProbeExpr, Result,
    SessionOptions, Severity, Target, TelemetryCollector, TelemetryRecord,
};
use serde_json::{Value, json};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

pub const BASE_URL: &str = "http://dashboard.test";

/// When things happen after the document loaded.
#[derive(Debug, Clone)]
pub struct Timeline {
    /// Skeleton placeholders appear.
    pub skeleton_ms: u64,
    /// Per section: when its data replaces the skeleton (`None`: never).
    pub sections: Vec<(String, Option<u64>)>,
    /// The settings form renders.
    pub form_ms: u64,
    /// Console errors logged on every load.
    pub console_errors: Vec<String>,
    /// Whether the live connection reports itself as up.
    pub connected: bool,
}

impl Default for Timeline {
    fn default() -> Self {
        Self {
            skeleton_ms: 50,
            sections: vec![
                ("metrics".into(), Some(1_200)),
                ("charts".into(), Some(1_800)),
                ("gpu".into(), Some(2_200)),
                ("router".into(), Some(2_500)),
            ],
            form_ms: 150,
            console_errors: Vec::new(),
            connected: true,
        }
    }
}

impl Timeline {
    pub fn with_section(mut self, name: &str, ready_ms: Option<u64>) -> Self {
        for (section, ready) in &mut self.sections {
            if section == name {
                *ready = ready_ms;
            }
        }
        self
    }

    pub fn with_console_error(mut self, text: &str) -> Self {
        self.console_errors.push(text.to_string());
        self
    }
}

/// Server-side state and bookkeeping shared by every page.
#[derive(Debug, Default)]
pub struct Dashboard {
    pub saved_host: Mutex<Option<String>>,
    pub launches: AtomicUsize,
    pub closes: AtomicUsize,
    pub open: AtomicUsize,
    pub max_open: AtomicUsize,
}

impl Dashboard {
    pub fn launches(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    pub fn max_open(&self) -> usize {
        self.max_open.load(Ordering::SeqCst)
    }
}

/// Launches scripted pages.
pub struct ScriptedLauncher {
    pub dashboard: Arc<Dashboard>,
    pub timeline: Timeline,
    pub contract: DashboardContract,
    pub fail_launch: bool,
}

impl ScriptedLauncher {
    pub fn new(timeline: Timeline) -> Self {
        Self {
            dashboard: Arc::new(Dashboard::default()),
            timeline,
            contract: DashboardContract::default(),
            fail_launch: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            fail_launch: true,
            ..Self::new(Timeline::default())
        }
    }
}

#[async_trait]
impl Launcher for ScriptedLauncher {
    async fn launch(
        &self,
        _options: &SessionOptions,
        telemetry: TelemetryCollector,
    ) -> Result<Box<dyn PageDriver>> {
        if self.fail_launch {
            return Err(HarnessError::LaunchFailed {
                reason: "chrome executable not found".into(),
                source: None,
            });
        }

        self.dashboard.launches.fetch_add(1, Ordering::SeqCst);
        let open = self.dashboard.open.fetch_add(1, Ordering::SeqCst) + 1;
        self.dashboard.max_open.fetch_max(open, Ordering::SeqCst);

        Ok(Box::new(ScriptedPage {
            dashboard: self.dashboard.clone(),
            timeline: self.timeline.clone(),
            contract: self.contract.clone(),
            telemetry,
            view: Mutex::new(None),
        }))
    }
}

#[derive(Debug, Clone)]
struct View {
    path: String,
    loaded_at: Instant,
    host_field: String,
}

struct ScriptedPage {
    dashboard: Arc<Dashboard>,
    timeline: Timeline,
    contract: DashboardContract,
    telemetry: TelemetryCollector,
    view: Mutex<Option<View>>,
}

impl ScriptedPage {
    fn view(&self) -> Option<View> {
        self.view.lock().unwrap().clone()
    }

    fn elapsed_ms(view: &View) -> u64 {
        u64::try_from(view.loaded_at.elapsed().as_millis()).unwrap()
    }

    fn section_loading(&self, view: &View, name: &str) -> bool {
        self.timeline
            .sections
            .iter()
            .find(|(section, _)| section == name)
            .is_some_and(|(_, ready)| ready.is_none_or(|ms| Self::elapsed_ms(view) < ms))
    }

    fn on_dashboard(&self, view: &View) -> bool {
        view.path == self.contract.dashboard_path
    }

    fn on_settings(&self, view: &View) -> bool {
        view.path == self.contract.settings_path && Self::elapsed_ms(view) >= self.timeline.form_ms
    }

    fn answer(&self, script: &str) -> Value {
        let c = &self.contract;
        let Some(view) = self.view() else {
            return Value::Null;
        };
        let elapsed = Self::elapsed_ms(&view);
        let host = c.field(&c.host_field);

        if script == ProbeExpr::count(&c.app_root).to_script() {
            return json!(1);
        }
        if script == ProbeExpr::count(c.skeleton_selector()).to_script() {
            if !self.on_dashboard(&view) || elapsed < self.timeline.skeleton_ms {
                return json!(0);
            }
            let loading = self
                .timeline
                .sections
                .iter()
                .filter(|(name, _)| self.section_loading(&view, name))
                .count();
            return json!(loading);
        }
        for (name, _) in &self.timeline.sections {
            let selector = c.section(name);
            if script == ProbeExpr::count(selector.clone()).to_script() {
                let rendered = self.on_dashboard(&view) && elapsed >= self.timeline.skeleton_ms;
                return json!(u8::from(rendered));
            }
            if script == ProbeExpr::attribute(selector, "class").to_script() {
                if !self.on_dashboard(&view) || elapsed < self.timeline.skeleton_ms {
                    return Value::Null;
                }
                return if self.section_loading(&view, name) {
                    json!(format!("card {}", c.skeleton_class))
                } else {
                    json!("card")
                };
            }
        }
        if script == ProbeExpr::count(host.clone()).to_script() {
            return json!(u8::from(self.on_settings(&view)));
        }
        if script
            == (ProbeExpr::FieldValue {
                selector: host.clone(),
            })
            .to_script()
        {
            return if self.on_settings(&view) {
                json!(view.host_field)
            } else {
                Value::Null
            };
        }
        if script
            == (Action::Fill {
                selector: host.clone(),
                value: c.host_value.clone(),
            })
            .to_script()
        {
            if !self.on_settings(&view) {
                return json!(false);
            }
            if let Some(current) = self.view.lock().unwrap().as_mut() {
                current.host_field = c.host_value.clone();
            }
            return json!(true);
        }
        if script
            == (Action::Click {
                selector: c.action(&c.save_action),
            })
            .to_script()
        {
            if !self.on_settings(&view) {
                return json!(false);
            }
            *self.dashboard.saved_host.lock().unwrap() = Some(view.host_field.clone());
            return json!(true);
        }
        if script == ProbeExpr::request(&c.config_request, Value::Null).to_script() {
            let saved = self.dashboard.saved_host.lock().unwrap().clone();
            return json!({
                "success": true,
                "data": { "config": { "host": saved.unwrap_or_else(|| "localhost".into()) } }
            });
        }
        if script == c.connection_probe {
            return json!(self.timeline.connected);
        }

        // Anything else matches nothing.
        if script.starts_with("document.querySelectorAll(") {
            json!(0)
        } else if script.starts_with("(() => { const el = document.querySelector(") {
            json!(false)
        } else {
            Value::Null
        }
    }
}

#[async_trait]
impl PageDriver for ScriptedPage {
    async fn goto(&self, url: &str, _timeout: Duration) -> Result<()> {
        let path = url.strip_prefix(BASE_URL).unwrap_or(url).to_string();
        if path == "/broken" {
            return Err(HarnessError::NavigationFailed {
                url: url.to_string(),
                reason: "net::ERR_ABORTED".into(),
            });
        }

        // Document load takes a moment.
        tokio::time::sleep(Duration::from_millis(80)).await;

        let host_field = self
            .dashboard
            .saved_host
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| "localhost".into());
        *self.view.lock().unwrap() = Some(View {
            path,
            loaded_at: Instant::now(),
            host_field,
        });

        self.telemetry
            .push(TelemetryRecord::console(Severity::Log, "dashboard booted"));
        self.telemetry.push(
            TelemetryRecord::console(Severity::Warning, "metrics poll slow")
                .with_source("app.js:12".into()),
        );
        for error in &self.timeline.console_errors {
            self.telemetry
                .push(TelemetryRecord::console(Severity::Error, error.clone()));
        }
        Ok(())
    }

    async fn evaluate(&self, script: &str) -> Result<Value> {
        Ok(self.answer(script))
    }

    async fn screenshot(&self) -> Result<Vec<u8>> {
        Ok(vec![0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A])
    }

    async fn close(&mut self) -> Result<()> {
        self.dashboard.closes.fetch_add(1, Ordering::SeqCst);
        self.dashboard.open.fetch_sub(1, Ordering::SeqCst);
        Ok(())
    }
}

/// A target that is always reachable.
pub struct ScriptedTarget;

#[async_trait]
impl Target for ScriptedTarget {
    fn base_url(&self) -> &str {
        BASE_URL
    }
}
