//! Error types for harness operations.
//!
//! Errors fall into two classes. Framework errors (the browser could not be
//! launched, the DevTools connection dropped, the process died) abort the
//! whole run. Everything else is scoped to a scenario and is converted into
//! `ScenarioResult` data by the runner instead of being propagated.

use thiserror::Error;

/// The main error type for all harness operations.
#[derive(Debug, Error)]
pub enum HarnessError {
    /// Failed to launch the browser process.
    ///
    /// This typically occurs when Chrome/Chromium is not installed,
    /// or when there are permission issues with the executable.
    #[error("failed to launch browser: {reason}")]
    LaunchFailed {
        /// Human-readable reason for the launch failure
        reason: String,
        /// Optional underlying error that caused the failure
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Failed to establish or keep the DevTools Protocol connection.
    #[error("CDP connection failed: {0}")]
    ConnectionFailed(String),

    /// Navigation to a URL failed or did not settle within its deadline.
    #[error("navigation to '{url}' failed: {reason}")]
    NavigationFailed {
        /// The URL that failed to load
        url: String,
        /// Reason for the navigation failure
        reason: String,
    },

    /// The target application did not accept connections.
    #[error("target '{url}' is unreachable: {reason}")]
    TargetUnreachable {
        /// Base URL of the target
        url: String,
        /// Connection error
        reason: String,
    },

    /// An interaction targeted a selector that matched nothing.
    #[error("no element matches '{selector}'")]
    ElementNotFound {
        /// The selector that matched nothing
        selector: String,
    },

    /// JavaScript execution in the page context failed.
    #[error("JavaScript execution failed: {0}")]
    ScriptExecutionFailed(String),

    /// A probe returned a value the harness could not interpret.
    #[error("probe '{probe}' returned an unexpected value: {reason}")]
    ProbeFailed {
        /// Short description of the probe
        probe: String,
        /// What was wrong with the result
        reason: String,
    },

    /// The browser process crashed or was killed unexpectedly.
    #[error("browser process terminated unexpectedly")]
    ProcessTerminated,

    /// An operation was attempted on a closed session.
    #[error("session is already closed")]
    AlreadyClosed,

    /// A scenario definition is malformed (unknown set, empty steps, ...).
    #[error("invalid scenario '{name}': {reason}")]
    InvalidScenario {
        /// Scenario or scenario-set name
        name: String,
        /// What is wrong with it
        reason: String,
    },

    /// A scenario task panicked or was cancelled.
    #[error("scenario '{0}' aborted unexpectedly")]
    ScenarioAborted(String),

    /// A DevTools command failed while setting a session up.
    #[error("chromiumoxide error: {0}")]
    ChromiumOxide(#[from] chromiumoxide::error::CdpError),

    /// Generic I/O errors (report and screenshot persistence).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Report or scenario file (de)serialization errors.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl HarnessError {
    /// Returns true for framework errors that must abort the entire run.
    ///
    /// Navigation failures, probe failures and script errors are scenario
    /// scoped and get recorded in the scenario result instead.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            HarnessError::LaunchFailed { .. }
                | HarnessError::ConnectionFailed(_)
                | HarnessError::TargetUnreachable { .. }
                | HarnessError::ProcessTerminated
                | HarnessError::AlreadyClosed
                | HarnessError::ChromiumOxide(_)
        )
    }
}

/// A specialized Result type for harness operations.
pub type Result<T> = std::result::Result<T, HarnessError>;
