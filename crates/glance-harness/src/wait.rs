//! Deadline-bounded polling.
//!
//! Every `sleep(100ms); check()` loop in a verification script is a special
//! case of [`wait_for`]: poll a predicate at a fixed interval starting at
//! elapsed = 0 and stop at the first `true` or at the deadline. A missed
//! deadline is data (`detected = false`), not an error.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tokio::time::{Instant, sleep};

/// Default deadline for wait operations (30 seconds).
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default poll interval for checking conditions (100ms).
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Configuration for wait operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitConfig {
    /// Maximum time to wait for the condition.
    pub deadline: Duration,

    /// Suspension between two polls.
    pub poll_interval: Duration,
}

impl WaitConfig {
    /// Creates a new wait configuration.
    #[must_use]
    pub fn new(deadline: Duration, poll_interval: Duration) -> Self {
        Self {
            deadline,
            poll_interval,
        }
    }

    /// Creates a config with custom deadline and default poll interval.
    #[must_use]
    pub fn with_deadline(deadline: Duration) -> Self {
        Self::new(deadline, DEFAULT_POLL_INTERVAL)
    }
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT, DEFAULT_POLL_INTERVAL)
    }
}

/// Result of a bounded wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaitOutcome {
    /// Whether the predicate became true before the deadline.
    pub detected: bool,

    /// Time from the first poll to detection, or exactly the deadline.
    #[serde(with = "duration_ms")]
    pub elapsed: Duration,
}

/// Polls `condition` until it returns true or `config.deadline` elapses.
///
/// The first poll happens immediately. Between polls the task sleeps for
/// `poll_interval`, shortened so that one final poll lands exactly on the
/// deadline. When that poll is also false the outcome reports
/// `elapsed == deadline`.
///
/// Errors that are not fatal (a transient script failure while the page is
/// mid-render) count as `false`; fatal errors end the wait and propagate.
pub async fn wait_for<F, Fut>(condition: F, config: WaitConfig) -> Result<WaitOutcome>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<bool>>,
{
    let start = Instant::now();
    let deadline = start + config.deadline;

    loop {
        match condition().await {
            Ok(true) => {
                return Ok(WaitOutcome {
                    detected: true,
                    elapsed: start.elapsed().min(config.deadline),
                });
            }
            Ok(false) => {}
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => tracing::trace!("transient poll error: {e}"),
        }

        let now = Instant::now();
        if now >= deadline {
            return Ok(WaitOutcome {
                detected: false,
                elapsed: config.deadline,
            });
        }

        let pause = config.poll_interval.min(deadline - now);
        sleep(pause).await;
    }
}

pub(crate) mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}
