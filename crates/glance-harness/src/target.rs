//! The application under test.
//!
//! The harness does not start the dashboard; it consumes a base URL from
//! anything implementing [`Target`]. Before a run starts, the target is
//! health-checked so that an unreachable application is reported once as a
//! framework error instead of as a navigation failure in every scenario.

use crate::error::{HarnessError, Result};
use async_trait::async_trait;
use std::fmt;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;

/// A running application the harness can navigate to.
#[async_trait]
pub trait Target: Send + Sync {
    /// Base URL without a trailing slash.
    fn base_url(&self) -> &str;

    /// Fails if the application cannot be reached.
    async fn health_check(&self) -> Result<()> {
        Ok(())
    }

    /// Joins `path` to the base URL. Absolute URLs pass through unchanged.
    fn url(&self, path: &str) -> String {
        join_url(self.base_url(), path)
    }
}

impl fmt::Debug for dyn Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Target")
            .field("base_url", &self.base_url())
            .finish()
    }
}

/// Joins a path onto a base URL.
///
/// Absolute `http(s)` URLs and `data:`/`about:` URLs pass through.
#[must_use]
pub fn join_url(base: &str, path: &str) -> String {
    const ABSOLUTE: &[&str] = &["http://", "https://", "data:", "about:"];
    if ABSOLUTE.iter().any(|scheme| path.starts_with(scheme)) {
        return path.to_string();
    }
    let base = base.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    format!("{base}/{path}")
}

/// An already-running application at a fixed URL.
///
/// The health check opens a TCP connection to the URL's host and port.
#[derive(Debug, Clone)]
pub struct StaticTarget {
    base_url: String,
    connect_timeout: Duration,
}

impl StaticTarget {
    /// Creates a target for `base_url`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            connect_timeout: Duration::from_secs(5),
        }
    }

    /// Overrides the connection timeout of the health check.
    #[must_use]
    pub fn with_connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self
    }
}

#[async_trait]
impl Target for StaticTarget {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn health_check(&self) -> Result<()> {
        let unreachable = |reason: String| HarnessError::TargetUnreachable {
            url: self.base_url.clone(),
            reason,
        };

        let address = socket_address(&self.base_url)
            .ok_or_else(|| unreachable("not an http(s) URL".into()))?;
        tracing::debug!("Checking target at {address}");

        match timeout(self.connect_timeout, TcpStream::connect(&address)).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(unreachable(e.to_string())),
            Err(_) => Err(unreachable(format!(
                "no connection within {}ms",
                self.connect_timeout.as_millis()
            ))),
        }
    }
}

/// Extracts `host:port` from an http(s) URL, applying the scheme's default
/// port.
fn socket_address(url: &str) -> Option<String> {
    let (rest, default_port) = if let Some(rest) = url.strip_prefix("http://") {
        (rest, 80)
    } else if let Some(rest) = url.strip_prefix("https://") {
        (rest, 443)
    } else {
        return None;
    };

    let authority = rest.split(['/', '?', '#']).next().unwrap_or_default();
    let authority = authority.rsplit('@').next().unwrap_or_default();
    if authority.is_empty() {
        return None;
    }

    // Bracketed IPv6 literal: the port (if any) follows the closing bracket.
    if authority.starts_with('[') {
        let close = authority.find(']')?;
        let host = &authority[..=close];
        return match authority[close + 1..].strip_prefix(':') {
            Some(port) => Some(format!("{host}:{port}")),
            None => Some(format!("{host}:{default_port}")),
        };
    }

    match authority.rsplit_once(':') {
        Some((host, port)) if !port.is_empty() => Some(format!("{host}:{port}")),
        Some((host, _)) => Some(format!("{host}:{default_port}")),
        None => Some(format!("{authority}:{default_port}")),
    }
}
