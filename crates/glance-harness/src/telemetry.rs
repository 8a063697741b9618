//! Console and network telemetry capture.
//!
//! One [`TelemetryCollector`] is owned by each session. Browser listeners
//! append to it; scenario code and the runner read it through
//! [`TelemetryCollector::query`], which returns a snapshot of the log at call
//! time rather than a live stream.
//!
//! Records are never removed except by [`TelemetryCollector::clear`]. Each
//! record gets a sequence number under the log lock, so `seq` order is the
//! arrival order even when the console and network listeners race.

use chromiumoxide::cdp::browser_protocol::network::{
    EventLoadingFailed, EventLoadingFinished, EventRequestWillBeSent, EventResponseReceived,
};
use chromiumoxide::cdp::js_protocol::runtime::{EventConsoleApiCalled, EventExceptionThrown};
use chromiumoxide::page::Page as ChromePage;
use chrono::{DateTime, Utc};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;
use tokio::task::JoinHandle;

use crate::error::Result;

/// Which listener produced a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    /// `console.*` calls and uncaught exceptions
    Console,
    /// Requests issued by the page
    Network,
}

/// Severity of a record.
///
/// For console records this maps directly to the JavaScript console method.
/// Network records are `Info` unless the response was a 4xx (`Warning`), a
/// 5xx or a transport failure (`Error`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// `console.debug()`
    Debug,
    /// `console.log()` and other console APIs
    Log,
    /// `console.info()`
    Info,
    /// `console.warn()`
    Warning,
    /// `console.error()`
    Error,
}

impl Severity {
    /// Returns true if this is an error-level record.
    #[must_use]
    pub fn is_error(&self) -> bool {
        matches!(self, Severity::Error)
    }

    /// Returns true if this is a warning or error.
    #[must_use]
    pub fn is_warning_or_error(&self) -> bool {
        matches!(self, Severity::Warning | Severity::Error)
    }
}

impl From<&str> for Severity {
    fn from(s: &str) -> Self {
        match s {
            "debug" => Severity::Debug,
            "info" => Severity::Info,
            "warn" | "warning" => Severity::Warning,
            "error" => Severity::Error,
            _ => Severity::Log,
        }
    }
}

impl From<&EventConsoleApiCalled> for Severity {
    fn from(event: &EventConsoleApiCalled) -> Self {
        use chromiumoxide::cdp::js_protocol::runtime::ConsoleApiCalledType;

        match event.r#type {
            ConsoleApiCalledType::Info => Severity::Info,
            ConsoleApiCalledType::Warning => Severity::Warning,
            ConsoleApiCalledType::Error | ConsoleApiCalledType::Assert => Severity::Error,
            ConsoleApiCalledType::Debug => Severity::Debug,
            _ => Severity::Log,
        }
    }
}

/// What was observed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Payload {
    /// A console message or uncaught exception.
    Console {
        /// Formatted message text. Multiple arguments are joined with spaces.
        text: String,
        /// Source location if available (e.g., "app.js:42:10").
        #[serde(default, skip_serializing_if = "Option::is_none")]
        source: Option<String>,
    },
    /// One phase of a network request.
    Network {
        /// HTTP verb
        method: String,
        /// Request URL
        url: String,
        /// Response status once known
        #[serde(default, skip_serializing_if = "Option::is_none")]
        status: Option<u16>,
        /// Transport failure reason (`net::ERR_...`)
        #[serde(default, skip_serializing_if = "Option::is_none")]
        failure: Option<String>,
    },
}

/// One immutable entry in the telemetry log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetryRecord {
    /// Arrival position; strictly increasing, survives `clear()`.
    pub seq: u64,

    /// Wall-clock capture time.
    pub timestamp: DateTime<Utc>,

    /// Milliseconds since the collector was created (monotonic).
    pub elapsed_ms: u64,

    /// Producing listener.
    pub channel: Channel,

    /// Severity level.
    pub severity: Severity,

    /// Message text or request line.
    pub payload: Payload,

    /// Free-form extra context (`requestId`, `phase`, `origin`, ...).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}

impl TelemetryRecord {
    /// Creates an unsequenced console record. Sequence and time are assigned
    /// when the record is appended to a collector.
    #[must_use]
    pub fn console(severity: Severity, text: impl Into<String>) -> Self {
        Self::unsequenced(
            Channel::Console,
            severity,
            Payload::Console {
                text: text.into(),
                source: None,
            },
        )
    }

    /// Creates an unsequenced network record.
    #[must_use]
    pub fn network(severity: Severity, method: impl Into<String>, url: impl Into<String>) -> Self {
        Self::unsequenced(
            Channel::Network,
            severity,
            Payload::Network {
                method: method.into(),
                url: url.into(),
                status: None,
                failure: None,
            },
        )
    }

    fn unsequenced(channel: Channel, severity: Severity, payload: Payload) -> Self {
        Self {
            seq: 0,
            timestamp: Utc::now(),
            elapsed_ms: 0,
            channel,
            severity,
            payload,
            metadata: BTreeMap::new(),
        }
    }

    /// Attaches a source location to a console record.
    #[must_use]
    pub fn with_source(mut self, location: String) -> Self {
        if let Payload::Console { source, .. } = &mut self.payload {
            *source = Some(location);
        }
        self
    }

    /// Attaches a response status to a network record.
    #[must_use]
    pub fn with_status(mut self, code: u16) -> Self {
        if let Payload::Network { status, .. } = &mut self.payload {
            *status = Some(code);
        }
        self
    }

    /// Attaches a failure reason to a network record.
    #[must_use]
    pub fn with_failure(mut self, reason: String) -> Self {
        if let Payload::Network { failure, .. } = &mut self.payload {
            *failure = Some(reason);
        }
        self
    }

    /// Adds a metadata entry.
    #[must_use]
    pub fn with_meta(mut self, key: &str, value: impl Into<String>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }

    /// The searchable text of the record: the console message, or
    /// `METHOD url` plus any failure reason for network records.
    #[must_use]
    pub fn text(&self) -> String {
        match &self.payload {
            Payload::Console { text, .. } => text.clone(),
            Payload::Network {
                method,
                url,
                failure,
                ..
            } => match failure {
                Some(reason) => format!("{method} {url} {reason}"),
                None => format!("{method} {url}"),
            },
        }
    }
}

/// A position in the log, usable as the `since` bound of a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TelemetryMark(pub u64);

/// Filter for [`TelemetryCollector::query`]. All set fields must match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TelemetryQuery {
    /// Restrict to one channel.
    pub channel: Option<Channel>,
    /// Restrict to these severities.
    pub severity_in: Option<Vec<Severity>>,
    /// Case-insensitive substring of [`TelemetryRecord::text`].
    pub text_contains: Option<String>,
    /// Only records appended at or after this mark.
    pub since: Option<TelemetryMark>,
}

impl TelemetryQuery {
    /// An unfiltered query.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Restricts the query to one channel.
    #[must_use]
    pub fn channel(mut self, channel: Channel) -> Self {
        self.channel = Some(channel);
        self
    }

    /// Restricts the query to the given severities.
    #[must_use]
    pub fn severity_in(mut self, severities: impl IntoIterator<Item = Severity>) -> Self {
        self.severity_in = Some(severities.into_iter().collect());
        self
    }

    /// Restricts the query to records whose text contains `needle`.
    #[must_use]
    pub fn text_contains(mut self, needle: impl Into<String>) -> Self {
        self.text_contains = Some(needle.into());
        self
    }

    /// Restricts the query to records appended at or after `mark`.
    #[must_use]
    pub fn since(mut self, mark: TelemetryMark) -> Self {
        self.since = Some(mark);
        self
    }

    /// Returns true if `record` satisfies every set filter.
    #[must_use]
    pub fn matches(&self, record: &TelemetryRecord) -> bool {
        if self.channel.is_some_and(|c| c != record.channel) {
            return false;
        }
        if let Some(severities) = &self.severity_in {
            if !severities.contains(&record.severity) {
                return false;
            }
        }
        if self.since.is_some_and(|m| record.seq < m.0) {
            return false;
        }
        if let Some(needle) = &self.text_contains {
            if !record
                .text()
                .to_lowercase()
                .contains(&needle.to_lowercase())
            {
                return false;
            }
        }
        true
    }
}

/// A frozen copy of the log taken at query time.
///
/// Filtering happens lazily during iteration and the snapshot can be
/// iterated any number of times; appends after the query are not visible.
#[derive(Debug, Clone)]
pub struct TelemetrySnapshot {
    records: Arc<Vec<TelemetryRecord>>,
    query: TelemetryQuery,
}

impl TelemetrySnapshot {
    /// Iterates the matching records in arrival order.
    pub fn iter(&self) -> impl Iterator<Item = &TelemetryRecord> + '_ {
        self.records.iter().filter(|r| self.query.matches(r))
    }

    /// Number of matching records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    /// Returns true if nothing matched.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }

    /// Collects the matching records.
    #[must_use]
    pub fn to_vec(&self) -> Vec<TelemetryRecord> {
        self.iter().cloned().collect()
    }
}

impl<'a> IntoIterator for &'a TelemetrySnapshot {
    type Item = &'a TelemetryRecord;
    type IntoIter = Box<dyn Iterator<Item = &'a TelemetryRecord> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.iter())
    }
}

#[derive(Debug)]
struct LogState {
    records: Vec<TelemetryRecord>,
    next_seq: u64,
    /// `requestId` to `(method, url)` of requests still running.
    in_flight: HashMap<String, (String, String)>,
}

/// Thread-safe, append-only telemetry log.
///
/// Cheaply cloneable (Arc). The listener tasks hold clones; the owning
/// session hands out references for queries.
#[derive(Debug, Clone)]
pub struct TelemetryCollector {
    state: Arc<Mutex<LogState>>,
    origin: Instant,
}

impl TelemetryCollector {
    /// Creates a new, empty collector.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(LogState {
                records: Vec::new(),
                next_seq: 0,
                in_flight: HashMap::new(),
            })),
            origin: Instant::now(),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, LogState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Appends a record, assigning its sequence number and capture time.
    ///
    /// Public so that drivers other than the built-in Chrome one can feed
    /// the log.
    pub fn push(&self, mut record: TelemetryRecord) {
        let mut state = self.lock();
        record.seq = state.next_seq;
        record.timestamp = Utc::now();
        record.elapsed_ms = u64::try_from(self.origin.elapsed().as_millis()).unwrap_or(u64::MAX);
        state.next_seq += 1;
        state.records.push(record);
    }

    /// Returns a snapshot of the records matching `query`.
    #[must_use]
    pub fn query(&self, query: TelemetryQuery) -> TelemetrySnapshot {
        let records = Arc::new(self.lock().records.clone());
        TelemetrySnapshot { records, query }
    }

    /// Returns a mark positioned after every record appended so far.
    #[must_use]
    pub fn mark(&self) -> TelemetryMark {
        TelemetryMark(self.lock().next_seq)
    }

    /// Clears the buffer. Sequence numbers keep increasing so earlier marks
    /// stay meaningful.
    pub fn clear(&self) {
        self.lock().records.clear();
    }

    /// Total number of records currently held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().records.len()
    }

    /// Returns true if no records are held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of requests that started and have not finished or failed.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.lock().in_flight.len()
    }

    pub(crate) fn request_started(&self, id: String, method: String, url: String) {
        let record = TelemetryRecord::network(Severity::Info, method.clone(), url.clone())
            .with_meta("phase", "request")
            .with_meta("requestId", id.clone());
        self.lock().in_flight.insert(id, (method, url));
        self.push(record);
    }

    /// Records a response. The method comes from the matching request.
    pub(crate) fn response_received(&self, id: &str, status: u16, url: String) {
        let severity = match status {
            500.. => Severity::Error,
            400..=499 => Severity::Warning,
            _ => Severity::Info,
        };
        let method = self
            .lock()
            .in_flight
            .get(id)
            .map(|(method, _)| method.clone())
            .unwrap_or_default();
        self.push(
            TelemetryRecord::network(severity, method, url)
                .with_status(status)
                .with_meta("phase", "response")
                .with_meta("requestId", id),
        );
    }

    pub(crate) fn request_finished(&self, id: &str) {
        self.lock().in_flight.remove(id);
    }

    /// Records a transport failure under the request line it belongs to.
    /// Cancelled requests are informational.
    pub(crate) fn request_failed(&self, id: &str, reason: String, canceled: bool) {
        let (method, url) = self.lock().in_flight.remove(id).unwrap_or_default();
        let severity = if canceled { Severity::Info } else { Severity::Error };
        self.push(
            TelemetryRecord::network(severity, method, url)
                .with_failure(reason)
                .with_meta("phase", "failed")
                .with_meta("requestId", id),
        );
    }

    /// Subscribes to console, exception and network events of `page`.
    ///
    /// Subscriptions are established before this returns, so nothing the
    /// page emits after the first navigation is missed. The returned tasks
    /// end when the page's event streams close.
    pub(crate) async fn attach(&self, page: &ChromePage) -> Result<Vec<JoinHandle<()>>> {
        let mut console = page.event_listener::<EventConsoleApiCalled>().await?;
        let mut exceptions = page.event_listener::<EventExceptionThrown>().await?;
        let mut requests = page.event_listener::<EventRequestWillBeSent>().await?;
        let mut responses = page.event_listener::<EventResponseReceived>().await?;
        let mut finished = page.event_listener::<EventLoadingFinished>().await?;
        let mut failed = page.event_listener::<EventLoadingFailed>().await?;

        let mut tasks = Vec::with_capacity(4);

        let log = self.clone();
        tasks.push(tokio::spawn(async move {
            loop {
                tokio::select! {
                    Some(event) = console.next() => log.push(parse_console_event(&event)),
                    Some(event) = exceptions.next() => log.push(parse_exception_event(&event)),
                    else => break,
                }
            }
        }));

        let log = self.clone();
        tasks.push(tokio::spawn(async move {
            while let Some(event) = requests.next().await {
                log.request_started(
                    event.request_id.inner().clone(),
                    event.request.method.clone(),
                    event.request.url.clone(),
                );
            }
        }));

        let log = self.clone();
        tasks.push(tokio::spawn(async move {
            while let Some(event) = responses.next().await {
                let status = u16::try_from(event.response.status).unwrap_or(0);
                log.response_received(
                    event.request_id.inner(),
                    status,
                    event.response.url.clone(),
                );
            }
        }));

        let log = self.clone();
        tasks.push(tokio::spawn(async move {
            loop {
                tokio::select! {
                    Some(event) = finished.next() => log.request_finished(event.request_id.inner()),
                    Some(event) = failed.next() => log.request_failed(
                        event.request_id.inner(),
                        event.error_text.clone(),
                        event.canceled.unwrap_or(false),
                    ),
                    else => break,
                }
            }
        }));

        Ok(tasks)
    }
}

impl Default for TelemetryCollector {
    fn default() -> Self {
        Self::new()
    }
}

/// Converts a `Runtime.consoleAPICalled` event into a record.
///
/// String arguments are used verbatim, other primitives are JSON-encoded
/// and objects fall back to their description.
pub(crate) fn parse_console_event(event: &EventConsoleApiCalled) -> TelemetryRecord {
    let severity = Severity::from(event);

    let text = event
        .args
        .iter()
        .map(|arg| match (&arg.value, &arg.description) {
            (Some(serde_json::Value::String(s)), _) => s.clone(),
            (Some(v), _) => v.to_string(),
            (None, Some(description)) => description.clone(),
            (None, None) => "<object>".to_string(),
        })
        .collect::<Vec<_>>()
        .join(" ");

    let mut record = TelemetryRecord::console(severity, text);

    if let Some(stack_trace) = &event.stack_trace {
        if let Some(frame) = stack_trace.call_frames.first() {
            record = record.with_source(format!(
                "{}:{}:{}",
                frame.url, frame.line_number, frame.column_number
            ));
        }
    }

    record
}

/// Converts an uncaught exception into an error-level console record.
pub(crate) fn parse_exception_event(event: &EventExceptionThrown) -> TelemetryRecord {
    let details = &event.exception_details;
    let text = details
        .exception
        .as_ref()
        .and_then(|e| e.description.clone())
        .unwrap_or_else(|| details.text.clone());

    let mut record =
        TelemetryRecord::console(Severity::Error, text).with_meta("origin", "exception");
    if let Some(url) = &details.url {
        record = record.with_source(format!(
            "{}:{}:{}",
            url, details.line_number, details.column_number
        ));
    }
    record
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_log() -> TelemetryCollector {
        let log = TelemetryCollector::new();
        log.push(TelemetryRecord::console(Severity::Log, "dashboard mounted"));
        log.push(TelemetryRecord::console(Severity::Error, "Failed to fetch metrics"));
        log.push(
            TelemetryRecord::network(Severity::Info, "GET", "http://localhost:3000/app.js")
                .with_meta("phase", "request"),
        );
        log.push(TelemetryRecord::console(Severity::Warning, "slow render"));
        log
    }

    #[test]
    fn severity_classification() {
        assert!(Severity::Error.is_error());
        assert!(!Severity::Warning.is_error());
        assert!(Severity::Warning.is_warning_or_error());
        assert!(!Severity::Log.is_warning_or_error());
        assert_eq!(Severity::from("warn"), Severity::Warning);
        assert_eq!(Severity::from("trace"), Severity::Log);
    }

    #[test]
    fn records_are_sequenced_in_arrival_order() {
        let log = sample_log();
        let all = log.query(TelemetryQuery::new()).to_vec();

        assert_eq!(all.len(), 4);
        assert!(all.windows(2).all(|w| w[0].seq < w[1].seq));
        assert!(all.windows(2).all(|w| w[0].elapsed_ms <= w[1].elapsed_ms));
    }

    #[test]
    fn query_filters_compose() {
        let log = sample_log();

        let console_errors = log.query(
            TelemetryQuery::new()
                .channel(Channel::Console)
                .severity_in([Severity::Error]),
        );
        assert_eq!(console_errors.len(), 1);
        assert_eq!(console_errors.to_vec()[0].text(), "Failed to fetch metrics");

        let network = log.query(TelemetryQuery::new().channel(Channel::Network));
        assert_eq!(network.len(), 1);

        let by_text = log.query(TelemetryQuery::new().text_contains("FETCH"));
        assert_eq!(by_text.len(), 1, "text match is case-insensitive");
    }

    #[test]
    fn since_mark_excludes_earlier_records() {
        let log = sample_log();
        let mark = log.mark();
        log.push(TelemetryRecord::console(Severity::Error, "after the mark"));

        let later = log.query(TelemetryQuery::new().since(mark));
        assert_eq!(later.len(), 1);
        assert_eq!(later.to_vec()[0].text(), "after the mark");
    }

    #[test]
    fn snapshot_is_frozen_and_restartable() {
        let log = sample_log();
        let snapshot = log.query(TelemetryQuery::new());
        log.push(TelemetryRecord::console(Severity::Log, "late"));

        assert_eq!(snapshot.len(), 4);
        let first_pass: Vec<u64> = snapshot.iter().map(|r| r.seq).collect();
        let second_pass: Vec<u64> = (&snapshot).into_iter().map(|r| r.seq).collect();
        assert_eq!(first_pass, second_pass);
    }

    #[test]
    fn clear_then_query_is_empty() {
        let log = sample_log();
        log.clear();

        assert!(log.query(TelemetryQuery::new()).is_empty());
        assert!(log.is_empty());

        log.push(TelemetryRecord::console(Severity::Log, "fresh"));
        let records = log.query(TelemetryQuery::new()).to_vec();
        assert_eq!(records[0].seq, 4, "sequence numbers survive clear()");
    }

    #[test]
    fn in_flight_tracks_request_lifecycle() {
        let log = TelemetryCollector::new();
        log.request_started("1".into(), "GET".into(), "http://localhost/a".into());
        log.request_started("2".into(), "GET".into(), "http://localhost/b".into());
        assert_eq!(log.in_flight(), 2);

        log.request_finished("1");
        log.request_failed("2", "net::ERR_CONNECTION_REFUSED".into(), false);
        assert_eq!(log.in_flight(), 0);
        assert_eq!(log.len(), 3);
    }

    #[test]
    fn failed_requests_keep_their_request_line() {
        let log = TelemetryCollector::new();
        log.request_started(
            "7".into(),
            "GET".into(),
            "http://localhost:3000/favicon.ico".into(),
        );
        log.request_failed("7", "net::ERR_FILE_NOT_FOUND".into(), false);

        let failures = log.query(
            TelemetryQuery::new()
                .channel(Channel::Network)
                .severity_in([Severity::Error])
                .text_contains("favicon.ico"),
        );
        let failure = failures.iter().next().unwrap();
        assert_eq!(
            failure.text(),
            "GET http://localhost:3000/favicon.ico net::ERR_FILE_NOT_FOUND"
        );
        assert_eq!(failure.metadata["phase"], "failed");
    }

    #[test]
    fn responses_take_the_method_of_their_request() {
        let log = TelemetryCollector::new();
        log.request_started("9".into(), "POST".into(), "http://localhost/api/config".into());
        log.response_received("9", 503, "http://localhost/api/config".into());
        log.request_failed("10", "net::ERR_ABORTED".into(), true);

        let records = log.query(TelemetryQuery::new()).to_vec();
        assert_eq!(records[1].text(), "POST http://localhost/api/config");
        assert_eq!(records[1].severity, Severity::Error);
        assert!(matches!(
            records[1].payload,
            Payload::Network {
                status: Some(503),
                ..
            }
        ));
        // unknown ids still produce a record
        assert_eq!(records[2].severity, Severity::Info);
        assert_eq!(log.in_flight(), 1);
    }

    #[test]
    fn network_text_includes_failure() {
        let record = TelemetryRecord::network(Severity::Error, "GET", "http://x/y")
            .with_failure("net::ERR_TIMED_OUT".into());
        assert_eq!(record.text(), "GET http://x/y net::ERR_TIMED_OUT");
    }
}
