//! Reads and interactions against the application, expressed as data.
//!
//! Verification code never writes JavaScript inline. It builds a
//! [`ProbeExpr`] (or an [`Action`]) and hands it to an [`AppProbe`]. The
//! Chrome driver renders these into scripts; the rendering always passes
//! selectors and values through JSON encoding so they cannot break out of
//! their string literals.
//!
//! Missing elements never raise: counts resolve to `0`, text and attribute
//! reads resolve to `null`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;

/// Global the application exposes its state store under.
pub const STATE_GLOBAL: &str = "stateManager";

/// Global the application exposes its request client under.
pub const REQUEST_GLOBAL: &str = "socketClient";

/// How text is gathered from matching elements.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextMode {
    /// Text content of the first match.
    #[default]
    First,
    /// Text content of every match joined with spaces.
    All,
}

/// A read against the page or the application behind it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "probe", rename_all = "camelCase")]
pub enum ProbeExpr {
    /// Number of elements matching a selector.
    ElementCount { selector: String },
    /// Text content of matching elements.
    Text {
        selector: String,
        #[serde(default)]
        mode: TextMode,
    },
    /// Attribute of the first match.
    Attribute { selector: String, name: String },
    /// `value` of the first matching form control.
    FieldValue { selector: String },
    /// One top-level key of the application state store.
    State { key: String },
    /// Response of the client-side request function.
    Request {
        name: String,
        #[serde(default)]
        payload: Value,
    },
    /// Raw expression. Prefer the structured variants.
    Script { source: String },
}

impl ProbeExpr {
    /// Counts elements matching `selector`.
    pub fn count(selector: impl Into<String>) -> Self {
        ProbeExpr::ElementCount {
            selector: selector.into(),
        }
    }

    /// Reads the text of the first element matching `selector`.
    pub fn text(selector: impl Into<String>) -> Self {
        ProbeExpr::Text {
            selector: selector.into(),
            mode: TextMode::First,
        }
    }

    /// Reads attribute `name` of the first element matching `selector`.
    pub fn attribute(selector: impl Into<String>, name: impl Into<String>) -> Self {
        ProbeExpr::Attribute {
            selector: selector.into(),
            name: name.into(),
        }
    }

    /// Issues a request through the application's request client.
    pub fn request(name: impl Into<String>, payload: Value) -> Self {
        ProbeExpr::Request {
            name: name.into(),
            payload,
        }
    }

    /// Short human-readable form used as an assertion target.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            ProbeExpr::ElementCount { selector } => format!("count({selector})"),
            ProbeExpr::Text { selector, mode } => match mode {
                TextMode::First => format!("text({selector})"),
                TextMode::All => format!("text*({selector})"),
            },
            ProbeExpr::Attribute { selector, name } => format!("{selector}@{name}"),
            ProbeExpr::FieldValue { selector } => format!("value({selector})"),
            ProbeExpr::State { key } => format!("state.{key}"),
            ProbeExpr::Request { name, .. } => format!("request({name})"),
            ProbeExpr::Script { source } => format!("script({})", truncate(source, 48)),
        }
    }

    /// Renders the probe as a JavaScript expression.
    #[must_use]
    pub fn to_script(&self) -> String {
        match self {
            ProbeExpr::ElementCount { selector } => {
                format!("document.querySelectorAll({}).length", js(selector))
            }
            ProbeExpr::Text {
                selector,
                mode: TextMode::First,
            } => format!(
                "(document.querySelector({})?.textContent ?? null)",
                js(selector)
            ),
            ProbeExpr::Text {
                selector,
                mode: TextMode::All,
            } => format!(
                "(() => {{ const els = Array.from(document.querySelectorAll({})); \
                 return els.length ? els.map(e => e.textContent).join(' ') : null; }})()",
                js(selector)
            ),
            ProbeExpr::Attribute { selector, name } => format!(
                "(document.querySelector({})?.getAttribute({}) ?? null)",
                js(selector),
                js(name)
            ),
            ProbeExpr::FieldValue { selector } => format!(
                "(document.querySelector({})?.value ?? null)",
                js(selector)
            ),
            ProbeExpr::State { key } => format!(
                "(() => {{ const s = window.{STATE_GLOBAL}; \
                 if (!s || typeof s.get !== 'function') return null; \
                 const v = s.get({}); return v === undefined ? null : v; }})()",
                js(key)
            ),
            ProbeExpr::Request { name, payload } => format!(
                "(async () => {{ const c = window.{REQUEST_GLOBAL}; \
                 if (!c || typeof c.request !== 'function') \
                 return {{ success: false, error: '{REQUEST_GLOBAL} unavailable' }}; \
                 try {{ const r = await c.request({}, {}); \
                 return r ?? {{ success: false, error: 'empty response' }}; }} \
                 catch (e) {{ return {{ success: false, error: String((e && e.message) || e) }}; }} }})()",
                js(name),
                payload
            ),
            ProbeExpr::Script { source } => source.clone(),
        }
    }
}

/// An interaction with the page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum Action {
    /// Clicks the first element matching `selector`.
    Click { selector: String },
    /// Sets the value of a form control and fires `input` and `change`.
    Fill { selector: String, value: String },
}

impl Action {
    /// The selector the action targets.
    #[must_use]
    pub fn selector(&self) -> &str {
        match self {
            Action::Click { selector } | Action::Fill { selector, .. } => selector,
        }
    }

    /// Renders the action as a JavaScript expression that evaluates to
    /// `true` when the target element existed.
    #[must_use]
    pub fn to_script(&self) -> String {
        match self {
            Action::Click { selector } => format!(
                "(() => {{ const el = document.querySelector({}); \
                 if (!el) return false; el.click(); return true; }})()",
                js(selector)
            ),
            Action::Fill { selector, value } => format!(
                "(() => {{ const el = document.querySelector({}); \
                 if (!el) return false; el.focus(); el.value = {}; \
                 el.dispatchEvent(new Event('input', {{ bubbles: true }})); \
                 el.dispatchEvent(new Event('change', {{ bubbles: true }})); \
                 return true; }})()",
                js(selector),
                js(value)
            ),
        }
    }
}

/// The single adapter through which DOM and application state are read.
#[async_trait]
pub trait AppProbe: Send + Sync {
    /// Evaluates `expr` against the current page.
    async fn probe(&self, expr: &ProbeExpr) -> Result<Value>;
}

/// Resolves a dotted path (`data.config.host`, `items.0.name`) inside a
/// JSON value. An empty path returns the value itself.
#[must_use]
pub fn lookup_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    if path.is_empty() {
        return Some(value);
    }
    path.split('.').try_fold(value, |current, segment| match current {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

fn js(s: &str) -> String {
    // JSON string literals are valid JavaScript string literals.
    serde_json::to_string(s).unwrap_or_else(|_| "\"\"".to_string())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let head: String = s.chars().take(max).collect();
        format!("{head}…")
    }
}
