//! Terminal output: status messages on stderr and the run summary.
//!
//! Colors follow `--no-color`, `NO_COLOR`/`FORCE_COLOR` and terminal
//! detection. Everything is rendered to strings first so that the summary
//! can be tested without a terminal.
//!
//! # Examples
//!
//! ```no_run
//! use glance_cli::ui;
//!
//! ui::init_colors(false);
//! ui::info("Running 3 scenarios against http://127.0.0.1:8080");
//! ui::success("All scenarios passed");
//! ```

mod format;
mod messages;

use std::fmt::Display;
use std::sync::atomic::{AtomicBool, Ordering};

pub use format::{format_duration, render_report, render_sets};
pub use messages::{error, info, success};

static COLORS: AtomicBool = AtomicBool::new(false);

/// Check if color output should be enabled.
///
/// `NO_COLOR` disables colors, `FORCE_COLOR` forces them even without a
/// terminal; otherwise stderr's capabilities decide.
pub fn should_use_color() -> bool {
    if std::env::var_os("NO_COLOR").is_some() {
        return false;
    }

    if std::env::var_os("FORCE_COLOR").is_some() {
        return true;
    }

    console::user_attended_stderr() && console::Term::stderr().features().colors_supported()
}

/// Initialize color support. Call once, early in `main`.
pub fn init_colors(no_color: bool) {
    let enabled = !no_color && should_use_color();
    COLORS.store(enabled, Ordering::Relaxed);
    console::set_colors_enabled(enabled);
    console::set_colors_enabled_stderr(enabled);
}

/// Whether output is colored.
pub fn colors_enabled() -> bool {
    COLORS.load(Ordering::Relaxed)
}

/// Applies `styled` when colors are enabled, plain text otherwise.
pub(crate) fn paint<T: Display>(text: T, styled: impl FnOnce(&T) -> String) -> String {
    if colors_enabled() {
        styled(&text)
    } else {
        text.to_string()
    }
}
