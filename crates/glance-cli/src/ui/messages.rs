//! Status message functions for terminal output.

use super::paint;
use owo_colors::OwoColorize;

/// Print a success message to stderr.
pub fn success(message: &str) {
    eprintln!("{} {}", paint("✓", |t| t.green().bold().to_string()), message);
}

/// Print an info message to stderr.
pub fn info(message: &str) {
    eprintln!("{} {}", paint("ℹ", |t| t.blue().bold().to_string()), message);
}

/// Print an error message to stderr.
pub fn error(message: &str) {
    eprintln!(
        "{} {}",
        paint("✗", |t| t.red().bold().to_string()),
        paint(message, |t| t.red().to_string())
    );
}
