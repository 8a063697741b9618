//! Show command implementation.
//!
//! Prints the summary of a persisted report and exits with the code the
//! original run exited with, so `glance show` can gate CI on an artifact.

use crate::cli::ShowArgs;
use crate::commands::Outcome;
use crate::error::{Result, ResultExt};
use crate::ui;
use glance_harness::{REPORT_FILE, Report};
use std::path::PathBuf;

/// Resolves a report path; directories point at their `report.json`.
fn report_path(arg: PathBuf) -> PathBuf {
    if arg.is_dir() { arg.join(REPORT_FILE) } else { arg }
}

/// Execute the show command.
///
/// # Errors
///
/// Returns an error if the report is missing or not a glance report.
pub fn execute(args: ShowArgs) -> Result<Outcome> {
    let path = report_path(args.report);
    let report = Report::load(&path)
        .with_path(&path)
        .with_hint("Point glance show at a report.json written by glance run")?;

    print!("{}", ui::render_report(&report, args.all));
    println!(
        "  Generated {}",
        report.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    Ok(Outcome::from(&report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_report_path_resolves_directories() {
        let temp = TempDir::new().unwrap();
        assert_eq!(
            report_path(temp.path().to_path_buf()),
            temp.path().join("report.json")
        );
        let file = temp.path().join("nightly.json");
        assert_eq!(report_path(file.clone()), file);
    }

    #[test]
    fn test_missing_report_is_an_error() {
        let temp = TempDir::new().unwrap();
        let err = execute(ShowArgs {
            report: temp.path().join("missing.json"),
            all: false,
        })
        .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("File not found"));
        assert!(msg.contains("Hint:"));
    }
}
