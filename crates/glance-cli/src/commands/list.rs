//! List command implementation.

use crate::commands::Outcome;
use crate::error::Result;
use crate::ui;
use glance_harness::SETS;

/// Execute the list command: print the built-in scenario sets to stdout.
pub fn execute() -> Result<Outcome> {
    println!("Scenario sets:\n");
    print!("{}", ui::render_sets(SETS));
    println!("\nRun one with: glance run <SET> --base-url <URL>");
    Ok(Outcome::Passed)
}
