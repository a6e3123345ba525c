//! Terminal output utilities.
//!
//! Formatting helpers plus rendering of identity migration hints.

use crate::planning::KeyRename;
use crate::state::MigrationReport;
use colored::Colorize;

/// Format a value as a quoted, right-aligned field.
pub fn format_field<T: ToString>(value: T, width: usize) -> String {
    let quoted = format!("\"{}\"", value.to_string());
    if quoted.len() >= width {
        quoted
    } else {
        format!("{quoted:>width$}")
    }
}

/// One state move instruction per rename.
pub fn migration_hint_lines(renames: &[KeyRename]) -> Vec<String> {
    renames
        .iter()
        .map(|r| format!("state mv '{}' '{}'", r.from, r.to))
        .collect()
}

/// Print migration hints and any transit routes needing manual correction.
pub fn print_migration_hints(report: &MigrationReport) {
    if report.renames.is_empty() {
        log::info!("No identity key changes.");
    } else {
        println!("#{}# {} key renames", "MOVE".on_blue(), report.renames.len());
        for line in migration_hint_lines(&report.renames) {
            println!("{line}");
        }
    }

    if !report.transit_routes.is_empty() {
        println!(
            "#{}# transit gateway routes below are keyed by destination and need manual correction",
            "NOTE".on_red()
        );
        for key in &report.transit_routes.removed {
            println!("  - {}", key.red());
        }
        for key in &report.transit_routes.added {
            println!("  + {}", key.green());
        }
    }
}
