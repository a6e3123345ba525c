//! Output formatting for network plans.
//!
//! This module handles rendering plans and migration hints:
//! - [`csv`] - CSV / JSON output of the plan
//! - [`terminal`] - field formatting and migration hints

mod csv;
mod terminal;

pub use csv::{plan_rows, print_plan, print_plan_json, PlanRow};
pub use terminal::{format_field, migration_hint_lines, print_migration_hints};
