//! Command-line interface for icp-journal.
//!
//! Provides commands for the full report, the metrics summary, section
//! routing of an existing document, and the analyst journal.

mod commands;

pub use commands::{parse_cli, run, run_with_cli, Cli, Commands};
