//! Output module for run summaries and reports
//!
//! This module handles:
//! - The end-of-run summary printed to stdout
//! - The markdown report saved next to the harvested records

mod markdown;
mod summary;

pub use markdown::{format_markdown_report, write_markdown_report, REPORT_FILE};
pub use summary::{print_summary, RunStatus, RunSummary};
