//! Markdown run report
//!
//! Writes `summary.md` into the category folder after each run.

use crate::output::summary::RunSummary;
use std::fs::File;
use std::io::Write;
use std::path::Path;

pub const REPORT_FILE: &str = "summary.md";

/// Writes the run report to `output_path`
///
/// # Returns
///
/// * `Ok(())` - Successfully wrote the report
/// * `Err(std::io::Error)` - Failed to create or write the file
pub fn write_markdown_report(summary: &RunSummary, output_path: &Path) -> std::io::Result<()> {
    let markdown = format_markdown_report(summary);

    let mut file = File::create(output_path)?;
    file.write_all(markdown.as_bytes())?;

    Ok(())
}

/// Formats a run summary as markdown
pub fn format_markdown_report(summary: &RunSummary) -> String {
    let mut md = String::new();

    md.push_str("# Listing Harvest Summary\n\n");

    md.push_str("## Run Information\n\n");
    md.push_str(&format!("- **Category**: {}\n", summary.category));
    md.push_str(&format!("- **Sitemap**: {}\n", summary.source_url));
    md.push_str(&format!(
        "- **Search Term**: {} (score {:.3})\n",
        summary.search_term, summary.match_score
    ));
    md.push_str(&format!("- **Started**: {}\n", summary.started_at.to_rfc3339()));
    md.push_str(&format!("- **Finished**: {}\n", summary.finished_at.to_rfc3339()));
    md.push_str(&format!(
        "- **Duration**: {} seconds\n",
        summary.duration_seconds()
    ));
    md.push_str(&format!("- **Status**: {}\n", summary.status.as_str()));
    if let Some(hash) = &summary.config_hash {
        md.push_str(&format!("- **Config Hash**: {}\n", hash));
    }
    md.push_str(&format!("- **Output Format**: {:?}\n\n", summary.format));

    md.push_str("## Products\n\n");
    md.push_str("| Outcome | Count |\n");
    md.push_str("|---------|-------|\n");
    md.push_str(&format!("| Discovered | {} |\n", summary.items_discovered));
    md.push_str(&format!("| Processed | {} |\n", summary.items_processed()));
    md.push_str(&format!("| Written | {} |\n", summary.items_written));
    md.push_str(&format!(
        "| Permanently Failed | {} |\n",
        summary.failures.len()
    ));
    md.push_str(&format!("| Unprocessed | {} |\n\n", summary.unprocessed));

    md.push_str("## Records Written\n\n");
    md.push_str(&format!("- **Listings**: {}\n", summary.details_written));
    md.push_str(&format!("- **Sellers**: {}\n", summary.sellers_written));
    md.push_str(&format!(
        "- **Duplicate Sellers Skipped**: {}\n",
        summary.duplicate_sellers_skipped
    ));
    md.push_str(&format!(
        "- **Success Rate**: {:.2}%\n\n",
        summary.success_rate()
    ));

    if !summary.failures.is_empty() {
        md.push_str("## Permanent Failures\n\n");
        md.push_str("| Product | Attempts | Last Error |\n");
        md.push_str("|---------|----------|------------|\n");

        for failure in &summary.failures {
            md.push_str(&format!(
                "| {} | {} | {} |\n",
                failure.item_id,
                failure.attempts,
                failure.last_reason.to_string().replace('|', "\\|")
            ));
        }
        md.push('\n');
    }

    md
}
