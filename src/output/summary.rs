//! End-of-run summary
//!
//! Collects what a harvest run did and prints it to stdout.

use crate::config::OutputFormat;
use crate::model::PermanentFailure;
use chrono::{DateTime, Utc};
use std::path::PathBuf;

/// Final state of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Completed,
    /// Stopped by the user before every product reached a final outcome
    Interrupted,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Interrupted => "interrupted",
        }
    }
}

/// Harvest run summary
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub category: String,
    pub source_url: String,
    pub search_term: String,
    /// Similarity between the search term and the chosen category
    pub match_score: f64,

    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub status: RunStatus,
    pub config_hash: Option<String>,

    pub output_dir: PathBuf,
    pub format: OutputFormat,

    /// Identifiers extracted from the category sitemap
    pub items_discovered: usize,
    /// Products whose records were written
    pub items_written: usize,
    pub details_written: usize,
    pub sellers_written: usize,
    /// Seller entries skipped because the key was already written this run
    pub duplicate_sellers_skipped: usize,
    /// Products with no final outcome (interrupted runs only)
    pub unprocessed: usize,

    pub failures: Vec<PermanentFailure>,
}

impl RunSummary {
    /// Products that reached a final outcome, success or permanent failure
    pub fn items_processed(&self) -> usize {
        self.items_written + self.failures.len()
    }

    pub fn duration_seconds(&self) -> i64 {
        (self.finished_at - self.started_at).num_seconds().max(0)
    }

    /// Percentage of discovered products whose records were written
    pub fn success_rate(&self) -> f64 {
        if self.items_discovered == 0 {
            0.0
        } else {
            (self.items_written as f64 / self.items_discovered as f64) * 100.0
        }
    }
}

/// Prints the summary to stdout
pub fn print_summary(summary: &RunSummary) {
    println!("=== Harvest Summary ===\n");

    println!("Category:");
    println!(
        "  {} (matched '{}' with score {:.3})",
        summary.category, summary.search_term, summary.match_score
    );
    println!("  Sitemap: {}", summary.source_url);
    println!();

    println!("Run:");
    println!("  Status: {}", summary.status.as_str());
    println!("  Duration: {} seconds", summary.duration_seconds());
    println!(
        "  Output: {} ({:?})",
        summary.output_dir.display(),
        summary.format
    );
    println!();

    println!("Products:");
    println!("  Discovered: {}", summary.items_discovered);
    println!("  Processed: {}", summary.items_processed());
    println!("  Written: {}", summary.items_written);
    println!("  Permanently failed: {}", summary.failures.len());
    if summary.unprocessed > 0 {
        println!("  Unprocessed: {}", summary.unprocessed);
    }
    println!();

    println!("Records:");
    println!("  Listings: {}", summary.details_written);
    println!("  Sellers: {}", summary.sellers_written);
    println!(
        "  Duplicate sellers skipped: {}",
        summary.duplicate_sellers_skipped
    );
    println!();

    if !summary.failures.is_empty() {
        println!("Permanent Failures ({}):", summary.failures.len());
        for failure in &summary.failures {
            println!(
                "  - {} after {} attempts: {}",
                failure.item_id, failure.attempts, failure.last_reason
            );
        }
        println!();
    }

    println!(
        "Success Rate: {:.1}% ({} / {} products written)",
        summary.success_rate(),
        summary.items_written,
        summary.items_discovered
    );
}

#[cfg(test)]
pub(crate) fn sample_summary() -> RunSummary {
    use crate::model::{FailureReason, ItemId};

    let started_at = DateTime::parse_from_rfc3339("2024-05-01T10:00:00Z")
        .unwrap()
        .with_timezone(&Utc);
    RunSummary {
        category: "pokemon".to_string(),
        source_url: "https://example.com/sitemap/pokemon.xml".to_string(),
        search_term: "pokeman".to_string(),
        match_score: 0.943,
        started_at,
        finished_at: started_at + chrono::Duration::seconds(90),
        status: RunStatus::Completed,
        config_hash: Some("abc123".to_string()),
        output_dir: PathBuf::from("./output/pokemon"),
        format: OutputFormat::Jsonl,
        items_discovered: 4,
        items_written: 3,
        details_written: 7,
        sellers_written: 5,
        duplicate_sellers_skipped: 2,
        unprocessed: 0,
        failures: vec![PermanentFailure {
            item_id: ItemId::from("104"),
            attempts: 6,
            last_reason: FailureReason::HttpStatus(503),
        }],
    }
}
