//! Listing Harvester: a bounded, concurrent catalog listing scraper
//!
//! This crate discovers product identifiers from a catalog sitemap, fetches
//! each product's live listings under a fixed concurrency budget, and appends
//! three record streams (product stats, listings, deduplicated sellers) to
//! append-only sinks.

pub mod config;
pub mod discovery;
pub mod harvester;
pub mod model;
pub mod output;
pub mod shutdown;
pub mod storage;

use thiserror::Error;

/// Main error type for harvester operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Unreachable: {url}: {reason}")]
    NetworkUnreachable { url: String, reason: String },

    #[error("Parse error in {context}: {message}")]
    ParseError { context: String, message: String },

    #[error("No category matches search term '{search_term}'")]
    NoMatch { search_term: String },

    #[error("No product identifiers found for category '{category}'")]
    NoIdentifiers { category: String },

    #[error("Sink write error: {0}")]
    Sink(#[from] storage::SinkError),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Pipeline task failed: {0}")]
    Task(String),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Result type alias for harvester operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use harvester::{run_pipeline, Harvester, ListingFetcher, PipelineSettings};
pub use model::{
    AggregateRecord, CategoryDescriptor, DetailRecord, FetchFailure, FetchOutcome, ItemId,
    ItemRecords, SellerRecord,
};
pub use output::RunSummary;
