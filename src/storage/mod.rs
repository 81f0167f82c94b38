//! Storage module for the three output record streams
//!
//! This module handles:
//! - The append-only sink interface shared by all output media
//! - JSON Lines files (the default)
//! - A SQLite database with one table per stream

mod jsonl;
#[cfg(test)]
pub(crate) mod memory;
mod schema;
mod sqlite;
mod traits;

pub use jsonl::{JsonlSink, AGGREGATES_FILE, DETAILS_FILE, SELLERS_FILE};
pub use sqlite::{SqliteSink, DATABASE_FILE};
pub use traits::{RecordSink, SinkError, SinkResult, Sinks};

use crate::config::OutputFormat;
use crate::model::{AggregateRecord, DetailRecord, SellerRecord};
use std::path::Path;

/// Opens the three sinks for a run inside `directory`
///
/// The directory is created if needed. Existing files or tables are appended to.
///
/// # Arguments
///
/// * `directory` - The per-category output folder
/// * `format` - Which medium to write
pub fn open_sinks(directory: &Path, format: OutputFormat) -> SinkResult<Sinks> {
    std::fs::create_dir_all(directory)?;

    let sinks = match format {
        OutputFormat::Jsonl => Sinks {
            aggregates: Box::new(JsonlSink::<AggregateRecord>::open(
                &directory.join(AGGREGATES_FILE),
            )?),
            details: Box::new(JsonlSink::<DetailRecord>::open(
                &directory.join(DETAILS_FILE),
            )?),
            sellers: Box::new(JsonlSink::<SellerRecord>::open(
                &directory.join(SELLERS_FILE),
            )?),
        },
        OutputFormat::Sqlite => {
            let path = directory.join(DATABASE_FILE);
            Sinks {
                aggregates: Box::new(SqliteSink::<AggregateRecord>::open(&path)?),
                details: Box::new(SqliteSink::<DetailRecord>::open(&path)?),
                sellers: Box::new(SqliteSink::<SellerRecord>::open(&path)?),
            }
        }
    };

    tracing::info!(
        "Writing {:?} output to {}",
        format,
        directory.display()
    );
    Ok(sinks)
}
