//! Sink traits and error types
//!
//! This module defines the append-only interface every output medium
//! implements, and the bundle of three sinks a harvest run writes to.

use crate::model::{AggregateRecord, DetailRecord, SellerRecord};
use thiserror::Error;

/// Errors that can occur while appending records
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for sink operations
pub type SinkResult<T> = Result<T, SinkError>;

/// An append-only destination for one record stream
///
/// Each call writes whole records and flushes before returning; a record is
/// never left half-written when the call returns, even on error.
pub trait RecordSink<R>: Send {
    /// Appends a single record
    fn append(&mut self, record: &R) -> SinkResult<()>;

    /// Appends a batch of records belonging to the same product
    fn append_all(&mut self, records: &[R]) -> SinkResult<()> {
        for record in records {
            self.append(record)?;
        }
        Ok(())
    }
}

/// The three output streams of a run, owned by the result writer
pub struct Sinks {
    pub aggregates: Box<dyn RecordSink<AggregateRecord>>,
    pub details: Box<dyn RecordSink<DetailRecord>>,
    pub sellers: Box<dyn RecordSink<SellerRecord>>,
}
