//! In-memory sinks for unit tests

use crate::model::{AggregateRecord, DetailRecord, SellerRecord};
use crate::storage::traits::{RecordSink, SinkError, SinkResult, Sinks};
use std::sync::{Arc, Mutex};

/// Collects appended records into a shared vector
pub struct MemorySink<R>(Arc<Mutex<Vec<R>>>);

impl<R: Clone + Send> RecordSink<R> for MemorySink<R> {
    fn append(&mut self, record: &R) -> SinkResult<()> {
        self.0
            .lock()
            .map_err(|_| SinkError::Io(std::io::Error::other("memory sink poisoned")))?
            .push(record.clone());
        Ok(())
    }
}

/// Rejects every append
pub struct FailingSink;

impl<R> RecordSink<R> for FailingSink {
    fn append(&mut self, _record: &R) -> SinkResult<()> {
        Err(SinkError::Io(std::io::Error::other("disk full")))
    }
}

/// Handles onto what the memory sinks received
#[derive(Clone, Default)]
pub struct Captured {
    pub aggregates: Arc<Mutex<Vec<AggregateRecord>>>,
    pub details: Arc<Mutex<Vec<DetailRecord>>>,
    pub sellers: Arc<Mutex<Vec<SellerRecord>>>,
}

impl Captured {
    pub fn seller_keys(&self) -> Vec<String> {
        self.sellers
            .lock()
            .unwrap()
            .iter()
            .map(|seller| seller.seller_key.clone())
            .collect()
    }
}

pub fn memory_sinks() -> (Sinks, Captured) {
    let captured = Captured::default();
    let sinks = Sinks {
        aggregates: Box::new(MemorySink(Arc::clone(&captured.aggregates))),
        details: Box::new(MemorySink(Arc::clone(&captured.details))),
        sellers: Box::new(MemorySink(Arc::clone(&captured.sellers))),
    };
    (sinks, captured)
}
