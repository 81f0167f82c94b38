//! Result writer
//!
//! A single consumer owns the three sinks and the set of sellers already
//! written this run. Workers only send messages, so sink access and the
//! seller dedup check never race.

use crate::model::{ItemRecords, PermanentFailure};
use crate::storage::{SinkResult, Sinks};
use std::collections::HashSet;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Messages sent from workers to the writer
#[derive(Debug)]
pub enum WriterMessage {
    /// A successful fetch, to be appended to the sinks
    Records(ItemRecords),
    /// A product that ran out of retries
    Failed(PermanentFailure),
}

/// What the writer persisted over a run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriterReport {
    pub items_written: usize,
    pub details_written: usize,
    pub sellers_written: usize,
    pub duplicate_sellers_skipped: usize,
    pub failures: Vec<PermanentFailure>,
}

/// Appends fetched records to the sinks, writing each seller at most once
pub struct ResultWriter {
    sinks: Sinks,
    seen_sellers: HashSet<String>,
    report: WriterReport,
}

impl ResultWriter {
    pub fn new(sinks: Sinks) -> Self {
        Self {
            sinks,
            seen_sellers: HashSet::new(),
            report: WriterReport::default(),
        }
    }

    /// Writes one product: its aggregate, its listings, then any new sellers
    pub fn write(&mut self, records: &ItemRecords) -> SinkResult<()> {
        self.sinks.aggregates.append(&records.aggregate)?;
        self.sinks.details.append_all(&records.details)?;

        for (seller_key, seller) in &records.sellers {
            if self.seen_sellers.contains(seller_key) {
                self.report.duplicate_sellers_skipped += 1;
                continue;
            }
            self.sinks.sellers.append(seller)?;
            self.seen_sellers.insert(seller_key.clone());
            self.report.sellers_written += 1;
        }

        self.report.items_written += 1;
        self.report.details_written += records.details.len();
        Ok(())
    }

    pub fn record_failure(&mut self, failure: PermanentFailure) {
        tracing::error!(
            "Giving up on product {} after {} attempts: {}",
            failure.item_id,
            failure.attempts,
            failure.last_reason
        );
        self.report.failures.push(failure);
    }

    pub fn handle(&mut self, message: WriterMessage) -> SinkResult<()> {
        match message {
            WriterMessage::Records(records) => self.write(&records),
            WriterMessage::Failed(failure) => {
                self.record_failure(failure);
                Ok(())
            }
        }
    }

    pub fn finish(self) -> WriterReport {
        self.report
    }
}

/// Runs the writer on a blocking thread until every sender is dropped
///
/// The first sink error ends the writer and is returned from the handle.
/// Dropping the receiver at that point makes further worker sends fail.
pub fn spawn_writer(
    sinks: Sinks,
    mut receiver: mpsc::UnboundedReceiver<WriterMessage>,
) -> JoinHandle<SinkResult<WriterReport>> {
    tokio::task::spawn_blocking(move || {
        let mut writer = ResultWriter::new(sinks);

        while let Some(message) = receiver.blocking_recv() {
            if let Err(e) = writer.handle(message) {
                tracing::error!("Sink write failed: {}", e);
                return Err(e);
            }
        }

        let report = writer.finish();
        tracing::debug!(
            "Writer finished: {} products, {} listings, {} sellers",
            report.items_written,
            report.details_written,
            report.sellers_written
        );
        Ok(report)
    })
}
