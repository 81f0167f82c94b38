//! Worker pool
//!
//! Each worker loops: take an item, hold a fetch permit for the duration of
//! the catalog call, then forward the outcome. Failures are either put back on
//! the queue after a backoff or reported as permanent. The progress bar moves
//! exactly once per product, when its outcome is final.

use crate::harvester::fetcher::ListingFetcher;
use crate::harvester::queue::{WorkItem, WorkQueue};
use crate::harvester::retry::RetryPolicy;
use crate::harvester::writer::WriterMessage;
use crate::model::{FetchFailure, FetchOutcome, PermanentFailure};
use crate::shutdown::SharedShutdown;
use indicatif::ProgressBar;
use std::sync::Arc;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;

/// Everything a worker shares with its siblings
pub struct WorkerContext<F: ?Sized> {
    pub queue: Arc<WorkQueue>,
    pub permits: Arc<Semaphore>,
    pub fetcher: Arc<F>,
    pub results: mpsc::UnboundedSender<WriterMessage>,
    pub retry: RetryPolicy,
    pub progress: ProgressBar,
    /// Stops the workers (set on completion, user interrupt or sink failure)
    pub stop: SharedShutdown,
}

// Manual impl: a derive would require `F: Clone`
impl<F: ?Sized> Clone for WorkerContext<F> {
    fn clone(&self) -> Self {
        Self {
            queue: Arc::clone(&self.queue),
            permits: Arc::clone(&self.permits),
            fetcher: Arc::clone(&self.fetcher),
            results: self.results.clone(),
            retry: self.retry,
            progress: self.progress.clone(),
            stop: Arc::clone(&self.stop),
        }
    }
}

/// Spawns `count` workers sharing `context`
pub fn spawn_workers<F>(count: usize, context: WorkerContext<F>) -> JoinSet<()>
where
    F: ListingFetcher + ?Sized + 'static,
{
    let mut workers = JoinSet::new();
    for worker_id in 0..count {
        let context = context.clone();
        workers.spawn(async move { run_worker(worker_id, context).await });
    }
    workers
}

async fn run_worker<F>(worker_id: usize, context: WorkerContext<F>)
where
    F: ListingFetcher + ?Sized,
{
    tracing::trace!("Worker {} started", worker_id);

    while let Some(item) = context.queue.next(&context.stop).await {
        let outcome = {
            let Ok(_permit) = context.permits.acquire().await else {
                context.queue.task_done();
                break;
            };
            context.fetcher.fetch(&item.item_id).await
        };

        handle_outcome(&context, item, outcome);
        context.queue.task_done();
    }

    tracing::trace!("Worker {} stopped", worker_id);
}

fn handle_outcome<F: ?Sized>(context: &WorkerContext<F>, item: WorkItem, outcome: FetchOutcome) {
    match outcome {
        FetchOutcome::Success(records) => {
            tracing::debug!(
                "Fetched product {}: {} listings",
                records.item_id(),
                records.details.len()
            );
            forward(context, WriterMessage::Records(records));
            context.progress.inc(1);
        }
        FetchOutcome::Failure(FetchFailure { item_id, reason }) => {
            if context.retry.should_retry(item.attempt) {
                let delay = context.retry.delay_for(item.attempt);
                tracing::warn!(
                    "Product {} attempt {} failed ({}), retrying in {:?}",
                    item_id,
                    item.attempt,
                    reason,
                    delay
                );
                context
                    .queue
                    .requeue_after(item.next_attempt(), delay, Arc::clone(&context.stop));
            } else {
                forward(
                    context,
                    WriterMessage::Failed(PermanentFailure {
                        item_id,
                        attempts: item.attempt,
                        last_reason: reason,
                    }),
                );
                context.progress.inc(1);
            }
        }
    }
}

fn forward<F: ?Sized>(context: &WorkerContext<F>, message: WriterMessage) {
    if context.results.send(message).is_err() {
        // The writer has stopped; the run is being torn down
        context.stop.request_shutdown();
    }
}
