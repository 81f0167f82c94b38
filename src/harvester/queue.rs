//! Bounded work queue with completion tracking
//!
//! Items are pending or in flight until a worker calls [`WorkQueue::task_done`].
//! [`WorkQueue::join`] resolves once every item ever put has been marked done,
//! which is how the coordinator knows the run is complete.
//!
//! Workers share one multi-consumer channel receiver and the counter is a
//! plain atomic, so neither dequeuing nor acknowledging takes a lock.

use crate::model::ItemId;
use crate::shutdown::{SharedShutdown, ShutdownCoordinator};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

/// One unit of work: a product and which attempt this is
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    pub item_id: ItemId,
    /// 1 for the first try, incremented on each retry
    pub attempt: u32,
}

impl WorkItem {
    pub fn new(item_id: ItemId) -> Self {
        Self {
            item_id,
            attempt: 1,
        }
    }

    /// The same product, scheduled for its next attempt
    pub fn next_attempt(&self) -> Self {
        Self {
            item_id: self.item_id.clone(),
            attempt: self.attempt.saturating_add(1),
        }
    }
}

/// FIFO queue of work items shared by the producer, workers and retry timers
pub struct WorkQueue {
    sender: async_channel::Sender<WorkItem>,
    receiver: async_channel::Receiver<WorkItem>,
    capacity: usize,
    unfinished: AtomicUsize,
    all_done: Notify,
}

impl WorkQueue {
    /// Creates a queue holding at most `capacity` pending items
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (sender, receiver) = async_channel::bounded(capacity);
        Self {
            sender,
            receiver,
            capacity,
            unfinished: AtomicUsize::new(0),
            all_done: Notify::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of items waiting to be taken
    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Items put but not yet marked done (pending, in flight, or waiting on a retry timer)
    pub fn unfinished(&self) -> usize {
        self.unfinished.load(Ordering::SeqCst)
    }

    /// Adds an item, waiting while the queue is full
    pub async fn put(&self, item: WorkItem) {
        // Counted before the send so a worker can never acknowledge it first
        self.unfinished.fetch_add(1, Ordering::SeqCst);
        let mut unsent = UnsentGuard {
            queue: self,
            armed: true,
        };
        if self.sender.send(item).await.is_ok() {
            unsent.armed = false;
        }
    }

    /// Takes the next item, or `None` once shutdown has been requested
    pub async fn next(&self, shutdown: &ShutdownCoordinator) -> Option<WorkItem> {
        if shutdown.is_shutdown_requested() {
            return None;
        }

        tokio::select! {
            biased;
            _ = shutdown.wait_for_shutdown() => None,
            item = self.receiver.recv() => item.ok(),
        }
    }

    /// Marks one previously taken item as finished
    pub fn task_done(&self) {
        let previous = self
            .unfinished
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |count| {
                count.checked_sub(1)
            });

        match previous {
            Ok(1) => self.all_done.notify_waiters(),
            Ok(_) => {}
            Err(_) => tracing::warn!("task_done called more times than items were put"),
        }
    }

    /// Waits until every item put so far has been marked done
    pub async fn join(&self) {
        loop {
            let notified = self.all_done.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.unfinished() == 0 {
                return;
            }
            notified.await;
        }
    }

    /// Puts `item` back after `delay` without blocking the caller
    ///
    /// The item counts as unfinished from this call until a worker marks it
    /// done, so [`join`](Self::join) keeps waiting across the delay. If
    /// shutdown is requested first the item is dropped and its count released.
    pub fn requeue_after(
        self: &Arc<Self>,
        item: WorkItem,
        delay: Duration,
        shutdown: SharedShutdown,
    ) {
        self.unfinished.fetch_add(1, Ordering::SeqCst);
        let queue = Arc::clone(self);

        tokio::spawn(async move {
            let sent = tokio::select! {
                _ = shutdown.wait_for_shutdown() => false,
                sent = async {
                    tokio::time::sleep(delay).await;
                    queue.sender.send(item).await.is_ok()
                } => sent,
            };

            if !sent {
                queue.task_done();
            }
        });
    }
}

/// Releases the count of a put that was cancelled or failed before sending
struct UnsentGuard<'a> {
    queue: &'a WorkQueue,
    armed: bool,
}

impl Drop for UnsentGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.queue.task_done();
        }
    }
}
