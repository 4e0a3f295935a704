//! # Plain FIFO pending list.
//!
//! [`FifoList`] is the simple realization of [`PendingList`]: submissions
//! are queued and `take()` hands them back in submission order, **without
//! executing them** — the wrapper's outcome is `None` and running the task
//! belongs to the consumer (typically the service's processing hook).
//!
//! Used where strict ordering matters more than throughput, or where the
//! work itself is cheap and the heavy lifting happens in the hook.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

use crate::error::QueueError;
use crate::pending::list::PendingList;
use crate::policies::{BackoffPolicy, RetryPolicy};
use crate::tasks::{ErrorRecord, TaskRef, TaskWrapper};

/// Submission-ordered pending list; execution is the consumer's job.
pub struct FifoList<R> {
    queue: Mutex<VecDeque<TaskWrapper<R>>>,
    available: Notify,
    cancel: CancellationToken,
    closed: AtomicBool,
    sequence: AtomicU64,
    retry: RetryPolicy,
    backoff: BackoffPolicy,
}

impl<R> FifoList<R> {
    /// Creates an empty list with the given default policies for fresh
    /// records.
    pub fn new(retry: RetryPolicy, backoff: BackoffPolicy) -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            available: Notify::new(),
            cancel: CancellationToken::new(),
            closed: AtomicBool::new(false),
            sequence: AtomicU64::new(0),
            retry,
            backoff,
        }
    }

    fn queue_lock(&self) -> MutexGuard<'_, VecDeque<TaskWrapper<R>>> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl<R> Default for FifoList<R> {
    fn default() -> Self {
        Self::new(RetryPolicy::default(), BackoffPolicy::default())
    }
}

#[async_trait]
impl<R: Send + 'static> PendingList<R> for FifoList<R> {
    async fn add(&self, task: TaskRef<R>, record: ErrorRecord) -> Result<(), QueueError> {
        {
            let mut queue = self.queue_lock();
            if self.is_closed() {
                return Err(QueueError::Closed);
            }
            let sequence = self.sequence.fetch_add(1, Ordering::SeqCst);
            queue.push_back(TaskWrapper::new(task, None, record, sequence));
        }
        self.available.notify_one();
        Ok(())
    }

    async fn take(&self) -> Result<TaskWrapper<R>, QueueError> {
        loop {
            if self.is_closed() {
                return Err(QueueError::Closed);
            }
            // Register interest before re-checking the queue so a push
            // between the check and the await is not missed.
            let notified = self.available.notified();
            if let Some(wrapper) = self.queue_lock().pop_front() {
                return Ok(wrapper);
            }

            tokio::select! {
                _ = notified => {}
                _ = self.cancel.cancelled() => return Err(QueueError::Closed),
            }
        }
    }

    fn is_empty(&self) -> bool {
        self.queue_lock().is_empty()
    }

    fn fresh_record(&self) -> ErrorRecord {
        ErrorRecord::new(self.retry, self.backoff)
    }

    fn cancel_all_and_shutdown(&self) {
        let mut queue = self.queue_lock();
        self.closed.store(true, Ordering::SeqCst);
        self.cancel.cancel();
        queue.clear();
    }
}
