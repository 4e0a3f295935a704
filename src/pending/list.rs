//! # Pending-list contract.
//!
//! [`PendingList`] abstracts over "tasks currently submitted but not yet in
//! a terminal state". The service loop only needs this trait; which
//! realization backs it (worker pool or plain queue) is the caller's choice.
//!
//! ## Rules
//! - `add` must be safe to call concurrently from multiple producers and
//!   from the service loop resubmitting a retry.
//! - `take` blocks until some outstanding task is ready, yields in
//!   completion order, and must be cancellable: callers select against a
//!   cancellation token and dropping the future must not lose an item.
//! - `retry` must carry the accumulated [`ErrorRecord`] unchanged —
//!   resubmission never resets the failure count.
//! - After `cancel_all_and_shutdown`, `add`, `retry` and `take` fail with
//!   [`QueueError::Closed`]; the call itself is idempotent.

use async_trait::async_trait;

use crate::error::QueueError;
use crate::tasks::{ErrorRecord, TaskRef, TaskWrapper};

/// Thread-safe collection of currently outstanding tasks.
#[async_trait]
pub trait PendingList<R: Send + 'static>: Send + Sync + 'static {
    /// Submits a task with an explicit error record.
    async fn add(&self, task: TaskRef<R>, record: ErrorRecord) -> Result<(), QueueError>;

    /// Submits a task with a fresh record built from the list's configured
    /// retry and backoff policies.
    async fn submit(&self, task: TaskRef<R>) -> Result<(), QueueError> {
        let record = self.fresh_record();
        self.add(task, record).await
    }

    /// Resubmits a task after a failure, keeping its accumulated history.
    async fn retry(&self, task: TaskRef<R>, record: ErrorRecord) -> Result<(), QueueError> {
        self.add(task, record).await
    }

    /// Returns the next wrapper whose execution has completed, blocking
    /// until one is ready. Completion order, not submission order.
    async fn take(&self) -> Result<TaskWrapper<R>, QueueError>;

    /// True iff no task is currently queued or running.
    fn is_empty(&self) -> bool;

    /// Builds an empty record carrying the list's default policies.
    fn fresh_record(&self) -> ErrorRecord;

    /// Cancels in-flight executions, discards queued-but-not-started tasks
    /// and rejects all further submissions. Idempotent.
    fn cancel_all_and_shutdown(&self);
}
