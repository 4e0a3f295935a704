//! # A taken task together with its outcome and error record.
//!
//! [`TaskWrapper`] is what [`PendingList::take`](crate::PendingList::take)
//! yields: the task handle, the execution outcome (if the list realization
//! executes tasks itself), the accumulated [`ErrorRecord`], and a submission
//! sequence number.
//!
//! The sequence number is assigned at submission time, strictly increasing
//! per list, and is diagnostic only — processing order is completion order,
//! never sequence order.
//!
//! The wrapper exists from `take()` until the task reaches a terminal state:
//! success (dropped), retry (split back into task + record via
//! [`into_parts`](TaskWrapper::into_parts)), or permanent failure (parts
//! handed to the [`FailureList`](crate::FailureList)).

use crate::error::TaskError;
use crate::tasks::record::ErrorRecord;
use crate::tasks::task::TaskRef;

/// A task taken from a pending list, with outcome and failure history.
pub struct TaskWrapper<R> {
    task: TaskRef<R>,
    outcome: Option<Result<R, TaskError>>,
    record: ErrorRecord,
    sequence: u64,
}

impl<R: Send + 'static> TaskWrapper<R> {
    /// Assembles a wrapper. Called by pending-list realizations; user code
    /// receives wrappers from `take()`.
    pub fn new(
        task: TaskRef<R>,
        outcome: Option<Result<R, TaskError>>,
        record: ErrorRecord,
        sequence: u64,
    ) -> Self {
        Self {
            task,
            outcome,
            record,
            sequence,
        }
    }

    /// The task handle.
    pub fn task(&self) -> &TaskRef<R> {
        &self.task
    }

    /// Convenience: the task's name.
    pub fn name(&self) -> &str {
        self.task.name()
    }

    /// The execution outcome.
    ///
    /// `Some` for lists backed by a worker pool (the wrapper is only yielded
    /// once execution finished); `None` for the FIFO realization, where
    /// execution belongs to the consumer.
    pub fn result(&self) -> Option<&Result<R, TaskError>> {
        self.outcome.as_ref()
    }

    /// Takes ownership of the execution outcome, leaving `None` behind.
    pub fn take_result(&mut self) -> Option<Result<R, TaskError>> {
        self.outcome.take()
    }

    /// The accumulated failure history.
    pub fn record(&self) -> &ErrorRecord {
        &self.record
    }

    /// Appends a failure to the record (delegation).
    pub fn add_error(&mut self, error: TaskError) {
        self.record.add_error(error);
    }

    /// True while the record's policy allows another attempt (delegation).
    pub fn should_retry(&self) -> bool {
        self.record.should_retry()
    }

    /// Submission sequence number (diagnostic ordering only).
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Splits the wrapper into the parts needed to resubmit the task or to
    /// file it in the failure ledger.
    pub fn into_parts(self) -> (TaskRef<R>, ErrorRecord) {
        (self.task, self.record)
    }
}
