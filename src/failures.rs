//! # Append-only ledger of permanently failed tasks.
//!
//! When a task exhausts its retry budget the service moves it here, full
//! error history attached. Nothing in the engine ever removes or resubmits a
//! ledger entry on its own: getting a task out again is an explicit external
//! operation ([`drain`](FailureList::drain), used by retry-all flows).
//!
//! ## Rules
//! - `add_failure` appends; it never overwrites and never deduplicates.
//! - `failures()` is a point-in-time snapshot; failures appended
//!   concurrently after the call returns are not reflected.
//! - Safe under concurrent appends from multiple services sharing one
//!   ledger, though in practice one ledger belongs to one service.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::tasks::{ErrorRecord, TaskRef};

/// A permanently failed task and the history that condemned it.
pub struct FailureRecord<R> {
    task: TaskRef<R>,
    record: ErrorRecord,
}

// Manual impl: the task handle clones regardless of whether `R` does.
impl<R> Clone for FailureRecord<R> {
    fn clone(&self) -> Self {
        Self {
            task: Arc::clone(&self.task),
            record: self.record.clone(),
        }
    }
}

impl<R: Send + 'static> FailureRecord<R> {
    /// The failed task.
    pub fn task(&self) -> &TaskRef<R> {
        &self.task
    }

    /// Convenience: the task's name.
    pub fn name(&self) -> &str {
        self.task.name()
    }

    /// The full error history accumulated across attempts.
    pub fn record(&self) -> &ErrorRecord {
        &self.record
    }

    /// Splits into task and history, e.g. to resubmit.
    pub fn into_parts(self) -> (TaskRef<R>, ErrorRecord) {
        (self.task, self.record)
    }
}

/// Thread-safe, append-only list of permanent failures.
pub struct FailureList<R> {
    entries: Mutex<Vec<FailureRecord<R>>>,
}

impl<R> FailureList<R> {
    /// Creates an empty ledger.
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
        }
    }

    fn entries_lock(&self) -> MutexGuard<'_, Vec<FailureRecord<R>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Appends a failed task with its error history.
    pub fn add_failure(&self, task: TaskRef<R>, record: ErrorRecord) {
        self.entries_lock().push(FailureRecord { task, record });
    }

    /// Snapshot of the ledger in append order.
    pub fn failures(&self) -> Vec<FailureRecord<R>> {
        self.entries_lock().clone()
    }

    /// Number of recorded permanent failures.
    pub fn len(&self) -> usize {
        self.entries_lock().len()
    }

    /// True if nothing has permanently failed.
    pub fn is_empty(&self) -> bool {
        self.entries_lock().is_empty()
    }

    /// Empties the ledger, returning every entry — the explicit external
    /// retry-all hook.
    pub fn drain(&self) -> Vec<FailureRecord<R>> {
        std::mem::take(&mut *self.entries_lock())
    }
}

impl<R> Default for FailureList<R> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TaskError;
    use crate::tasks::TaskFn;

    fn failed_task(name: &'static str, failures: usize) -> (TaskRef<()>, ErrorRecord) {
        let task: TaskRef<()> = TaskFn::arc(name, |_ctx| async { Ok::<_, TaskError>(()) });
        let mut record = ErrorRecord::bounded(failures as u32);
        for i in 0..failures {
            record.add_error(TaskError::fail(format!("attempt {i}")));
        }
        (task, record)
    }

    #[tokio::test]
    async fn test_appends_preserve_order_and_history() {
        let ledger: FailureList<()> = FailureList::new();
        let (t1, r1) = failed_task("one", 2);
        let (t2, r2) = failed_task("two", 3);

        ledger.add_failure(t1, r1);
        ledger.add_failure(t2, r2);

        let snapshot = ledger.failures();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0].name(), "one");
        assert_eq!(snapshot[0].record().failure_count(), 2);
        assert_eq!(snapshot[1].name(), "two");
        assert_eq!(snapshot[1].record().failure_count(), 3);
    }

    #[tokio::test]
    async fn test_snapshot_is_point_in_time() {
        let ledger: FailureList<()> = FailureList::new();
        let (t1, r1) = failed_task("early", 1);
        ledger.add_failure(t1, r1);

        let snapshot = ledger.failures();
        let (t2, r2) = failed_task("late", 1);
        ledger.add_failure(t2, r2);

        assert_eq!(snapshot.len(), 1);
        assert_eq!(ledger.len(), 2);
    }

    #[tokio::test]
    async fn test_drain_empties_the_ledger() {
        let ledger: FailureList<()> = FailureList::new();
        let (t1, r1) = failed_task("gone", 1);
        ledger.add_failure(t1, r1);

        let drained = ledger.drain();
        assert_eq!(drained.len(), 1);
        assert!(ledger.is_empty());
    }
}
