//! Error types used by the engine and by task bodies.
//!
//! This module defines two error enums:
//!
//! - [`TaskError`] — errors raised by individual task executions (or by the
//!   result-processing hook, which is treated identically).
//! - [`QueueError`] — errors raised by a pending list after it has been
//!   shut down.
//!
//! Whether a [`TaskError`] leads to a retry or a permanent failure is decided
//! by the [`RetryPolicy`](crate::RetryPolicy) attached to the task's error
//! record, never by the error variant itself.

use std::time::Duration;
use thiserror::Error;

/// # Errors produced by task execution.
///
/// A task body reports failure through this type; the service loop appends it
/// to the task's [`ErrorRecord`](crate::ErrorRecord) and consults the retry
/// policy. Payloads are plain strings so records can be cloned into the
/// failure ledger.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TaskError {
    /// Task execution failed.
    #[error("execution failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },

    /// Task execution exceeded the pool's per-attempt timeout.
    #[error("timed out after {timeout:?}")]
    Timeout {
        /// The timeout duration that was exceeded.
        timeout: Duration,
    },

    /// Task observed cancellation and stopped cooperatively.
    #[error("task canceled")]
    Canceled,
}

impl TaskError {
    /// Convenience constructor for [`TaskError::Fail`].
    pub fn fail(error: impl Into<String>) -> Self {
        TaskError::Fail {
            error: error.into(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use backhaul::TaskError;
    ///
    /// assert_eq!(TaskError::fail("boom").as_label(), "task_failed");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            TaskError::Fail { .. } => "task_failed",
            TaskError::Timeout { .. } => "task_timeout",
            TaskError::Canceled => "task_canceled",
        }
    }

    /// True if this error came from cooperative cancellation rather than the
    /// work itself going wrong.
    pub fn is_canceled(&self) -> bool {
        matches!(self, TaskError::Canceled)
    }
}

/// # Errors produced by a pending list.
///
/// After [`cancel_all_and_shutdown`](crate::PendingList::cancel_all_and_shutdown)
/// a list rejects further submissions and takes with [`QueueError::Closed`].
#[non_exhaustive]
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueError {
    /// The list has been shut down; no further submissions are accepted and
    /// nothing outstanding will be delivered.
    #[error("pending list has been shut down")]
    Closed,
}
