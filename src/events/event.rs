//! # Runtime events emitted by the service and its collaborators.
//!
//! [`EventKind`] classifies events across three categories:
//! - **Outcome events**: a task finished for good (succeeded, retrying,
//!   abandoned to the failure ledger)
//! - **Lifecycle events**: service status transitions and restart warnings
//! - **Subscriber events**: fan-out overflow and panic reports
//!
//! The [`Event`] struct carries optional metadata: task name, submission
//! sequence, attempt count, error text, backoff delay, new status.
//!
//! ## Ordering
//! Each event has a globally unique sequence number (`seq`) that increases
//! monotonically; use it to restore order when events are observed through
//! independent receivers.

use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use crate::service::ServiceStatus;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Service lifecycle ===
    /// Service status transitioned.
    ///
    /// Sets: `status`, `at`, `seq`.
    StatusChanged,

    /// `start()` found the previous loop still tearing down after the grace
    /// wait and proceeded anyway.
    ///
    /// Sets: `at`, `seq`.
    RestartOverlap,

    // === Task outcomes ===
    /// Task result was processed successfully.
    ///
    /// Sets: `task`, `sequence`, `attempt` (1-based attempts used), `at`, `seq`.
    TaskSucceeded,

    /// Task failed and was resubmitted for another attempt.
    ///
    /// Sets: `task`, `sequence`, `attempt` (failures so far), `delay_ms`,
    /// `error`, `at`, `seq`.
    TaskRetrying,

    /// Task exhausted its retry budget and was moved to the failure ledger.
    ///
    /// Sets: `task`, `sequence`, `attempt`, `error`, `at`, `seq`.
    TaskAbandoned,

    // === Subscriber fan-out ===
    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets: `task` (subscriber name), `error` (reason), `at`, `seq`.
    SubscriberOverflow,

    /// Subscriber panicked while handling an event.
    ///
    /// Sets: `task` (subscriber name), `error` (panic info), `at`, `seq`.
    SubscriberPanicked,
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Name of the task (or subscriber), if applicable.
    pub task: Option<Arc<str>>,
    /// Submission sequence number of the task, if applicable.
    pub sequence: Option<u64>,
    /// Attempt / failure count, depending on the kind.
    pub attempt: Option<u32>,
    /// Backoff delay before the next attempt, in milliseconds.
    pub delay_ms: Option<u64>,
    /// Human-readable error or reason text.
    pub error: Option<Arc<str>>,
    /// New service status, for [`EventKind::StatusChanged`].
    pub status: Option<ServiceStatus>,
}

impl Event {
    /// Creates a new event of the given kind with the current timestamp and
    /// the next global sequence number.
    pub fn now(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            task: None,
            sequence: None,
            attempt: None,
            delay_ms: None,
            error: None,
            status: None,
        }
    }

    /// Attaches a task (or subscriber) name.
    #[inline]
    pub fn with_task(mut self, task: impl Into<Arc<str>>) -> Self {
        self.task = Some(task.into());
        self
    }

    /// Attaches the task's submission sequence number.
    #[inline]
    pub fn with_sequence(mut self, sequence: u64) -> Self {
        self.sequence = Some(sequence);
        self
    }

    /// Attaches an attempt / failure count.
    #[inline]
    pub fn with_attempt(mut self, n: u32) -> Self {
        self.attempt = Some(n);
        self
    }

    /// Attaches a backoff delay (stored as milliseconds).
    #[inline]
    pub fn with_delay(mut self, d: Duration) -> Self {
        self.delay_ms = Some(d.as_millis().min(u128::from(u64::MAX)) as u64);
        self
    }

    /// Attaches a human-readable error or reason.
    #[inline]
    pub fn with_error(mut self, error: impl Into<Arc<str>>) -> Self {
        self.error = Some(error.into());
        self
    }

    /// Attaches the new service status.
    #[inline]
    pub fn with_status(mut self, status: ServiceStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::now(EventKind::SubscriberOverflow)
            .with_task(subscriber)
            .with_error(reason)
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::now(EventKind::SubscriberPanicked)
            .with_task(subscriber)
            .with_error(info)
    }
}
