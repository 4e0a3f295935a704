//! # LogWriter — structured event logging via `tracing`.
//!
//! A built-in subscriber that turns the event stream into `tracing` records:
//! routine lifecycle at debug/info, retries and abandonments at warn/error.
//! Attach it when the embedding application has a `tracing` subscriber
//! installed; pair it with a custom [`Subscribe`](crate::Subscribe) for
//! metrics or UI updates.

use async_trait::async_trait;

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Event-stream logging subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Constructs a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        match e.kind {
            EventKind::StatusChanged => {
                tracing::info!(
                    status = e.status.map(|s| s.as_label()).unwrap_or("unknown"),
                    "service status changed"
                );
            }
            EventKind::RestartOverlap => {
                tracing::warn!("service restarted before the previous loop finished");
            }
            EventKind::TaskSucceeded => {
                tracing::debug!(
                    task = e.task.as_deref(),
                    attempt = e.attempt,
                    "task succeeded"
                );
            }
            EventKind::TaskRetrying => {
                tracing::warn!(
                    task = e.task.as_deref(),
                    failures = e.attempt,
                    delay_ms = e.delay_ms,
                    error = e.error.as_deref(),
                    "task failed; retry scheduled"
                );
            }
            EventKind::TaskAbandoned => {
                tracing::error!(
                    task = e.task.as_deref(),
                    failures = e.attempt,
                    error = e.error.as_deref(),
                    "task abandoned after exhausting retries"
                );
            }
            EventKind::SubscriberOverflow => {
                tracing::warn!(
                    subscriber = e.task.as_deref(),
                    reason = e.error.as_deref(),
                    "subscriber dropped an event"
                );
            }
            EventKind::SubscriberPanicked => {
                tracing::error!(
                    subscriber = e.task.as_deref(),
                    info = e.error.as_deref(),
                    "subscriber panicked"
                );
            }
        }
    }

    fn name(&self) -> &'static str {
        "log"
    }
}
