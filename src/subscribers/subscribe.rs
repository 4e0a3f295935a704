//! # Event subscriber trait.
//!
//! [`Subscribe`] is the extension point for plugging event consumers into
//! the engine. Each subscriber gets:
//! - a **dedicated worker task** (runs independently of the service loop),
//! - a **bounded queue** (capacity via [`Subscribe::queue_capacity`]),
//! - **panic isolation** (panics are caught and republished as
//!   [`EventKind::SubscriberPanicked`](crate::EventKind::SubscriberPanicked)).
//!
//! ## Overflow behavior
//! When a subscriber's queue is full the new event is dropped **for that
//! subscriber only** and an overflow event is published; other subscribers
//! are unaffected.

use async_trait::async_trait;

use crate::events::Event;

/// Event consumer with an isolated queue and worker.
///
/// ### Implementation requirements
/// - Use async I/O; avoid blocking the executor.
/// - Handle errors internally; do not panic.
/// - Slow processing affects only this subscriber's queue.
#[async_trait]
pub trait Subscribe: Send + Sync + 'static {
    /// Processes a single event.
    ///
    /// Called from the subscriber's worker task, never from the service
    /// loop. Events arrive in FIFO order per subscriber.
    async fn on_event(&self, event: &Event);

    /// Subscriber name used in overflow/panic diagnostics.
    ///
    /// Prefer short, descriptive names ("progress", "stats", "log").
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Preferred queue capacity (clamped to a minimum of 1). Default: 256.
    fn queue_capacity(&self) -> usize {
        256
    }
}
