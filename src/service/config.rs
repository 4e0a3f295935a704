//! # Service runtime configuration.
//!
//! [`ServiceConfig`] centralizes the settings of a
//! [`BackgroundService`](crate::BackgroundService): when the loop terminates
//! on its own, how long a re-`start()` waits for the previous loop to tear
//! down, and how large the event ring is.
//!
//! Worker-pool sizing and retry/backoff defaults live with the pending list
//! ([`PoolConfig`](crate::PoolConfig)), not here — the service drives any
//! [`PendingList`](crate::PendingList) realization.

use std::time::Duration;

/// When the service loop stops making further blocking takes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TerminationPolicy {
    /// Exit as soon as the pending list is empty. Suits one-shot batch
    /// flows that drain a known set of submissions.
    StopWhenEmpty,
    /// Keep waiting for work until `stop()` is called (default). Suits a
    /// long-lived upload queue fed for the lifetime of the application.
    ContinueUntilStopped,
}

impl TerminationPolicy {
    /// True for [`TerminationPolicy::StopWhenEmpty`].
    #[inline]
    pub fn stop_when_empty(&self) -> bool {
        matches!(self, TerminationPolicy::StopWhenEmpty)
    }
}

/// Runtime configuration for a background service.
#[derive(Clone, Copy, Debug)]
pub struct ServiceConfig {
    /// Loop termination behavior.
    pub termination: TerminationPolicy,

    /// Maximum time a re-`start()` blocks waiting for the previous loop
    /// task to finish tearing down. If the wait expires the new loop starts
    /// anyway and a warning is published.
    pub restart_grace: Duration,

    /// Capacity of the event bus ring buffer (clamped to ≥ 1 by the bus).
    pub bus_capacity: usize,
}

impl Default for ServiceConfig {
    /// Default configuration:
    /// - `termination = ContinueUntilStopped`
    /// - `restart_grace = 10s`
    /// - `bus_capacity = 1024`
    fn default() -> Self {
        Self {
            termination: TerminationPolicy::ContinueUntilStopped,
            restart_grace: Duration::from_secs(10),
            bus_capacity: 1024,
        }
    }
}
