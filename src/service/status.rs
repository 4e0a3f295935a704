//! # Service lifecycle state machine.
//!
//! [`ServiceStatus`] is the externally observable state of a
//! [`BackgroundService`](crate::BackgroundService):
//!
//! ```text
//! Initialized ──start()──► Running ──stop()──► StopRequested
//!                             │                     │
//!                             └────── loop exits ───┴──► Complete
//!                                                          │
//!                              start() (re-entrant) ◄──────┘
//! ```
//!
//! Every transition goes through [`StatusCell::set`], a single
//! mutex-guarded compare-and-set. The one suppressed edge is
//! `Complete → StopRequested`: once the loop has naturally finished, a late
//! `stop()` must not tell observers the service is stopping when it has
//! already fully stopped.

use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::events::{Bus, Event, EventKind};

/// Observable lifecycle state of a background service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceStatus {
    /// Constructed, never started.
    Initialized,
    /// Loop task is processing (or waiting for) work.
    Running,
    /// `stop()` was called; the loop is tearing down.
    StopRequested,
    /// The loop task has exited. A later `start()` leaves this state.
    Complete,
}

impl ServiceStatus {
    /// Returns a short stable label (snake_case) for logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            ServiceStatus::Initialized => "initialized",
            ServiceStatus::Running => "running",
            ServiceStatus::StopRequested => "stop_requested",
            ServiceStatus::Complete => "complete",
        }
    }
}

/// Mutex-guarded status holder that publishes transitions on the bus.
pub(crate) struct StatusCell {
    current: Mutex<ServiceStatus>,
    bus: Bus,
}

impl StatusCell {
    pub(crate) fn new(bus: Bus) -> Self {
        Self {
            current: Mutex::new(ServiceStatus::Initialized),
            bus,
        }
    }

    fn current_lock(&self) -> MutexGuard<'_, ServiceStatus> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current status.
    pub(crate) fn get(&self) -> ServiceStatus {
        *self.current_lock()
    }

    /// Applies a transition under the lock and publishes it.
    ///
    /// The `Complete → StopRequested` regression is suppressed (returns
    /// false, publishes nothing); the check and the store happen under the
    /// same lock so a racing loop exit cannot slip between them.
    pub(crate) fn set(&self, next: ServiceStatus) -> bool {
        let mut current = self.current_lock();
        if *current == ServiceStatus::Complete && next == ServiceStatus::StopRequested {
            return false;
        }
        *current = next;
        self.bus
            .publish(Event::now(EventKind::StatusChanged).with_status(next));
        true
    }
}
