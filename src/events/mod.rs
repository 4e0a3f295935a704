//! Runtime events: types and broadcast bus.
//!
//! This module groups the event **data model** and the **bus** used to
//! publish/subscribe to events emitted by the service loop, the pending
//! lists and the subscriber workers.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `BackgroundService` (status changes, task outcomes,
//!   restart warnings), `SubscriberSet` workers (overflow/panic).
//! - **Consumers**: anything holding a receiver from [`Bus::subscribe`] —
//!   typically the service's subscriber listener, which fans out to a
//!   [`SubscriberSet`](crate::SubscriberSet).

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
