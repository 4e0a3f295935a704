//! Event subscribers: consumers of the service's event stream.
//!
//! Notification consumers (progress UIs, statistics reporters, log sinks)
//! must never stall the service loop, so they do not read the bus directly
//! from the loop's context. Instead the service forwards every event into a
//! [`SubscriberSet`], which gives each [`Subscribe`] implementation its own
//! bounded queue and worker task.
//!
//! ```text
//! service loop ── publish ──► Bus ──► listener ──► SubscriberSet::emit
//!                                                    ├─► [queue] worker ─► progress UI
//!                                                    ├─► [queue] worker ─► statistics
//!                                                    └─► [queue] worker ─► LogWriter
//! ```

mod log;
mod set;
mod subscribe;

pub use log::LogWriter;
pub use set::SubscriberSet;
pub use subscribe::Subscribe;
