//! Pending lists: the set of submitted-but-not-terminal tasks.
//!
//! A pending list accepts submissions, hands back completed work in
//! **completion order**, and knows how to shut everything down. Two
//! realizations are provided:
//!
//! - [`CompletionPool`]: backed by a fixed-concurrency worker pool;
//!   `take()` yields whichever submission finishes first, so one slow
//!   transfer never holds up several fast ones behind it.
//! - [`FifoList`]: a plain queue; `take()` yields wrappers in submission
//!   order and execution belongs to the consumer's processing hook.
//!
//! ```text
//! producers ──► add()/submit() ──► [ pending map / queue ]
//!                                        │ workers (pool only)
//!                                        ▼
//! service loop ◄── take() ◄── completion channel (finish order)
//! ```

mod completion;
mod fifo;
mod list;

pub use completion::{CompletionPool, PoolConfig};
pub use fifo::FifoList;
pub use list::PendingList;
