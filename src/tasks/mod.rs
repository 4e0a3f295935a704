//! Task abstractions and per-task bookkeeping.
//!
//! This module provides the task-facing types:
//! - [`Task`] - trait for implementing async, cancelable units of work
//! - [`TaskFn`] - function-backed task implementation
//! - [`TaskRef`] - shared handle to a task (`Arc<dyn Task<Output = R>>`)
//! - [`ErrorRecord`] - failure history plus retry-eligibility bookkeeping
//! - [`TaskWrapper`] - a taken task together with its outcome and record

mod record;
mod task;
mod task_fn;
mod wrapper;

pub use record::{ErrorEntry, ErrorRecord};
pub use task::{Task, TaskRef};
pub use task_fn::TaskFn;
pub use wrapper::TaskWrapper;
