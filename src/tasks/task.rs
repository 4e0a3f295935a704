//! # Task abstraction.
//!
//! This module defines the [`Task`] trait: an async, cancelable unit of work
//! producing a result value. The common handle type is [`TaskRef`], an
//! `Arc<dyn Task<Output = R>>` suitable for sharing between the pending list,
//! the worker pool and the failure ledger.
//!
//! A task receives a [`CancellationToken`] and should periodically check it
//! to stop cooperatively when the pool is shut down; the engine never
//! force-kills non-cooperative work.

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::TaskError;

/// Shared handle to a task producing `R`.
pub type TaskRef<R> = Arc<dyn Task<Output = R>>;

/// # Asynchronous, cancelable unit of work.
///
/// A `Task` has a stable [`name`](Task::name) (used in events and logs) and
/// an async [`run`](Task::run) method that either produces a result value or
/// fails with a [`TaskError`]. Task identity is the `Arc` pointer; the engine
/// never compares tasks structurally.
///
/// Implementors should regularly check the token and return
/// [`TaskError::Canceled`] promptly during shutdown.
///
/// # Example
/// ```
/// use async_trait::async_trait;
/// use tokio_util::sync::CancellationToken;
/// use backhaul::{Task, TaskError};
///
/// struct BundleUpload { study: String }
///
/// #[async_trait]
/// impl Task for BundleUpload {
///     type Output = usize;
///
///     fn name(&self) -> &str { &self.study }
///
///     async fn run(&self, ctx: CancellationToken) -> Result<usize, TaskError> {
///         if ctx.is_cancelled() {
///             return Err(TaskError::Canceled);
///         }
///         // transfer files, return bytes sent...
///         Ok(0)
///     }
/// }
/// ```
#[async_trait]
pub trait Task: Send + Sync + 'static {
    /// Result value produced by a successful execution.
    type Output: Send + 'static;

    /// Returns a stable, human-readable task name.
    fn name(&self) -> &str;

    /// Executes the task until completion, failure or cancellation.
    async fn run(&self, ctx: CancellationToken) -> Result<Self::Output, TaskError>;
}
