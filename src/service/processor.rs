//! # Result-processing and notification hooks.
//!
//! [`Processor`] is the seam where application logic hangs off the service
//! loop. The loop calls, in order:
//!
//! - [`before_run`](Processor::before_run) once, when the loop task starts;
//! - [`process`](Processor::process) for every taken wrapper whose
//!   execution did not already fail — an `Err` here counts against the same
//!   retry budget as a task-execution failure;
//! - [`on_success`](Processor::on_success) / [`on_failure`](Processor::on_failure)
//!   after the outcome is classified (failure meaning *permanent* failure);
//! - [`after_run`](Processor::after_run) once, when the loop exits.
//!
//! All hooks run synchronously **on the loop task**: a hook that blocks for
//! long stalls retries and takes for the whole service. Push heavy work onto
//! the event bus and a [`Subscribe`](crate::Subscribe) implementation
//! instead.

use async_trait::async_trait;

use crate::error::TaskError;
use crate::tasks::TaskWrapper;

/// Hooks invoked by the service loop.
#[async_trait]
pub trait Processor<R: Send + 'static>: Send + Sync + 'static {
    /// Consumes one completed wrapper.
    ///
    /// For pool-backed lists the execution outcome is already in the
    /// wrapper; for the FIFO list the outcome is `None` and running the
    /// task (or whatever "processing" means) happens here. Returning `Err`
    /// sends the task down the retry path.
    async fn process(&self, _wrapper: &mut TaskWrapper<R>) -> Result<(), TaskError> {
        Ok(())
    }

    /// Called after a task's result was processed successfully.
    async fn on_success(&self, _wrapper: &TaskWrapper<R>) {}

    /// Called after a task exhausted its retry budget, just before it is
    /// filed in the failure ledger.
    async fn on_failure(&self, _wrapper: &TaskWrapper<R>) {}

    /// Called once when the loop task starts.
    async fn before_run(&self) {}

    /// Called once when the loop task exits, after the status turned
    /// `Complete`.
    async fn after_run(&self) {}
}

/// Processor that accepts every result and does nothing else.
///
/// The builder default: useful when task bodies are self-contained and
/// observers hang off the event bus.
pub struct NoopProcessor;

#[async_trait]
impl<R: Send + 'static> Processor<R> for NoopProcessor {}
