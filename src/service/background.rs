//! # BackgroundService: the retry/failure bookkeeping loop.
//!
//! One dedicated loop task per service drains the pending list and performs
//! all retry decisions, so that decision logic never races with itself. The
//! worker pool executes; the loop classifies.
//!
//! ## Loop body
//! ```text
//! before_run()
//! while not cancelled and termination policy allows:
//!     wrapper = take()                (cancellable; completion order)
//!     outcome = execution error ?? process(wrapper)
//!     ├─ Ok  ──► on_success + TaskSucceeded event
//!     └─ Err ──► record error
//!          ├─ should_retry ──► resubmit (history intact) + TaskRetrying
//!          └─ else ──► on_failure + failure ledger + TaskAbandoned
//! status = Complete, after_run()
//! ```
//!
//! ## Rules
//! - Cancellation while *waiting* for work is control flow, never a task
//!   failure: nothing is recorded and the loop just exits.
//! - A hook error and a task-execution error draw from the same retry
//!   budget.
//! - On exit, queued tasks stay in the pending list; a later `start()`
//!   resumes them. Pausing a service must not lose work.
//! - `stop()` cancels only the loop. Tearing down the executions themselves
//!   is [`PendingList::cancel_all_and_shutdown`]; full teardown needs both.

use std::collections::VecDeque;
use std::sync::Arc;

use tokio::sync::Mutex as AsyncMutex;
use tokio::task::JoinHandle;
use tokio::time;
use tokio_util::sync::CancellationToken;

use crate::error::QueueError;
use crate::events::{Bus, Event, EventKind};
use crate::failures::{FailureList, FailureRecord};
use crate::pending::{CompletionPool, PendingList};
use crate::service::config::ServiceConfig;
use crate::service::processor::{NoopProcessor, Processor};
use crate::service::status::{ServiceStatus, StatusCell};
use crate::subscribers::{Subscribe, SubscriberSet};
use crate::tasks::{TaskRef, TaskWrapper};

/// Loop task bookkeeping guarded by one async mutex: `start()`, `stop()`
/// and `wait_for_completion()` all serialize here.
struct LoopControl {
    handle: Option<JoinHandle<()>>,
    cancel: Option<CancellationToken>,
}

/// Drives a [`PendingList`]: takes completed work, classifies outcomes,
/// retries or files permanent failures, and reports through hooks and the
/// event bus.
pub struct BackgroundService<R: Send + 'static> {
    cfg: ServiceConfig,
    pending: Arc<dyn PendingList<R>>,
    processor: Arc<dyn Processor<R>>,
    failures: Arc<FailureList<R>>,
    bus: Bus,
    status: Arc<StatusCell>,
    control: AsyncMutex<LoopControl>,
}

impl<R: Send + 'static> BackgroundService<R> {
    /// Starts building a service with the given configuration.
    pub fn builder(cfg: ServiceConfig) -> ServiceBuilder<R> {
        ServiceBuilder::new(cfg)
    }

    /// Starts the loop task. Re-entrant:
    ///
    /// - while already `Running` this is a no-op;
    /// - after a `stop()`, waits up to [`ServiceConfig::restart_grace`] for
    ///   the previous loop to finish tearing down, then starts a new loop
    ///   regardless, publishing [`EventKind::RestartOverlap`] and logging a
    ///   warning rather than failing.
    pub async fn start(&self) {
        let mut control = self.control.lock().await;

        if self.status.get() == ServiceStatus::Running {
            return;
        }

        if let Some(mut handle) = control.handle.take() {
            match time::timeout(self.cfg.restart_grace, &mut handle).await {
                Ok(_joined) => {}
                Err(_elapsed) => {
                    tracing::warn!(
                        grace = ?self.cfg.restart_grace,
                        "service restarted while the previous loop is still \
                         tearing down; starting a new loop anyway"
                    );
                    self.bus.publish(Event::now(EventKind::RestartOverlap));
                    // The old handle is dropped; its task finishes detached.
                }
            }
        }

        self.status.set(ServiceStatus::Running);

        let cancel = CancellationToken::new();
        let run = ServiceLoop {
            pending: Arc::clone(&self.pending),
            processor: Arc::clone(&self.processor),
            failures: Arc::clone(&self.failures),
            bus: self.bus.clone(),
            status: Arc::clone(&self.status),
            cfg: self.cfg,
            cancel: cancel.clone(),
        };
        control.handle = Some(tokio::spawn(run.run()));
        control.cancel = Some(cancel);
    }

    /// Requests the loop to stop after the item it is currently processing.
    ///
    /// The status moves to `StopRequested` unless the loop already finished
    /// naturally — a completed service is never reported as stopping. Does
    /// not touch the worker pool.
    pub async fn stop(&self) {
        let control = self.control.lock().await;
        if let Some(cancel) = control.cancel.as_ref() {
            self.status.set(ServiceStatus::StopRequested);
            cancel.cancel();
        }
    }

    /// Waits for the loop task to exit, up to `timeout`.
    ///
    /// Returns true if the loop has exited (or was never started). Call
    /// [`stop`](Self::stop) first; this method only waits, it does not
    /// request anything.
    pub async fn wait_for_completion(&self, timeout: std::time::Duration) -> bool {
        let mut control = self.control.lock().await;
        match control.handle.take() {
            None => true,
            Some(mut handle) => match time::timeout(timeout, &mut handle).await {
                Ok(_joined) => true,
                Err(_elapsed) => {
                    control.handle = Some(handle);
                    false
                }
            },
        }
    }

    /// Submits a task with a fresh error record.
    pub async fn submit(&self, task: TaskRef<R>) -> Result<(), QueueError> {
        self.pending.submit(task).await
    }

    /// The pending list this service drains — external producers submit
    /// through this same handle.
    pub fn pending_list(&self) -> Arc<dyn PendingList<R>> {
        Arc::clone(&self.pending)
    }

    /// Current lifecycle status.
    pub fn status(&self) -> ServiceStatus {
        self.status.get()
    }

    /// True while the loop is processing (or waiting for) work.
    pub fn is_running(&self) -> bool {
        self.status.get() == ServiceStatus::Running
    }

    /// Snapshot of the permanent-failure ledger.
    pub fn failures(&self) -> Vec<FailureRecord<R>> {
        self.failures.failures()
    }

    /// Drains the failure ledger and resubmits every task with a fresh
    /// error record. Returns how many were resubmitted.
    ///
    /// If the pending list was shut down mid-way, the not-yet-resubmitted
    /// entries are filed back into the ledger and the error is returned.
    pub async fn retry_all_failures(&self) -> Result<usize, QueueError> {
        let mut queue: VecDeque<FailureRecord<R>> = self.failures.drain().into();
        let mut resubmitted = 0;
        while let Some(entry) = queue.pop_front() {
            let (task, record) = entry.into_parts();
            if let Err(err) = self.pending.submit(Arc::clone(&task)).await {
                self.failures.add_failure(task, record);
                while let Some(rest) = queue.pop_front() {
                    let (task, record) = rest.into_parts();
                    self.failures.add_failure(task, record);
                }
                return Err(err);
            }
            resubmitted += 1;
        }
        Ok(resubmitted)
    }

    /// New receiver for the service's event stream (status changes, task
    /// outcomes, restart warnings, subscriber diagnostics).
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<Event> {
        self.bus.subscribe()
    }
}

/// Everything one loop run needs, cloned out so the spawned task owns it.
struct ServiceLoop<R: Send + 'static> {
    pending: Arc<dyn PendingList<R>>,
    processor: Arc<dyn Processor<R>>,
    failures: Arc<FailureList<R>>,
    bus: Bus,
    status: Arc<StatusCell>,
    cfg: ServiceConfig,
    cancel: CancellationToken,
}

impl<R: Send + 'static> ServiceLoop<R> {
    /// Whether to make a further blocking take or terminate.
    fn continue_processing(&self) -> bool {
        if self.cfg.termination.stop_when_empty() {
            !self.pending.is_empty()
        } else {
            true
        }
    }

    async fn run(self) {
        self.processor.before_run().await;

        loop {
            if self.cancel.is_cancelled() || !self.continue_processing() {
                break;
            }

            let taken = tokio::select! {
                _ = self.cancel.cancelled() => break,
                taken = self.pending.take() => taken,
            };
            let wrapper = match taken {
                Ok(wrapper) => wrapper,
                // The list was shut down under us; nothing left to drain.
                Err(QueueError::Closed) => break,
            };

            self.handle_taken(wrapper).await;
        }

        self.status.set(ServiceStatus::Complete);
        self.processor.after_run().await;
        // Remaining queued tasks are deliberately left in the pending list
        // so a restarted loop resumes processing them.
    }

    async fn handle_taken(&self, mut wrapper: TaskWrapper<R>) {
        // An execution failure short-circuits the hook; a hook failure is
        // treated exactly like an execution failure.
        let execution_error = match wrapper.result() {
            Some(Err(err)) => Some(err.clone()),
            _ => None,
        };
        let outcome = match execution_error {
            Some(err) => Err(err),
            None => self.processor.process(&mut wrapper).await,
        };

        match outcome {
            Ok(()) => {
                self.processor.on_success(&wrapper).await;
                self.bus.publish(
                    Event::now(EventKind::TaskSucceeded)
                        .with_task(wrapper.name().to_string())
                        .with_sequence(wrapper.sequence())
                        .with_attempt(wrapper.record().failure_count() as u32 + 1),
                );
            }
            Err(err) => {
                tracing::warn!(
                    task = wrapper.name(),
                    error = %err,
                    "task attempt failed"
                );
                wrapper.add_error(err.clone());

                if wrapper.should_retry() {
                    let name = wrapper.name().to_string();
                    let sequence = wrapper.sequence();
                    let attempt = wrapper.record().failure_count() as u32;
                    let delay = wrapper.record().delay_until_ready();
                    let (task, record) = wrapper.into_parts();

                    self.bus.publish(
                        Event::now(EventKind::TaskRetrying)
                            .with_task(name.clone())
                            .with_sequence(sequence)
                            .with_attempt(attempt)
                            .with_delay(delay)
                            .with_error(err.to_string()),
                    );

                    if self.pending.retry(task, record).await.is_err() {
                        tracing::debug!(
                            task = %name,
                            "pending list shut down; dropping retry"
                        );
                    }
                } else {
                    self.processor.on_failure(&wrapper).await;
                    self.bus.publish(
                        Event::now(EventKind::TaskAbandoned)
                            .with_task(wrapper.name().to_string())
                            .with_sequence(wrapper.sequence())
                            .with_attempt(wrapper.record().failure_count() as u32)
                            .with_error(err.to_string()),
                    );
                    let (task, record) = wrapper.into_parts();
                    self.failures.add_failure(task, record);
                }
            }
        }
    }
}

/// Builder wiring a service together: pending list, processor, subscribers.
pub struct ServiceBuilder<R: Send + 'static> {
    cfg: ServiceConfig,
    pending: Option<Arc<dyn PendingList<R>>>,
    processor: Option<Arc<dyn Processor<R>>>,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl<R: Send + 'static> ServiceBuilder<R> {
    /// Creates a builder with the given configuration.
    pub fn new(cfg: ServiceConfig) -> Self {
        Self {
            cfg,
            pending: None,
            processor: None,
            subscribers: Vec::new(),
        }
    }

    /// Sets the pending list the service drains.
    ///
    /// Defaults to a serial [`CompletionPool`].
    pub fn with_pending(mut self, pending: Arc<dyn PendingList<R>>) -> Self {
        self.pending = Some(pending);
        self
    }

    /// Sets the result-processing hooks.
    ///
    /// Defaults to [`NoopProcessor`].
    pub fn with_processor(mut self, processor: Arc<dyn Processor<R>>) -> Self {
        self.processor = Some(processor);
        self
    }

    /// Attaches event subscribers; each gets a dedicated bounded queue and
    /// worker so slow consumers never stall the loop.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Builds the service and spawns the subscriber fan-out listener.
    ///
    /// Must be called within a tokio runtime.
    pub fn build(self) -> Arc<BackgroundService<R>> {
        let bus = Bus::new(self.cfg.bus_capacity);

        if !self.subscribers.is_empty() {
            let set = SubscriberSet::new(self.subscribers, bus.clone());
            let mut rx = bus.subscribe();
            tokio::spawn(async move {
                loop {
                    match rx.recv().await {
                        Ok(ev) => set.emit(&ev),
                        Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                        Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                    }
                }
            });
        }

        let pending = self
            .pending
            .unwrap_or_else(|| Arc::new(CompletionPool::serial()) as Arc<dyn PendingList<R>>);
        let processor = self
            .processor
            .unwrap_or_else(|| Arc::new(NoopProcessor) as Arc<dyn Processor<R>>);

        Arc::new(BackgroundService {
            cfg: self.cfg,
            pending,
            processor,
            failures: Arc::new(FailureList::new()),
            status: Arc::new(StatusCell::new(bus.clone())),
            bus,
            control: AsyncMutex::new(LoopControl {
                handle: None,
                cancel: None,
            }),
        })
    }
}
