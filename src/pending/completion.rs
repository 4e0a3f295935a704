//! # Completion-ordered pending list backed by a fixed-concurrency pool.
//!
//! [`CompletionPool`] executes each submission on its own tokio task, gated
//! by a semaphore of [`PoolConfig::workers`] permits, and delivers finished
//! work through an mpsc completion channel. `take()` therefore yields
//! whichever submission finishes first, regardless of submission order — one
//! large, slow transfer never blocks several small ones that complete
//! quickly.
//!
//! ## Architecture
//! ```text
//! add(task, record)
//!   ├─► pending map: sequence → (task, record)
//!   └─► spawn ── sleep until record's next-eligible instant (cancellable)
//!             ── acquire pool permit (cancellable)
//!             ── task.run(child token), optional per-attempt timeout
//!             ── send (sequence, outcome) ──► completion channel
//!
//! take()
//!   └─► recv completion ──► remove map entry ──► TaskWrapper
//! ```
//!
//! ## Rules
//! - The pending map is the arena: one entry per outstanding execution,
//!   keyed by the submission sequence number; `take()` removes exactly one.
//! - A retried submission re-enters through the same path with its record
//!   intact; the worker waits out the record's backoff window *before*
//!   occupying a pool slot, so backoff never starves unrelated work.
//! - `cancel_all_and_shutdown()` cancels the pool token (in-flight attempts
//!   observe their child token), discards everything queued, and closes the
//!   list for good. Completions from attempts that were already running are
//!   dropped on the floor afterwards.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, Mutex as AsyncMutex, Semaphore};
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;

use crate::error::{QueueError, TaskError};
use crate::pending::list::PendingList;
use crate::policies::{BackoffPolicy, RetryPolicy};
use crate::tasks::{ErrorRecord, TaskRef, TaskWrapper};

/// Configuration for a [`CompletionPool`].
#[derive(Clone, Copy, Debug)]
pub struct PoolConfig {
    /// Number of tasks allowed to execute simultaneously.
    ///
    /// Default 1: strict serial processing, the safe choice for servers that
    /// dislike parallel sessions. Raise to 2–4 for parallel uploads.
    pub workers: usize,

    /// Optional per-attempt timeout. A timed-out attempt has its token
    /// cancelled and counts as an ordinary task error.
    pub attempt_timeout: Option<Duration>,

    /// Retry policy for records created by [`PendingList::submit`].
    pub retry: RetryPolicy,

    /// Backoff policy for records created by [`PendingList::submit`].
    pub backoff: BackoffPolicy,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            workers: 1,
            attempt_timeout: None,
            retry: RetryPolicy::default(),
            backoff: BackoffPolicy::default(),
        }
    }
}

/// One finished execution, keyed back into the pending map.
struct Completion<R> {
    sequence: u64,
    outcome: Result<R, TaskError>,
}

/// An outstanding submission.
struct Entry<R> {
    task: TaskRef<R>,
    record: ErrorRecord,
}

/// State shared between the pool handle and its spawned workers.
struct Shared<R> {
    pending: Mutex<HashMap<u64, Entry<R>>>,
    completion_tx: mpsc::UnboundedSender<Completion<R>>,
    permits: Arc<Semaphore>,
    cancel: CancellationToken,
    closed: AtomicBool,
    sequence: AtomicU64,
    attempt_timeout: Option<Duration>,
}

impl<R> Shared<R> {
    fn pending_lock(&self) -> MutexGuard<'_, HashMap<u64, Entry<R>>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

/// Completion-ordered pending list over a fixed-size worker pool.
pub struct CompletionPool<R: Send + 'static> {
    shared: Arc<Shared<R>>,
    completion_rx: AsyncMutex<mpsc::UnboundedReceiver<Completion<R>>>,
    retry: RetryPolicy,
    backoff: BackoffPolicy,
}

impl<R: Send + 'static> CompletionPool<R> {
    /// Creates a pool with the given configuration.
    pub fn new(cfg: PoolConfig) -> Self {
        let (completion_tx, completion_rx) = mpsc::unbounded_channel();
        let shared = Arc::new(Shared {
            pending: Mutex::new(HashMap::new()),
            completion_tx,
            permits: Arc::new(Semaphore::new(cfg.workers.max(1))),
            cancel: CancellationToken::new(),
            closed: AtomicBool::new(false),
            sequence: AtomicU64::new(0),
            attempt_timeout: cfg.attempt_timeout,
        });
        Self {
            shared,
            completion_rx: AsyncMutex::new(completion_rx),
            retry: cfg.retry,
            backoff: cfg.backoff,
        }
    }

    /// Serial pool (one worker) with default policies.
    pub fn serial() -> Self {
        Self::new(PoolConfig::default())
    }

    /// Executes one submission: backoff wait, permit, attempt, completion.
    async fn run_submission(
        shared: Arc<Shared<R>>,
        sequence: u64,
        task: TaskRef<R>,
        resume_at: Option<Instant>,
    ) {
        // A retried task sits out its backoff window here, without holding
        // a pool permit.
        if let Some(at) = resume_at {
            tokio::select! {
                _ = time::sleep_until(at) => {}
                _ = shared.cancel.cancelled() => return,
            }
        }

        let permit = tokio::select! {
            permit = shared.permits.clone().acquire_owned() => match permit {
                Ok(permit) => permit,
                Err(_closed) => return,
            },
            _ = shared.cancel.cancelled() => return,
        };

        let child = shared.cancel.child_token();
        let outcome = match shared.attempt_timeout.filter(|d| *d > Duration::ZERO) {
            Some(dur) => match time::timeout(dur, task.run(child.clone())).await {
                Ok(result) => result,
                Err(_elapsed) => {
                    child.cancel();
                    Err(TaskError::Timeout { timeout: dur })
                }
            },
            None => task.run(child).await,
        };
        drop(permit);

        // Receiver closed means the pool handle is gone; nothing to report to.
        let _ = shared.completion_tx.send(Completion { sequence, outcome });
    }
}

#[async_trait]
impl<R: Send + 'static> PendingList<R> for CompletionPool<R> {
    async fn add(&self, task: TaskRef<R>, record: ErrorRecord) -> Result<(), QueueError> {
        let sequence;
        let resume_at = record.next_eligible();
        {
            let mut pending = self.shared.pending_lock();
            if self.shared.is_closed() {
                return Err(QueueError::Closed);
            }
            sequence = self.shared.sequence.fetch_add(1, Ordering::SeqCst);
            pending.insert(
                sequence,
                Entry {
                    task: task.clone(),
                    record,
                },
            );
        }

        tokio::spawn(Self::run_submission(
            Arc::clone(&self.shared),
            sequence,
            task,
            resume_at,
        ));
        Ok(())
    }

    async fn take(&self) -> Result<TaskWrapper<R>, QueueError> {
        let mut rx = self.completion_rx.lock().await;
        loop {
            if self.shared.is_closed() {
                return Err(QueueError::Closed);
            }

            let completion = tokio::select! {
                _ = self.shared.cancel.cancelled() => return Err(QueueError::Closed),
                received = rx.recv() => match received {
                    Some(completion) => completion,
                    // Unreachable while `shared` holds the sender; treat a
                    // closed channel as shutdown all the same.
                    None => return Err(QueueError::Closed),
                },
            };

            let entry = self.shared.pending_lock().remove(&completion.sequence);
            match entry {
                Some(Entry { task, record }) => {
                    return Ok(TaskWrapper::new(
                        task,
                        Some(completion.outcome),
                        record,
                        completion.sequence,
                    ));
                }
                // Entry was discarded by a shutdown racing this take.
                None => continue,
            }
        }
    }

    fn is_empty(&self) -> bool {
        self.shared.pending_lock().is_empty()
    }

    fn fresh_record(&self) -> ErrorRecord {
        ErrorRecord::new(self.retry, self.backoff)
    }

    fn cancel_all_and_shutdown(&self) {
        let mut pending = self.shared.pending_lock();
        self.shared.closed.store(true, Ordering::SeqCst);
        self.shared.cancel.cancel();
        pending.clear();
    }
}

impl<R: Send + 'static> Drop for CompletionPool<R> {
    fn drop(&mut self) {
        // Unblock any workers still sleeping on backoff or a permit.
        self.shared.cancel.cancel();
    }
}
