//! # backhaul
//!
//! **Backhaul** is a bounded-concurrency background task engine for
//! resilient transfers: submit opaque units of work (file-bundle uploads,
//! typically), run them on a fixed-size worker pool, consume results in
//! completion order, retry transient failures with exponential backoff, and
//! keep a ledger of tasks that exhausted their retry budget — with graceful
//! start/stop, re-entrant restart, and mid-flight cancellation.
//!
//! ## Architecture
//! ```text
//!  producers                 ┌────────────────────────────────────┐
//!  (upload orchestration) ──►  PendingList (CompletionPool)      │
//!                            │   sequence → (task, ErrorRecord)   │
//!                            │   N-permit semaphore worker pool   │
//!                            └───────────────┬────────────────────┘
//!                                            │ completion channel
//!                                            ▼ (finish order)
//!  ┌──────────────────────────────────────────────────────────────┐
//!  │  BackgroundService loop (one task)                           │
//!  │    take() ─► Ok  ─► Processor::process ─► on_success         │
//!  │           └► Err ─► ErrorRecord::add_error                   │
//!  │                      ├─ should_retry ─► retry (backoff)      │
//!  │                      └─ exhausted   ─► FailureList           │
//!  └───────────────┬──────────────────────────────────────────────┘
//!                  │ Bus (broadcast)
//!                  ▼
//!          SubscriberSet ─► progress UI / stats / LogWriter
//! ```
//!
//! ## Features
//! | Area            | Description                                             | Key types / traits                      |
//! |-----------------|---------------------------------------------------------|-----------------------------------------|
//! | **Tasks**       | Opaque, cancelable, result-producing units of work.     | [`Task`], [`TaskFn`], [`TaskRef`]       |
//! | **Pending**     | Completion-ordered pool or plain FIFO list.             | [`PendingList`], [`CompletionPool`], [`FifoList`] |
//! | **Retry**       | Bounded or repeat-forever, exponentially spaced.        | [`RetryPolicy`], [`BackoffPolicy`], [`ErrorRecord`] |
//! | **Service**     | The drain/classify/retry loop with lifecycle control.   | [`BackgroundService`], [`ServiceStatus`] |
//! | **Failures**    | Append-only ledger of permanently failed tasks.         | [`FailureList`]                         |
//! | **Observability**| Event stream with isolated, non-blocking consumers.    | [`Bus`], [`Event`], [`Subscribe`]       |
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use tokio_util::sync::CancellationToken;
//! use backhaul::{
//!     BackgroundService, CompletionPool, PoolConfig, RetryPolicy, ServiceConfig,
//!     TaskError, TaskFn, TaskRef, TerminationPolicy,
//! };
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let pool: Arc<CompletionPool<u64>> = Arc::new(CompletionPool::new(PoolConfig {
//!         workers: 2,
//!         retry: RetryPolicy::Limited { max_attempts: 3 },
//!         ..PoolConfig::default()
//!     }));
//!
//!     let service = BackgroundService::builder(ServiceConfig {
//!         termination: TerminationPolicy::StopWhenEmpty,
//!         ..ServiceConfig::default()
//!     })
//!     .with_pending(pool)
//!     .build();
//!
//!     let upload: TaskRef<u64> = TaskFn::arc("bundle-001", |ctx: CancellationToken| async move {
//!         if ctx.is_cancelled() {
//!             return Err(TaskError::Canceled);
//!         }
//!         // push bytes to the server, return how many...
//!         Ok(1024)
//!     });
//!
//!     service.submit(upload).await.expect("list accepts work");
//!     service.start().await;
//!     service.wait_for_completion(Duration::from_secs(30)).await;
//!     assert!(service.failures().is_empty());
//! }
//! ```

mod error;
mod events;
mod failures;
mod pending;
mod policies;
mod service;
mod subscribers;
mod tasks;

// ---- Public re-exports ----

pub use error::{QueueError, TaskError};
pub use events::{Bus, Event, EventKind};
pub use failures::{FailureList, FailureRecord};
pub use pending::{CompletionPool, FifoList, PendingList, PoolConfig};
pub use policies::{BackoffPolicy, JitterPolicy, RetryPolicy};
pub use service::{
    BackgroundService, NoopProcessor, Processor, ServiceBuilder, ServiceConfig, ServiceStatus,
    TerminationPolicy,
};
pub use subscribers::{LogWriter, Subscribe, SubscriberSet};
pub use tasks::{ErrorEntry, ErrorRecord, Task, TaskFn, TaskRef, TaskWrapper};
