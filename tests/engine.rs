//! End-to-end tests of the engine: service loop + completion pool + retry
//! bookkeeping + failure ledger, driven through the public API only.
//!
//! Timing-sensitive tests run under tokio's paused clock so sleeps and
//! backoff windows auto-advance deterministically.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Semaphore;
use tokio::time::timeout;

use backhaul::{
    BackgroundService, BackoffPolicy, CompletionPool, ErrorRecord, EventKind, FifoList,
    JitterPolicy, PendingList, PoolConfig, Processor, RetryPolicy, ServiceConfig, ServiceStatus,
    TaskError, TaskFn, TaskRef, TaskWrapper, TerminationPolicy,
};

const EVENT_WAIT: Duration = Duration::from_secs(120);

/// Hook that reports entry into `process` and then parks until the test
/// hands over a gate permit.
struct GatedHook {
    gate: Arc<Semaphore>,
    entered: tokio::sync::mpsc::UnboundedSender<()>,
}

impl GatedHook {
    fn new() -> (
        Arc<Self>,
        Arc<Semaphore>,
        tokio::sync::mpsc::UnboundedReceiver<()>,
    ) {
        let gate = Arc::new(Semaphore::new(0));
        let (entered, entered_rx) = tokio::sync::mpsc::unbounded_channel();
        (
            Arc::new(Self {
                gate: gate.clone(),
                entered,
            }),
            gate,
            entered_rx,
        )
    }
}

#[async_trait]
impl Processor<&'static str> for GatedHook {
    async fn process(&self, _wrapper: &mut TaskWrapper<&'static str>) -> Result<(), TaskError> {
        let _ = self.entered.send(());
        let permit = self.gate.acquire().await.expect("gate open");
        permit.forget();
        Ok(())
    }
}

fn fast_backoff() -> BackoffPolicy {
    BackoffPolicy {
        first: Duration::from_millis(10),
        max: Duration::from_secs(1),
        factor: 2.0,
        jitter: JitterPolicy::None,
    }
}

fn pool_with(retry: RetryPolicy) -> Arc<CompletionPool<&'static str>> {
    Arc::new(CompletionPool::new(PoolConfig {
        workers: 1,
        attempt_timeout: None,
        retry,
        backoff: fast_backoff(),
    }))
}

fn succeeding(name: &'static str) -> TaskRef<&'static str> {
    TaskFn::arc(name, move |_ctx| async move { Ok::<_, TaskError>(name) })
}

fn always_failing(name: &'static str, runs: Arc<AtomicUsize>) -> TaskRef<&'static str> {
    TaskFn::arc(name, move |_ctx| {
        let runs = runs.clone();
        async move {
            runs.fetch_add(1, Ordering::SeqCst);
            Err::<&'static str, _>(TaskError::fail("server said no"))
        }
    })
}

/// Drains service events until the given counts of successes and
/// abandonments have been observed.
async fn await_outcomes(
    events: &mut tokio::sync::broadcast::Receiver<backhaul::Event>,
    successes: usize,
    abandoned: usize,
) -> (usize, usize, usize) {
    let (mut ok, mut dead, mut retries) = (0, 0, 0);
    while ok < successes || dead < abandoned {
        let ev = timeout(EVENT_WAIT, events.recv())
            .await
            .expect("engine made no progress")
            .expect("bus stays open");
        match ev.kind {
            EventKind::TaskSucceeded => ok += 1,
            EventKind::TaskAbandoned => dead += 1,
            EventKind::TaskRetrying => retries += 1,
            _ => {}
        }
    }
    (ok, dead, retries)
}

#[tokio::test(start_paused = true)]
async fn test_bounded_retry_scenario_one_bad_two_good() {
    let pool = pool_with(RetryPolicy::Limited { max_attempts: 2 });
    let service = BackgroundService::builder(ServiceConfig::default())
        .with_pending(pool.clone())
        .build();
    let mut events = service.subscribe();

    let runs = Arc::new(AtomicUsize::new(0));
    service
        .submit(always_failing("bad-study", runs.clone()))
        .await
        .unwrap();
    service.submit(succeeding("good-study-1")).await.unwrap();
    service.submit(succeeding("good-study-2")).await.unwrap();
    service.start().await;

    let (ok, dead, retries) = await_outcomes(&mut events, 2, 1).await;
    assert_eq!(ok, 2, "success notification fired exactly twice");
    assert_eq!(dead, 1);
    assert_eq!(retries, 1, "two attempts means exactly one resubmission");
    assert_eq!(runs.load(Ordering::SeqCst), 2);

    let failures = service.failures();
    assert_eq!(failures.len(), 1, "the bad task appears exactly once");
    assert_eq!(failures[0].name(), "bad-study");
    assert_eq!(failures[0].record().failure_count(), 2);

    assert!(pool.is_empty(), "nothing outstanding once all work settled");

    service.stop().await;
    assert!(service.wait_for_completion(Duration::from_secs(5)).await);
}

#[tokio::test(start_paused = true)]
async fn test_unbounded_repeater_never_reaches_the_ledger() {
    let pool = pool_with(RetryPolicy::Forever);
    let service = BackgroundService::builder(ServiceConfig::default())
        .with_pending(pool)
        .build();
    let mut events = service.subscribe();

    let runs = Arc::new(AtomicUsize::new(0));
    service
        .submit(always_failing("wont-give-up", runs.clone()))
        .await
        .unwrap();
    service.start().await;

    let mut retries = 0;
    while retries < 4 {
        let ev = timeout(EVENT_WAIT, events.recv())
            .await
            .expect("retries keep coming")
            .expect("bus stays open");
        match ev.kind {
            EventKind::TaskRetrying => retries += 1,
            EventKind::TaskAbandoned => panic!("repeat-forever task must never be abandoned"),
            _ => {}
        }
    }

    assert!(service.failures().is_empty());
    assert!(runs.load(Ordering::SeqCst) >= 4);

    service.stop().await;
    assert!(service.wait_for_completion(Duration::from_secs(5)).await);
}

#[tokio::test(start_paused = true)]
async fn test_hook_errors_share_the_retry_budget() {
    struct RejectingHook;

    #[async_trait]
    impl Processor<&'static str> for RejectingHook {
        async fn process(
            &self,
            _wrapper: &mut TaskWrapper<&'static str>,
        ) -> Result<(), TaskError> {
            Err(TaskError::fail("result validation failed"))
        }
    }

    let pool = pool_with(RetryPolicy::Limited { max_attempts: 1 });
    let service = BackgroundService::builder(ServiceConfig::default())
        .with_pending(pool)
        .with_processor(Arc::new(RejectingHook))
        .build();
    let mut events = service.subscribe();

    // The task itself succeeds; only the hook rejects it.
    service.submit(succeeding("rejected")).await.unwrap();
    service.start().await;

    let (ok, dead, retries) = await_outcomes(&mut events, 0, 1).await;
    assert_eq!((ok, dead, retries), (0, 1, 0));

    let failures = service.failures();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].record().failure_count(), 1);

    service.stop().await;
    assert!(service.wait_for_completion(Duration::from_secs(5)).await);
}

#[tokio::test(start_paused = true)]
async fn test_stop_when_empty_completes_after_draining() {
    let pool = pool_with(RetryPolicy::limited());
    let service = BackgroundService::builder(ServiceConfig {
        termination: TerminationPolicy::StopWhenEmpty,
        ..ServiceConfig::default()
    })
    .with_pending(pool)
    .build();

    service.submit(succeeding("only-item")).await.unwrap();
    service.start().await;

    assert!(
        service.wait_for_completion(Duration::from_secs(30)).await,
        "loop exits on its own once the list is empty"
    );
    assert_eq!(service.status(), ServiceStatus::Complete);
    assert!(service.failures().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_late_stop_does_not_regress_completed_status() {
    let pool = pool_with(RetryPolicy::limited());
    let service = BackgroundService::builder(ServiceConfig {
        termination: TerminationPolicy::StopWhenEmpty,
        ..ServiceConfig::default()
    })
    .with_pending(pool)
    .build();

    service.submit(succeeding("quick")).await.unwrap();
    service.start().await;
    assert!(service.wait_for_completion(Duration::from_secs(30)).await);
    assert_eq!(service.status(), ServiceStatus::Complete);

    service.stop().await;
    assert_eq!(
        service.status(),
        ServiceStatus::Complete,
        "a finished service is never reported as stopping"
    );
}

#[tokio::test(start_paused = true)]
async fn test_restart_immediately_after_stop_processes_once() {
    let pool = pool_with(RetryPolicy::limited());
    let service = BackgroundService::builder(ServiceConfig::default())
        .with_pending(pool.clone())
        .build();
    let mut events = service.subscribe();

    service.start().await;
    service.stop().await;
    // Old loop may not have torn down yet; start() must cope.
    service.start().await;
    assert!(service.is_running());

    let runs = Arc::new(AtomicUsize::new(0));
    let counted = {
        let runs = runs.clone();
        TaskFn::arc("in-flight", move |_ctx| {
            let runs = runs.clone();
            async move {
                runs.fetch_add(1, Ordering::SeqCst);
                Ok::<_, TaskError>("done")
            }
        })
    };
    service.submit(counted).await.unwrap();

    let (ok, _, _) = await_outcomes(&mut events, 1, 0).await;
    assert_eq!(ok, 1);
    assert_eq!(runs.load(Ordering::SeqCst), 1, "no duplicate processing");

    service.stop().await;
    assert!(service.wait_for_completion(Duration::from_secs(5)).await);
}

#[tokio::test(start_paused = true)]
async fn test_restart_overlap_is_a_warning_not_an_error() {
    let (hook, gate, mut entered) = GatedHook::new();
    let pool = pool_with(RetryPolicy::limited());
    let service = BackgroundService::builder(ServiceConfig {
        restart_grace: Duration::from_millis(50),
        ..ServiceConfig::default()
    })
    .with_pending(pool)
    .with_processor(hook)
    .build();
    let mut events = service.subscribe();

    service.submit(succeeding("held")).await.unwrap();
    service.start().await;

    // Wait until the loop has taken the task and parked inside the hook.
    entered.recv().await.expect("hook entered");
    service.stop().await;

    // The old loop is stuck in the hook, so the grace wait must expire and
    // the restart proceed anyway.
    service.start().await;

    let overlap = loop {
        let ev = timeout(EVENT_WAIT, events.recv())
            .await
            .expect("overlap warning published")
            .expect("bus stays open");
        if ev.kind == EventKind::RestartOverlap {
            break ev;
        }
    };
    assert_eq!(overlap.kind, EventKind::RestartOverlap);

    // Release the parked hook; the old loop finishes and the item is
    // reported exactly once.
    gate.add_permits(1);
    let (ok, _, _) = await_outcomes(&mut events, 1, 0).await;
    assert_eq!(ok, 1);

    service.stop().await;
    service.wait_for_completion(Duration::from_secs(5)).await;
}

#[tokio::test(start_paused = true)]
async fn test_stop_leaves_queued_tasks_for_restart() {
    let (hook, gate, mut entered) = GatedHook::new();
    let pool = pool_with(RetryPolicy::limited());
    let service = BackgroundService::builder(ServiceConfig::default())
        .with_pending(pool.clone())
        .with_processor(hook)
        .build();
    let mut events = service.subscribe();

    service.submit(succeeding("first")).await.unwrap();
    service.submit(succeeding("second")).await.unwrap();
    service.submit(succeeding("third")).await.unwrap();
    service.start().await;

    // Loop takes "first" and parks in the hook; wait until it is there,
    // then request a stop and release exactly one item.
    entered.recv().await.expect("hook entered");
    service.stop().await;
    gate.add_permits(1);

    let (ok, _, _) = await_outcomes(&mut events, 1, 0).await;
    assert_eq!(ok, 1);
    assert!(service.wait_for_completion(Duration::from_secs(30)).await);

    assert!(
        !pool.is_empty(),
        "unprocessed tasks stay in the pending list across a pause"
    );

    // A restart resumes exactly where the pause left off.
    gate.add_permits(2);
    service.start().await;
    let (ok, _, _) = await_outcomes(&mut events, 2, 0).await;
    assert_eq!(ok, 2);
    assert!(pool.is_empty());

    service.stop().await;
    assert!(service.wait_for_completion(Duration::from_secs(5)).await);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_stops_the_loop_and_rejects_submissions() {
    let pool = pool_with(RetryPolicy::limited());
    let service = BackgroundService::builder(ServiceConfig::default())
        .with_pending(pool.clone())
        .build();

    service.start().await;
    pool.cancel_all_and_shutdown();

    assert!(
        service.wait_for_completion(Duration::from_secs(30)).await,
        "a closed list ends the loop"
    );
    assert_eq!(service.status(), ServiceStatus::Complete);
    assert!(service.submit(succeeding("late")).await.is_err());
}

#[tokio::test(start_paused = true)]
async fn test_retry_all_failures_requeues_ledger_entries() {
    let pool = pool_with(RetryPolicy::Limited { max_attempts: 1 });
    let service = BackgroundService::builder(ServiceConfig::default())
        .with_pending(pool)
        .build();
    let mut events = service.subscribe();

    let runs = Arc::new(AtomicUsize::new(0));
    service
        .submit(always_failing("flaky", runs.clone()))
        .await
        .unwrap();
    service.start().await;

    let (_, dead, _) = await_outcomes(&mut events, 0, 1).await;
    assert_eq!(dead, 1);
    assert_eq!(service.failures().len(), 1);

    // Resubmission starts a fresh record; with max_attempts = 1 the task
    // fails straight back into the ledger.
    let requeued = service.retry_all_failures().await.unwrap();
    assert_eq!(requeued, 1);

    let (_, dead, _) = await_outcomes(&mut events, 0, 1).await;
    assert_eq!(dead, 1);
    assert_eq!(service.failures().len(), 1);
    assert_eq!(runs.load(Ordering::SeqCst), 2);

    service.stop().await;
    assert!(service.wait_for_completion(Duration::from_secs(5)).await);
}

#[tokio::test(start_paused = true)]
async fn test_fifo_list_service_runs_tasks_in_the_hook() {
    /// FIFO wrappers carry no outcome; this hook runs the task itself.
    struct RunInline;

    #[async_trait]
    impl Processor<&'static str> for RunInline {
        async fn process(
            &self,
            wrapper: &mut TaskWrapper<&'static str>,
        ) -> Result<(), TaskError> {
            assert!(wrapper.result().is_none());
            let token = tokio_util::sync::CancellationToken::new();
            wrapper.task().run(token).await.map(|_| ())
        }
    }

    let list: Arc<FifoList<&'static str>> = Arc::new(FifoList::new(
        RetryPolicy::Limited { max_attempts: 2 },
        fast_backoff(),
    ));
    let service = BackgroundService::builder(ServiceConfig::default())
        .with_pending(list)
        .with_processor(Arc::new(RunInline))
        .build();
    let mut events = service.subscribe();

    let runs = Arc::new(AtomicUsize::new(0));
    service.submit(succeeding("ordered-1")).await.unwrap();
    service
        .submit(always_failing("ordered-2", runs.clone()))
        .await
        .unwrap();
    service.start().await;

    let (ok, dead, _) = await_outcomes(&mut events, 1, 1).await;
    assert_eq!((ok, dead), (1, 1));
    assert_eq!(runs.load(Ordering::SeqCst), 2, "retried once via the list");

    service.stop().await;
    assert!(service.wait_for_completion(Duration::from_secs(5)).await);
}

#[tokio::test(start_paused = true)]
async fn test_status_stream_reports_lifecycle_transitions() {
    let pool = pool_with(RetryPolicy::limited());
    let service = BackgroundService::builder(ServiceConfig {
        termination: TerminationPolicy::StopWhenEmpty,
        ..ServiceConfig::default()
    })
    .with_pending(pool)
    .build();
    let mut events = service.subscribe();

    service.submit(succeeding("observed")).await.unwrap();
    service.start().await;
    assert!(service.wait_for_completion(Duration::from_secs(30)).await);

    let mut statuses = Vec::new();
    while let Ok(ev) = events.try_recv() {
        if ev.kind == EventKind::StatusChanged {
            statuses.push(ev.status.expect("status attached"));
        }
    }
    assert_eq!(
        statuses,
        vec![ServiceStatus::Running, ServiceStatus::Complete]
    );
}

#[tokio::test(start_paused = true)]
async fn test_retry_waits_out_the_backoff_window() {
    let pool = pool_with(RetryPolicy::Limited { max_attempts: 2 });
    let service = BackgroundService::builder(ServiceConfig::default())
        .with_pending(pool)
        .build();
    let mut events = service.subscribe();

    let started = tokio::time::Instant::now();
    let runs = Arc::new(AtomicUsize::new(0));
    service
        .submit(always_failing("paced", runs.clone()))
        .await
        .unwrap();
    service.start().await;

    let (_, dead, _) = await_outcomes(&mut events, 0, 1).await;
    assert_eq!(dead, 1);
    assert!(
        started.elapsed() >= Duration::from_millis(10),
        "second attempt respected the first backoff delay"
    );

    service.stop().await;
    assert!(service.wait_for_completion(Duration::from_secs(5)).await);
}

#[tokio::test(start_paused = true)]
async fn test_submit_with_explicit_record_keeps_history() {
    let pool = pool_with(RetryPolicy::Limited { max_attempts: 2 });
    let service = BackgroundService::builder(ServiceConfig::default())
        .with_pending(pool.clone())
        .build();
    let mut events = service.subscribe();

    // One failure already on the books: a single further failure exhausts
    // the budget without any resubmission.
    let mut record = ErrorRecord::new(RetryPolicy::Limited { max_attempts: 2 }, fast_backoff());
    record.add_error(TaskError::fail("failed before the process restarted"));

    let runs = Arc::new(AtomicUsize::new(0));
    pool.add(always_failing("carried-over", runs.clone()), record)
        .await
        .unwrap();
    service.start().await;

    let (_, dead, retries) = await_outcomes(&mut events, 0, 1).await;
    assert_eq!((dead, retries), (1, 0));
    assert_eq!(runs.load(Ordering::SeqCst), 1);
    assert_eq!(service.failures()[0].record().failure_count(), 2);

    service.stop().await;
    assert!(service.wait_for_completion(Duration::from_secs(5)).await);
}
