//! The worker pool: bounded-concurrency job execution with retry,
//! backoff, dead-lettering, and admission control on job starts.

use std::collections::HashMap;
use std::num::NonZeroU32;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use governor::clock::DefaultClock;
use governor::middleware::NoOpMiddleware;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use tokio::sync::{Semaphore, broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::store::JobStore;
use crate::types::{Job, JobStatus, QueueEvent};

type DirectLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock, NoOpMiddleware>;

/// Admission control on job starts: at most `max` starts per `per` window.
///
/// Independent of the concurrency bound; exists to protect the downstream
/// classifier from burst overload, not to cap parallelism.
#[derive(Debug, Clone, Copy)]
pub struct RateLimit {
    pub max: u32,
    pub per: Duration,
}

impl Default for RateLimit {
    fn default() -> Self {
        Self {
            max: 10,
            per: Duration::from_secs(60),
        }
    }
}

impl RateLimit {
    fn limiter(&self) -> DirectLimiter {
        let max = NonZeroU32::new(self.max.max(1)).unwrap_or(NonZeroU32::MIN);
        let period = self.per / max.get();
        let quota = Quota::with_period(period.max(Duration::from_nanos(1)))
            .unwrap_or_else(|| Quota::per_second(max))
            .allow_burst(max);
        RateLimiter::direct(quota)
    }
}

/// Worker pool configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Maximum in-flight handlers, process-wide
    pub concurrency: usize,
    /// Admission control on job starts
    pub rate: RateLimit,
    /// How often to poll when the queue is empty
    pub poll_interval: Duration,
    /// Name for logging
    pub name: String,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            concurrency: 5,
            rate: RateLimit::default(),
            poll_interval: Duration::from_millis(100),
            name: "worker".to_string(),
        }
    }
}

impl WorkerConfig {
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn with_rate(mut self, rate: RateLimit) -> Self {
        self.rate = rate;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }
}

/// A registered job handler.
///
/// Because delivery is at-least-once, `run` may see the same payload more
/// than once; its side effects must be safe to apply twice.
#[async_trait]
pub trait JobHandler: Send + Sync {
    async fn run(&self, job: &Job) -> Result<serde_json::Value, String>;
}

/// Executor runtime statistics.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct ExecutorStats {
    pub jobs_processed: u64,
    pub jobs_succeeded: u64,
    pub jobs_failed: u64,
    pub jobs_dead_lettered: u64,
    pub current_running: usize,
}

/// Handle to control a running worker pool.
pub struct WorkerHandle {
    shutdown: watch::Sender<bool>,
    join: JoinHandle<()>,
    stats: Arc<Mutex<ExecutorStats>>,
}

impl WorkerHandle {
    /// Request graceful shutdown and wait for in-flight jobs to drain.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        let _ = self.join.await;
    }

    pub fn stats(&self) -> ExecutorStats {
        self.stats.lock().expect("lock poisoned").clone()
    }
}

/// Background job executor.
///
/// Claims jobs from the store, runs registered handlers under a concurrency
/// bound and a start-rate limit, and emits completion/failure events.
pub struct JobExecutor {
    store: Arc<dyn JobStore>,
    handlers: HashMap<String, Arc<dyn JobHandler>>,
    events: broadcast::Sender<QueueEvent>,
}

impl JobExecutor {
    pub fn new(store: Arc<dyn JobStore>) -> Self {
        let (events, _) = broadcast::channel(256);
        Self {
            store,
            handlers: HashMap::new(),
            events,
        }
    }

    /// Register a handler for a queue name.
    pub fn register_handler(&mut self, queue: impl Into<String>, handler: Arc<dyn JobHandler>) {
        self.handlers.insert(queue.into(), handler);
    }

    /// Subscribe to completion/dead-letter events. Lossy broadcast; the
    /// job store remains authoritative.
    pub fn subscribe_events(&self) -> broadcast::Receiver<QueueEvent> {
        self.events.subscribe()
    }

    /// Execute a single already-claimed job (tests / synchronous use).
    pub async fn execute_one(&self, job: &mut Job) -> Result<(), String> {
        let handler = self
            .handlers
            .get(&job.queue)
            .cloned()
            .ok_or_else(|| format!("no handler for queue: {}", job.queue))?;
        run_job(&handler, &self.store, &self.events, job).await
    }

    /// Spawn the worker pool onto the current runtime.
    pub fn spawn(self, config: WorkerConfig) -> WorkerHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let stats = Arc::new(Mutex::new(ExecutorStats::default()));
        let stats_clone = stats.clone();

        let join = tokio::spawn(async move {
            run_loop(self, config, shutdown_rx, stats_clone).await;
        });

        WorkerHandle {
            shutdown: shutdown_tx,
            join,
            stats,
        }
    }
}

async fn run_loop(
    executor: JobExecutor,
    config: WorkerConfig,
    mut shutdown_rx: watch::Receiver<bool>,
    stats: Arc<Mutex<ExecutorStats>>,
) {
    info!(worker = %config.name, concurrency = config.concurrency, "worker pool started");

    let semaphore = Arc::new(Semaphore::new(config.concurrency));
    let limiter = Arc::new(config.rate.limiter());
    let queues: Vec<String> = executor.handlers.keys().cloned().collect();

    loop {
        if *shutdown_rx.borrow() {
            break;
        }

        // Concurrency gate first: no point claiming a job we cannot run.
        let permit = tokio::select! {
            permit = semaphore.clone().acquire_owned() => match permit {
                Ok(p) => p,
                Err(_) => break,
            },
            _ = shutdown_rx.changed() => continue,
        };

        let mut claimed = None;
        for queue in &queues {
            match executor.store.claim_next(queue).await {
                Ok(Some(job)) => {
                    claimed = Some(job);
                    break;
                }
                Ok(None) => {}
                Err(e) => {
                    error!(worker = %config.name, queue, error = %e, "failed to claim job");
                }
            }
        }

        let job = match claimed {
            Some(job) => job,
            None => {
                drop(permit);
                tokio::select! {
                    _ = tokio::time::sleep(config.poll_interval) => {}
                    _ = shutdown_rx.changed() => {}
                }
                continue;
            }
        };

        // Admission control gates the *start*, after the claim: the job is
        // already marked Running, so no other worker can pick it up while
        // it waits here.
        let admitted = tokio::select! {
            _ = limiter.until_ready() => true,
            _ = shutdown_rx.changed() => false,
        };
        if !admitted {
            // Shutdown arrived mid-wait: return the claim, the job never
            // started and must not count as a delivery attempt.
            let mut job = job;
            job.status = JobStatus::Pending;
            job.attempt = job.attempt.saturating_sub(1);
            if let Err(e) = executor.store.update(&job).await {
                error!(job_id = %job.id, error = %e, "failed to release claimed job");
            }
            drop(permit);
            continue;
        }

        debug!(worker = %config.name, job_id = %job.id, queue = %job.queue, attempt = job.attempt, "job started");

        let handler = executor
            .handlers
            .get(&job.queue)
            .cloned()
            .expect("claimed job from unregistered queue");
        let store = executor.store.clone();
        let events = executor.events.clone();
        let task_stats = stats.clone();

        tokio::spawn(async move {
            {
                let mut s = task_stats.lock().expect("lock poisoned");
                s.current_running += 1;
            }

            let mut job = job;
            let result = run_job(&handler, &store, &events, &mut job).await;

            let mut s = task_stats.lock().expect("lock poisoned");
            s.current_running = s.current_running.saturating_sub(1);
            s.jobs_processed += 1;
            match result {
                Ok(()) => s.jobs_succeeded += 1,
                Err(_) => {
                    s.jobs_failed += 1;
                    if matches!(job.status, JobStatus::DeadLettered { .. }) {
                        s.jobs_dead_lettered += 1;
                    }
                }
            }

            drop(permit);
        });
    }

    // Drain: wait until every in-flight handler has returned its permit.
    let _ = semaphore.acquire_many(config.concurrency as u32).await;
    info!(worker = %config.name, "worker pool stopped");
}

async fn run_job(
    handler: &Arc<dyn JobHandler>,
    store: &Arc<dyn JobStore>,
    events: &broadcast::Sender<QueueEvent>,
    job: &mut Job,
) -> Result<(), String> {
    let started = Utc::now();

    match handler.run(job).await {
        Ok(value) => {
            job.mark_completed(started);
            if let Err(e) = store.update(job).await {
                // The handler's side effect landed but the completion mark
                // did not: the job will be redelivered. Idempotent handlers
                // make this safe.
                error!(job_id = %job.id, error = %e, "failed to persist job completion");
            }
            let _ = events.send(QueueEvent::Completed {
                job_id: job.id,
                queue: job.queue.clone(),
                payload: job.payload.clone(),
                value,
            });
            debug!(job_id = %job.id, "job completed");
            Ok(())
        }
        Err(reason) => {
            job.mark_failed(reason.clone(), started);
            if let Err(e) = store.update(job).await {
                error!(job_id = %job.id, error = %e, "failed to persist job failure");
            }

            if matches!(job.status, JobStatus::DeadLettered { .. }) {
                warn!(job_id = %job.id, queue = %job.queue, reason = %reason, "job dead-lettered");
                if let Err(e) = store.dead_letter(job.clone(), reason.clone()).await {
                    error!(job_id = %job.id, error = %e, "failed to persist dead letter");
                }
                let _ = events.send(QueueEvent::DeadLettered {
                    job_id: job.id,
                    queue: job.queue.clone(),
                    payload: job.payload.clone(),
                    reason: reason.clone(),
                });
            } else {
                debug!(job_id = %job.id, attempt = job.attempt, reason = %reason, "job failed, will retry");
            }

            Err(reason)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::JobQueue;
    use crate::store::InMemoryJobStore;
    use crate::types::RetryPolicy;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Ok200;

    #[async_trait]
    impl JobHandler for Ok200 {
        async fn run(&self, job: &Job) -> Result<serde_json::Value, String> {
            Ok(serde_json::json!({ "echo": job.payload }))
        }
    }

    struct AlwaysFails;

    #[async_trait]
    impl JobHandler for AlwaysFails {
        async fn run(&self, _job: &Job) -> Result<serde_json::Value, String> {
            Err("classifier unavailable".to_string())
        }
    }

    struct Tracked {
        running: Arc<AtomicUsize>,
        peak: Arc<AtomicUsize>,
        hold: Duration,
    }

    #[async_trait]
    impl JobHandler for Tracked {
        async fn run(&self, _job: &Job) -> Result<serde_json::Value, String> {
            let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(self.hold).await;
            self.running.fetch_sub(1, Ordering::SeqCst);
            Ok(serde_json::Value::Null)
        }
    }

    fn fast_config() -> WorkerConfig {
        WorkerConfig::default()
            .with_poll_interval(Duration::from_millis(5))
            .with_rate(RateLimit {
                max: 1000,
                per: Duration::from_secs(1),
            })
    }

    #[tokio::test]
    async fn successful_job_emits_completed_event() {
        let store = Arc::new(InMemoryJobStore::new());
        let mut executor = JobExecutor::new(store.clone());
        executor.register_handler("ticket-triage", Arc::new(Ok200));
        let mut events = executor.subscribe_events();

        store
            .enqueue(Job::new("ticket-triage", serde_json::json!({"ticketId": "t1"})))
            .await
            .unwrap();

        let mut job = store.claim_next("ticket-triage").await.unwrap().unwrap();
        executor.execute_one(&mut job).await.unwrap();

        assert!(matches!(job.status, JobStatus::Completed));
        match events.recv().await.unwrap() {
            QueueEvent::Completed { job_id, queue, .. } => {
                assert_eq!(job_id, job.id);
                assert_eq!(queue, "ticket-triage");
            }
            other => panic!("expected Completed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn unregistered_queue_is_an_error() {
        let store = Arc::new(InMemoryJobStore::new());
        let executor = JobExecutor::new(store.clone());

        let mut job = Job::new("nobody-home", serde_json::json!({}));
        assert!(executor.execute_one(&mut job).await.is_err());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn exhausted_retries_dead_letter_with_one_event() {
        let store = Arc::new(InMemoryJobStore::new());
        let mut executor = JobExecutor::new(store.clone());
        executor.register_handler("ticket-triage", Arc::new(AlwaysFails));
        let mut events = executor.subscribe_events();

        let job = Job::new("ticket-triage", serde_json::json!({"ticketId": "t1"}))
            .with_retry_policy(RetryPolicy::fixed(2, Duration::from_millis(1)));
        let job_id = store.enqueue(job).await.unwrap();

        let handle = executor.spawn(fast_config().with_name("test-worker"));

        // Exactly one DeadLettered event, carrying the original reason.
        let event = tokio::time::timeout(Duration::from_secs(5), events.recv())
            .await
            .expect("timed out waiting for dead-letter event")
            .unwrap();
        match event {
            QueueEvent::DeadLettered { job_id: id, reason, .. } => {
                assert_eq!(id, job_id);
                assert_eq!(reason, "classifier unavailable");
            }
            other => panic!("expected DeadLettered, got {other:?}"),
        }
        assert!(matches!(
            events.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        ));

        handle.shutdown().await;

        let job = store.get(job_id).await.unwrap().unwrap();
        assert!(matches!(job.status, JobStatus::DeadLettered { attempts: 2, .. }));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrency_bound_is_never_exceeded() {
        let store = Arc::new(InMemoryJobStore::new());
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let mut executor = JobExecutor::new(store.clone());
        executor.register_handler(
            "ticket-triage",
            Arc::new(Tracked {
                running: running.clone(),
                peak: peak.clone(),
                hold: Duration::from_millis(50),
            }),
        );

        let queue = JobQueue::new(store.clone());
        for i in 0..6 {
            queue
                .enqueue("ticket-triage", serde_json::json!({ "i": i }))
                .await
                .unwrap();
        }

        let handle = executor.spawn(fast_config().with_concurrency(2));

        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                if handle.stats().jobs_processed == 6 {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("jobs did not finish in time");

        handle.shutdown().await;
        assert!(peak.load(Ordering::SeqCst) <= 2, "peak = {}", peak.load(Ordering::SeqCst));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn admission_control_caps_starts_in_window() {
        let store = Arc::new(InMemoryJobStore::new());
        let mut executor = JobExecutor::new(store.clone());
        executor.register_handler("ticket-triage", Arc::new(Ok200));

        let queue = JobQueue::new(store.clone());
        for i in 0..5 {
            queue
                .enqueue("ticket-triage", serde_json::json!({ "i": i }))
                .await
                .unwrap();
        }

        // 2 starts per minute: burst of 2, then nothing for ~30s.
        let config = WorkerConfig::default()
            .with_poll_interval(Duration::from_millis(5))
            .with_rate(RateLimit {
                max: 2,
                per: Duration::from_secs(60),
            });
        let handle = executor.spawn(config);

        tokio::time::sleep(Duration::from_millis(500)).await;
        let stats = handle.stats();
        assert_eq!(stats.jobs_processed, 2, "only the burst may start");

        handle.shutdown().await;
    }
}
