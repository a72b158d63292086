//! `triagedesk-jobs` — durable job queue and worker pool.
//!
//! ## Design
//!
//! - Jobs are named by queue (e.g. `ticket-triage`) and carry a JSON payload
//! - Retry policy with exponential backoff, then dead-letter
//! - At-least-once delivery: a crash between a handler's side effect and the
//!   completion mark redelivers the job, so handlers must be idempotent
//! - Per-job serialization: a `Running` job is never claimable, so two
//!   attempts of the same job instance never overlap
//! - Bounded concurrency plus admission control on job starts (protects the
//!   downstream classifier from burst overload)
//!
//! ## Components
//!
//! - `Job` / `RetryPolicy`: the job abstraction and its failure policy
//! - `JobStore`: queue persistence (in-memory, or Redis behind the `redis`
//!   feature)
//! - `JobQueue`: thin producer facade (`enqueue`)
//! - `JobExecutor`: the worker pool, with a completion/failure event stream

pub mod executor;
pub mod queue;
#[cfg(feature = "redis")]
pub mod redis_store;
pub mod store;
pub mod types;

pub use executor::{
    ExecutorStats, JobExecutor, JobHandler, RateLimit, WorkerConfig, WorkerHandle,
};
pub use queue::JobQueue;
#[cfg(feature = "redis")]
pub use redis_store::RedisJobStore;
pub use store::{InMemoryJobStore, JobStore, JobStoreError, QueueStats};
pub use types::{Job, JobId, JobStatus, QueueEvent, RetryPolicy};
