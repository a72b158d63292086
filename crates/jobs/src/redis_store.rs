//! Redis-backed job store (feature `redis`).
//!
//! Layout:
//! - `jobs:data`: hash of job id to serialized job (all statuses)
//! - `jobs:{queue}:ready`: list of job ids ready to run (FIFO)
//! - `jobs:{queue}:delayed`: zset of job ids scored by ready-at millis
//! - `jobs:{queue}:dead`: list of dead-lettered job ids
//!
//! Promotion of due delayed jobs happens lazily inside `claim_next`. The
//! promote-then-pop sequence is not a single atomic step, which is fine for
//! one worker pool per queue (the deployment shape here); a multi-pool
//! deployment would want a Lua script for the claim.

use async_trait::async_trait;
use chrono::Utc;
use redis::AsyncCommands;
use redis::aio::MultiplexedConnection;

use crate::store::{JobStore, JobStoreError, QueueStats};
use crate::types::{Job, JobId, JobStatus};

const DATA_KEY: &str = "jobs:data";

pub struct RedisJobStore {
    conn: MultiplexedConnection,
}

impl RedisJobStore {
    /// Connect to Redis by URL (`redis://host:port`).
    pub async fn connect(url: &str) -> Result<Self, JobStoreError> {
        let client = redis::Client::open(url).map_err(redis_err)?;
        let conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(redis_err)?;
        Ok(Self { conn })
    }

    fn conn(&self) -> MultiplexedConnection {
        self.conn.clone()
    }
}

fn redis_err(e: redis::RedisError) -> JobStoreError {
    JobStoreError::Storage(e.to_string())
}

fn codec_err(e: serde_json::Error) -> JobStoreError {
    JobStoreError::Storage(format!("job codec: {e}"))
}

fn ready_key(queue: &str) -> String {
    format!("jobs:{queue}:ready")
}

fn delayed_key(queue: &str) -> String {
    format!("jobs:{queue}:delayed")
}

fn dead_key(queue: &str) -> String {
    format!("jobs:{queue}:dead")
}

async fn put_job(conn: &mut MultiplexedConnection, job: &Job) -> Result<(), JobStoreError> {
    let raw = serde_json::to_string(job).map_err(codec_err)?;
    let _: () = conn
        .hset(DATA_KEY, job.id.to_string(), raw)
        .await
        .map_err(redis_err)?;
    Ok(())
}

async fn fetch_job(
    conn: &mut MultiplexedConnection,
    id: &str,
) -> Result<Option<Job>, JobStoreError> {
    let raw: Option<String> = conn.hget(DATA_KEY, id).await.map_err(redis_err)?;
    raw.map(|r| serde_json::from_str(&r).map_err(codec_err))
        .transpose()
}

/// Move due delayed jobs onto the ready list.
async fn promote_due(
    conn: &mut MultiplexedConnection,
    queue: &str,
) -> Result<(), JobStoreError> {
    let now_ms = Utc::now().timestamp_millis();
    let due: Vec<String> = conn
        .zrangebyscore_limit(delayed_key(queue), "-inf", now_ms, 0, 64)
        .await
        .map_err(redis_err)?;

    for id in due {
        let _: () = conn
            .zrem(delayed_key(queue), &id)
            .await
            .map_err(redis_err)?;
        let _: () = conn
            .rpush(ready_key(queue), &id)
            .await
            .map_err(redis_err)?;
    }
    Ok(())
}

#[async_trait]
impl JobStore for RedisJobStore {
    async fn enqueue(&self, job: Job) -> Result<JobId, JobStoreError> {
        let mut conn = self.conn();
        let id = job.id;

        let exists: bool = conn
            .hexists(DATA_KEY, id.to_string())
            .await
            .map_err(redis_err)?;
        if exists {
            return Err(JobStoreError::AlreadyExists(id));
        }

        put_job(&mut conn, &job).await?;
        let _: () = conn
            .rpush(ready_key(&job.queue), id.to_string())
            .await
            .map_err(redis_err)?;
        Ok(id)
    }

    async fn get(&self, job_id: JobId) -> Result<Option<Job>, JobStoreError> {
        let mut conn = self.conn();
        fetch_job(&mut conn, &job_id.to_string()).await
    }

    async fn update(&self, job: &Job) -> Result<(), JobStoreError> {
        let mut conn = self.conn();

        let exists: bool = conn
            .hexists(DATA_KEY, job.id.to_string())
            .await
            .map_err(redis_err)?;
        if !exists {
            return Err(JobStoreError::NotFound(job.id));
        }

        put_job(&mut conn, job).await?;

        // Requeue according to the new status: retriable failures go to
        // the delayed set (backoff), a released claim goes straight back
        // to the ready list.
        match &job.status {
            JobStatus::Failed { .. } => {
                let ready_at = job
                    .scheduled_at
                    .map_or_else(|| Utc::now().timestamp_millis(), |t| t.timestamp_millis());
                let _: () = conn
                    .zadd(delayed_key(&job.queue), job.id.to_string(), ready_at)
                    .await
                    .map_err(redis_err)?;
            }
            JobStatus::Pending => {
                let _: () = conn
                    .rpush(ready_key(&job.queue), job.id.to_string())
                    .await
                    .map_err(redis_err)?;
            }
            _ => {}
        }
        Ok(())
    }

    async fn claim_next(&self, queue: &str) -> Result<Option<Job>, JobStoreError> {
        let mut conn = self.conn();
        promote_due(&mut conn, queue).await?;

        loop {
            let id: Option<String> = conn
                .lpop(ready_key(queue), None)
                .await
                .map_err(redis_err)?;
            let id = match id {
                Some(id) => id,
                None => return Ok(None),
            };

            // A stale list entry (job mutated since listing) is skipped.
            let mut job = match fetch_job(&mut conn, &id).await? {
                Some(job) if job.status.is_claimable() && job.is_ready() => job,
                _ => continue,
            };

            job.mark_running();
            put_job(&mut conn, &job).await?;
            return Ok(Some(job));
        }
    }

    async fn dead_letter(&self, mut job: Job, reason: String) -> Result<(), JobStoreError> {
        let mut conn = self.conn();

        if !matches!(job.status, JobStatus::DeadLettered { .. }) {
            job.status = JobStatus::DeadLettered {
                error: reason,
                attempts: job.attempt,
            };
        }
        job.updated_at = Utc::now();

        put_job(&mut conn, &job).await?;
        let _: () = conn
            .rpush(dead_key(&job.queue), job.id.to_string())
            .await
            .map_err(redis_err)?;
        Ok(())
    }

    async fn list_dead_letters(&self, queue: &str, limit: usize) -> Result<Vec<Job>, JobStoreError> {
        let mut conn = self.conn();
        let ids: Vec<String> = conn
            .lrange(dead_key(queue), 0, limit.saturating_sub(1) as isize)
            .await
            .map_err(redis_err)?;

        let mut jobs = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(job) = fetch_job(&mut conn, &id).await? {
                jobs.push(job);
            }
        }
        Ok(jobs)
    }

    async fn stats(&self, queue: &str) -> Result<QueueStats, JobStoreError> {
        let mut conn = self.conn();

        // Full scan of the data hash; acceptable at triage-queue scale.
        let raws: Vec<String> = conn.hvals(DATA_KEY).await.map_err(redis_err)?;

        let mut stats = QueueStats::default();
        for raw in raws {
            let job: Job = serde_json::from_str(&raw).map_err(codec_err)?;
            if job.queue != queue {
                continue;
            }
            match &job.status {
                JobStatus::Pending => stats.pending += 1,
                JobStatus::Running => stats.running += 1,
                JobStatus::Completed => stats.completed += 1,
                JobStatus::Failed { .. } => stats.failed += 1,
                JobStatus::DeadLettered { .. } => stats.dead_lettered += 1,
            }
        }
        Ok(stats)
    }
}
