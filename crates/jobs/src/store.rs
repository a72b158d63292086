//! Job storage implementations.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::Utc;

use crate::types::{Job, JobId, JobStatus};

/// Job store error.
#[derive(Debug, Clone, thiserror::Error)]
pub enum JobStoreError {
    #[error("job not found: {0}")]
    NotFound(JobId),
    #[error("job already exists: {0}")]
    AlreadyExists(JobId),
    #[error("storage error: {0}")]
    Storage(String),
}

/// Queue statistics.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct QueueStats {
    pub pending: usize,
    pub running: usize,
    pub completed: usize,
    pub failed: usize,
    pub dead_lettered: usize,
}

/// Job store abstraction.
///
/// `claim_next` is the serialization point: it must atomically transition
/// the oldest ready claimable job to `Running`, so two workers (or two
/// retries) never hold the same job instance concurrently.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Append a new job to its queue.
    async fn enqueue(&self, job: Job) -> Result<JobId, JobStoreError>;

    /// Get a job by ID.
    async fn get(&self, job_id: JobId) -> Result<Option<Job>, JobStoreError>;

    /// Persist an updated job.
    async fn update(&self, job: &Job) -> Result<(), JobStoreError>;

    /// Claim the next ready job on `queue` (oldest first), marking it
    /// `Running`. Returns `None` when nothing is ready.
    async fn claim_next(&self, queue: &str) -> Result<Option<Job>, JobStoreError>;

    /// Record a terminally-failed job.
    async fn dead_letter(&self, job: Job, reason: String) -> Result<(), JobStoreError>;

    /// List terminally-failed jobs on `queue`, oldest first.
    async fn list_dead_letters(&self, queue: &str, limit: usize) -> Result<Vec<Job>, JobStoreError>;

    /// Per-queue statistics.
    async fn stats(&self, queue: &str) -> Result<QueueStats, JobStoreError>;
}

/// In-memory job store for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryJobStore {
    jobs: RwLock<HashMap<JobId, Job>>,
    dead_letters: RwLock<HashMap<JobId, Job>>,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JobStore for InMemoryJobStore {
    async fn enqueue(&self, job: Job) -> Result<JobId, JobStoreError> {
        let mut jobs = self.jobs.write().expect("lock poisoned");
        if jobs.contains_key(&job.id) {
            return Err(JobStoreError::AlreadyExists(job.id));
        }
        let id = job.id;
        jobs.insert(id, job);
        Ok(id)
    }

    async fn get(&self, job_id: JobId) -> Result<Option<Job>, JobStoreError> {
        let jobs = self.jobs.read().expect("lock poisoned");
        match jobs.get(&job_id) {
            Some(job) => Ok(Some(job.clone())),
            None => Ok(self
                .dead_letters
                .read()
                .expect("lock poisoned")
                .get(&job_id)
                .cloned()),
        }
    }

    async fn update(&self, job: &Job) -> Result<(), JobStoreError> {
        let mut jobs = self.jobs.write().expect("lock poisoned");
        if !jobs.contains_key(&job.id) {
            return Err(JobStoreError::NotFound(job.id));
        }
        jobs.insert(job.id, job.clone());
        Ok(())
    }

    async fn claim_next(&self, queue: &str) -> Result<Option<Job>, JobStoreError> {
        let mut jobs = self.jobs.write().expect("lock poisoned");

        // Oldest ready claimable job on this queue; FIFO by creation time.
        let candidate = jobs
            .values()
            .filter(|j| j.queue == queue && j.status.is_claimable() && j.is_ready())
            .min_by_key(|j| j.created_at)
            .map(|j| j.id);

        if let Some(job_id) = candidate {
            if let Some(job) = jobs.get_mut(&job_id) {
                job.mark_running();
                return Ok(Some(job.clone()));
            }
        }

        Ok(None)
    }

    async fn dead_letter(&self, mut job: Job, reason: String) -> Result<(), JobStoreError> {
        let mut jobs = self.jobs.write().expect("lock poisoned");
        let mut dls = self.dead_letters.write().expect("lock poisoned");

        if !matches!(job.status, JobStatus::DeadLettered { .. }) {
            job.status = JobStatus::DeadLettered {
                error: reason,
                attempts: job.attempt,
            };
        }
        job.updated_at = Utc::now();

        jobs.remove(&job.id);
        dls.insert(job.id, job);
        Ok(())
    }

    async fn list_dead_letters(&self, queue: &str, limit: usize) -> Result<Vec<Job>, JobStoreError> {
        let dls = self.dead_letters.read().expect("lock poisoned");
        let mut result: Vec<_> = dls.values().filter(|j| j.queue == queue).cloned().collect();
        result.sort_by_key(|j| j.updated_at);
        result.truncate(limit);
        Ok(result)
    }

    async fn stats(&self, queue: &str) -> Result<QueueStats, JobStoreError> {
        let jobs = self.jobs.read().expect("lock poisoned");
        let dls = self.dead_letters.read().expect("lock poisoned");

        let mut stats = QueueStats::default();
        for job in jobs.values().filter(|j| j.queue == queue) {
            match &job.status {
                JobStatus::Pending => stats.pending += 1,
                JobStatus::Running => stats.running += 1,
                JobStatus::Completed => stats.completed += 1,
                JobStatus::Failed { .. } => stats.failed += 1,
                JobStatus::DeadLettered { .. } => stats.dead_lettered += 1,
            }
        }
        stats.dead_lettered += dls.values().filter(|j| j.queue == queue).count();

        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RetryPolicy;
    use std::time::Duration;

    #[tokio::test]
    async fn enqueue_and_claim_fifo() {
        let store = InMemoryJobStore::new();

        let first = Job::new("ticket-triage", serde_json::json!({"n": 1}));
        let second = Job::new("ticket-triage", serde_json::json!({"n": 2}));
        let first_id = store.enqueue(first).await.unwrap();
        let second_id = store.enqueue(second).await.unwrap();

        let claimed = store.claim_next("ticket-triage").await.unwrap().unwrap();
        assert_eq!(claimed.id, first_id);
        assert!(matches!(claimed.status, JobStatus::Running));
        assert_eq!(claimed.attempt, 1);

        let claimed = store.claim_next("ticket-triage").await.unwrap().unwrap();
        assert_eq!(claimed.id, second_id);

        assert!(store.claim_next("ticket-triage").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn running_jobs_are_not_reclaimable() {
        let store = InMemoryJobStore::new();
        store
            .enqueue(Job::new("ticket-triage", serde_json::json!({})))
            .await
            .unwrap();

        let claimed = store.claim_next("ticket-triage").await.unwrap();
        assert!(claimed.is_some());
        // Same job instance must never be delivered twice concurrently.
        assert!(store.claim_next("ticket-triage").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn queues_are_isolated() {
        let store = InMemoryJobStore::new();
        store
            .enqueue(Job::new("ticket-triage", serde_json::json!({})))
            .await
            .unwrap();

        assert!(store.claim_next("other-queue").await.unwrap().is_none());
        assert!(store.claim_next("ticket-triage").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn backoff_delays_reclaim() {
        let store = InMemoryJobStore::new();
        let job = Job::new("ticket-triage", serde_json::json!({}))
            .with_retry_policy(RetryPolicy::fixed(3, Duration::from_secs(60)));
        store.enqueue(job).await.unwrap();

        let mut claimed = store.claim_next("ticket-triage").await.unwrap().unwrap();
        claimed.mark_failed("boom".to_string(), Utc::now());
        store.update(&claimed).await.unwrap();

        // Backoff of 60s: not ready yet.
        assert!(store.claim_next("ticket-triage").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn dead_letter_flow() {
        let store = InMemoryJobStore::new();
        let job = Job::new("ticket-triage", serde_json::json!({}));
        let job_id = job.id;
        store.enqueue(job).await.unwrap();

        let mut claimed = store.claim_next("ticket-triage").await.unwrap().unwrap();
        claimed.mark_failed("boom".to_string(), Utc::now());
        store
            .dead_letter(claimed, "max retries exceeded".to_string())
            .await
            .unwrap();

        assert!(store.claim_next("ticket-triage").await.unwrap().is_none());

        let dls = store.list_dead_letters("ticket-triage", 10).await.unwrap();
        assert_eq!(dls.len(), 1);
        assert_eq!(dls[0].id, job_id);

        let stats = store.stats("ticket-triage").await.unwrap();
        assert_eq!(stats.dead_lettered, 1);
        assert_eq!(stats.pending, 0);
    }

    #[tokio::test]
    async fn stats_tracking() {
        let store = InMemoryJobStore::new();
        for i in 0..5 {
            store
                .enqueue(Job::new("ticket-triage", serde_json::json!({ "i": i })))
                .await
                .unwrap();
        }

        store.claim_next("ticket-triage").await.unwrap();
        store.claim_next("ticket-triage").await.unwrap();

        let stats = store.stats("ticket-triage").await.unwrap();
        assert_eq!(stats.pending, 3);
        assert_eq!(stats.running, 2);
    }
}
