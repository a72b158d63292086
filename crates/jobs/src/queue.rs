//! Producer-side facade over a job store.

use std::sync::Arc;

use crate::store::{JobStore, JobStoreError};
use crate::types::{Job, JobId, RetryPolicy};

/// Cheap-to-clone enqueue handle handed to producers (the API gateway).
///
/// Constructed once at startup and passed down; producers never touch the
/// store or executor directly.
#[derive(Clone)]
pub struct JobQueue {
    store: Arc<dyn JobStore>,
    retry_policy: RetryPolicy,
}

impl JobQueue {
    pub fn new(store: Arc<dyn JobStore>) -> Self {
        Self {
            store,
            retry_policy: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    /// Append a durable job to `queue`.
    pub async fn enqueue(
        &self,
        queue: &str,
        payload: serde_json::Value,
    ) -> Result<JobId, JobStoreError> {
        let job = Job::new(queue, payload).with_retry_policy(self.retry_policy.clone());
        let id = self.store.enqueue(job).await?;
        tracing::debug!(job_id = %id, queue, "job enqueued");
        Ok(id)
    }

    pub fn store(&self) -> Arc<dyn JobStore> {
        self.store.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryJobStore;

    #[tokio::test]
    async fn enqueue_applies_configured_policy() {
        let store = Arc::new(InMemoryJobStore::new());
        let queue = JobQueue::new(store.clone()).with_retry_policy(RetryPolicy::no_retry());

        let id = queue
            .enqueue("ticket-triage", serde_json::json!({"ticketId": "x"}))
            .await
            .unwrap();

        let job = store.get(id).await.unwrap().unwrap();
        assert_eq!(job.queue, "ticket-triage");
        assert_eq!(job.retry_policy.max_attempts, 1);
    }
}
