//! Infrastructure wiring: store, queue, broadcast channel.
//!
//! Services are built once in `main` (or a test harness) and passed down
//! as an `Extension`; there are no process-global singletons.

use std::sync::Arc;

use triagedesk_events::Broadcaster;
use triagedesk_jobs::{InMemoryJobStore, JobQueue, JobStore};
use triagedesk_store::{InMemoryTicketStore, TicketStore};

use crate::config::AppConfig;

/// Queue name consumed by the triage worker pool.
pub const TRIAGE_QUEUE: &str = "ticket-triage";

/// Shared application services.
pub struct AppServices {
    pub tickets: Arc<dyn TicketStore>,
    pub queue: JobQueue,
    pub realtime: Broadcaster,
}

impl AppServices {
    pub fn new(tickets: Arc<dyn TicketStore>, job_store: Arc<dyn JobStore>) -> Self {
        Self {
            tickets,
            queue: JobQueue::new(job_store),
            realtime: Broadcaster::new(),
        }
    }

    /// Fully in-memory wiring (dev and tests).
    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(InMemoryTicketStore::new()),
            Arc::new(InMemoryJobStore::new()),
        )
    }
}

/// Build services according to configuration: Postgres/Redis when
/// configured (and compiled in), in-memory otherwise.
pub async fn build_services(config: &AppConfig) -> anyhow::Result<AppServices> {
    let tickets: Arc<dyn TicketStore> = match &config.database_url {
        #[cfg(feature = "postgres")]
        Some(url) => {
            tracing::info!("using postgres ticket store");
            Arc::new(triagedesk_store::PostgresTicketStore::connect(url).await?)
        }
        #[cfg(not(feature = "postgres"))]
        Some(_) => {
            anyhow::bail!("DATABASE_URL is set but this build lacks the `postgres` feature")
        }
        None => {
            tracing::info!("using in-memory ticket store");
            Arc::new(InMemoryTicketStore::new())
        }
    };

    let job_store: Arc<dyn JobStore> = match &config.redis_url {
        #[cfg(feature = "redis")]
        Some(url) => {
            tracing::info!("using redis job store");
            Arc::new(triagedesk_jobs::RedisJobStore::connect(url).await?)
        }
        #[cfg(not(feature = "redis"))]
        Some(_) => {
            anyhow::bail!("REDIS_URL is set but this build lacks the `redis` feature")
        }
        None => {
            tracing::info!("using in-memory job store");
            Arc::new(InMemoryJobStore::new())
        }
    };

    Ok(AppServices::new(tickets, job_store))
}
