//! The `TicketStore` trait and its companion types.

use async_trait::async_trait;

use triagedesk_core::{Ticket, TicketId, TicketStatus, TriageOutcome};

use crate::query::{TicketPage, TicketQuery};

/// Store-level error.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("ticket not found: {0}")]
    NotFound(TicketId),
    #[error("database error: {0}")]
    Database(String),
}

/// Inputs for ticket creation. The store assigns id, status, and timestamps.
#[derive(Debug, Clone)]
pub struct NewTicket {
    pub content: String,
    pub customer_email: Option<String>,
}

/// Partial update from a client PATCH. Absent fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct TicketPatch {
    pub status: Option<TicketStatus>,
    pub ai_draft: Option<String>,
}

/// Persistent ticket storage.
///
/// Concurrent writers are serialized per row by the implementation;
/// last write wins, no optimistic locking.
#[async_trait]
pub trait TicketStore: Send + Sync {
    /// Insert a new ticket (status `Pending`, classifier fields absent).
    async fn insert(&self, new: NewTicket) -> Result<Ticket, StoreError>;

    /// Fetch a ticket by id.
    async fn get(&self, id: TicketId) -> Result<Option<Ticket>, StoreError>;

    /// Apply a client patch. Bumps `updated_at`.
    async fn update(&self, id: TicketId, patch: TicketPatch) -> Result<Ticket, StoreError>;

    /// Overwrite the classifier-owned fields and set status `Processed`,
    /// in one write keyed by id. Idempotent for a fixed outcome.
    async fn apply_triage(
        &self,
        id: TicketId,
        outcome: &TriageOutcome,
    ) -> Result<Ticket, StoreError>;

    /// Degrade the ticket to `Failed` (exhausted classification retries).
    async fn mark_failed(&self, id: TicketId) -> Result<(), StoreError>;

    /// Filtered, sorted, paginated listing.
    async fn list(&self, query: TicketQuery) -> Result<TicketPage, StoreError>;
}
