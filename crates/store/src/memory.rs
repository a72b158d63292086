//! In-memory ticket store for tests/dev.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::Utc;

use triagedesk_core::{Ticket, TicketId, TicketStatus, TriageOutcome, Urgency};

use crate::query::{SortField, SortOrder, TicketPage, TicketQuery};
use crate::ticket_store::{NewTicket, StoreError, TicketPatch, TicketStore};

/// RwLock-backed map. Writers are serialized per store rather than per row,
/// which is stricter than the contract requires; fine for dev scale.
#[derive(Debug, Default)]
pub struct InMemoryTicketStore {
    tickets: RwLock<HashMap<TicketId, Ticket>>,
}

impl InMemoryTicketStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.tickets.read().expect("lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Rank by enum definition order so "desc" means most urgent first,
/// matching what the database does with its enum types.
fn urgency_rank(u: Option<Urgency>) -> u8 {
    match u {
        Some(Urgency::High) => 0,
        Some(Urgency::Medium) => 1,
        Some(Urgency::Low) => 2,
        None => 3,
    }
}

fn status_rank(s: TicketStatus) -> u8 {
    match s {
        TicketStatus::Pending => 0,
        TicketStatus::Processed => 1,
        TicketStatus::Resolved => 2,
        TicketStatus::Failed => 3,
    }
}

fn compare(a: &Ticket, b: &Ticket, field: SortField) -> Ordering {
    match field {
        SortField::CreatedAt => a.created_at.cmp(&b.created_at),
        SortField::Urgency => urgency_rank(a.urgency).cmp(&urgency_rank(b.urgency)),
        // Missing sentiment sorts after any present value.
        SortField::Sentiment => a
            .sentiment
            .map_or(i64::MAX, i64::from)
            .cmp(&b.sentiment.map_or(i64::MAX, i64::from)),
        SortField::Status => status_rank(a.status).cmp(&status_rank(b.status)),
    }
}

#[async_trait]
impl TicketStore for InMemoryTicketStore {
    async fn insert(&self, new: NewTicket) -> Result<Ticket, StoreError> {
        let ticket = Ticket::new(new.content, new.customer_email);
        let mut tickets = self.tickets.write().expect("lock poisoned");
        tickets.insert(ticket.id, ticket.clone());
        Ok(ticket)
    }

    async fn get(&self, id: TicketId) -> Result<Option<Ticket>, StoreError> {
        let tickets = self.tickets.read().expect("lock poisoned");
        Ok(tickets.get(&id).cloned())
    }

    async fn update(&self, id: TicketId, patch: TicketPatch) -> Result<Ticket, StoreError> {
        let mut tickets = self.tickets.write().expect("lock poisoned");
        let ticket = tickets.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        if let Some(status) = patch.status {
            ticket.status = status;
        }
        if let Some(draft) = patch.ai_draft {
            ticket.ai_draft = Some(draft);
        }
        ticket.updated_at = Utc::now();
        Ok(ticket.clone())
    }

    async fn apply_triage(
        &self,
        id: TicketId,
        outcome: &TriageOutcome,
    ) -> Result<Ticket, StoreError> {
        let mut tickets = self.tickets.write().expect("lock poisoned");
        let ticket = tickets.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        ticket.apply_triage(outcome);
        Ok(ticket.clone())
    }

    async fn mark_failed(&self, id: TicketId) -> Result<(), StoreError> {
        let mut tickets = self.tickets.write().expect("lock poisoned");
        let ticket = tickets.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        ticket.status = TicketStatus::Failed;
        ticket.updated_at = Utc::now();
        Ok(())
    }

    async fn list(&self, query: TicketQuery) -> Result<TicketPage, StoreError> {
        let tickets = self.tickets.read().expect("lock poisoned");

        let mut matching: Vec<Ticket> = tickets
            .values()
            .filter(|t| query.status.is_none_or(|s| t.status == s))
            .filter(|t| query.urgency.is_none_or(|u| t.urgency == Some(u)))
            .cloned()
            .collect();

        matching.sort_by(|a, b| {
            let ord = compare(a, b, query.sort_by);
            match query.sort_order {
                SortOrder::Asc => ord,
                SortOrder::Desc => ord.reverse(),
            }
        });

        let total = matching.len() as u64;
        let page: Vec<Ticket> = matching
            .into_iter()
            .skip(query.offset() as usize)
            .take(query.limit as usize)
            .collect();

        Ok(TicketPage::new(page, total, &query))
    }
}
