//! Listing query types: filter, sort allow-list, pagination.

use serde::Serialize;

use triagedesk_core::{Ticket, TicketStatus, Urgency};

/// Sortable columns. Anything outside this allow-list falls back to
/// `CreatedAt` rather than reaching the database.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SortField {
    CreatedAt,
    Urgency,
    Sentiment,
    Status,
}

impl SortField {
    /// Parse a client-supplied `sortBy`; unknown values fall back to
    /// `CreatedAt` (matches the dashboard's lenient contract).
    pub fn parse_or_default(s: &str) -> Self {
        match s {
            "createdAt" => Self::CreatedAt,
            "urgency" => Self::Urgency,
            "sentiment" => Self::Sentiment,
            "status" => Self::Status,
            _ => Self::CreatedAt,
        }
    }

    #[cfg(feature = "postgres")]
    pub(crate) fn column(&self) -> &'static str {
        match self {
            Self::CreatedAt => "created_at",
            Self::Urgency => "urgency",
            Self::Sentiment => "sentiment",
            Self::Status => "status",
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    /// Anything other than `asc` sorts descending.
    pub fn parse_or_default(s: &str) -> Self {
        if s == "asc" { Self::Asc } else { Self::Desc }
    }
}

/// Listing parameters. `status`/`urgency` of `None` mean no filter
/// (the gateway maps the literal `"ALL"` to `None`).
#[derive(Debug, Clone)]
pub struct TicketQuery {
    pub status: Option<TicketStatus>,
    pub urgency: Option<Urgency>,
    pub page: u32,
    pub limit: u32,
    pub sort_by: SortField,
    pub sort_order: SortOrder,
}

impl Default for TicketQuery {
    fn default() -> Self {
        Self {
            status: None,
            urgency: None,
            page: 1,
            limit: 10,
            sort_by: SortField::CreatedAt,
            sort_order: SortOrder::Desc,
        }
    }
}

impl TicketQuery {
    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.limit)
    }
}

/// One page of listing results.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketPage {
    pub tickets: Vec<Ticket>,
    pub total: u64,
    pub pages: u64,
    pub current_page: u32,
}

impl TicketPage {
    pub fn new(tickets: Vec<Ticket>, total: u64, query: &TicketQuery) -> Self {
        let pages = if query.limit == 0 {
            0
        } else {
            total.div_ceil(u64::from(query.limit))
        };
        Self {
            tickets,
            total,
            pages,
            current_page: query.page,
        }
    }
}
