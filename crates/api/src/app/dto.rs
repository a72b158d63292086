//! Request DTOs and query-parameter parsing.

use serde::Deserialize;

use triagedesk_core::{TicketStatus, Urgency};
use triagedesk_store::{SortField, SortOrder, TicketQuery};

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTicketRequest {
    pub content: String,
    #[serde(default)]
    pub customer_email: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTicketRequest {
    /// Status as a raw string; validated against the enum in the handler
    /// so a bad value yields a structured 400, not a serde reject.
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub ai_draft: Option<String>,
}

// -------------------------
// Listing query parameters
// -------------------------

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ListTicketsParams {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub urgency: Option<String>,
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub limit: Option<u32>,
    #[serde(default)]
    pub sort_by: Option<String>,
    #[serde(default)]
    pub sort_order: Option<String>,
}

/// Errors from filter parsing; sort parameters are lenient (fall back to
/// defaults) but an unknown filter value would silently return the wrong
/// rows, so it is rejected.
#[derive(Debug)]
pub struct BadFilter(pub String);

impl ListTicketsParams {
    pub fn into_query(self) -> Result<TicketQuery, BadFilter> {
        let status = match self.status.as_deref() {
            None | Some("ALL") | Some("") => None,
            Some(raw) => Some(
                TicketStatus::parse(raw).ok_or_else(|| BadFilter(format!("unknown status: {raw}")))?,
            ),
        };
        let urgency = match self.urgency.as_deref() {
            None | Some("ALL") | Some("") => None,
            Some(raw) => Some(
                Urgency::parse(raw).ok_or_else(|| BadFilter(format!("unknown urgency: {raw}")))?,
            ),
        };

        Ok(TicketQuery {
            status,
            urgency,
            page: self.page.unwrap_or(1).max(1),
            limit: self.limit.unwrap_or(10).max(1),
            sort_by: self
                .sort_by
                .as_deref()
                .map_or(SortField::CreatedAt, SortField::parse_or_default),
            sort_order: self
                .sort_order
                .as_deref()
                .map_or(SortOrder::Desc, SortOrder::parse_or_default),
        })
    }
}
