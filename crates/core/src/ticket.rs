//! The ticket entity and its classifier-owned value types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::id::TicketId;

/// Lifecycle state of a ticket.
///
/// Transitions: `Pending → Processed → Resolved`, with `Processed ↔ Resolved`
/// reversible via explicit reopen, and `Pending → Failed` when classification
/// retries are exhausted. Explicit client updates may set any of the four
/// values directly and never go through the classifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TicketStatus {
    Pending,
    Processed,
    Resolved,
    Failed,
}

impl TicketStatus {
    /// Parse a client-supplied status string (PATCH input).
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(Self::Pending),
            "PROCESSED" => Some(Self::Processed),
            "RESOLVED" => Some(Self::Resolved),
            "FAILED" => Some(Self::Failed),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Processed => "PROCESSED",
            Self::Resolved => "RESOLVED",
            Self::Failed => "FAILED",
        }
    }
}

/// Classifier-assigned ticket category.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
    Billing,
    Technical,
    FeatureRequest,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Billing => "BILLING",
            Self::Technical => "TECHNICAL",
            Self::FeatureRequest => "FEATURE_REQUEST",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "BILLING" => Some(Self::Billing),
            "TECHNICAL" => Some(Self::Technical),
            "FEATURE_REQUEST" => Some(Self::FeatureRequest),
            _ => None,
        }
    }
}

/// Classifier-assigned urgency.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Urgency {
    High,
    Medium,
    Low,
}

impl Urgency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "HIGH",
            Self::Medium => "MEDIUM",
            Self::Low => "LOW",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "HIGH" => Some(Self::High),
            "MEDIUM" => Some(Self::Medium),
            "LOW" => Some(Self::Low),
            _ => None,
        }
    }
}

/// A support ticket.
///
/// Classifier-owned fields (`category`, `sentiment`, `urgency`, `ai_draft`)
/// are absent until a triage job completes, then overwritten as one unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticket {
    pub id: TicketId,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_email: Option<String>,
    pub status: TicketStatus,
    pub category: Option<Category>,
    /// Sentiment score in 1..=10 (1 = furious, 10 = delighted).
    pub sentiment: Option<i32>,
    pub urgency: Option<Urgency>,
    pub ai_draft: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Ticket {
    /// Create a fresh ticket. Always starts `Pending` with classifier
    /// fields absent.
    pub fn new(content: String, customer_email: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: TicketId::new(),
            content,
            customer_email,
            status: TicketStatus::Pending,
            category: None,
            sentiment: None,
            urgency: None,
            ai_draft: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply a triage outcome: full overwrite of the classifier-owned
    /// fields plus `status = Processed`.
    ///
    /// The overwrite is unconditional: repeated application with the same
    /// outcome is idempotent (at-least-once delivery), and a concurrent
    /// manual `Resolved` can be clobbered back to `Processed` (known race,
    /// see DESIGN.md).
    pub fn apply_triage(&mut self, outcome: &TriageOutcome) {
        self.status = TicketStatus::Processed;
        self.category = Some(outcome.category);
        self.sentiment = Some(outcome.sentiment);
        self.urgency = Some(outcome.urgency);
        self.ai_draft = Some(outcome.draft.clone());
        self.updated_at = Utc::now();
    }
}

/// The full set of classifier-owned fields, applied as one overwrite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriageOutcome {
    pub category: Category,
    pub sentiment: i32,
    pub urgency: Urgency,
    pub draft: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome() -> TriageOutcome {
        TriageOutcome {
            category: Category::Technical,
            sentiment: 4,
            urgency: Urgency::High,
            draft: "We're looking into it.".to_string(),
        }
    }

    #[test]
    fn new_ticket_is_pending_with_classifier_fields_absent() {
        let t = Ticket::new("My invoice is wrong".to_string(), None);
        assert_eq!(t.status, TicketStatus::Pending);
        assert!(t.category.is_none());
        assert!(t.sentiment.is_none());
        assert!(t.urgency.is_none());
        assert!(t.ai_draft.is_none());
    }

    #[test]
    fn apply_triage_twice_is_idempotent() {
        let mut t = Ticket::new("App crashes on login every time".to_string(), None);
        t.apply_triage(&outcome());
        let once = t.clone();
        t.apply_triage(&outcome());
        assert_eq!(t.status, once.status);
        assert_eq!(t.category, once.category);
        assert_eq!(t.sentiment, once.sentiment);
        assert_eq!(t.urgency, once.urgency);
        assert_eq!(t.ai_draft, once.ai_draft);
    }

    #[test]
    fn apply_triage_overwrites_resolved() {
        // Documents the completion-path race: the classifier path sets
        // Processed unconditionally, even over a manual Resolved.
        let mut t = Ticket::new("Please add dark mode to the app".to_string(), None);
        t.status = TicketStatus::Resolved;
        t.apply_triage(&outcome());
        assert_eq!(t.status, TicketStatus::Processed);
    }

    #[test]
    fn status_serializes_screaming_snake() {
        let json = serde_json::to_string(&TicketStatus::Pending).unwrap();
        assert_eq!(json, "\"PENDING\"");
        assert_eq!(
            serde_json::to_string(&Category::FeatureRequest).unwrap(),
            "\"FEATURE_REQUEST\""
        );
    }

    #[test]
    fn status_parse_rejects_unknown() {
        assert_eq!(TicketStatus::parse("RESOLVED"), Some(TicketStatus::Resolved));
        assert_eq!(TicketStatus::parse("INVALID_STATUS"), None);
        assert_eq!(TicketStatus::parse("resolved"), None);
    }

    #[test]
    fn ticket_json_uses_camel_case() {
        let t = Ticket::new("Charged twice for one seat".to_string(), Some("a@b.co".into()));
        let v = serde_json::to_value(&t).unwrap();
        assert!(v.get("customerEmail").is_some());
        assert!(v.get("aiDraft").is_some());
        assert!(v.get("createdAt").is_some());
        assert!(v.get("customer_email").is_none());
    }
}
