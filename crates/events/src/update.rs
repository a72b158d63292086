//! Client-visible update events.

use serde::{Deserialize, Serialize};

use triagedesk_core::TicketId;

/// What happened to the ticket.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateKind {
    /// Ticket row was created (synchronous, gateway path).
    Created,
    /// Classification completed and the row was overwritten.
    Processed,
    /// A client PATCH changed the row.
    Updated,
    /// Classification retries were exhausted; row degraded to FAILED.
    Failed,
}

/// Transient notification broadcast to connected clients. Not persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateEvent {
    pub id: TicketId,
    #[serde(rename = "type")]
    pub kind: UpdateKind,
    /// Failure reason, present only for `Failed`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl UpdateEvent {
    pub fn new(id: TicketId, kind: UpdateKind) -> Self {
        Self {
            id,
            kind,
            reason: None,
        }
    }

    pub fn failed(id: TicketId, reason: impl Into<String>) -> Self {
        Self {
            id,
            kind: UpdateKind::Failed,
            reason: Some(reason.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_shape_matches_clients() {
        let ev = UpdateEvent::new(TicketId::new(), UpdateKind::Processed);
        let v = serde_json::to_value(&ev).unwrap();
        assert_eq!(v["type"], "processed");
        assert!(v.get("reason").is_none());

        let ev = UpdateEvent::failed(TicketId::new(), "classifier timeout");
        let v = serde_json::to_value(&ev).unwrap();
        assert_eq!(v["type"], "failed");
        assert_eq!(v["reason"], "classifier timeout");
    }
}
