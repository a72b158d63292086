//! The classifier contract.

use async_trait::async_trait;

use triagedesk_core::TriageOutcome;

use crate::result::ClassifierError;

/// Opaque remote triage function: ticket text in, full classifier-owned
/// field set out. Implementations suspend for a network round trip and
/// surface every failure mode as [`ClassifierError`].
#[async_trait]
pub trait Classifier: Send + Sync {
    async fn triage(&self, content: &str) -> Result<TriageOutcome, ClassifierError>;
}
