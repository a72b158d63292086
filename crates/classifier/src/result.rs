//! Classifier error model and output validation.

use thiserror::Error;

use triagedesk_core::TriageOutcome;

/// Failure modes of a triage call. Everything here is surfaced to the job
/// queue as a handler error and retried up to the queue's ceiling.
#[derive(Debug, Error)]
pub enum ClassifierError {
    /// No API key configured; fatal for the worker path at startup.
    #[error("classifier API key is not set")]
    MissingApiKey,

    /// Network error or timeout reaching the model.
    #[error("classifier request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The model answered, but not with the contract we asked for.
    #[error("malformed classifier output: {0}")]
    Malformed(String),
}

/// Validate a model-produced outcome against the contract: sentiment in
/// 1..=10, non-empty draft. Enum fields are already constrained by parsing.
pub fn validate_outcome(outcome: &TriageOutcome) -> Result<(), ClassifierError> {
    if !(1..=10).contains(&outcome.sentiment) {
        return Err(ClassifierError::Malformed(format!(
            "sentiment {} outside 1..=10",
            outcome.sentiment
        )));
    }
    if outcome.draft.trim().is_empty() {
        return Err(ClassifierError::Malformed("empty draft reply".to_string()));
    }
    Ok(())
}
