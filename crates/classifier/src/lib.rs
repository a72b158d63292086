//! `triagedesk-classifier`
//!
//! **Responsibility:** the external AI boundary.
//!
//! This crate is intentionally **not** part of the domain model:
//! - It must not depend on stores or queues.
//! - It must not mutate ticket state.
//! - It turns free text into a [`TriageOutcome`], or fails and lets the
//!   caller's retry machinery take over.

pub mod gemini;
pub mod result;
#[cfg(any(test, feature = "test-util"))]
pub mod scripted;
pub mod traits;

pub use gemini::GeminiClassifier;
pub use result::ClassifierError;
#[cfg(any(test, feature = "test-util"))]
pub use scripted::{Script, ScriptedClassifier};
pub use traits::Classifier;

/// Re-exported so callers name one crate for the classifier contract.
pub use triagedesk_core::TriageOutcome;
