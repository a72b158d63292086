//! `triagedesk-core` — domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns):
//! the ticket entity, its enums, input validation, and the domain error model.

pub mod error;
pub mod id;
pub mod ticket;
pub mod validate;

pub use error::{DomainError, DomainResult, FieldError};
pub use id::TicketId;
pub use ticket::{Category, Ticket, TicketStatus, TriageOutcome, Urgency};
pub use validate::{validate_content, validate_email, validate_new_ticket};
