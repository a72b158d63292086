//! `triagedesk-store` — persistence boundary for tickets.
//!
//! The store is the single source of truth for ticket state. Everything
//! else (queue events, broadcast notifications) is derived and lossy.
//!
//! Two implementations:
//! - [`InMemoryTicketStore`] for tests and dev.
//! - `PostgresTicketStore` (feature `postgres`) for real deployments; the
//!   table schema ships as `schema.sql`.

pub mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;
pub mod query;
pub mod ticket_store;

pub use memory::InMemoryTicketStore;
#[cfg(feature = "postgres")]
pub use postgres::PostgresTicketStore;
pub use query::{SortField, SortOrder, TicketPage, TicketQuery};
pub use ticket_store::{NewTicket, StoreError, TicketPatch, TicketStore};
