//! `triagedesk-events` — client notification fan-out.
//!
//! A lossy broadcast channel that turns ticket lifecycle moments into
//! events for connected dashboard clients.
//!
//! ## Delivery semantics
//!
//! - **Fire-and-forget**: publishing never fails and never blocks; with no
//!   subscribers the event is dropped.
//! - **No replay**: late subscribers miss earlier events; lagging
//!   subscribers lose the oldest buffered events.
//! - **Not the source of truth**: the ticket store is. Clients poll for
//!   correctness; this channel only shaves latency.

pub mod broadcast;
pub mod update;

pub use broadcast::Broadcaster;
pub use update::{UpdateEvent, UpdateKind};
