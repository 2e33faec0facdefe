//! Runtime events: types and broadcast bus.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `Supervisor` (registration, shutdown milestones), workers
//!   (task lifecycle, crashes), daemon contexts (rate limits), `SubscriberSet`
//!   workers (overflow/panic).
//! - **Consumer**: the supervisor listener, which fans out to the `SubscriberSet`.

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
