//! # Event subscriber trait.
//!
//! [`Subscribe`] is the extension point for observing the runtime: logging,
//! metrics export, alerting. It plays the role of the runtime's logger; a
//! supervisor without subscribers simply drops its events.
//!
//! Each subscriber gets:
//! - a **dedicated worker task**,
//! - a **bounded queue** (capacity via [`Subscribe::queue_capacity`]),
//! - **panic isolation** (panics are reported as `EventKind::SubscriberPanicked`).
//!
//! ## Example
//! ```rust
//! use std::sync::atomic::{AtomicU64, Ordering};
//! use async_trait::async_trait;
//! use daemonvisor::{Event, EventKind, Subscribe};
//!
//! #[derive(Default)]
//! struct PanicCounter(AtomicU64);
//!
//! #[async_trait]
//! impl Subscribe for PanicCounter {
//!     async fn on_event(&self, ev: &Event) {
//!         if matches!(ev.kind, EventKind::TaskFailed) {
//!             self.0.fetch_add(1, Ordering::Relaxed);
//!         }
//!     }
//!
//!     fn name(&self) -> &'static str { "panic-counter" }
//! }
//! ```

use async_trait::async_trait;

use crate::events::Event;

/// Observer of supervisor events.
///
/// A slow subscriber only fills its own queue; once full, further events are
/// dropped for it and reported as `SubscriberOverflow`.
#[async_trait]
pub trait Subscribe: Send + Sync + 'static {
    /// Called for every event, in publication order.
    async fn on_event(&self, event: &Event);

    /// Short name shown in overflow and panic reports.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Capacity of this subscriber's queue (at least 1).
    fn queue_capacity(&self) -> usize {
        1024
    }
}
