//! # Event bus for broadcasting runtime events.
//!
//! [`Bus`] wraps [`tokio::sync::broadcast`] so that workers, daemons and the
//! supervisor can publish without blocking.
//!
//! ```text
//! Publishers (many):                  Listener (one):
//!   Worker 1 ──┐
//!   Worker N ──┼──────► Bus ───────► Supervisor listener ────► SubscriberSet
//!   Daemons  ──┤  (broadcast chan)
//!   Stop     ──┘
//! ```
//!
//! ## Rules
//! - `publish()` never blocks; events are dropped when nobody listens.
//! - A single ring buffer of `capacity` events is shared by all receivers.
//! - Slow receivers observe `RecvError::Lagged(n)` and skip `n` oldest items.

use tokio::sync::broadcast;

use super::event::Event;

/// Broadcast channel for runtime events. Cheap to clone.
#[derive(Clone, Debug)]
pub struct Bus {
    tx: broadcast::Sender<Event>,
}

impl Bus {
    /// Creates a new bus with the given channel capacity (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel::<Event>(capacity.max(1));
        Self { tx }
    }

    /// Publishes an event to all active receivers. Fire-and-forget.
    pub fn publish(&self, ev: Event) {
        let _ = self.tx.send(ev);
    }

    /// Creates a new receiver that observes events sent after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }
}
