//! Message backend seams.
//!
//! The runtime does not own a transport. A daemon's `subscribe` pulls
//! payloads from a [`Subscriber`] and its `publish` pushes them to a
//! [`Publisher`]; both are configured on the `SupervisorBuilder`.
//! [`MemoryBroker`] implements both over in-process queues.
//!
//! Delivery semantics (acknowledgements, offsets, redelivery) belong to the
//! backend.

mod memory;

use async_trait::async_trait;

use crate::error::BackendError;

pub use memory::MemoryBroker;

/// Opens message streams for a consumer on a topic.
#[async_trait]
pub trait Subscriber: Send + Sync + 'static {
    /// Opens a stream of payloads published on `topic`, consumed as `consumer`.
    async fn subscribe(
        &self,
        consumer: &str,
        topic: &str,
    ) -> Result<Box<dyn MessageStream>, BackendError>;
}

/// Inbound payload stream.
#[async_trait]
pub trait MessageStream: Send + 'static {
    /// Next payload, or `None` once the backend closed the stream.
    async fn next(&mut self) -> Option<Vec<u8>>;

    /// Releases the stream. Called exactly once by the runtime, on every exit path.
    fn close(&mut self);
}

/// Outbound payload sink.
#[async_trait]
pub trait Publisher: Send + Sync + 'static {
    async fn publish(&self, payload: Vec<u8>) -> Result<(), BackendError>;

    async fn close(&self) {}
}
