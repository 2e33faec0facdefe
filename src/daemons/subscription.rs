//! # Subscription loop.
//!
//! Runs as a system task of the subscribing daemon:
//!
//! ```text
//! stream = subscriber.subscribe(daemon, topic)       (guarded: close() on every exit)
//! loop select! {
//!     shutdown.cancelled()  → Ok(())
//!     stream.next() = None  → Ok(())                 (backend closed the stream)
//!     stream.next() = bytes → select! {
//!         shutdown.cancelled()       → Ok(())
//!         enqueue_general(handler)   (waits for the rate limiter)
//!     }
//! }
//! ```
//!
//! Handler failures stay inside their general task. A backend error opening
//! the stream fails the system task, which is then restarted like any other.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use super::base::DaemonContext;
use crate::backend::{MessageStream, Subscriber};
use crate::error::TaskError;
use crate::handlers::Handler;

/// Closes the stream when dropped, including during unwinding.
struct StreamGuard(Box<dyn MessageStream>);

impl Drop for StreamGuard {
    fn drop(&mut self) {
        self.0.close();
    }
}

pub(crate) async fn run(
    ctx: DaemonContext,
    subscriber: Arc<dyn Subscriber>,
    topic: Arc<str>,
    handler: Arc<dyn Handler>,
    shutdown: CancellationToken,
) -> Result<(), TaskError> {
    let stream = subscriber
        .subscribe(ctx.name(), &topic)
        .await
        .map_err(|e| TaskError::fail(e.to_string()))?;
    let mut stream = StreamGuard(stream);

    loop {
        let payload = tokio::select! {
            biased;
            _ = shutdown.cancelled() => return Ok(()),
            payload = stream.0.next() => payload,
        };
        let Some(payload) = payload else {
            return Ok(());
        };
        // the rate limiter may hold the message for a whole interval
        let enqueue = ctx.enqueue_general_boxed(Some(Arc::clone(&topic)), handler.call(payload));
        tokio::select! {
            biased;
            _ = shutdown.cancelled() => return Ok(()),
            queued = enqueue => queued?,
        }
    }
}
