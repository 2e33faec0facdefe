//! # Runtime plumbing embedded in every daemon.
//!
//! [`Base`] is empty until the daemon is registered. Registration wires it
//! exactly once with a [`DaemonContext`]: the handle through which the daemon
//! enqueues work, subscribes, publishes, throttles itself and observes
//! shutdown. A second registration of the same daemon is rejected.
//!
//! ```text
//! Supervisor::register(daemon)
//!   └─► Base::wire(DaemonContext { owner, runtime })   (OnceLock, once)
//!          ├─ enqueue_general(fut)     ─► [limiter.acquire()] ─► queue
//!          ├─ enqueue_system(name, f)  ─► queue (restarted on failure)
//!          ├─ subscribe(topic, h)      ─► enqueue_system(subscription loop)
//!          ├─ publish(bytes)           ─► Publisher
//!          └─ shutdown_requested()     ─► system-scope CancellationToken
//! ```

use std::future::Future;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use super::owner::{Owner, PanicHandler};
use super::subscription;
use crate::core::Runtime;
use crate::error::{RuntimeError, TaskError};
use crate::events::{Event, EventKind};
use crate::handlers::Handler;
use crate::policies::RateLimiter;
use crate::stats::Metric;
use crate::tasks::{BoxTaskFuture, SystemAction, Task};

/// Per-daemon runtime state, wired at registration.
///
/// Embed it in the daemon struct and return it from [`Daemon::base`](crate::Daemon::base).
#[derive(Default)]
pub struct Base {
    ctx: OnceLock<DaemonContext>,
}

impl Base {
    pub fn new() -> Self {
        Self::default()
    }

    /// Context of the registered daemon.
    pub fn context(&self) -> Result<&DaemonContext, RuntimeError> {
        self.ctx.get().ok_or(RuntimeError::NotRegistered)
    }

    pub fn is_registered(&self) -> bool {
        self.ctx.get().is_some()
    }

    /// `false` until registered, then whether system shutdown has begun.
    pub fn is_shutting_down(&self) -> bool {
        self.ctx.get().is_some_and(DaemonContext::is_shutting_down)
    }

    pub(crate) fn wire(&self, ctx: DaemonContext) -> Result<(), DaemonContext> {
        self.ctx.set(ctx)
    }
}

/// Handle through which a registered daemon talks to the runtime.
///
/// Cheap to clone; move clones into system task closures.
#[derive(Clone)]
pub struct DaemonContext {
    owner: Arc<Owner>,
    rt: Arc<Runtime>,
}

impl DaemonContext {
    pub(crate) fn new(owner: Arc<Owner>, rt: Arc<Runtime>) -> Self {
        Self { owner, rt }
    }

    /// Display name of the daemon.
    pub fn name(&self) -> &str {
        self.owner.name()
    }

    /// The daemon's own metric (run time of successful general tasks, errors of failed ones).
    pub fn stats(&self) -> Arc<Metric> {
        Arc::clone(self.owner.metric())
    }

    /// Enqueues a one-shot task. Failures are recorded, never retried.
    ///
    /// Waits for the daemon's rate limiter first, if one is set. Call it from
    /// a producer (a system task), never from inside a general task.
    pub async fn enqueue_general<F>(&self, fut: F) -> Result<(), RuntimeError>
    where
        F: Future<Output = Result<(), TaskError>> + Send + 'static,
    {
        self.enqueue_general_boxed(None, Box::pin(fut)).await
    }

    /// Same as [`enqueue_general`](Self::enqueue_general), with a task name for diagnostics.
    pub async fn enqueue_general_named<F>(
        &self,
        name: impl Into<Arc<str>>,
        fut: F,
    ) -> Result<(), RuntimeError>
    where
        F: Future<Output = Result<(), TaskError>> + Send + 'static,
    {
        self.enqueue_general_boxed(Some(name.into()), Box::pin(fut))
            .await
    }

    pub(crate) async fn enqueue_general_boxed(
        &self,
        name: Option<Arc<str>>,
        fut: BoxTaskFuture,
    ) -> Result<(), RuntimeError> {
        if let Some(limiter) = self.owner.limiter() {
            limiter.acquire().await;
        }
        self.push(Task::general(Arc::clone(&self.owner), name, fut))
    }

    /// Enqueues a supervised task, restarted whenever it fails or panics
    /// until system shutdown begins.
    ///
    /// `action` builds a fresh future for every run and receives the
    /// system-scope shutdown signal, which the future should observe.
    pub fn enqueue_system<F, Fut>(
        &self,
        name: impl Into<Arc<str>>,
        action: F,
    ) -> Result<(), RuntimeError>
    where
        F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), TaskError>> + Send + 'static,
    {
        let action: SystemAction =
            Arc::new(move |token: CancellationToken| -> BoxTaskFuture { Box::pin(action(token)) });
        let task = Task::system(Arc::clone(&self.owner), Some(name.into()), action)
            .tracked_by(&self.rt.system_tracker);
        self.push(task)
    }

    /// Runs a subscription loop on `topic` as a system task; every message
    /// becomes a general task running `handler`.
    pub fn subscribe(&self, topic: &str, handler: Arc<dyn Handler>) -> Result<(), RuntimeError> {
        let subscriber = self
            .rt
            .subscriber
            .clone()
            .ok_or(RuntimeError::MissingSubscriber)?;
        let ctx = self.clone();
        let topic: Arc<str> = topic.into();
        let name = format!("subscription {topic}");
        self.enqueue_system(name, move |shutdown| {
            subscription::run(
                ctx.clone(),
                Arc::clone(&subscriber),
                Arc::clone(&topic),
                Arc::clone(&handler),
                shutdown,
            )
        })
    }

    /// Sends `payload` through the configured publisher.
    pub async fn publish(&self, payload: impl Into<Vec<u8>>) -> Result<(), RuntimeError> {
        let publisher = self
            .rt
            .publisher
            .as_ref()
            .ok_or(RuntimeError::MissingPublisher)?;
        publisher.publish(payload.into()).await?;
        Ok(())
    }

    /// Throttles `enqueue_general` to `count` tasks per `window`.
    ///
    /// A non-positive rate is clamped to one per second and reported.
    pub fn limit_rate(&self, count: u32, window: Duration) {
        let limiter = Arc::new(RateLimiter::new(count, window));
        let ev = if limiter.clamped() {
            Event::new(EventKind::RateLimitClamped).with_reason(format!(
                "rate {count} per {window:?} is not positive"
            ))
        } else {
            Event::new(EventKind::RateLimitSet)
        };
        self.rt
            .bus
            .publish(ev.with_daemon(self.name()).with_rate(limiter.rate()));
        self.owner.set_limiter(limiter);
    }

    /// Invoked once with the error of every failed general task.
    pub fn set_panic_handler<F>(&self, handler: F)
    where
        F: Fn(&TaskError) + Send + Sync + 'static,
    {
        let handler: PanicHandler = Arc::new(handler);
        self.owner.set_panic_handler(handler);
    }

    /// System-scope shutdown signal.
    pub fn shutdown_requested(&self) -> CancellationToken {
        self.rt.system_token.clone()
    }

    pub fn is_shutting_down(&self) -> bool {
        self.rt.shutdown_requested()
    }

    fn push(&self, task: Task) -> Result<(), RuntimeError> {
        if self.rt.enqueue(task) {
            Ok(())
        } else {
            Err(RuntimeError::QueueClosed)
        }
    }
}
