//! # Daemon abstraction.
//!
//! A daemon is a long-lived unit of behavior. Its [`startup`](Daemon::startup)
//! enqueues the system tasks that do the actual work (subscription loops,
//! generators) and configures the optional panic handler and rate limit. It
//! must return promptly; anything long-running belongs in a system task.
//!
//! ```text
//! Registered ─► Started ─► (running) ─► ShuttingDown ─► Stopped
//!   register()   startup()               shutdown()       system tasks drained,
//!   wires Base   spawned, not awaited                     workers stopped
//! ```
//!
//! # Example
//! ```rust
//! use std::sync::Arc;
//! use async_trait::async_trait;
//! use daemonvisor::{Base, Daemon, RuntimeError, TaskError};
//!
//! #[derive(Default)]
//! struct Heartbeat {
//!     base: Base,
//! }
//!
//! #[async_trait]
//! impl Daemon for Heartbeat {
//!     fn name(&self) -> &str { "Heartbeat" }
//!     fn base(&self) -> &Base { &self.base }
//!
//!     async fn startup(self: Arc<Self>) -> Result<(), RuntimeError> {
//!         let ctx = self.base.context()?.clone();
//!         let producer = ctx.clone();
//!         ctx.enqueue_system("beat", move |shutdown| {
//!             let ctx = producer.clone();
//!             async move {
//!                 while !shutdown.is_cancelled() {
//!                     ctx.enqueue_general(async { Ok::<(), TaskError>(()) }).await?;
//!                     tokio::time::sleep(std::time::Duration::from_secs(1)).await;
//!                 }
//!                 Ok::<(), TaskError>(())
//!             }
//!         })
//!     }
//! }
//! ```

use std::sync::Arc;

use async_trait::async_trait;

use super::base::Base;
use crate::error::RuntimeError;

/// Polymorphic unit of behavior run by a [`Supervisor`](crate::Supervisor).
#[async_trait]
pub trait Daemon: Send + Sync + 'static {
    /// Display name; also the key of the daemon's metric. Must be unique per supervisor.
    fn name(&self) -> &str;

    /// Shared runtime plumbing embedded in the daemon.
    fn base(&self) -> &Base;

    /// Enqueues system tasks and configures the daemon. Not awaited by `register`.
    async fn startup(self: Arc<Self>) -> Result<(), RuntimeError>;

    /// Non-task cleanup, run after the system-scope shutdown signal fired.
    async fn shutdown(&self) {}
}
