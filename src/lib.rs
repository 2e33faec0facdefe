//! # daemonvisor
//!
//! **Daemonvisor** is a supervised task-execution runtime for Tokio.
//!
//! Independent long-running units ("daemons") enqueue work into one shared
//! queue, a bounded pool of workers executes it, panics are contained per
//! task, failed background loops are restarted automatically, daemons can
//! rate-limit their own throughput, and latency/error statistics are kept per
//! unit of work.
//!
//! ## Architecture
//! ```text
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │   Daemon A   │   │   Daemon B   │   │   Daemon C   │
//!     │ Base + ctx   │   │ Base + ctx   │   │ Base + ctx   │
//!     └──────┬───────┘   └──────┬───────┘   └──────┬───────┘
//!            │ enqueue_system / enqueue_general / subscribe
//!            ▼                  ▼                  ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Supervisor                                                       │
//! │  - shared queue (competing consumers)                             │
//! │  - system signal + system wait-group (system tasks, startups)     │
//! │  - worker signal + worker wait-group (worker pool)                │
//! │  - Stats: Latency, TaskWait, one metric per daemon                │
//! └──────┬──────────────────┬──────────────────┬──────────────────────┘
//!        ▼                  ▼                  ▼
//!     ┌──────────┐       ┌──────────┐       ┌──────────┐
//!     │ worker 1 │       │ worker 2 │  ...  │ worker N │
//!     └────┬─────┘       └────┬─────┘       └────┬─────┘
//!          │ run_once: catch_unwind around every task
//!          │   general → stats / panic handler, never retried
//!          │   system  → restarted until shutdown
//!          ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                     Bus (broadcast events)                        │
//! └─────────────────────────────────┬─────────────────────────────────┘
//!                                   ▼
//!                    SubscriberSet ──► LogWriter, custom subscribers
//! ```
//!
//! ### Task lifecycle
//! ```text
//! Created ──► Queued ──► Running ──► Completed
//!                ▲           │
//!                └─ system ──┴──► Panicked ──► (general, or shutdown) dropped
//! ```
//!
//! ## Features
//! | Area           | Description                                              | Key types / traits                          |
//! |----------------|----------------------------------------------------------|---------------------------------------------|
//! | **Daemons**    | Units of behavior and their runtime handle.              | [`Daemon`], [`Base`], [`DaemonContext`]     |
//! | **Supervision**| Worker pool, restarts, two-phase shutdown.               | [`Supervisor`], [`SupervisorBuilder`]       |
//! | **Statistics** | Reservoir histograms, percentiles, snapshots, history.   | [`Stats`], [`Snapshot`], [`History`]        |
//! | **Pacing**     | Restart delays and producer rate limiting.               | [`RestartBackoff`], [`RateLimiter`]         |
//! | **Messaging**  | Subscribe/publish seams and an in-memory broker.         | [`Subscriber`], [`Publisher`], [`handlers`] |
//! | **Events**     | Lifecycle events fanned out to subscribers.              | [`Subscribe`], [`Event`], [`EventKind`]     |
//! | **Errors**     | Typed errors for the runtime, tasks and backends.        | [`RuntimeError`], [`TaskError`]             |
//!
//! ## Optional features
//! - `logging` (default): the built-in [`LogWriter`] subscriber, rendering events through `tracing`.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use async_trait::async_trait;
//! use daemonvisor::{Base, Config, Daemon, RuntimeError, Supervisor, TaskError};
//!
//! #[derive(Default)]
//! struct Counter {
//!     base: Base,
//! }
//!
//! #[async_trait]
//! impl Daemon for Counter {
//!     fn name(&self) -> &str { "Counter" }
//!     fn base(&self) -> &Base { &self.base }
//!
//!     async fn startup(self: Arc<Self>) -> Result<(), RuntimeError> {
//!         let ctx = self.base.context()?.clone();
//!         ctx.limit_rate(100, Duration::from_secs(1));
//!         let producer = ctx.clone();
//!         ctx.enqueue_system("count", move |shutdown| {
//!             let ctx = producer.clone();
//!             async move {
//!                 for _ in 0..3 {
//!                     if shutdown.is_cancelled() {
//!                         break;
//!                     }
//!                     ctx.enqueue_general(async { Ok::<(), TaskError>(()) }).await?;
//!                 }
//!                 Ok::<(), TaskError>(())
//!             }
//!         })
//!     }
//! }
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), RuntimeError> {
//!     let sup = Supervisor::builder(Config::default()).build();
//!     sup.register(Arc::new(Counter::default()))?;
//!     sup.start_workers(4)?;
//!
//!     tokio::time::sleep(Duration::from_millis(100)).await;
//!     let report = sup.stop().await;
//!     println!("{report}");
//!     Ok(())
//! }
//! ```

mod backend;
mod core;
mod daemons;
mod error;
mod events;
pub mod handlers;
mod policies;
mod stats;
mod subscribers;
mod tasks;

// ---- Public re-exports ----

pub use backend::{MemoryBroker, MessageStream, Publisher, Subscriber};
pub use self::core::{Config, DEFAULT_WORKERS, Report, Supervisor, SupervisorBuilder};
pub use daemons::{Base, Daemon, DaemonContext, PanicHandler};
pub use error::{BackendError, RuntimeError, TaskError};
pub use events::{Bus, Event, EventKind};
pub use handlers::Handler;
pub use policies::{Jitter, MIN_RATE, RateLimiter, RestartBackoff};
pub use stats::{
    DEFAULT_HISTORY_SIZE, DEFAULT_PERCENTILE, DEFAULT_SAMPLE_SIZE, History, LATENCY, Metric,
    Snapshot, Stats, StatsGroup, StatsSink, TASK_WAIT, Void, format_duration,
};
pub use subscribers::{Subscribe, SubscriberSet};
pub use tasks::{BoxTaskFuture, TaskState};

// Built-in `tracing` subscriber.
// Enable with: `--features logging` (on by default).
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
