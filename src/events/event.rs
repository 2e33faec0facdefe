//! # Runtime events emitted by the supervisor, workers and daemons.
//!
//! The [`EventKind`] enum classifies events across five groups:
//! - **Daemon events**: registration, startup failures, rate limit configuration
//! - **System task events**: start, stop, failure, restart scheduling, drop
//! - **General task events**: failure of a one-shot task
//! - **Runtime events**: worker pool start, worker crash, rejected enqueue
//! - **Shutdown events**: the two-phase shutdown milestones and the final report
//!
//! The [`Event`] struct carries the metadata (daemon, task label, reason,
//! backtrace, attempt, delay, count, rate).
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use daemonvisor::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::SystemTaskFailed)
//!     .with_daemon("PriceConsumer")
//!     .with_task("PriceConsumer[subscription]")
//!     .with_reason("boom")
//!     .with_attempt(3)
//!     .with_delay(Duration::from_millis(100));
//!
//! assert_eq!(ev.kind, EventKind::SystemTaskFailed);
//! assert_eq!(ev.daemon.as_deref(), Some("PriceConsumer"));
//! assert_eq!(ev.delay_ms, Some(100));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    // === Subscriber events ===
    /// Event subscriber panicked while processing an event.
    ///
    /// Sets: `task` (subscriber name), `reason` (panic message).
    SubscriberPanicked,

    /// Event subscriber dropped an event (queue full or worker closed), or the
    /// bus listener fell behind and skipped events for every subscriber.
    ///
    /// Sets: `task` (subscriber name, or `"listener"`), `reason`;
    /// `count` (skipped events) when the listener lagged.
    SubscriberOverflow,

    // === Daemon events ===
    /// Daemon base state was wired and its startup was launched.
    ///
    /// Sets: `daemon`.
    DaemonRegistered,

    /// Daemon startup returned an error or panicked.
    ///
    /// Sets: `daemon`, `reason`, `backtrace` (on panic).
    DaemonStartupFailed,

    /// Daemon shutdown hook panicked.
    ///
    /// Sets: `daemon`, `reason`.
    DaemonShutdownFailed,

    /// Daemon configured a rate limit.
    ///
    /// Sets: `daemon`, `rate` (tokens per second).
    RateLimitSet,

    /// Daemon configured a non-positive rate; it was clamped to one token per second.
    ///
    /// Sets: `daemon`, `rate` (effective), `reason` (requested configuration).
    RateLimitClamped,

    // === System task events ===
    /// Worker is about to run a system task.
    ///
    /// Sets: `daemon`, `task`, `attempt` (1-based run counter).
    SystemTaskStarting,

    /// System task action returned (successfully or after observing shutdown).
    ///
    /// Sets: `daemon`, `task`, `attempt`.
    SystemTaskStopped,

    /// System task action failed or panicked.
    ///
    /// Sets: `daemon`, `task`, `attempt`, `reason`, `backtrace`.
    SystemTaskFailed,

    /// Failed system task will be re-queued after `delay`.
    ///
    /// Sets: `daemon`, `task`, `attempt`, `delay_ms`.
    SystemTaskRestartScheduled,

    /// System task was discarded because system shutdown already began.
    ///
    /// Sets: `daemon`, `task`.
    SystemTaskDropped,

    /// System task failed with a fatal error and will not be restarted.
    ///
    /// Sets: `daemon`, `task`, `reason`.
    SystemTaskDead,

    // === General task events ===
    /// General task failed or panicked; it is discarded, never retried.
    ///
    /// Sets: `daemon`, `task`, `reason`, `backtrace`.
    TaskFailed,

    /// A task could not be (re-)queued because the queue was closed.
    ///
    /// Sets: `daemon`, `task`.
    TaskRejected,

    // === Runtime events ===
    /// Workers were spawned.
    ///
    /// Sets: `count`.
    WorkersStarted,

    /// Worker loop crashed and was respawned in place.
    ///
    /// Sets: `count` (worker id), `reason`, `backtrace`.
    WorkerCrashed,

    // === Shutdown events ===
    /// Shutdown requested; the system-scope signal was closed.
    ///
    /// Sets: `reason` (signal name) when triggered by an OS signal.
    ShutdownRequested,

    /// All system tasks and startups have returned.
    SystemTasksDrained,

    /// All workers have exited; the queue is closed.
    ///
    /// Sets: `count` (tasks still queued and dropped at close).
    WorkersStopped,

    /// Aggregated statistics rendered after shutdown.
    ///
    /// Sets: `reason` (rendered report).
    StatsReported,
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Display name of the daemon involved, if any.
    pub daemon: Option<Arc<str>>,
    /// Display label of the task (or subscriber name), if any.
    pub task: Option<Arc<str>>,
    /// Human-readable reason (error values, configuration details, reports).
    pub reason: Option<Arc<str>>,
    /// Captured backtrace for failures, when available.
    pub backtrace: Option<Arc<str>>,
    /// Run counter of a system task (starting from 1).
    pub attempt: Option<u32>,
    /// Restart delay in milliseconds (compact).
    pub delay_ms: Option<u32>,
    /// Count or identifier (number of workers, worker id).
    pub count: Option<u32>,
    /// Rate in tokens per second.
    pub rate: Option<f64>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            daemon: None,
            task: None,
            reason: None,
            backtrace: None,
            attempt: None,
            delay_ms: None,
            count: None,
            rate: None,
        }
    }

    /// Attaches a daemon name.
    #[inline]
    pub fn with_daemon(mut self, daemon: impl Into<Arc<str>>) -> Self {
        self.daemon = Some(daemon.into());
        self
    }

    /// Attaches a task label.
    #[inline]
    pub fn with_task(mut self, task: impl Into<Arc<str>>) -> Self {
        self.task = Some(task.into());
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches a rendered backtrace.
    #[inline]
    pub fn with_backtrace(mut self, backtrace: impl Into<Arc<str>>) -> Self {
        self.backtrace = Some(backtrace.into());
        self
    }

    /// Attaches an attempt count.
    #[inline]
    pub fn with_attempt(mut self, n: u32) -> Self {
        self.attempt = Some(n);
        self
    }

    /// Attaches a restart delay (stored as milliseconds).
    #[inline]
    pub fn with_delay(mut self, d: Duration) -> Self {
        let ms = d.as_millis().min(u128::from(u32::MAX)) as u32;
        self.delay_ms = Some(ms);
        self
    }

    /// Attaches a count or identifier.
    #[inline]
    pub fn with_count(mut self, n: u32) -> Self {
        self.count = Some(n);
        self
    }

    /// Attaches a rate (tokens per second).
    #[inline]
    pub fn with_rate(mut self, rate: f64) -> Self {
        self.rate = Some(rate);
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_task(subscriber)
            .with_reason(format!("subscriber={subscriber} reason={reason}"))
    }

    /// Creates the event reporting that the bus listener skipped `skipped` events.
    pub fn listener_lagged(skipped: u64) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_task("listener")
            .with_reason(format!("listener lagged behind the bus, {skipped} events skipped"))
            .with_count(u32::try_from(skipped).unwrap_or(u32::MAX))
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_task(subscriber)
            .with_reason(info)
    }

    /// Returns true for events describing a failure that deserves attention.
    pub fn is_failure(&self) -> bool {
        matches!(
            self.kind,
            EventKind::SystemTaskFailed
                | EventKind::SystemTaskDead
                | EventKind::TaskFailed
                | EventKind::TaskRejected
                | EventKind::WorkerCrashed
                | EventKind::DaemonStartupFailed
                | EventKind::DaemonShutdownFailed
                | EventKind::SubscriberPanicked
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_numbers_increase() {
        let a = Event::new(EventKind::ShutdownRequested);
        let b = Event::new(EventKind::SystemTasksDrained);
        assert!(b.seq > a.seq);
    }

    #[test]
    fn delay_is_saturated_to_u32_millis() {
        let ev = Event::new(EventKind::SystemTaskRestartScheduled)
            .with_delay(Duration::from_secs(u64::from(u32::MAX)));
        assert_eq!(ev.delay_ms, Some(u32::MAX));
    }

    #[test]
    fn failure_classification() {
        assert!(Event::new(EventKind::TaskFailed).is_failure());
        assert!(!Event::new(EventKind::SystemTaskStarting).is_failure());
    }
}
