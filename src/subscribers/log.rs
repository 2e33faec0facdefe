//! # LogWriter: renders runtime events through `tracing`.
//!
//! Failures are logged at `error`/`warn` with the daemon, task label, error
//! value and backtrace; lifecycle transitions at `info`/`debug`.
//!
//! ## Example output (fmt subscriber)
//! ```text
//! INFO  daemonvisor: workers started count=100
//! INFO  daemonvisor: system task starting task="NumberPrinter[generator]" attempt=1
//! ERROR daemonvisor: system task failed task="NumberPrinter[generator]" error="panicked: no numbers on sundays"
//! WARN  daemonvisor: system task restart scheduled task="NumberPrinter[generator]" delay_ms=100
//! ERROR daemonvisor: task failed daemon="NumberPrinter" error="panicked: zero"
//! ```

use async_trait::async_trait;

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Event writer subscriber backed by `tracing`.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let daemon = e.daemon.as_deref().unwrap_or("-");
        let task = e.task.as_deref().unwrap_or("-");
        let reason = e.reason.as_deref().unwrap_or("-");
        let backtrace = e.backtrace.as_deref().unwrap_or("");

        match e.kind {
            EventKind::WorkersStarted => {
                tracing::info!(target: "daemonvisor", count = ?e.count, "workers started");
            }
            EventKind::WorkerCrashed => {
                tracing::error!(target: "daemonvisor", worker = ?e.count, error = reason, %backtrace, "worker crashed; respawning");
            }
            EventKind::DaemonRegistered => {
                tracing::info!(target: "daemonvisor", daemon, "daemon registered");
            }
            EventKind::DaemonStartupFailed => {
                tracing::error!(target: "daemonvisor", daemon, error = reason, %backtrace, "daemon startup failed");
            }
            EventKind::DaemonShutdownFailed => {
                tracing::error!(target: "daemonvisor", daemon, error = reason, "daemon shutdown failed");
            }
            EventKind::RateLimitSet => {
                tracing::info!(target: "daemonvisor", daemon, rate = ?e.rate, "processing rate is limited (ops/s)");
            }
            EventKind::RateLimitClamped => {
                tracing::warn!(target: "daemonvisor", daemon, requested = reason, rate = ?e.rate, "processing rate clamped");
            }
            EventKind::SystemTaskStarting => {
                tracing::info!(target: "daemonvisor", task, attempt = ?e.attempt, "system task starting");
            }
            EventKind::SystemTaskStopped => {
                tracing::info!(target: "daemonvisor", task, attempt = ?e.attempt, "system task finished");
            }
            EventKind::SystemTaskFailed => {
                tracing::error!(target: "daemonvisor", task, attempt = ?e.attempt, error = reason, %backtrace, "system task failed");
            }
            EventKind::SystemTaskRestartScheduled => {
                tracing::warn!(target: "daemonvisor", task, attempt = ?e.attempt, delay_ms = ?e.delay_ms, "system task restart scheduled");
            }
            EventKind::SystemTaskDropped => {
                tracing::debug!(target: "daemonvisor", task, "system task dropped during shutdown");
            }
            EventKind::SystemTaskDead => {
                tracing::error!(target: "daemonvisor", task, error = reason, "system task will not be restarted");
            }
            EventKind::TaskFailed => {
                tracing::error!(target: "daemonvisor", daemon, task, error = reason, %backtrace, "task failed");
            }
            EventKind::TaskRejected => {
                tracing::warn!(target: "daemonvisor", daemon, task, "task rejected: queue closed");
            }
            EventKind::ShutdownRequested => {
                tracing::info!(target: "daemonvisor", signal = reason, "shutdown requested");
            }
            EventKind::SystemTasksDrained => {
                tracing::info!(target: "daemonvisor", "system tasks drained");
            }
            EventKind::WorkersStopped => {
                tracing::info!(target: "daemonvisor", dropped = ?e.count, "workers stopped; queue closed");
            }
            EventKind::StatsReported => {
                tracing::info!(target: "daemonvisor", "statistics\n{reason}");
            }
            EventKind::SubscriberOverflow => {
                tracing::warn!(target: "daemonvisor", subscriber = task, reason, "subscriber overflow");
            }
            EventKind::SubscriberPanicked => {
                tracing::error!(target: "daemonvisor", subscriber = task, info = reason, "subscriber panicked");
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
