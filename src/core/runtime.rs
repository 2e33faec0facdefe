//! Runtime state shared by the supervisor, its workers and every daemon context.
//!
//! ```text
//! system_token ── fires first: system tasks and startups observe it and return
//! system_tracker ── wait-group over system task runs, startups, delayed restarts
//! worker_token ── fires after system_tracker drained: workers exit
//! worker_tracker ── wait-group over worker loops
//! ```

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use super::config::Config;
use super::queue::Queue;
use crate::backend::{Publisher, Subscriber};
use crate::events::{Bus, Event, EventKind};
use crate::stats::{Stats, StatsSink};
use crate::tasks::Task;

pub(crate) struct Runtime {
    pub(crate) cfg: Config,
    pub(crate) bus: Bus,
    pub(crate) queue: Queue,

    pub(crate) system_token: CancellationToken,
    pub(crate) system_tracker: TaskTracker,
    pub(crate) worker_token: CancellationToken,
    pub(crate) worker_tracker: TaskTracker,

    /// `Latency` and `TaskWait`.
    pub(crate) runtime_stats: Stats,
    /// One metric per daemon, keyed by display name.
    pub(crate) daemon_stats: Stats,
    pub(crate) sink: Option<Arc<dyn StatsSink>>,

    pub(crate) subscriber: Option<Arc<dyn Subscriber>>,
    pub(crate) publisher: Option<Arc<dyn Publisher>>,
}

impl Runtime {
    /// Pushes `task`, publishing `TaskRejected` if the queue is closed.
    pub(crate) fn enqueue(&self, task: Task) -> bool {
        match self.queue.push(task) {
            Ok(()) => true,
            Err(task) => {
                self.bus.publish(
                    Event::new(EventKind::TaskRejected)
                        .with_daemon(task.owner.name())
                        .with_task(task.label()),
                );
                false
            }
        }
    }

    pub(crate) fn shutdown_requested(&self) -> bool {
        self.system_token.is_cancelled()
    }
}
