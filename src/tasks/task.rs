//! # Unit of work flowing through the shared queue.
//!
//! A [`Task`] is created by a daemon, pushed into the queue and executed by
//! whichever worker dequeues it. Two kinds exist:
//!
//! - **general**: a one-shot future (a handler invocation). It runs at most
//!   once; failures are recorded and the task is discarded.
//! - **system**: a restartable action (a subscription loop, a generator). The
//!   action is a factory so the worker can build a fresh future on each run.
//!
//! ## State machine
//! ```text
//! Created ──► Queued ──► Running ──► Completed
//!                ▲           │
//!                │           ▼
//!                └──(system, shutdown not requested)── Panicked
//! ```
//!
//! A system task holds a token of the system tracker for its whole life,
//! across restarts, so shutdown waits for queued system tasks too: each one
//! either runs or is dropped on dequeue.
//!
//! `created_at` is stamped on every entry into `Queued`, so after a restart the
//! wait and latency metrics start from the re-queue, not from the original
//! enqueue.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tokio_util::task::{TaskTracker, task_tracker::TaskTrackerToken};

use crate::daemons::Owner;
use crate::error::TaskError;

/// Boxed future returned by task actions.
pub type BoxTaskFuture = Pin<Box<dyn Future<Output = Result<(), TaskError>> + Send + 'static>>;

/// Factory of system task runs; receives the system-scope shutdown signal.
pub(crate) type SystemAction = Arc<dyn Fn(CancellationToken) -> BoxTaskFuture + Send + Sync>;

/// Lifecycle state of a task instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TaskState {
    Created,
    Queued,
    Running,
    Completed,
    Panicked,
}

enum Work {
    General(Option<BoxTaskFuture>),
    System(SystemAction),
}

pub(crate) struct Task {
    pub(crate) owner: Arc<Owner>,
    work: Work,
    pub(crate) created_at: Instant,
    name: Option<Arc<str>>,
    state: TaskState,
    restarts: u32,
    /// Keeps the system tracker busy from enqueue until the task is dropped.
    _tracked: Option<TaskTrackerToken>,
}

impl Task {
    pub(crate) fn general(owner: Arc<Owner>, name: Option<Arc<str>>, fut: BoxTaskFuture) -> Self {
        Self::new(owner, name, Work::General(Some(fut)))
    }

    pub(crate) fn system(owner: Arc<Owner>, name: Option<Arc<str>>, action: SystemAction) -> Self {
        Self::new(owner, name, Work::System(action))
    }

    fn new(owner: Arc<Owner>, name: Option<Arc<str>>, work: Work) -> Self {
        Self {
            owner,
            work,
            created_at: Instant::now(),
            name: name.filter(|n| !n.is_empty()),
            state: TaskState::Created,
            restarts: 0,
            _tracked: None,
        }
    }

    pub(crate) fn tracked_by(mut self, tracker: &TaskTracker) -> Self {
        self._tracked = Some(tracker.token());
        self
    }

    pub(crate) fn is_system(&self) -> bool {
        matches!(self.work, Work::System(_))
    }

    /// Future to run now: the general future (taken once) or a fresh system run.
    pub(crate) fn take_run(&mut self, shutdown: &CancellationToken) -> Option<BoxTaskFuture> {
        match &mut self.work {
            Work::General(fut) => fut.take(),
            Work::System(action) => Some(action(shutdown.clone())),
        }
    }

    pub(crate) fn state(&self) -> TaskState {
        self.state
    }

    /// Number of times this system task has been re-queued.
    pub(crate) fn restarts(&self) -> u32 {
        self.restarts
    }

    /// Display label: `Daemon[name]`, or `[unnamed Daemon process]`.
    pub(crate) fn label(&self) -> String {
        match &self.name {
            Some(name) => format!("{}[{}]", self.owner.name(), name),
            None => format!("[unnamed {} process]", self.owner.name()),
        }
    }

    /// Enters `Queued`; `created_at` becomes the enqueue time.
    pub(crate) fn mark_queued(&mut self) {
        debug_assert!(matches!(self.state, TaskState::Created | TaskState::Panicked));
        self.created_at = Instant::now();
        self.state = TaskState::Queued;
    }

    pub(crate) fn mark_running(&mut self) {
        debug_assert_eq!(self.state, TaskState::Queued);
        self.state = TaskState::Running;
    }

    pub(crate) fn finish(&mut self, outcome: &Result<(), TaskError>) {
        self.state = match outcome {
            Ok(()) | Err(TaskError::Canceled) => TaskState::Completed,
            Err(_) => TaskState::Panicked,
        };
    }

    /// Counts a restart of a failed system task; the next `mark_queued` refreshes `created_at`.
    pub(crate) fn restart(&mut self) {
        debug_assert!(self.is_system() && self.state == TaskState::Panicked);
        self.restarts = self.restarts.saturating_add(1);
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("label", &self.label())
            .field("system", &self.is_system())
            .field("state", &self.state)
            .field("restarts", &self.restarts)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::Stats;

    fn owner(name: &str) -> Arc<Owner> {
        Arc::new(Owner::new(name.into(), Stats::default().fetch(name)))
    }

    fn system(name: Option<&str>) -> Task {
        let action: SystemAction = Arc::new(|_: CancellationToken| -> BoxTaskFuture {
            Box::pin(async { Ok::<(), TaskError>(()) })
        });
        Task::system(owner("Ticker"), name.map(Arc::from), action)
    }

    #[test]
    fn labels_follow_daemon_and_task_name() {
        assert_eq!(system(Some("generator")).label(), "Ticker[generator]");
        assert_eq!(system(None).label(), "[unnamed Ticker process]");
        assert_eq!(system(Some("")).label(), "[unnamed Ticker process]");
    }

    #[test]
    fn canceled_counts_as_completed() {
        let fut: BoxTaskFuture = Box::pin(async { Ok::<(), TaskError>(()) });
        let mut task = Task::general(owner("Printer"), None, fut);
        assert!(!task.is_system());
        task.mark_queued();
        task.mark_running();
        task.finish(&Err(TaskError::Canceled));
        assert_eq!(task.state(), TaskState::Completed);
    }

    #[tokio::test(start_paused = true)]
    async fn restart_refreshes_created_at() {
        let mut task = system(Some("loop"));
        let first = task.created_at;
        task.mark_queued();
        task.mark_running();
        task.finish(&Err(TaskError::Panicked {
            message: "boom".into(),
        }));
        assert_eq!(task.state(), TaskState::Panicked);

        tokio::time::advance(Duration::from_millis(10)).await;
        task.restart();
        task.mark_queued();

        assert!(task.created_at > first);
        assert_eq!(task.restarts(), 1);
        assert_eq!(task.state(), TaskState::Queued);
    }
}
