//! # Worker loop and the per-task execution protocol.
//!
//! A worker waits on the shared queue and the worker signal at the same time
//! and runs whatever it dequeues through [`runner::run_once`]:
//!
//! ```text
//! loop:
//!   select! { worker_token.cancelled() → exit,  queue.pop() → task }
//!   record TaskWait (enqueue → dequeue)
//!   general:
//!     Ok / Canceled  → Latency (enqueue → completion), daemon metric (run time)
//!     Err / panic    → daemon error, panic handler (once), TaskFailed; discarded
//!   system:
//!     shutdown begun → SystemTaskDropped
//!     Ok / Canceled  → SystemTaskStopped
//!     Fatal          → SystemTaskDead
//!     Fail / panic   → SystemTaskFailed, then re-queue after restart_backoff
//!                      unless shutdown began in the meantime
//! ```
//!
//! A system task carries a token of the system tracker from enqueue until it
//! is dropped (completed, dead, or discarded after shutdown), including while
//! it waits for a delayed restart, so `stop()` cannot observe an empty tracker
//! while a system task is queued, running or about to be re-queued.
//!
//! The loop itself is wrapped in a second `catch_unwind`: if anything outside
//! task code panics, the worker reports `WorkerCrashed` and starts over, so
//! the pool keeps its size.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tokio::time::Instant;

use super::runner::{self, Outcome, panic_message};
use super::runtime::Runtime;
use crate::error::TaskError;
use crate::events::{Event, EventKind};
use crate::stats::{LATENCY, TASK_WAIT};
use crate::tasks::Task;

/// Spawns worker `id` on the worker tracker.
pub(crate) fn spawn(rt: Arc<Runtime>, id: u32) {
    let tracker = rt.worker_tracker.clone();
    tracker.spawn(async move {
        loop {
            match AssertUnwindSafe(work(&rt)).catch_unwind().await {
                Ok(()) => break,
                Err(payload) => {
                    rt.bus.publish(
                        Event::new(EventKind::WorkerCrashed)
                            .with_count(id)
                            .with_reason(panic_message(payload.as_ref()))
                            .with_backtrace(std::backtrace::Backtrace::force_capture().to_string()),
                    );
                }
            }
        }
    });
}

async fn work(rt: &Arc<Runtime>) {
    loop {
        let task = tokio::select! {
            biased;
            _ = rt.worker_token.cancelled() => break,
            task = rt.queue.pop() => task,
        };
        match task {
            Some(task) => execute(rt, task).await,
            None => return,
        }
    }

    if rt.cfg.drain_on_stop {
        while let Some(task) = rt.queue.try_pop().await {
            execute(rt, task).await;
        }
    }
}

async fn execute(rt: &Arc<Runtime>, mut task: Task) {
    let dequeued = Instant::now();
    rt.runtime_stats
        .record(TASK_WAIT, dequeued.duration_since(task.created_at));

    if task.is_system() {
        run_system(rt, task).await;
    } else {
        task.mark_running();
        let Some(fut) = task.take_run(&rt.system_token) else {
            return;
        };
        let outcome = runner::run_once(fut).await;
        task.finish(&outcome.result);
        general_done(rt, &task, dequeued, outcome);
    }
}

fn general_done(rt: &Runtime, task: &Task, dequeued: Instant, outcome: Outcome) {
    let owner = &task.owner;
    match outcome.result {
        Ok(()) | Err(TaskError::Canceled) => {
            let now = Instant::now();
            let run_time = now.duration_since(dequeued);
            rt.runtime_stats
                .record(LATENCY, now.duration_since(task.created_at));
            owner.metric().record(run_time);
            if let Some(sink) = &rt.sink {
                sink.add(owner.name(), run_time);
            }
        }
        Err(err) => {
            owner.metric().record_error();
            if let Some(sink) = &rt.sink {
                sink.error(owner.name());
            }

            let mut ev = Event::new(EventKind::TaskFailed)
                .with_daemon(owner.name())
                .with_task(task.label())
                .with_reason(err.to_string());
            if let Some(bt) = outcome.backtrace {
                ev = ev.with_backtrace(bt);
            }
            rt.bus.publish(ev);

            if let Some(handler) = owner.panic_handler() {
                if let Err(payload) = std::panic::catch_unwind(AssertUnwindSafe(|| handler(&err))) {
                    rt.bus.publish(
                        Event::new(EventKind::TaskFailed)
                            .with_daemon(owner.name())
                            .with_task(task.label())
                            .with_reason(format!(
                                "panic handler panicked: {}",
                                panic_message(payload.as_ref())
                            )),
                    );
                }
            }
        }
    }
}

async fn run_system(rt: &Arc<Runtime>, mut task: Task) {
    if rt.shutdown_requested() {
        drop_system(rt, &task);
        return;
    }

    let attempt = task.restarts().saturating_add(1);
    task.mark_running();
    rt.bus.publish(
        Event::new(EventKind::SystemTaskStarting)
            .with_daemon(task.owner.name())
            .with_task(task.label())
            .with_attempt(attempt),
    );

    let Some(fut) = task.take_run(&rt.system_token) else {
        return;
    };
    let outcome = runner::run_once(fut).await;
    task.finish(&outcome.result);

    match outcome.result {
        Ok(()) | Err(TaskError::Canceled) => {
            rt.bus.publish(
                Event::new(EventKind::SystemTaskStopped)
                    .with_daemon(task.owner.name())
                    .with_task(task.label())
                    .with_attempt(attempt),
            );
        }
        Err(err) if !err.is_retryable() => {
            rt.bus.publish(
                Event::new(EventKind::SystemTaskDead)
                    .with_daemon(task.owner.name())
                    .with_task(task.label())
                    .with_reason(err.to_string()),
            );
        }
        Err(err) => {
            let mut ev = Event::new(EventKind::SystemTaskFailed)
                .with_daemon(task.owner.name())
                .with_task(task.label())
                .with_attempt(attempt)
                .with_reason(err.to_string());
            if let Some(bt) = outcome.backtrace {
                ev = ev.with_backtrace(bt);
            }
            rt.bus.publish(ev);

            if rt.shutdown_requested() {
                drop_system(rt, &task);
                return;
            }
            let delay = rt.cfg.restart_backoff.next(task.restarts());
            task.restart();
            schedule_restart(rt, task, attempt, delay);
        }
    }
}

fn schedule_restart(rt: &Arc<Runtime>, task: Task, attempt: u32, delay: Duration) {
    rt.bus.publish(
        Event::new(EventKind::SystemTaskRestartScheduled)
            .with_daemon(task.owner.name())
            .with_task(task.label())
            .with_attempt(attempt)
            .with_delay(delay),
    );

    if delay.is_zero() {
        rt.enqueue(task);
        return;
    }

    let rt = Arc::clone(rt);
    let tracker = rt.system_tracker.clone();
    tracker.spawn(async move {
        tokio::select! {
            _ = rt.system_token.cancelled() => drop_system(&rt, &task),
            _ = tokio::time::sleep(delay) => {
                if rt.shutdown_requested() {
                    drop_system(&rt, &task);
                } else {
                    rt.enqueue(task);
                }
            }
        }
    });
}

fn drop_system(rt: &Runtime, task: &Task) {
    rt.bus.publish(
        Event::new(EventKind::SystemTaskDropped)
            .with_daemon(task.owner.name())
            .with_task(task.label()),
    );
}
