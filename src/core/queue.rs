//! # Shared task queue.
//!
//! One unbounded channel, many competing consumers: every worker locks the
//! receiver only while it waits for the next task, so a task is handed to
//! exactly one worker. Execution order across workers is not guaranteed.
//!
//! The queue is closed once, after every worker has exited; tasks still
//! buffered at that point are dropped. Pushing into a closed queue returns the
//! task back to the caller instead of panicking.

use tokio::sync::{Mutex, mpsc};

use crate::tasks::Task;

pub(crate) struct Queue {
    tx: mpsc::UnboundedSender<Task>,
    rx: Mutex<mpsc::UnboundedReceiver<Task>>,
}

impl Queue {
    pub(crate) fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx,
            rx: Mutex::new(rx),
        }
    }

    /// Marks the task queued and sends it; returns it back if the queue is closed.
    pub(crate) fn push(&self, mut task: Task) -> Result<(), Box<Task>> {
        task.mark_queued();
        self.tx.send(task).map_err(|e| Box::new(e.0))
    }

    /// Waits for the next task; `None` once the queue is closed and empty.
    pub(crate) async fn pop(&self) -> Option<Task> {
        self.rx.lock().await.recv().await
    }

    /// Takes a task if one is immediately available.
    pub(crate) async fn try_pop(&self) -> Option<Task> {
        self.rx.lock().await.try_recv().ok()
    }

    /// Closes the queue and drops tasks still buffered; returns how many were dropped.
    pub(crate) async fn close(&self) -> usize {
        let mut rx = self.rx.lock().await;
        rx.close();
        let mut dropped = 0;
        while rx.try_recv().is_ok() {
            dropped += 1;
        }
        dropped
    }

    #[cfg(test)]
    fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}
