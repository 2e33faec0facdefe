#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use daemonvisor::{Base, Daemon, DaemonContext, Event, EventKind, RuntimeError};
use tokio::sync::broadcast::{self, error::TryRecvError};

type Start = Box<dyn Fn(DaemonContext) -> Result<(), RuntimeError> + Send + Sync>;

/// Daemon whose startup is a closure over its context.
pub struct TestDaemon {
    name: String,
    base: Base,
    start: Start,
    pub shutdowns: AtomicUsize,
}

impl TestDaemon {
    pub fn new<F>(name: &str, start: F) -> Arc<Self>
    where
        F: Fn(DaemonContext) -> Result<(), RuntimeError> + Send + Sync + 'static,
    {
        Arc::new(Self {
            name: name.to_string(),
            base: Base::new(),
            start: Box::new(start),
            shutdowns: AtomicUsize::new(0),
        })
    }

    pub fn ctx(&self) -> DaemonContext {
        self.base.context().expect("registered").clone()
    }
}

#[async_trait]
impl Daemon for TestDaemon {
    fn name(&self) -> &str {
        &self.name
    }

    fn base(&self) -> &Base {
        &self.base
    }

    async fn startup(self: Arc<Self>) -> Result<(), RuntimeError> {
        let ctx = self.base.context()?.clone();
        (self.start)(ctx)
    }

    async fn shutdown(&self) {
        self.shutdowns.fetch_add(1, Ordering::SeqCst);
    }
}

/// Everything currently buffered in `rx`.
pub fn drain(rx: &mut broadcast::Receiver<Event>) -> Vec<Event> {
    let mut out = Vec::new();
    loop {
        match rx.try_recv() {
            Ok(ev) => out.push(ev),
            Err(TryRecvError::Lagged(_)) => continue,
            Err(TryRecvError::Empty | TryRecvError::Closed) => return out,
        }
    }
}

pub fn count(events: &[Event], kind: EventKind) -> usize {
    events.iter().filter(|e| e.kind == kind).count()
}

/// Polls `cond` until it holds, panicking after five seconds.
pub async fn eventually(mut cond: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !cond() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "condition not met in time"
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}
