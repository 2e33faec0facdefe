use std::sync::Arc;

use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use super::config::Config;
use super::queue::Queue;
use super::runtime::Runtime;
use super::supervisor::Supervisor;
use crate::backend::{Publisher, Subscriber};
use crate::events::{Bus, Event};
use crate::stats::{History, Stats, StatsSink};
use crate::subscribers::{Subscribe, SubscriberSet};

/// Builder for a [`Supervisor`] and its collaborators.
pub struct SupervisorBuilder {
    cfg: Config,
    subscribers: Vec<Arc<dyn Subscribe>>,
    consumer: Option<Arc<dyn Subscriber>>,
    publisher: Option<Arc<dyn Publisher>>,
    sink: Option<Arc<dyn StatsSink>>,
}

impl SupervisorBuilder {
    pub fn new(cfg: Config) -> Self {
        Self {
            cfg,
            subscribers: Vec::new(),
            consumer: None,
            publisher: None,
            sink: None,
        }
    }

    /// Sets event subscribers (e.g. `LogWriter`).
    ///
    /// Without any, runtime events are dropped.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Message source used by `DaemonContext::subscribe`.
    pub fn with_consumer(mut self, subscriber: Arc<dyn Subscriber>) -> Self {
        self.consumer = Some(subscriber);
        self
    }

    /// Message sink used by `DaemonContext::publish`; closed on stop.
    pub fn with_publisher(mut self, publisher: Arc<dyn Publisher>) -> Self {
        self.publisher = Some(publisher);
        self
    }

    /// Extra destination for daemon-scope records, next to the built-in daemon stats.
    pub fn with_daemon_sink(mut self, sink: Arc<dyn StatsSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Builds the supervisor and spawns its event listener (and history collector, if enabled).
    ///
    /// Must be called from within a Tokio runtime.
    pub fn build(self) -> Arc<Supervisor> {
        let cfg = self.cfg;
        let bus = Bus::new(cfg.bus_capacity_clamped());
        let runtime_stats = Stats::new(cfg.sample_size, cfg.percentile);
        let daemon_stats = Stats::new(cfg.sample_size, cfg.percentile);

        let listener_token = CancellationToken::new();
        let listener = spawn_listener(
            SubscriberSet::new(self.subscribers, bus.clone()),
            &bus,
            listener_token.clone(),
        );

        let history_token = CancellationToken::new();
        let history = cfg.history().map(|every| {
            let history = Arc::new(History::new(cfg.history_size));
            Arc::clone(&history).spawn(
                vec![runtime_stats.clone(), daemon_stats.clone()],
                every,
                history_token.clone(),
            );
            history
        });

        let rt = Arc::new(Runtime {
            cfg,
            bus,
            queue: Queue::new(),
            system_token: CancellationToken::new(),
            system_tracker: TaskTracker::new(),
            worker_token: CancellationToken::new(),
            worker_tracker: TaskTracker::new(),
            runtime_stats,
            daemon_stats,
            sink: self.sink,
            subscriber: self.consumer,
            publisher: self.publisher,
        });

        Arc::new(Supervisor::new_internal(
            rt,
            history,
            history_token,
            listener,
            listener_token,
        ))
    }
}

/// Forwards bus events to the subscriber set until `token` fires, then
/// flushes what is left and waits for the subscribers to finish.
///
/// Events skipped because the listener lagged are reported to the
/// subscribers as one `SubscriberOverflow` per gap.
fn spawn_listener(
    set: SubscriberSet,
    bus: &Bus,
    token: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    let mut rx = bus.subscribe();
    tokio::spawn(async move {
        loop {
            tokio::select! {
                biased;
                ev = rx.recv() => match ev {
                    Ok(ev) => set.emit(&ev),
                    Err(RecvError::Lagged(skipped)) => set.emit(&Event::listener_lagged(skipped)),
                    Err(RecvError::Closed) => break,
                },
                _ = token.cancelled() => break,
            }
        }
        loop {
            match rx.try_recv() {
                Ok(ev) => set.emit(&ev),
                Err(TryRecvError::Lagged(skipped)) => set.emit(&Event::listener_lagged(skipped)),
                Err(TryRecvError::Empty | TryRecvError::Closed) => break,
            }
        }
        set.shutdown().await;
    })
}
