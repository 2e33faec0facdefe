//! # Supervisor: daemons, worker pool and the two-phase shutdown.
//!
//! The [`Supervisor`] owns the shared task queue, the worker pool, the list of
//! registered daemons and the two shutdown signals. Daemons feed the queue
//! through their [`DaemonContext`]; workers drain it.
//!
//! ## Architecture
//! ```text
//! register(daemon) ──► Base wired ──► startup() spawned on system tracker
//!                                          │ enqueue_system / subscribe
//!                                          ▼
//!   daemon contexts ── enqueue ──► [ shared queue ] ──► worker 1 … worker N
//!                                                          │ run_once (panic isolated)
//!                                                          ├─ general: stats, panic handler
//!                                                          └─ system: restart on failure
//!
//! Events: runtime ── publish ──► Bus ──► listener ──► SubscriberSet ──► LogWriter, …
//! ```
//!
//! ## Shutdown protocol (`stop`)
//! ```text
//! 1. ShutdownRequested; system_token.cancel()
//! 2. daemon.shutdown() for every daemon, in registration order
//! 3. system_tracker.wait()         startups returned, every system task ran or was dropped
//!    → SystemTasksDrained
//! 4. worker_token.cancel(); worker_tracker.wait()
//!    (workers first drain queued general tasks when drain_on_stop)
//! 5. queue.close() → WorkersStopped; publisher.close()
//! 6. Report → StatsReported; event listener flushed
//! ```
//! The queue is closed only after every worker exited, so no system task can
//! ever be re-queued into a closed queue while it is still running.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use async_trait::async_trait;
//! use daemonvisor::{Base, Config, Daemon, RuntimeError, Supervisor, TaskError};
//!
//! #[derive(Default)]
//! struct Once { base: Base }
//!
//! #[async_trait]
//! impl Daemon for Once {
//!     fn name(&self) -> &str { "Once" }
//!     fn base(&self) -> &Base { &self.base }
//!     async fn startup(self: Arc<Self>) -> Result<(), RuntimeError> {
//!         let ctx = self.base.context()?.clone();
//!         let producer = ctx.clone();
//!         ctx.enqueue_system("emit", move |_shutdown| {
//!             let ctx = producer.clone();
//!             async move {
//!                 ctx.enqueue_general(async { Ok::<(), TaskError>(()) }).await?;
//!                 Ok::<(), TaskError>(())
//!             }
//!         })
//!     }
//! }
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), RuntimeError> {
//!     let sup = Supervisor::builder(Config::default()).build();
//!     sup.register(Arc::new(Once::default()))?;
//!     sup.start_workers(2)?;
//!
//!     // let the system task run before shutdown drops it
//!     tokio::time::sleep(std::time::Duration::from_millis(100)).await;
//!     let report = sup.stop().await;
//!     assert_eq!(report.daemon("Once").map(|s| s.processed), Some(1));
//!     Ok(())
//! }
//! ```

use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use futures::FutureExt;
use tokio::sync::{OnceCell, broadcast};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::builder::SupervisorBuilder;
use super::config::Config;
use super::report::Report;
use super::runner::panic_message;
use super::runtime::Runtime;
use super::{shutdown, worker};
use crate::daemons::{Daemon, DaemonContext, Owner};
use crate::error::RuntimeError;
use crate::events::{Event, EventKind};
use crate::stats::{History, Stats};

/// Owns the queue, the worker pool, the daemons and the shutdown signals.
pub struct Supervisor {
    rt: Arc<Runtime>,
    daemons: Mutex<Vec<Arc<dyn Daemon>>>,
    next_worker: AtomicU32,
    report: OnceCell<Report>,

    history: Option<Arc<History>>,
    history_token: CancellationToken,

    listener: Mutex<Option<JoinHandle<()>>>,
    listener_token: CancellationToken,
}

impl Supervisor {
    /// Starts building a supervisor with `cfg`.
    pub fn builder(cfg: Config) -> SupervisorBuilder {
        SupervisorBuilder::new(cfg)
    }

    pub(crate) fn new_internal(
        rt: Arc<Runtime>,
        history: Option<Arc<History>>,
        history_token: CancellationToken,
        listener: JoinHandle<()>,
        listener_token: CancellationToken,
    ) -> Self {
        Self {
            rt,
            daemons: Mutex::new(Vec::new()),
            next_worker: AtomicU32::new(0),
            report: OnceCell::new(),
            history,
            history_token,
            listener: Mutex::new(Some(listener)),
            listener_token,
        }
    }

    /// Wires the daemon's [`Base`](crate::Base) and launches its `startup`
    /// without awaiting it.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    /// - [`RuntimeError::Stopped`] once shutdown has begun;
    /// - [`RuntimeError::AlreadyRegistered`] if this daemon was registered before;
    /// - [`RuntimeError::DuplicateDaemon`] if another daemon has the same name.
    pub fn register<D: Daemon>(&self, daemon: Arc<D>) -> Result<(), RuntimeError> {
        if self.rt.shutdown_requested() {
            return Err(RuntimeError::Stopped);
        }
        let name: Arc<str> = daemon.name().into();
        {
            let mut daemons = self.daemons.lock().unwrap_or_else(PoisonError::into_inner);
            if daemon.base().is_registered() {
                return Err(RuntimeError::AlreadyRegistered {
                    name: name.to_string(),
                });
            }
            if daemons.iter().any(|d| d.name() == &*name) {
                return Err(RuntimeError::DuplicateDaemon {
                    name: name.to_string(),
                });
            }

            let metric = self.rt.daemon_stats.fetch(&name);
            let owner = Arc::new(Owner::new(Arc::clone(&name), metric));
            let ctx = DaemonContext::new(owner, Arc::clone(&self.rt));
            if daemon.base().wire(ctx).is_err() {
                return Err(RuntimeError::AlreadyRegistered {
                    name: name.to_string(),
                });
            }
            daemons.push(daemon.clone());
        }

        self.rt
            .bus
            .publish(Event::new(EventKind::DaemonRegistered).with_daemon(Arc::clone(&name)));
        self.spawn_startup(daemon, name);
        Ok(())
    }

    fn spawn_startup<D: Daemon>(&self, daemon: Arc<D>, name: Arc<str>) {
        let bus = self.rt.bus.clone();
        self.rt.system_tracker.spawn(async move {
            let failure = match AssertUnwindSafe(daemon.startup()).catch_unwind().await {
                Ok(Ok(())) => return,
                Ok(Err(e)) => Event::new(EventKind::DaemonStartupFailed).with_reason(e.to_string()),
                Err(payload) => Event::new(EventKind::DaemonStartupFailed)
                    .with_reason(panic_message(payload.as_ref()))
                    .with_backtrace(std::backtrace::Backtrace::force_capture().to_string()),
            };
            bus.publish(failure.with_daemon(name));
        });
    }

    /// Spawns `n` more workers on the shared queue.
    pub fn start_workers(&self, n: usize) -> Result<(), RuntimeError> {
        if self.rt.worker_token.is_cancelled() {
            return Err(RuntimeError::Stopped);
        }
        let n = u32::try_from(n).unwrap_or(u32::MAX);
        for _ in 0..n {
            let id = self.next_worker.fetch_add(1, Ordering::Relaxed);
            worker::spawn(Arc::clone(&self.rt), id);
        }
        self.rt
            .bus
            .publish(Event::new(EventKind::WorkersStarted).with_count(n));
        Ok(())
    }

    /// Spawns [`Config::worker_count`] workers.
    pub fn start(&self) -> Result<(), RuntimeError> {
        self.start_workers(self.rt.cfg.worker_count())
    }

    /// Starts the workers, waits for a termination signal, then stops.
    pub async fn run(&self) -> Result<Report, RuntimeError> {
        self.start()?;
        let signal = shutdown::wait_for_signal()
            .await
            .map_err(RuntimeError::Signal)?;
        Ok(self.stop_with(Some(signal)).await)
    }

    /// Runs the shutdown protocol and returns the final statistics.
    ///
    /// With a history collector running, the report holds what was recorded
    /// since its last collection (see [`Config::history_interval`]).
    ///
    /// Idempotent: later and concurrent calls wait for the first one and get
    /// the same report.
    pub async fn stop(&self) -> Report {
        self.stop_with(None).await
    }

    async fn stop_with(&self, reason: Option<&'static str>) -> Report {
        self.report
            .get_or_init(|| self.shutdown(reason))
            .await
            .clone()
    }

    async fn shutdown(&self, reason: Option<&'static str>) -> Report {
        let rt = &self.rt;

        let mut ev = Event::new(EventKind::ShutdownRequested);
        if let Some(reason) = reason {
            ev = ev.with_reason(reason);
        }
        rt.bus.publish(ev);
        rt.system_token.cancel();

        let daemons = self
            .daemons
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for daemon in daemons {
            if let Err(payload) = AssertUnwindSafe(daemon.shutdown()).catch_unwind().await {
                rt.bus.publish(
                    Event::new(EventKind::DaemonShutdownFailed)
                        .with_daemon(daemon.name())
                        .with_reason(panic_message(payload.as_ref())),
                );
            }
        }

        if self.next_worker.load(Ordering::Relaxed) == 0 {
            // Nobody would ever dequeue the system tasks the tracker waits for.
            rt.queue.close().await;
        }
        rt.system_tracker.close();
        rt.system_tracker.wait().await;
        rt.bus.publish(Event::new(EventKind::SystemTasksDrained));

        rt.worker_token.cancel();
        rt.worker_tracker.close();
        rt.worker_tracker.wait().await;
        let dropped = rt.queue.close().await;
        rt.bus.publish(
            Event::new(EventKind::WorkersStopped)
                .with_count(u32::try_from(dropped).unwrap_or(u32::MAX)),
        );
        if let Some(publisher) = &rt.publisher {
            publisher.close().await;
        }
        self.history_token.cancel();

        let report = Report::collect(&rt.runtime_stats, &rt.daemon_stats, rt.cfg.percentile);
        rt.bus
            .publish(Event::new(EventKind::StatsReported).with_reason(report.to_string()));

        self.listener_token.cancel();
        let listener = self
            .listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = listener {
            let _ = handle.await;
        }
        report
    }

    /// Process-wide metrics: `Latency` and `TaskWait`.
    pub fn latency_stats(&self) -> Stats {
        self.rt.runtime_stats.clone()
    }

    /// One metric per daemon, keyed by display name.
    pub fn daemon_stats(&self) -> Stats {
        self.rt.daemon_stats.clone()
    }

    /// Snapshot history, when `history_interval` is set.
    pub fn history(&self) -> Option<Arc<History>> {
        self.history.clone()
    }

    /// Raw event stream (in addition to the configured subscribers).
    pub fn events(&self) -> broadcast::Receiver<Event> {
        self.rt.bus.subscribe()
    }

    /// Whether `stop` has begun.
    pub fn is_shutting_down(&self) -> bool {
        self.rt.shutdown_requested()
    }

    /// Names of the registered daemons, in registration order.
    pub fn daemon_names(&self) -> Vec<String> {
        self.daemons
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|d| d.name().to_string())
            .collect()
    }
}
