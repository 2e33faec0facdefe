mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use common::{TestDaemon, count, drain, eventually};
use daemonvisor::{
    Config, EventKind, LATENCY, RestartBackoff, RuntimeError, Stats, StatsSink, Supervisor,
    TASK_WAIT, TaskError,
};

fn config() -> Config {
    Config {
        restart_backoff: RestartBackoff::immediate(),
        ..Config::default()
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn producer_feeds_general_tasks_through_the_pool() {
    let counter = Arc::new(AtomicUsize::new(0));
    let sup = Supervisor::builder(config()).build();

    let c = Arc::clone(&counter);
    let daemon = TestDaemon::new("Counter", move |ctx| {
        let producer = ctx.clone();
        let counter = Arc::clone(&c);
        ctx.enqueue_system("produce", move |_shutdown| {
            let ctx = producer.clone();
            let counter = Arc::clone(&counter);
            async move {
                for _ in 0..3 {
                    let counter = Arc::clone(&counter);
                    ctx.enqueue_general(async move {
                        counter.fetch_add(1, Ordering::SeqCst);
                        Ok::<(), TaskError>(())
                    })
                    .await?;
                }
                Ok::<(), TaskError>(())
            }
        })
    });
    sup.register(Arc::clone(&daemon)).expect("register");
    sup.start_workers(4).expect("workers");

    let seen = Arc::clone(&counter);
    eventually(move || seen.load(Ordering::SeqCst) == 3).await;
    let report = sup.stop().await;
    assert_eq!(counter.load(Ordering::SeqCst), 3);
    assert_eq!(report.daemon("Counter").map(|s| s.processed), Some(3));
    assert_eq!(report.latency.processed, 3);
    // one system task plus three general ones
    assert_eq!(report.task_wait.processed, 4);
    assert_eq!(daemon.shutdowns.load(Ordering::SeqCst), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn failed_general_task_is_counted_and_never_retried() {
    let runs = Arc::new(AtomicUsize::new(0));
    let handled = Arc::new(AtomicUsize::new(0));
    let sup = Supervisor::builder(config()).build();
    let mut events = sup.events();

    async fn boom() -> Result<(), TaskError> {
        panic!("general task exploded");
    }

    let (r, h) = (Arc::clone(&runs), Arc::clone(&handled));
    let daemon = TestDaemon::new("Fragile", move |ctx| {
        let h = Arc::clone(&h);
        ctx.set_panic_handler(move |err| {
            assert!(matches!(err, TaskError::Panicked { .. }));
            h.fetch_add(1, Ordering::SeqCst);
        });
        let producer = ctx.clone();
        let runs = Arc::clone(&r);
        ctx.enqueue_system("produce", move |_shutdown| {
            let ctx = producer.clone();
            let runs = Arc::clone(&runs);
            async move {
                ctx.enqueue_general_named("boom", async move {
                    runs.fetch_add(1, Ordering::SeqCst);
                    boom().await
                })
                .await?;
                ctx.enqueue_general(async { Ok::<(), TaskError>(()) }).await?;
                Ok::<(), TaskError>(())
            }
        })
    });
    sup.register(Arc::clone(&daemon)).expect("register");
    sup.start_workers(2).expect("workers");

    let metric = daemon.ctx().stats();
    eventually(move || metric.processed() + metric.errors() == 2).await;
    let report = sup.stop().await;
    let snap = report.daemon("Fragile").expect("daemon metric");
    assert_eq!(snap.errors, 1);
    assert_eq!(snap.processed, 1);
    assert_eq!(runs.load(Ordering::SeqCst), 1);
    assert_eq!(handled.load(Ordering::SeqCst), 1);

    let events = drain(&mut events);
    let failed: Vec<_> = events
        .iter()
        .filter(|e| e.kind == EventKind::TaskFailed)
        .collect();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].task.as_deref(), Some("Fragile[boom]"));
    assert!(failed[0].backtrace.is_some());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn failing_system_task_is_restarted() {
    let runs = Arc::new(AtomicUsize::new(0));
    let sup = Supervisor::builder(config()).build();
    let mut events = sup.events();

    let r = Arc::clone(&runs);
    let daemon = TestDaemon::new("Flaky", move |ctx| {
        let runs = Arc::clone(&r);
        ctx.enqueue_system("loop", move |_shutdown| {
            let runs = Arc::clone(&runs);
            async move {
                let n = runs.fetch_add(1, Ordering::SeqCst) + 1;
                if n < 3 {
                    panic!("attempt {n} failed");
                }
                Ok::<(), TaskError>(())
            }
        })
    });
    sup.register(daemon).expect("register");
    sup.start_workers(2).expect("workers");

    let seen = Arc::clone(&runs);
    eventually(move || seen.load(Ordering::SeqCst) >= 3).await;
    sup.stop().await;

    let events = drain(&mut events);
    assert_eq!(count(&events, EventKind::SystemTaskFailed), 2);
    assert_eq!(count(&events, EventKind::SystemTaskRestartScheduled), 2);
    let attempts: Vec<_> = events
        .iter()
        .filter(|e| e.kind == EventKind::SystemTaskStarting)
        .filter_map(|e| e.attempt)
        .collect();
    assert_eq!(attempts, vec![1, 2, 3]);
    let stopped = events
        .iter()
        .find(|e| e.kind == EventKind::SystemTaskStopped)
        .expect("stopped");
    assert_eq!(stopped.attempt, Some(3));
    assert_eq!(stopped.task.as_deref(), Some("Flaky[loop]"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn no_restart_once_shutdown_began() {
    let runs = Arc::new(AtomicUsize::new(0));
    let sup = Supervisor::builder(config()).build();
    let mut events = sup.events();

    let r = Arc::clone(&runs);
    let daemon = TestDaemon::new("Stubborn", move |ctx| {
        let runs = Arc::clone(&r);
        ctx.enqueue_system("loop", move |shutdown| {
            let runs = Arc::clone(&runs);
            async move {
                runs.fetch_add(1, Ordering::SeqCst);
                shutdown.cancelled().await;
                Err::<(), _>(TaskError::fail("gave up on the way out"))
            }
        })
    });
    sup.register(daemon).expect("register");
    sup.start_workers(2).expect("workers");

    let seen = Arc::clone(&runs);
    eventually(move || seen.load(Ordering::SeqCst) == 1).await;
    sup.stop().await;

    assert_eq!(runs.load(Ordering::SeqCst), 1);
    let events = drain(&mut events);
    assert_eq!(count(&events, EventKind::SystemTaskFailed), 1);
    assert_eq!(count(&events, EventKind::SystemTaskDropped), 1);
    assert_eq!(count(&events, EventKind::SystemTaskRestartScheduled), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn fatal_system_error_is_not_restarted() {
    let runs = Arc::new(AtomicUsize::new(0));
    let sup = Supervisor::builder(config()).build();
    let mut events = sup.events();

    let r = Arc::clone(&runs);
    let daemon = TestDaemon::new("Doomed", move |ctx| {
        let runs = Arc::clone(&r);
        ctx.enqueue_system("once", move |_shutdown| {
            let runs = Arc::clone(&runs);
            async move {
                runs.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(TaskError::fatal("bad configuration"))
            }
        })
    });
    sup.register(daemon).expect("register");
    sup.start_workers(1).expect("workers");

    let seen = Arc::clone(&runs);
    eventually(move || seen.load(Ordering::SeqCst) == 1).await;
    sup.stop().await;

    assert_eq!(runs.load(Ordering::SeqCst), 1);
    let events = drain(&mut events);
    assert_eq!(count(&events, EventKind::SystemTaskDead), 1);
    assert_eq!(count(&events, EventKind::SystemTaskRestartScheduled), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn stop_interrupts_sleeping_system_task() {
    let sup = Supervisor::builder(config()).build();
    let daemon = TestDaemon::new("Sleeper", move |ctx| {
        ctx.enqueue_system("nap", move |shutdown| async move {
            tokio::select! {
                _ = shutdown.cancelled() => Ok::<(), TaskError>(()),
                _ = tokio::time::sleep(Duration::from_secs(3600)) => Ok(()),
            }
        })
    });
    sup.register(Arc::clone(&daemon)).expect("register");
    sup.start_workers(2).expect("workers");

    let probe = sup.latency_stats();
    eventually(move || probe.fetch(TASK_WAIT).processed() == 1).await;
    let stopped = tokio::time::timeout(Duration::from_secs(5), sup.stop()).await;
    assert!(stopped.is_ok(), "stop hung on a sleeping system task");
    assert!(sup.is_shutting_down());

    let ctx = daemon.ctx();
    let late = ctx.enqueue_general(async { Ok::<(), TaskError>(()) }).await;
    assert!(matches!(late, Err(RuntimeError::QueueClosed)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn stop_is_idempotent_and_without_workers() {
    let sup = Supervisor::builder(config()).build();
    let mut events = sup.events();
    let daemon = TestDaemon::new("Idle", move |ctx| {
        ctx.enqueue_system("never", |_shutdown| async { Ok::<(), TaskError>(()) })
    });
    sup.register(daemon).expect("register");

    let first = tokio::time::timeout(Duration::from_secs(5), sup.stop())
        .await
        .expect("stop without workers");
    let second = sup.stop().await;
    assert_eq!(first.latency.processed, second.latency.processed);

    let events = drain(&mut events);
    assert_eq!(count(&events, EventKind::ShutdownRequested), 1);
    assert_eq!(count(&events, EventKind::StatsReported), 1);
    assert!(matches!(sup.start_workers(1), Err(RuntimeError::Stopped)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_records_are_not_lost() {
    let sup = Supervisor::builder(config()).build();
    let daemon = TestDaemon::new("Burst", move |ctx| {
        let producer = ctx.clone();
        ctx.enqueue_system("burst", move |_shutdown| {
            let ctx = producer.clone();
            async move {
                for _ in 0..200 {
                    ctx.enqueue_general(async {
                        tokio::task::yield_now().await;
                        Ok::<(), TaskError>(())
                    })
                    .await?;
                }
                Ok::<(), TaskError>(())
            }
        })
    });
    sup.register(daemon).expect("register");
    sup.start_workers(8).expect("workers");

    let probe = sup.latency_stats();
    eventually(move || probe.fetch(LATENCY).processed() == 200).await;
    let report = sup.stop().await;
    assert_eq!(report.latency.processed, 200);
    assert_eq!(report.daemon("Burst").map(|s| s.processed), Some(200));
    assert_eq!(sup.latency_stats().fetch(TASK_WAIT).processed(), 201);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn daemon_records_reach_the_external_sink() {
    let external = Stats::default();
    let sup = Supervisor::builder(config())
        .with_daemon_sink(Arc::new(external.clone()))
        .build();
    let daemon = TestDaemon::new("Mirrored", move |ctx| {
        let producer = ctx.clone();
        ctx.enqueue_system("emit", move |_shutdown| {
            let ctx = producer.clone();
            async move {
                ctx.enqueue_general(async { Ok::<(), TaskError>(()) }).await?;
                ctx.enqueue_general(async { Err::<(), _>(TaskError::fail("nope")) })
                    .await?;
                Ok::<(), TaskError>(())
            }
        })
    });
    sup.register(daemon).expect("register");
    sup.start_workers(2).expect("workers");

    let probe = external.clone();
    eventually(move || {
        let m = probe.fetch("Mirrored");
        m.processed() + m.errors() == 2
    })
    .await;
    sup.stop().await;

    let metric = external.fetch("Mirrored");
    assert_eq!(metric.processed(), 1);
    assert_eq!(metric.errors(), 1);
    assert_eq!(sup.latency_stats().fetch(LATENCY).processed(), 1);
}

/// Sink that blows up on every successful record.
struct ExplodingSink;

impl StatsSink for ExplodingSink {
    fn add(&self, name: &str, _dur: Duration) {
        panic!("sink rejected a record for {name}");
    }

    fn error(&self, _name: &str) {}
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn crashed_worker_is_replaced() {
    let sup = Supervisor::builder(config())
        .with_daemon_sink(Arc::new(ExplodingSink))
        .build();
    let mut events = sup.events();
    let daemon = TestDaemon::new("Crasher", move |ctx| {
        let producer = ctx.clone();
        ctx.enqueue_system("emit", move |_shutdown| {
            let ctx = producer.clone();
            async move {
                for _ in 0..3 {
                    ctx.enqueue_general(async { Ok::<(), TaskError>(()) }).await?;
                }
                Ok::<(), TaskError>(())
            }
        })
    });
    sup.register(Arc::clone(&daemon)).expect("register");
    sup.start_workers(1).expect("workers");

    let metric = daemon.ctx().stats();
    eventually(move || metric.processed() == 3).await;
    let report = sup.stop().await;

    assert_eq!(report.daemon("Crasher").map(|s| s.processed), Some(3));
    assert_eq!(report.latency.processed, 3);
    let events = drain(&mut events);
    assert_eq!(count(&events, EventKind::WorkerCrashed), 3);
    assert_eq!(count(&events, EventKind::WorkersStopped), 1);
}
