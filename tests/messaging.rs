mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use common::{TestDaemon, count, drain, eventually};
use daemonvisor::{
    Config, EventKind, MemoryBroker, MessageStream, RuntimeError, Subscriber, Supervisor, TaskError,
    handlers,
};
use serde::Deserialize;

#[derive(Deserialize)]
struct Number {
    n: u64,
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn subscription_turns_messages_into_general_tasks() {
    let broker = MemoryBroker::new();
    for n in 1..=3 {
        broker
            .send("numbers", format!(r#"{{"n":{n}}}"#))
            .expect("send");
    }
    broker.send("numbers", "garbage").expect("send");
    broker.close_topic("numbers");

    let sup = Supervisor::builder(Config::default())
        .with_consumer(Arc::new(broker.clone()))
        .build();
    let mut events = sup.events();

    let sum = Arc::new(AtomicU64::new(0));
    let s = Arc::clone(&sum);
    let daemon = TestDaemon::new("Adder", move |ctx| {
        let sum = Arc::clone(&s);
        ctx.subscribe(
            "numbers",
            handlers::json(move |msg: Number| {
                let sum = Arc::clone(&sum);
                async move {
                    sum.fetch_add(msg.n, Ordering::SeqCst);
                    Ok::<(), TaskError>(())
                }
            }),
        )
    });
    sup.register(Arc::clone(&daemon)).expect("register");
    sup.start_workers(4).expect("workers");

    let metric = daemon.ctx().stats();
    let m = Arc::clone(&metric);
    eventually(move || m.processed() + m.errors() == 4).await;
    sup.stop().await;

    assert_eq!(sum.load(Ordering::SeqCst), 6);
    assert_eq!(metric.processed(), 3);
    assert_eq!(metric.errors(), 1);

    let events = drain(&mut events);
    let stopped = events
        .iter()
        .find(|e| e.kind == EventKind::SystemTaskStopped)
        .expect("subscription loop ended with its stream");
    assert_eq!(stopped.task.as_deref(), Some("Adder[subscription numbers]"));
    let failed = events
        .iter()
        .find(|e| e.kind == EventKind::TaskFailed)
        .expect("undecodable payload");
    assert_eq!(failed.task.as_deref(), Some("Adder[numbers]"));
}

#[tokio::test]
async fn subscribe_and_publish_need_a_backend() {
    let sup = Supervisor::builder(Config::default()).build();
    let daemon = TestDaemon::new("Bare", |_ctx| Ok(()));
    sup.register(Arc::clone(&daemon)).expect("register");

    let ctx = daemon.ctx();
    let handler = handlers::raw(|_bytes: Vec<u8>| async { Ok::<(), TaskError>(()) });
    assert!(matches!(
        ctx.subscribe("anything", handler),
        Err(RuntimeError::MissingSubscriber)
    ));
    assert!(matches!(
        ctx.publish(b"hello".to_vec()).await,
        Err(RuntimeError::MissingPublisher)
    ));
    sup.stop().await;
}

#[tokio::test]
async fn publish_reaches_the_broker_and_closes_on_stop() {
    let broker = MemoryBroker::new();
    let sup = Supervisor::builder(Config::default())
        .with_publisher(broker.publisher("out"))
        .build();
    let mut events = sup.events();
    let daemon = TestDaemon::new("Emitter", |_ctx| Ok(()));
    sup.register(Arc::clone(&daemon)).expect("register");
    sup.start_workers(1).expect("workers");

    daemon.ctx().publish("hello").await.expect("publish");
    sup.stop().await;

    let mut stream = broker.subscribe("check", "out").await.expect("subscribe");
    assert_eq!(stream.next().await.as_deref(), Some(&b"hello"[..]));
    assert_eq!(stream.next().await, None);
    assert!(daemon.ctx().publish("late").await.is_err());

    let events = drain(&mut events);
    assert_eq!(count(&events, EventKind::DaemonStartupFailed), 0);
}

#[tokio::test(start_paused = true)]
async fn stop_is_not_held_up_by_a_throttled_subscription() {
    let broker = MemoryBroker::new();
    for n in 0u8..3 {
        broker.send("slow", vec![n]).expect("send");
    }

    let sup = Supervisor::builder(Config::default())
        .with_consumer(Arc::new(broker.clone()))
        .build();
    let handled = Arc::new(AtomicU64::new(0));
    let h = Arc::clone(&handled);
    let daemon = TestDaemon::new("Trickle", move |ctx| {
        ctx.limit_rate(1, Duration::from_secs(3600));
        let handled = Arc::clone(&h);
        ctx.subscribe(
            "slow",
            handlers::raw(move |_bytes: Vec<u8>| {
                let handled = Arc::clone(&handled);
                async move {
                    handled.fetch_add(1, Ordering::SeqCst);
                    Ok::<(), TaskError>(())
                }
            }),
        )
    });
    sup.register(daemon).expect("register");
    sup.start_workers(2).expect("workers");

    let seen = Arc::clone(&handled);
    eventually(move || seen.load(Ordering::SeqCst) == 1).await;

    // the second message now waits an hour for the limiter
    let stopped = tokio::time::timeout(Duration::from_secs(60), sup.stop()).await;
    assert!(stopped.is_ok(), "stop waited for the rate limiter");
    assert_eq!(handled.load(Ordering::SeqCst), 1);
}
