//! # Example: Number Printer
//!
//! One daemon, one supervised generator, many one-shot printers.
//!
//! The generator (a system task) draws random numbers and enqueues a general
//! task for each, throttled to 20 per second. Every seventh printer panics;
//! the panic is contained, counted in the daemon's statistics and handed to
//! the panic handler, while the generator keeps going. The generator itself
//! crashes now and then and is restarted by the supervisor.
//!
//! Runs for five seconds (or until Ctrl-C), then prints the final report.
//!
//! ```text
//! RUST_LOG=info cargo run --example number_printer
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use daemonvisor::{
    Base, Config, Daemon, LogWriter, RestartBackoff, RuntimeError, Supervisor, TaskError,
};
use tracing_subscriber::EnvFilter;

#[derive(Default)]
struct NumberPrinter {
    base: Base,
    printed: AtomicU64,
}

#[async_trait]
impl Daemon for NumberPrinter {
    fn name(&self) -> &str {
        "NumberPrinter"
    }

    fn base(&self) -> &Base {
        &self.base
    }

    async fn startup(self: Arc<Self>) -> Result<(), RuntimeError> {
        let ctx = self.base.context()?.clone();
        ctx.limit_rate(20, Duration::from_secs(1));
        ctx.set_panic_handler(|err| eprintln!("printer failed: {err}"));

        let this = Arc::clone(&self);
        let producer = ctx.clone();
        ctx.enqueue_system("generator", move |shutdown| {
            let ctx = producer.clone();
            let this = Arc::clone(&this);
            async move {
                while !shutdown.is_cancelled() {
                    let n: u32 = rand::random_range(0..1000);
                    if n == 999 {
                        panic!("generator drew {n}");
                    }

                    let this = Arc::clone(&this);
                    ctx.enqueue_general_named("print", async move {
                        let seq = this.printed.fetch_add(1, Ordering::Relaxed) + 1;
                        if seq % 7 == 0 {
                            panic!("refusing to print number #{seq}");
                        }
                        println!("#{seq}: {n}");
                        Ok::<(), TaskError>(())
                    })
                    .await?;
                }
                Ok::<(), TaskError>(())
            }
        })
    }

    async fn shutdown(&self) {
        println!(
            "NumberPrinter shutting down after {} numbers",
            self.printed.load(Ordering::Relaxed)
        );
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cfg = Config {
        workers: 8,
        restart_backoff: RestartBackoff::constant(Duration::from_millis(250)),
        ..Config::default()
    };
    let sup = Supervisor::builder(cfg)
        .with_subscribers(vec![Arc::new(LogWriter)])
        .build();

    sup.register(Arc::new(NumberPrinter::default()))?;
    sup.start()?;

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = tokio::time::sleep(Duration::from_secs(5)) => {}
    }

    let report = sup.stop().await;
    println!("\n{report}");
    Ok(())
}
