//! # OS termination signals.
//!
//! [`wait_for_signal`] resolves with the name of the first termination signal
//! the process receives: `SIGINT`, `SIGTERM` or `SIGQUIT` on Unix, Ctrl-C
//! elsewhere. Listeners are registered per call.

use std::io;

#[cfg(unix)]
pub(crate) async fn wait_for_signal() -> io::Result<&'static str> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut int = signal(SignalKind::interrupt())?;
    let mut term = signal(SignalKind::terminate())?;
    let mut quit = signal(SignalKind::quit())?;

    let name = tokio::select! {
        _ = int.recv() => "SIGINT",
        _ = term.recv() => "SIGTERM",
        _ = quit.recv() => "SIGQUIT",
    };
    Ok(name)
}

#[cfg(not(unix))]
pub(crate) async fn wait_for_signal() -> io::Result<&'static str> {
    tokio::signal::ctrl_c().await?;
    Ok("Ctrl-C")
}
