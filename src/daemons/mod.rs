//! Daemons: long-lived units that feed the shared queue.
//!
//! - [`Daemon`] the trait implemented by user daemons
//! - [`Base`] state embedded in each daemon, wired at registration
//! - [`DaemonContext`] the daemon-facing API (enqueue, subscribe, publish, rate limit)

mod base;
mod daemon;
mod owner;
mod subscription;

pub use base::{Base, DaemonContext};
pub use daemon::Daemon;
pub use owner::PanicHandler;
pub(crate) use owner::Owner;
