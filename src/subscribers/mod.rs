//! # Event subscribers for the daemonvisor runtime.
//!
//! ```text
//!   Worker ── publish(Event) ──► Bus ──► supervisor listener ──► SubscriberSet
//!                                                                    │
//!                                                  ┌─────────────────┼──────────┐
//!                                                  ▼                 ▼          ▼
//!                                              LogWriter          Metrics     Custom
//! ```
//!
//! Subscribers are the runtime's logger: the core never writes to stdout
//! itself. With no subscribers configured, events are dropped.

#[cfg(feature = "logging")]
mod log;
mod set;
mod subscribe;

#[cfg(feature = "logging")]
pub use log::LogWriter;
pub use set::SubscriberSet;
pub use subscribe::Subscribe;
