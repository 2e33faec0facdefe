//! Pacing policies: how long to wait before restarting a system task and how
//! fast a daemon may produce work.
//!
//! ## Contents
//! - [`RestartBackoff`] delay before a failed system task is re-queued
//! - [`Jitter`] randomization of that delay
//! - [`RateLimiter`] token bucket acquired before enqueueing general tasks
//!
//! ## Defaults
//! - `RestartBackoff::default()` → constant 100ms, no jitter.
//! - Rate limiting is off until a daemon calls `limit_rate`.

mod backoff;
mod jitter;
mod rate;

pub use backoff::RestartBackoff;
pub use jitter::Jitter;
pub use rate::{MIN_RATE, RateLimiter};
