//! # Delay between restarts of a system task.
//!
//! A failed system task is re-queued after `first × factor^restarts`, capped at
//! `max`, then jittered. `restarts` counts how many times that particular task
//! has already been restarted, so a task that keeps failing slows down while
//! other tasks keep the short delay.
//!
//! ```rust
//! use std::time::Duration;
//! use daemonvisor::{Jitter, RestartBackoff};
//!
//! let backoff = RestartBackoff {
//!     first: Duration::from_millis(50),
//!     max: Duration::from_secs(2),
//!     factor: 2.0,
//!     jitter: Jitter::None,
//! };
//! assert_eq!(backoff.next(0), Duration::from_millis(50));
//! assert_eq!(backoff.next(3), Duration::from_millis(400));
//! assert_eq!(backoff.next(20), Duration::from_secs(2));
//! ```

use std::time::Duration;

use super::jitter::Jitter;

/// Restart delay policy for system tasks.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RestartBackoff {
    /// Delay before the first restart. `Duration::ZERO` re-queues immediately.
    pub first: Duration,
    /// Upper bound for any delay.
    pub max: Duration,
    /// Growth per restart; `1.0` keeps the delay constant.
    pub factor: f64,
    pub jitter: Jitter,
}

impl Default for RestartBackoff {
    /// Constant 100ms, no jitter.
    fn default() -> Self {
        Self::constant(Duration::from_millis(100))
    }
}

impl RestartBackoff {
    /// Same delay for every restart.
    pub fn constant(delay: Duration) -> Self {
        Self {
            first: delay,
            max: delay,
            factor: 1.0,
            jitter: Jitter::None,
        }
    }

    /// Restart without any delay.
    pub fn immediate() -> Self {
        Self::constant(Duration::ZERO)
    }

    /// Delay before restart number `restarts + 1`.
    pub fn next(&self, restarts: u32) -> Duration {
        let exp = i32::try_from(restarts).unwrap_or(i32::MAX);
        let secs = self.first.as_secs_f64() * self.factor.powi(exp);
        let base = if secs.is_finite() && secs >= 0.0 && secs <= self.max.as_secs_f64() {
            Duration::from_secs_f64(secs)
        } else {
            self.max
        };
        self.jitter.apply(base)
    }
}
