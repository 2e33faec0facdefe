//! # Runtime configuration.
//!
//! [`Config`] holds every knob of the supervisor. All fields are public;
//! use the accessors instead of repeating sentinel checks.
//!
//! ## Sentinel values
//! - `workers = 0` → `Supervisor::start` spawns [`DEFAULT_WORKERS`]
//! - `history_interval = 0s` → no history collector
//! - `bus_capacity`, `sample_size`, `history_size` are clamped to at least 1

use std::time::Duration;

use crate::policies::RestartBackoff;
use crate::stats::{DEFAULT_HISTORY_SIZE, DEFAULT_PERCENTILE, DEFAULT_SAMPLE_SIZE};

/// Number of workers spawned by `Supervisor::start`.
pub const DEFAULT_WORKERS: usize = 100;

/// Global configuration for the supervisor runtime.
#[derive(Clone, Debug)]
pub struct Config {
    /// Worker pool size used by `Supervisor::start` (`0` = [`DEFAULT_WORKERS`]).
    pub workers: usize,

    /// Capacity of the event bus ring buffer. Lagging subscribers skip older events.
    pub bus_capacity: usize,

    /// Reservoir size of every metric.
    pub sample_size: usize,

    /// Quantile reported as the percentile of every metric (`0.95` = p95).
    pub percentile: f64,

    /// Delay before a failed system task is put back into the queue.
    pub restart_backoff: RestartBackoff,

    /// When the worker signal fires, finish general tasks already in the queue.
    pub drain_on_stop: bool,

    /// Period of the statistics history collector (`0s` = disabled).
    ///
    /// Every collection resets the live metrics, so with the collector enabled
    /// the `Report` returned by `stop()` covers only the time since the last
    /// collection; earlier intervals are in `Supervisor::history`.
    pub history_interval: Duration,

    /// Snapshots kept per metric by the history collector.
    pub history_size: usize,
}

impl Config {
    #[inline]
    pub fn worker_count(&self) -> usize {
        if self.workers == 0 {
            DEFAULT_WORKERS
        } else {
            self.workers
        }
    }

    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }

    /// Returns the history period, or `None` when the collector is disabled.
    #[inline]
    pub fn history(&self) -> Option<Duration> {
        if self.history_interval.is_zero() {
            None
        } else {
            Some(self.history_interval)
        }
    }
}

impl Default for Config {
    /// - `workers = 100`
    /// - `bus_capacity = 1024`
    /// - `sample_size = 1000`, `percentile = 0.95`
    /// - `restart_backoff` = constant 100ms
    /// - `drain_on_stop = true`
    /// - history disabled, `history_size = 360`
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            bus_capacity: 1024,
            sample_size: DEFAULT_SAMPLE_SIZE,
            percentile: DEFAULT_PERCENTILE,
            restart_backoff: RestartBackoff::default(),
            drain_on_stop: true,
            history_interval: Duration::ZERO,
            history_size: DEFAULT_HISTORY_SIZE,
        }
    }
}
