//! Statistics engine: per-name duration histograms with error counters.
//!
//! ## Contents
//! - [`Stats`] registry of named metrics, lazily created (check-lock-check)
//! - [`Metric`] reservoir-backed histogram with min/mean/percentile/max/stddev
//! - [`Snapshot`] immutable point-in-time view, usable after a reset
//! - [`StatsSink`], [`StatsGroup`], [`Void`] destinations for daemon-scope records
//! - [`History`] periodic snapshot-and-reset collector
//!
//! Percentiles are approximate: each metric keeps a uniform reservoir of
//! `sample_size` values (1000 by default), while `processed` and `errors` are
//! exact counters since the last reset.

mod history;
mod metric;
mod registry;
mod reservoir;
mod sink;
mod snapshot;

pub use history::{DEFAULT_HISTORY_SIZE, History};
pub use metric::Metric;
pub use registry::{DEFAULT_PERCENTILE, DEFAULT_SAMPLE_SIZE, Stats};
pub use sink::{StatsGroup, StatsSink, Void};
pub use snapshot::{Snapshot, format_duration};

/// Process-wide metric: enqueue → completion of a general task.
pub const LATENCY: &str = "Latency";
/// Process-wide metric: enqueue → dequeue of any task.
pub const TASK_WAIT: &str = "TaskWait";
