//! # Immutable statistics snapshot.
//!
//! A [`Snapshot`] is the materialized view of a metric at one point in time.
//! It stays valid after the metric is reset, which is what periodic history
//! collectors and the shutdown report rely on.

use std::fmt;
use std::time::{Duration, SystemTime};

use serde::Serialize;

/// Point-in-time statistics of one metric.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    /// Metric name.
    pub name: String,
    /// When the snapshot was taken.
    pub taken_at: SystemTime,
    /// Number of recorded samples since the last reset (not reservoir-bounded).
    pub processed: u64,
    /// Number of recorded errors since the last reset.
    pub errors: u64,
    /// Smallest sampled duration.
    pub min: Duration,
    /// Arithmetic mean of the sample.
    pub mean: Duration,
    /// Quantile used for [`Snapshot::percentile`] (e.g. `0.95`).
    pub quantile: f64,
    /// Value of the configured quantile.
    pub percentile: Duration,
    /// Largest sampled duration.
    pub max: Duration,
    /// Population standard deviation of the sample.
    pub std_dev: Duration,
}

impl Snapshot {
    /// Returns an all-zero snapshot for `name`.
    pub fn empty(name: impl Into<String>, quantile: f64) -> Self {
        Self {
            name: name.into(),
            taken_at: SystemTime::now(),
            processed: 0,
            errors: 0,
            min: Duration::ZERO,
            mean: Duration::ZERO,
            quantile,
            percentile: Duration::ZERO,
            max: Duration::ZERO,
            std_dev: Duration::ZERO,
        }
    }
}

impl fmt::Display for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = format!("{}%:", (self.quantile * 100.0).round());
        writeln!(f, "{} statistics:", self.name)?;
        writeln!(f, "Processed: {:>12}", self.processed)?;
        writeln!(f, "Errors:    {:>12}", self.errors)?;
        writeln!(f, "Min:       {:>12}", format_duration(self.min))?;
        writeln!(f, "Mean:      {:>12}", format_duration(self.mean))?;
        writeln!(f, "{label:<11}{:>12}", format_duration(self.percentile))?;
        writeln!(f, "Max:       {:>12}", format_duration(self.max))?;
        write!(f, "StdDev:    {:>12}", format_duration(self.std_dev))
    }
}

/// Renders a duration with a unit chosen by magnitude (ns, μs, ms, s).
pub fn format_duration(d: Duration) -> String {
    let ns = d.as_nanos() as f64;
    if ns < 1_000.0 {
        format!("{ns:.0}ns")
    } else if ns < 1_000_000.0 {
        format!("{:.3}μs", ns / 1_000.0)
    } else if ns < 1_000_000_000.0 {
        format!("{:.3}ms", ns / 1_000_000.0)
    } else {
        format!("{:.3}s", ns / 1_000_000_000.0)
    }
}
