//! # Named metrics registry.
//!
//! [`Stats`] maps metric names to [`Metric`]s. Metrics are created lazily on
//! first use through a check-lock-check path: a read lock answers the common
//! case, and only a missing name takes the write lock, where the entry API
//! makes sure concurrent first-writers end up sharing one metric.
//!
//! ```text
//! record("Latency", d)
//!   ├─► read lock: hit  ──► metric.record(d)        (metric-level mutex)
//!   └─► miss ──► write lock ──► entry(name).or_insert ──► metric.record(d)
//! ```

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use super::metric::Metric;
use super::sink::StatsSink;
use super::snapshot::Snapshot;

/// Default reservoir capacity per metric.
pub const DEFAULT_SAMPLE_SIZE: usize = 1000;
/// Default quantile reported as `percentile`.
pub const DEFAULT_PERCENTILE: f64 = 0.95;

/// Registry of named duration metrics with error counters.
///
/// Cheap to clone; clones share the same metrics.
#[derive(Clone, Debug)]
pub struct Stats {
    inner: Arc<StatsInner>,
}

#[derive(Debug)]
struct StatsInner {
    sample_size: usize,
    quantile: f64,
    metrics: RwLock<HashMap<String, Arc<Metric>>>,
}

impl Default for Stats {
    fn default() -> Self {
        Self::new(DEFAULT_SAMPLE_SIZE, DEFAULT_PERCENTILE)
    }
}

impl Stats {
    /// Creates a registry whose metrics keep `sample_size` samples and report the `quantile`.
    pub fn new(sample_size: usize, quantile: f64) -> Self {
        Self {
            inner: Arc::new(StatsInner {
                sample_size: sample_size.max(1),
                quantile: quantile.clamp(0.0, 1.0),
                metrics: RwLock::new(HashMap::new()),
            }),
        }
    }

    /// Records a duration sample for `name`.
    pub fn record(&self, name: &str, dur: Duration) {
        self.metric(name).record(dur);
    }

    /// Increments the error counter of `name`.
    pub fn record_error(&self, name: &str) {
        self.metric(name).record_error();
    }

    /// Returns the live metric for `name`, creating it if needed.
    pub fn fetch(&self, name: &str) -> Arc<Metric> {
        self.metric(name)
    }

    /// Returns the metric for `name` only if it already exists.
    pub fn get(&self, name: &str) -> Option<Arc<Metric>> {
        self.inner
            .metrics
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    /// Clears the reservoir and counters of `name`, keeping its registration.
    pub fn reset(&self, name: &str) {
        if let Some(m) = self.get(name) {
            m.reset();
        }
    }

    /// Resets every registered metric.
    pub fn reset_all(&self) {
        for m in self.metrics() {
            m.reset();
        }
    }

    /// Materializes every metric, sorted by name.
    pub fn snapshot(&self) -> Vec<Snapshot> {
        self.metrics().iter().map(|m| m.snapshot()).collect()
    }

    /// Materializes and resets every metric, sorted by name.
    pub fn snapshot_and_reset(&self) -> Vec<Snapshot> {
        self.metrics()
            .iter()
            .map(|m| m.snapshot_and_reset())
            .collect()
    }

    /// Returns sorted metric names.
    pub fn names(&self) -> Vec<String> {
        self.metrics().iter().map(|m| m.name().to_string()).collect()
    }

    fn metrics(&self) -> Vec<Arc<Metric>> {
        let mut all: Vec<Arc<Metric>> = self
            .inner
            .metrics
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();
        all.sort_unstable_by(|a, b| a.name().cmp(b.name()));
        all
    }

    pub(crate) fn metric(&self, name: &str) -> Arc<Metric> {
        if let Some(m) = self.get(name) {
            return m;
        }
        let mut metrics = self
            .inner
            .metrics
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let metric = metrics.entry(name.to_string()).or_insert_with(|| {
            Arc::new(Metric::new(
                name,
                self.inner.sample_size,
                self.inner.quantile,
            ))
        });
        Arc::clone(metric)
    }
}

impl StatsSink for Stats {
    fn add(&self, name: &str, dur: Duration) {
        self.record(name, dur);
    }

    fn error(&self, name: &str) {
        self.record_error(name);
    }
}
