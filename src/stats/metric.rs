//! # A single named metric: duration reservoir plus counters.
//!
//! All state sits behind one mutex so that `record`, `record_error`, `reset`
//! and `snapshot` are linearized per metric. Different metrics never contend.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, SystemTime};

use super::reservoir::Reservoir;
use super::snapshot::Snapshot;

#[derive(Debug)]
struct MetricState {
    sample: Reservoir,
    processed: u64,
    errors: u64,
}

/// Histogram and error counter for one metric name.
///
/// Obtained from [`Stats::fetch`](crate::Stats::fetch). Accessors compute
/// their value from the current reservoir contents on each call; use
/// [`Metric::snapshot`] to read everything consistently at once.
#[derive(Debug)]
pub struct Metric {
    name: String,
    quantile: f64,
    state: Mutex<MetricState>,
}

impl Metric {
    pub(crate) fn new(name: impl Into<String>, sample_size: usize, quantile: f64) -> Self {
        Self {
            name: name.into(),
            quantile,
            state: Mutex::new(MetricState {
                sample: Reservoir::new(sample_size),
                processed: 0,
                errors: 0,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MetricState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Metric name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Records one duration sample.
    pub fn record(&self, dur: Duration) {
        let nanos = u64::try_from(dur.as_nanos()).unwrap_or(u64::MAX);
        let mut state = self.lock();
        state.processed += 1;
        state.sample.update(nanos);
    }

    /// Increments the error counter.
    pub fn record_error(&self) {
        self.lock().errors += 1;
    }

    /// Clears the reservoir and both counters.
    pub fn reset(&self) {
        let mut state = self.lock();
        state.sample.clear();
        state.processed = 0;
        state.errors = 0;
    }

    /// Number of samples recorded since the last reset.
    pub fn processed(&self) -> u64 {
        self.lock().processed
    }

    /// Number of errors recorded since the last reset.
    pub fn errors(&self) -> u64 {
        self.lock().errors
    }

    pub fn min(&self) -> Duration {
        Duration::from_nanos(self.lock().sample.min())
    }

    pub fn max(&self) -> Duration {
        Duration::from_nanos(self.lock().sample.max())
    }

    pub fn mean(&self) -> Duration {
        nanos_f64(self.lock().sample.mean())
    }

    /// Value of the configured quantile (95th by default).
    pub fn percentile(&self) -> Duration {
        self.quantile(self.quantile)
    }

    /// Value of an arbitrary quantile `p` in `0.0..=1.0`.
    pub fn quantile(&self, p: f64) -> Duration {
        nanos_f64(self.lock().sample.percentile(p))
    }

    pub fn std_dev(&self) -> Duration {
        nanos_f64(self.lock().sample.std_dev())
    }

    /// Materializes the current statistics into an immutable value.
    pub fn snapshot(&self) -> Snapshot {
        self.materialize(&self.lock())
    }

    /// Takes a snapshot and resets the metric under the same lock.
    pub(crate) fn snapshot_and_reset(&self) -> Snapshot {
        let mut state = self.lock();
        let snap = self.materialize(&state);
        state.sample.clear();
        state.processed = 0;
        state.errors = 0;
        snap
    }

    fn materialize(&self, state: &MetricState) -> Snapshot {
        Snapshot {
            name: self.name.clone(),
            taken_at: SystemTime::now(),
            processed: state.processed,
            errors: state.errors,
            min: Duration::from_nanos(state.sample.min()),
            mean: nanos_f64(state.sample.mean()),
            quantile: self.quantile,
            percentile: nanos_f64(state.sample.percentile(self.quantile)),
            max: Duration::from_nanos(state.sample.max()),
            std_dev: nanos_f64(state.sample.std_dev()),
        }
    }
}

fn nanos_f64(ns: f64) -> Duration {
    if ns.is_finite() && ns > 0.0 {
        Duration::from_nanos(ns.round() as u64)
    } else {
        Duration::ZERO
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn processed_counter_is_not_bounded_by_the_sample() {
        let m = Metric::new("Latency", 10, 0.95);
        for i in 0..25 {
            m.record(Duration::from_millis(i));
        }
        assert_eq!(m.processed(), 25);
    }

    #[test]
    fn snapshot_survives_reset() {
        let m = Metric::new("Latency", 100, 0.95);
        m.record(Duration::from_millis(10));
        m.record(Duration::from_millis(30));
        m.record_error();

        let snap = m.snapshot();
        m.reset();

        assert_eq!(snap.processed, 2);
        assert_eq!(snap.errors, 1);
        assert_eq!(snap.min, Duration::from_millis(10));
        assert_eq!(snap.max, Duration::from_millis(30));
        assert_eq!(snap.mean, Duration::from_millis(20));
        assert_eq!(m.processed(), 0);
        assert_eq!(m.errors(), 0);
        assert_eq!(m.max(), Duration::ZERO);
    }
}
