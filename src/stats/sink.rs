//! # Statistics sinks.
//!
//! A [`StatsSink`] receives daemon-scope records (`add` per completed task,
//! `error` per failed task). [`Stats`](crate::Stats) is a sink; [`StatsGroup`]
//! fans records out to several sinks; [`Void`] discards them.

use std::sync::Arc;
use std::time::Duration;

/// Destination for duration samples and error counts.
pub trait StatsSink: Send + Sync + 'static {
    /// Records a duration for `name`.
    fn add(&self, name: &str, dur: Duration);
    /// Records an error for `name`.
    fn error(&self, name: &str);
}

/// Sink that forwards every record to all of its backends.
#[derive(Clone, Default)]
pub struct StatsGroup {
    backends: Vec<Arc<dyn StatsSink>>,
}

impl StatsGroup {
    pub fn new(backends: Vec<Arc<dyn StatsSink>>) -> Self {
        Self { backends }
    }

    pub fn len(&self) -> usize {
        self.backends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }
}

impl StatsSink for StatsGroup {
    fn add(&self, name: &str, dur: Duration) {
        for b in &self.backends {
            b.add(name, dur);
        }
    }

    fn error(&self, name: &str) {
        for b in &self.backends {
            b.error(name);
        }
    }
}

/// Sink that discards everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct Void;

impl StatsSink for Void {
    fn add(&self, _name: &str, _dur: Duration) {}
    fn error(&self, _name: &str) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Stats;

    #[test]
    fn group_forwards_to_every_backend() {
        let a = Stats::default();
        let b = Stats::default();
        let group = StatsGroup::new(vec![Arc::new(a.clone()), Arc::new(b.clone()), Arc::new(Void)]);
        assert_eq!(group.len(), 3);

        group.add("x", Duration::from_secs(5));
        group.error("x");

        for s in [a, b] {
            let m = s.fetch("x");
            assert_eq!(m.processed(), 1);
            assert_eq!(m.errors(), 1);
            assert_eq!(m.max(), Duration::from_secs(5));
        }
    }
}
