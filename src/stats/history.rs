//! # Periodic statistics history.
//!
//! [`History`] turns live metrics into a time series: every tick it snapshots
//! and resets each source registry, appending one [`Snapshot`] per metric to a
//! bounded ring (oldest entries are evicted first).
//!
//! ```text
//! every interval:
//!   for stats in sources:
//!     for snap in stats.snapshot_and_reset():
//!       ring[snap.name].push_back(snap)   (pop_front when full)
//! ```

use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::registry::Stats;
use super::snapshot::Snapshot;

/// Default history length: 30 minutes of 5 second snapshots.
pub const DEFAULT_HISTORY_SIZE: usize = 360;

/// Bounded per-metric series of snapshots.
#[derive(Debug)]
pub struct History {
    capacity: usize,
    series: Mutex<BTreeMap<String, VecDeque<Snapshot>>>,
}

impl Default for History {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_SIZE)
    }
}

impl History {
    /// Creates an empty history keeping at most `capacity` snapshots per metric.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            series: Mutex::new(BTreeMap::new()),
        }
    }

    /// Snapshots and resets every metric of `stats`, appending to the series.
    pub fn collect(&self, stats: &Stats) {
        let snaps = stats.snapshot_and_reset();
        let mut series = self.series.lock().unwrap_or_else(PoisonError::into_inner);
        for snap in snaps {
            let ring = series.entry(snap.name.clone()).or_default();
            if ring.len() >= self.capacity {
                ring.pop_front();
            }
            ring.push_back(snap);
        }
    }

    /// Returns the series recorded for `name`, oldest first.
    pub fn get(&self, name: &str) -> Vec<Snapshot> {
        self.series
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .map(|ring| ring.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Returns every series keyed by metric name.
    pub fn all(&self) -> BTreeMap<String, Vec<Snapshot>> {
        self.series
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(name, ring)| (name.clone(), ring.iter().cloned().collect()))
            .collect()
    }

    /// Renders every series as JSON.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.all())
    }

    /// Spawns the collector loop; it stops when `token` is cancelled.
    pub fn spawn(
        self: Arc<Self>,
        sources: Vec<Stats>,
        interval: Duration,
        token: CancellationToken,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        for stats in &sources {
                            self.collect(stats);
                        }
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ring_evicts_oldest_snapshot() {
        let history = History::new(2);
        let stats = Stats::default();
        for n in 1..=3u64 {
            for _ in 0..n {
                stats.record("Latency", Duration::from_millis(1));
            }
            history.collect(&stats);
        }
        let series = history.get("Latency");
        assert_eq!(series.len(), 2);
        assert_eq!(series[0].processed, 2);
        assert_eq!(series[1].processed, 3);
        assert_eq!(stats.fetch("Latency").processed(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn collector_ticks_until_cancelled() {
        let history = Arc::new(History::new(10));
        let stats = Stats::default();
        let token = CancellationToken::new();
        let handle = Arc::clone(&history).spawn(
            vec![stats.clone()],
            Duration::from_secs(5),
            token.clone(),
        );

        stats.record("Latency", Duration::from_millis(3));
        tokio::time::sleep(Duration::from_secs(11)).await;
        token.cancel();
        handle.await.expect("collector");

        let series = history.get("Latency");
        assert_eq!(series.len(), 2);
        assert_eq!(series[0].processed, 1);
        assert_eq!(series[1].processed, 0);
        assert!(history.to_json().expect("json").contains("Latency"));
    }
}
