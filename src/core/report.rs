//! Statistics returned by `Supervisor::stop`.

use std::fmt;

use serde::Serialize;

use crate::stats::{LATENCY, Snapshot, Stats, TASK_WAIT};

/// Final statistics of a supervisor run.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    /// Enqueue → completion of successful general tasks.
    pub latency: Snapshot,
    /// Enqueue → dequeue of every task.
    pub task_wait: Snapshot,
    /// One snapshot per daemon, sorted by name.
    pub daemons: Vec<Snapshot>,
}

impl Report {
    pub(crate) fn collect(runtime: &Stats, daemons: &Stats, quantile: f64) -> Self {
        let take = |name: &str| {
            runtime
                .get(name)
                .map(|m| m.snapshot())
                .unwrap_or_else(|| Snapshot::empty(name, quantile))
        };
        Self {
            latency: take(LATENCY),
            task_wait: take(TASK_WAIT),
            daemons: daemons.snapshot(),
        }
    }

    /// Snapshot of the daemon named `name`.
    pub fn daemon(&self, name: &str) -> Option<&Snapshot> {
        self.daemons.iter().find(|s| s.name == name)
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\n\n{}", self.latency, self.task_wait)?;
        for snap in &self.daemons {
            write!(f, "\n\n{snap}")?;
        }
        Ok(())
    }
}
