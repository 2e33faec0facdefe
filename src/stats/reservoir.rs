//! # Fixed-capacity uniform reservoir of duration samples.
//!
//! Implements Vitter's Algorithm R: the first `capacity` values are kept
//! verbatim; afterwards the n-th value replaces a random slot with probability
//! `capacity / n`. Every value seen since the last reset has the same chance of
//! being in the sample, and memory never grows past `capacity`.
//!
//! Percentiles are computed from the sorted sample with linear interpolation
//! between the closest ranks (`pos = p × (len + 1)`).

use rand::Rng;

/// Uniform sample of nanosecond values.
#[derive(Debug, Clone)]
pub(crate) struct Reservoir {
    capacity: usize,
    seen: u64,
    values: Vec<u64>,
}

impl Reservoir {
    pub(crate) fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            seen: 0,
            values: Vec::with_capacity(capacity.min(1024)),
        }
    }

    /// Offers a value to the reservoir.
    pub(crate) fn update(&mut self, value: u64) {
        self.seen += 1;
        if self.values.len() < self.capacity {
            self.values.push(value);
            return;
        }
        let slot = rand::rng().random_range(0..self.seen);
        if let Ok(slot) = usize::try_from(slot) {
            if slot < self.capacity {
                self.values[slot] = value;
            }
        }
    }

    pub(crate) fn clear(&mut self) {
        self.seen = 0;
        self.values.clear();
    }

    pub(crate) fn len(&self) -> usize {
        self.values.len()
    }

    pub(crate) fn min(&self) -> u64 {
        self.values.iter().copied().min().unwrap_or(0)
    }

    pub(crate) fn max(&self) -> u64 {
        self.values.iter().copied().max().unwrap_or(0)
    }

    pub(crate) fn mean(&self) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }
        let sum: u128 = self.values.iter().map(|v| u128::from(*v)).sum();
        sum as f64 / self.values.len() as f64
    }

    /// Population standard deviation of the sample.
    pub(crate) fn std_dev(&self) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }
        let mean = self.mean();
        let variance = self
            .values
            .iter()
            .map(|v| {
                let d = *v as f64 - mean;
                d * d
            })
            .sum::<f64>()
            / self.values.len() as f64;
        variance.sqrt()
    }

    /// Returns the `p`-quantile (`0.0..=1.0`) of the sample.
    pub(crate) fn percentile(&self, p: f64) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }
        let mut sorted = self.values.clone();
        sorted.sort_unstable();

        let len = sorted.len();
        let pos = p.clamp(0.0, 1.0) * (len + 1) as f64;
        if pos < 1.0 {
            sorted[0] as f64
        } else if pos >= len as f64 {
            sorted[len - 1] as f64
        } else {
            let lower = sorted[pos as usize - 1] as f64;
            let upper = sorted[pos as usize] as f64;
            lower + (pos - pos.floor()) * (upper - lower)
        }
    }
}
