//! # Randomization of restart delays.
//!
//! When many system tasks fail at once (for example, a shared backend goes
//! down) their restarts would otherwise line up. [`Jitter`] spreads them.

use std::time::Duration;

use rand::Rng;

/// How a restart delay is randomized.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Jitter {
    /// Use the delay as is.
    #[default]
    None,
    /// Uniform in `[0, delay]`.
    Full,
    /// `delay / 2` plus uniform in `[0, delay / 2]`.
    Equal,
}

impl Jitter {
    /// Returns `delay` randomized according to the policy.
    pub fn apply(self, delay: Duration) -> Duration {
        let ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        match self {
            Jitter::None => delay,
            Jitter::Full if ms == 0 => Duration::ZERO,
            Jitter::Full => Duration::from_millis(rand::rng().random_range(0..=ms)),
            Jitter::Equal => {
                let half = ms / 2;
                if half == 0 {
                    return Duration::from_millis(ms);
                }
                Duration::from_millis(half + rand::rng().random_range(0..=half))
            }
        }
    }
}
