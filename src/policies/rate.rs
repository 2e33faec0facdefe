//! # Token-bucket throttle for task producers.
//!
//! A [`RateLimiter`] yields `count / window` tokens per second into a bucket
//! that holds a single token, so admissions are paced evenly rather than
//! released in bursts. It throttles the loop that *creates* tasks; workers
//! never call [`RateLimiter::acquire`].
//!
//! A caller that finds the bucket empty reserves its token up front (the
//! balance goes negative) and sleeps outside the lock, so concurrent callers
//! queue up one interval apart instead of waking together.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use tokio::time::Instant;

/// Rate used when the configured one is not positive.
pub const MIN_RATE: f64 = 1.0;

#[derive(Debug)]
struct Bucket {
    tokens: f64,
    last: Instant,
}

/// Strict-pacing token bucket.
#[derive(Debug)]
pub struct RateLimiter {
    rate: f64,
    clamped: bool,
    bucket: Mutex<Bucket>,
}

impl RateLimiter {
    /// Creates a limiter admitting `count` acquisitions per `window`.
    ///
    /// A rate that is zero, negative or not finite is raised to [`MIN_RATE`];
    /// [`RateLimiter::clamped`] reports when that happened.
    pub fn new(count: u32, window: Duration) -> Self {
        let computed = f64::from(count) / window.as_secs_f64();
        let (rate, clamped) = if computed.is_finite() && computed > 0.0 {
            (computed, false)
        } else {
            (MIN_RATE, true)
        };
        Self {
            rate,
            clamped,
            bucket: Mutex::new(Bucket {
                tokens: 1.0,
                last: Instant::now(),
            }),
        }
    }

    /// Tokens per second.
    pub fn rate(&self) -> f64 {
        self.rate
    }

    /// Whether the configured rate was replaced by [`MIN_RATE`].
    pub fn clamped(&self) -> bool {
        self.clamped
    }

    /// Waits until one token is available and consumes it.
    pub async fn acquire(&self) {
        let wait = self.reserve(Instant::now());
        if !wait.is_zero() {
            tokio::time::sleep(wait).await;
        }
    }

    fn reserve(&self, now: Instant) -> Duration {
        let mut b = self.bucket.lock().unwrap_or_else(PoisonError::into_inner);
        let dt = now.saturating_duration_since(b.last).as_secs_f64();
        b.last = now;
        b.tokens = (b.tokens + dt * self.rate).min(1.0);
        b.tokens -= 1.0;
        if b.tokens >= 0.0 {
            Duration::ZERO
        } else {
            Duration::try_from_secs_f64(-b.tokens / self.rate).unwrap_or(Duration::MAX)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_positive_rate_is_clamped() {
        let zero = RateLimiter::new(0, Duration::from_secs(1));
        assert!(zero.clamped());
        assert_eq!(zero.rate(), MIN_RATE);

        let no_window = RateLimiter::new(10, Duration::ZERO);
        assert!(no_window.clamped());
        assert_eq!(no_window.rate(), MIN_RATE);

        let ok = RateLimiter::new(5, Duration::from_secs(1));
        assert!(!ok.clamped());
        assert_eq!(ok.rate(), 5.0);
    }

    #[tokio::test(start_paused = true)]
    async fn tiny_rate_saturates_the_wait() {
        let limiter = RateLimiter::new(1, Duration::MAX);
        assert!(!limiter.clamped());

        let now = Instant::now();
        assert_eq!(limiter.reserve(now), Duration::ZERO);
        limiter.reserve(now);
        // two intervals of `Duration::MAX` do not fit in a Duration
        assert_eq!(limiter.reserve(now), Duration::MAX);
    }

    #[tokio::test(start_paused = true)]
    async fn fifty_acquires_at_five_per_second_take_nine_seconds() {
        let limiter = RateLimiter::new(5, Duration::from_secs(1));
        let started = Instant::now();
        for _ in 0..50 {
            limiter.acquire().await;
        }
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(9), "elapsed {elapsed:?}");
        assert!(elapsed < Duration::from_secs(11), "elapsed {elapsed:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_callers_are_spaced_out() {
        let limiter = std::sync::Arc::new(RateLimiter::new(10, Duration::from_secs(1)));
        let started = Instant::now();
        let handles: Vec<_> = (0..5)
            .map(|_| {
                let l = limiter.clone();
                tokio::spawn(async move { l.acquire().await })
            })
            .collect();
        for h in handles {
            h.await.expect("acquire");
        }
        assert!(started.elapsed() >= Duration::from_millis(400));
    }

    #[test]
    fn first_token_is_free() {
        let limiter = RateLimiter::new(1, Duration::from_secs(60));
        let now = Instant::now();
        assert_eq!(limiter.reserve(now), Duration::ZERO);
        assert!(limiter.reserve(now) > Duration::from_secs(59));
    }
}
