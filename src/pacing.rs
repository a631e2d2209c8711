//! Time and randomness used for delays, jitter and identity choice.
//!
//! Kept behind a trait so tests can run on a virtual clock.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rand::Rng;

#[async_trait]
pub trait Pacing: Send + Sync {
    fn now(&self) -> Instant;

    /// Wall-clock time, for comparing against dates sent by servers.
    fn utc_now(&self) -> DateTime<Utc>;

    async fn sleep(&self, duration: Duration);

    /// Uniform duration in `[min, max]`.
    fn between(&self, min: Duration, max: Duration) -> Duration;

    /// Uniform index in `0..len`. `len` must be non-zero.
    fn pick(&self, len: usize) -> usize;
}

/// Real clock, tokio timers, thread-local RNG.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemPacing;

#[async_trait]
impl Pacing for SystemPacing {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn utc_now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    async fn sleep(&self, duration: Duration) {
        if !duration.is_zero() {
            tokio::time::sleep(duration).await;
        }
    }

    fn between(&self, min: Duration, max: Duration) -> Duration {
        let lo = min.as_millis() as u64;
        let hi = max.as_millis() as u64;
        if hi <= lo {
            return min;
        }
        Duration::from_millis(rand::rng().random_range(lo..=hi))
    }

    fn pick(&self, len: usize) -> usize {
        if len <= 1 {
            return 0;
        }
        rand::rng().random_range(0..len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn between_stays_in_range() {
        let pacing = SystemPacing;
        for _ in 0..100 {
            let d = pacing.between(Duration::from_millis(10), Duration::from_millis(20));
            assert!(d >= Duration::from_millis(10) && d <= Duration::from_millis(20));
        }
    }

    #[test]
    fn between_with_inverted_bounds_returns_min() {
        let pacing = SystemPacing;
        let d = pacing.between(Duration::from_millis(50), Duration::from_millis(5));
        assert_eq!(d, Duration::from_millis(50));
    }

    #[test]
    fn pick_stays_in_bounds() {
        let pacing = SystemPacing;
        for _ in 0..100 {
            assert!(pacing.pick(4) < 4);
        }
        assert_eq!(pacing.pick(1), 0);
    }
}
