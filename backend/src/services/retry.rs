use rand::Rng;
use std::time::Duration;

use crate::constants::{BACKOFF_BASE_SECS, BACKOFF_CAP_SECS, BACKOFF_JITTER_FRACTION, MAX_RETRIES};

/// Exponential backoff with jitter for network-facing store calls.
///
/// `delay(attempt) = min(base * 2^attempt + jitter, cap)` with the jitter
/// drawn fresh per call from `[0, 0.3 * base]`, so a fleet of clients that
/// failed together does not retry in lockstep.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub base: Duration,
    pub cap: Duration,
    pub max_retries: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base: Duration::from_secs_f64(BACKOFF_BASE_SECS),
            cap: Duration::from_secs_f64(BACKOFF_CAP_SECS),
            max_retries: MAX_RETRIES,
        }
    }
}

impl RetryPolicy {
    pub fn delay(&self, attempt: u32) -> Duration {
        let base = self.base.as_secs_f64();
        let exponential = base * 2f64.powi(attempt as i32);
        let jitter = rand::rng().random_range(0.0..=(BACKOFF_JITTER_FRACTION * base));
        Duration::from_secs_f64((exponential + jitter).min(self.cap.as_secs_f64()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delay_stays_within_jitter_bounds() {
        let policy = RetryPolicy::default();

        for _ in 0..100 {
            let d0 = policy.delay(0).as_secs_f64();
            assert!((0.5..=0.65).contains(&d0), "delay(0) = {}", d0);

            let d2 = policy.delay(2).as_secs_f64();
            assert!((2.0..=2.6).contains(&d2), "delay(2) = {}", d2);
        }
    }

    #[test]
    fn test_delay_is_capped() {
        let policy = RetryPolicy::default();

        for _ in 0..100 {
            assert!(policy.delay(10) <= Duration::from_secs_f64(BACKOFF_CAP_SECS));
        }
    }

    #[test]
    fn test_custom_policy_respects_its_own_cap() {
        let policy = RetryPolicy {
            base: Duration::from_secs(1),
            cap: Duration::from_secs(2),
            max_retries: 5,
        };

        assert!(policy.delay(5) <= Duration::from_secs(2));
    }
}
