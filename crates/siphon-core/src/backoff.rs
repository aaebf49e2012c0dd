//! Backoff policy: decides how long a worker waits after an empty fetch
//! or a fetch error.

use std::time::Duration;

use rand::Rng;

/// Capped exponential backoff.
///
/// The curve is not load-bearing; it only has to be bounded and
/// monotonic under sustained emptiness so workers neither busy-loop an
/// empty queue nor stall forever. Workers reset the attempt counter on
/// any non-empty fetch.
#[derive(Debug, Clone)]
pub struct BackoffPolicy {
    /// Delay after the first empty fetch.
    pub initial_delay: Duration,

    /// Growth factor per consecutive empty fetch.
    pub multiplier: f64,

    /// Upper bound on any delay.
    pub max_delay: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(250),
            multiplier: 2.0,
            max_delay: Duration::from_secs(10),
        }
    }
}

impl BackoffPolicy {
    /// Delay for the given consecutive-empty-fetch count (1-indexed),
    /// before jitter: `initial_delay * multiplier^(attempt - 1)`,
    /// capped at `max_delay`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let base = self.initial_delay.as_secs_f64();
        let exp = attempt.saturating_sub(1).min(63) as i32;
        let delay = base * self.multiplier.powi(exp);
        Duration::from_secs_f64(delay.min(self.max_delay.as_secs_f64()))
    }

    /// `delay_for` with ±20% jitter, to spread concurrent workers out.
    pub fn jittered_delay_for(&self, attempt: u32) -> Duration {
        let delay = self.delay_for(attempt);
        let factor = rand::thread_rng().gen_range(0.8..1.2);
        Duration::from_secs_f64(delay.as_secs_f64() * factor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delays_grow_monotonically() {
        let policy = BackoffPolicy::default();

        let d1 = policy.delay_for(1);
        let d2 = policy.delay_for(2);
        let d3 = policy.delay_for(3);

        assert_eq!(d1, Duration::from_millis(250));
        assert_eq!(d2, Duration::from_millis(500));
        assert_eq!(d3, Duration::from_millis(1000));
        assert!(d2 > d1);
        assert!(d3 > d2);
    }

    #[test]
    fn delays_are_capped() {
        let policy = BackoffPolicy::default();

        assert_eq!(policy.delay_for(100), policy.max_delay);
        // A huge attempt count must not overflow the exponentiation.
        assert_eq!(policy.delay_for(u32::MAX), policy.max_delay);
    }

    #[test]
    fn jitter_stays_within_bounds() {
        let policy = BackoffPolicy::default();

        for attempt in 1..=8 {
            let base = policy.delay_for(attempt).as_secs_f64();
            let jittered = policy.jittered_delay_for(attempt).as_secs_f64();
            assert!(jittered >= base * 0.8 - f64::EPSILON);
            assert!(jittered <= base * 1.2 + f64::EPSILON);
        }
    }
}
