//! Send retry policy.
//!
//! A failed send job is re-attempted up to [`MAX_SEND_ATTEMPTS`] times with
//! exponential backoff starting at [`BACKOFF_BASE_SECS`] seconds. After the
//! final attempt the job is terminally failed and left to operator
//! intervention.

use std::time::Duration;

/// Maximum number of delivery attempts for one send job.
pub const MAX_SEND_ATTEMPTS: i32 = 3;

/// Base delay for the exponential backoff schedule, in seconds.
pub const BACKOFF_BASE_SECS: i64 = 2;

/// Retry policy attached to a queue job at enqueue time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: i32,
    pub backoff_base_secs: i64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: MAX_SEND_ATTEMPTS,
            backoff_base_secs: BACKOFF_BASE_SECS,
        }
    }
}

impl RetryPolicy {
    /// Delay before re-attempting after `attempt` failures (1-based).
    ///
    /// Doubles per failed attempt: base, base*2, base*4, ...
    pub fn delay_after(&self, attempt: i32) -> Duration {
        let exponent = attempt.saturating_sub(1).clamp(0, 30) as u32;
        let secs = self.backoff_base_secs.max(0) as u64 * 2u64.pow(exponent);
        Duration::from_secs(secs)
    }

    /// Whether a job that has failed `attempts` times may run again.
    pub fn should_retry(&self, attempts: i32) -> bool {
        attempts < self.max_attempts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_matches_dispatch_contract() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.backoff_base_secs, 2);
    }

    #[test]
    fn delays_double_per_attempt() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_after(1), Duration::from_secs(2));
        assert_eq!(policy.delay_after(2), Duration::from_secs(4));
        assert_eq!(policy.delay_after(3), Duration::from_secs(8));
    }

    #[test]
    fn attempt_zero_is_treated_as_first() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_after(0), Duration::from_secs(2));
    }

    #[test]
    fn retries_stop_at_the_cap() {
        let policy = RetryPolicy::default();
        assert!(policy.should_retry(1));
        assert!(policy.should_retry(2));
        assert!(!policy.should_retry(3));
        assert!(!policy.should_retry(4));
    }

    #[test]
    fn large_attempt_counts_do_not_overflow() {
        let policy = RetryPolicy::default();
        // Exponent is clamped; this must not panic.
        let _ = policy.delay_after(i32::MAX);
    }
}
