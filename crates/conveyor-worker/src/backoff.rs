//! Retry backoff policy for failed transfer attempts.

/// Maximum delay in seconds before retrying a failed transfer. Caps exponential
/// backoff so that high attempt counts do not produce excessively long delays.
pub const MAX_RETRY_BACKOFF_SECS: u64 = 3600;

/// Exponential backoff with a cap: `base * 2^attempt`, at most `max`.
///
/// A plain value rather than queue-internal arithmetic, so the schedule can
/// be tuned per deployment and asserted in tests.
#[derive(Debug, Clone, Copy)]
pub struct RetryBackoff {
    base_delay_secs: u64,
    max_delay_secs: u64,
}

impl RetryBackoff {
    pub fn new(base_delay_secs: u64, max_delay_secs: u64) -> Self {
        Self {
            base_delay_secs,
            max_delay_secs,
        }
    }

    /// Delay in seconds before the attempt after `attempt_count` failures.
    pub fn delay_secs(&self, attempt_count: i32) -> u64 {
        let attempt = attempt_count.clamp(0, 32) as u32;
        self.base_delay_secs
            .saturating_mul(2_u64.saturating_pow(attempt))
            .min(self.max_delay_secs)
    }
}

impl Default for RetryBackoff {
    fn default() -> Self {
        Self::new(60, MAX_RETRY_BACKOFF_SECS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_per_attempt() {
        let backoff = RetryBackoff::new(60, MAX_RETRY_BACKOFF_SECS);
        assert_eq!(backoff.delay_secs(0), 60);
        assert_eq!(backoff.delay_secs(1), 120);
        assert_eq!(backoff.delay_secs(2), 240);
        assert_eq!(backoff.delay_secs(3), 480);
    }

    #[test]
    fn backoff_capped_at_max() {
        let backoff = RetryBackoff::new(60, MAX_RETRY_BACKOFF_SECS);
        assert_eq!(backoff.delay_secs(6), MAX_RETRY_BACKOFF_SECS);
        assert_eq!(backoff.delay_secs(30), MAX_RETRY_BACKOFF_SECS);
    }

    #[test]
    fn backoff_negative_attempt_clamped() {
        let backoff = RetryBackoff::new(60, MAX_RETRY_BACKOFF_SECS);
        assert_eq!(backoff.delay_secs(-1), 60);
    }

    #[test]
    fn backoff_huge_attempt_does_not_overflow() {
        let backoff = RetryBackoff::new(60, u64::MAX);
        // 2^32 * 60 saturates well below u64::MAX; the clamp keeps the
        // exponent finite either way.
        assert!(backoff.delay_secs(i32::MAX) >= 60);
    }
}
