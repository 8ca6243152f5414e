//! Backoff policy shared by HTTP retries and relay inter-attempt delays.

use std::time::{Duration, SystemTime};

use reqwest_retry::{RetryDecision, RetryPolicy};

/// Exponential backoff policy, capped at a maximum delay.
///
/// Used two ways: as the retry policy of the HTTP middleware, and as the pause the
/// relay fetcher inserts between endpoints. Setting `base_delay == max_delay` gives a
/// fixed delay; `BackoffPolicy::none()` disables both retries and pauses.
#[derive(Debug, Clone, PartialEq)]
pub struct BackoffPolicy {
    max_retries: u32,
    base_delay: Duration,
    max_delay: Duration,
}

impl BackoffPolicy {
    /// Create an exponential policy starting at one second, capped at one minute.
    ///
    /// # Arguments
    ///
    /// * `max_retries` - Maximum number of retry attempts
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
        }
    }

    /// A constant delay with no retries.
    pub fn fixed(delay: Duration) -> Self {
        Self {
            max_retries: 0,
            base_delay: delay,
            max_delay: delay,
        }
    }

    /// No retries and no delay.
    pub fn none() -> Self {
        Self::fixed(Duration::ZERO)
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Delay before attempt `n_attempts + 1`.
    pub fn delay(&self, n_attempts: u32) -> Duration {
        let exponent = n_attempts.min(i32::MAX as u32) as i32;
        let delay = self.base_delay.as_secs_f64() * 2_f64.powi(exponent);
        Duration::from_secs_f64(delay.min(self.max_delay.as_secs_f64()))
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::none()
    }
}

impl RetryPolicy for BackoffPolicy {
    fn should_retry(&self, _request_start_time: SystemTime, n_past_retries: u32) -> RetryDecision {
        if n_past_retries >= self.max_retries {
            RetryDecision::DoNotRetry
        } else {
            RetryDecision::Retry {
                execute_after: SystemTime::now() + self.delay(n_past_retries),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exponential_delay() {
        let policy = BackoffPolicy::new(3);

        assert_eq!(policy.delay(0).as_secs(), 1);
        assert_eq!(policy.delay(1).as_secs(), 2);
        assert_eq!(policy.delay(2).as_secs(), 4);
    }

    #[test]
    fn test_max_delay_cap() {
        let policy = BackoffPolicy::new(10);
        assert!(policy.delay(10) <= Duration::from_secs(60));
        assert_eq!(policy.delay(u32::MAX), Duration::from_secs(60));
    }

    #[test]
    fn test_fixed_delay_is_constant() {
        let policy = BackoffPolicy::fixed(Duration::from_millis(500));
        assert_eq!(policy.delay(0), Duration::from_millis(500));
        assert_eq!(policy.delay(5), Duration::from_millis(500));
        assert_eq!(policy.max_retries(), 0);
    }

    #[test]
    fn test_none_never_retries() {
        let policy = BackoffPolicy::none();
        assert_eq!(policy.delay(3), Duration::ZERO);
        assert!(matches!(
            policy.should_retry(SystemTime::now(), 0),
            RetryDecision::DoNotRetry
        ));
    }

    #[test]
    fn test_should_retry_until_limit() {
        let policy = BackoffPolicy::fixed(Duration::ZERO).with_max_retries(2);
        assert!(matches!(
            policy.should_retry(SystemTime::now(), 1),
            RetryDecision::Retry { .. }
        ));
        assert!(matches!(
            policy.should_retry(SystemTime::now(), 2),
            RetryDecision::DoNotRetry
        ));
    }
}
