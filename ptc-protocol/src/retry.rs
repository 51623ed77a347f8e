//! LLM-call retry/backoff policy.

use std::time::Duration;

/// Shape of the delay between retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackoffStrategy {
    /// Same delay every attempt.
    Constant,
    /// Delay grows linearly with the attempt number.
    Linear,
    /// Delay doubles with every attempt.
    Exponential,
}

/// Retry policy for LLM transport errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the first), default 3.
    pub max_attempts: u32,
    /// Backoff shape, default [`BackoffStrategy::Exponential`].
    pub strategy: BackoffStrategy,
    /// Base delay used by the backoff calculation.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            strategy: BackoffStrategy::Exponential,
            base_delay: Duration::from_millis(200),
        }
    }
}

impl RetryPolicy {
    /// Delay to sleep before attempt number `attempt` (1-based; the
    /// first attempt never sleeps).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            return Duration::ZERO;
        }
        let n = attempt - 1;
        match self.strategy {
            BackoffStrategy::Constant => self.base_delay,
            BackoffStrategy::Linear => self.base_delay * n,
            BackoffStrategy::Exponential => self.base_delay * 2u32.saturating_pow(n - 1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_never_grows() {
        let p = RetryPolicy {
            strategy: BackoffStrategy::Constant,
            ..Default::default()
        };
        assert_eq!(p.delay_for(1), Duration::ZERO);
        assert_eq!(p.delay_for(2), p.base_delay);
        assert_eq!(p.delay_for(3), p.base_delay);
    }

    #[test]
    fn linear_grows_by_multiples() {
        let p = RetryPolicy {
            strategy: BackoffStrategy::Linear,
            base_delay: Duration::from_millis(100),
            ..Default::default()
        };
        assert_eq!(p.delay_for(2), Duration::from_millis(100));
        assert_eq!(p.delay_for(3), Duration::from_millis(200));
    }

    #[test]
    fn exponential_doubles() {
        let p = RetryPolicy {
            strategy: BackoffStrategy::Exponential,
            base_delay: Duration::from_millis(100),
            ..Default::default()
        };
        assert_eq!(p.delay_for(2), Duration::from_millis(100));
        assert_eq!(p.delay_for(3), Duration::from_millis(200));
        assert_eq!(p.delay_for(4), Duration::from_millis(400));
    }
}
