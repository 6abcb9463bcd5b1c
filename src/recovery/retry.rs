//! Retry policy: exponential backoff with jitter (spec §4.B).

use std::time::Duration;

use rand::Rng;

use crate::recovery::classify::{classify, is_non_retryable, ErrorKind};

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub base: Duration,
    pub multiplier: f64,
    pub max_delay: Duration,
    pub max_attempts: u32,
    pub jitter: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base: Duration::from_secs(1),
            multiplier: 2.0,
            max_delay: Duration::from_secs(60),
            max_attempts: 5,
            jitter: 0.1,
        }
    }
}

impl RetryPolicy {
    /// Delay before `attempt` (0-based). Rate-limit errors double the delay
    /// per spec §4.B.
    pub fn delay_for(&self, attempt: u32, error: &crate::error::SyncError) -> Duration {
        let (kind, _) = classify(error);
        let raw = self.base.as_secs_f64() * self.multiplier.powi(attempt as i32);
        let capped = raw.min(self.max_delay.as_secs_f64());
        let capped = if kind == ErrorKind::RateLimit {
            (capped * 2.0).min(self.max_delay.as_secs_f64() * 2.0)
        } else {
            capped
        };
        let jitter_max = capped * self.jitter;
        let jitter = rand::thread_rng().gen_range(0.0..=jitter_max.max(0.0));
        Duration::from_secs_f64(capped + jitter)
    }

    /// Whether another attempt should be made given the error and how many
    /// attempts have already been made.
    pub fn should_retry(&self, error: &crate::error::SyncError, attempts_made: u32, severity: crate::recovery::classify::Severity) -> bool {
        if attempts_made >= self.max_attempts {
            return false;
        }
        !is_non_retryable(error, severity)
    }
}
