//! Per-operation circuit breaker (spec §4.B): CLOSED -> OPEN -> HALF_OPEN -> CLOSED.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Closed,
    Open,
    HalfOpen,
}

struct BreakerState {
    state: State,
    failure_count: u32,
    opened_at: Option<Instant>,
    half_open_calls: u32,
}

impl BreakerState {
    fn new() -> Self {
        Self {
            state: State::Closed,
            failure_count: 0,
            opened_at: None,
            half_open_calls: 0,
        }
    }
}

pub struct CircuitBreakerConfig {
    pub failure_threshold: u32,
    pub recovery_timeout: Duration,
    pub half_open_max_calls: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            recovery_timeout: Duration::from_secs(300),
            half_open_max_calls: 3,
        }
    }
}

pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    states: Mutex<HashMap<String, BreakerState>>,
}

impl CircuitBreaker {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            states: Mutex::new(HashMap::new()),
        }
    }

    /// Whether `key` currently admits calls; transitions OPEN -> HALF_OPEN
    /// once `recovery_timeout` has elapsed.
    pub async fn allow(&self, key: &str) -> bool {
        let mut states = self.states.lock().await;
        let entry = states.entry(key.to_string()).or_insert_with(BreakerState::new);

        match entry.state {
            State::Closed => true,
            State::Open => {
                let elapsed = entry
                    .opened_at
                    .map(|t| t.elapsed())
                    .unwrap_or(Duration::ZERO);
                if elapsed >= self.config.recovery_timeout {
                    entry.state = State::HalfOpen;
                    entry.half_open_calls = 0;
                    true
                } else {
                    false
                }
            }
            State::HalfOpen => entry.half_open_calls < self.config.half_open_max_calls,
        }
    }

    pub async fn record_success(&self, key: &str) {
        let mut states = self.states.lock().await;
        let entry = states.entry(key.to_string()).or_insert_with(BreakerState::new);
        match entry.state {
            State::HalfOpen => {
                entry.state = State::Closed;
                entry.failure_count = 0;
                entry.half_open_calls = 0;
                entry.opened_at = None;
            }
            State::Closed => {
                entry.failure_count = 0;
            }
            State::Open => {}
        }
    }

    pub async fn record_failure(&self, key: &str) {
        let mut states = self.states.lock().await;
        let entry = states.entry(key.to_string()).or_insert_with(BreakerState::new);
        match entry.state {
            State::HalfOpen => {
                entry.state = State::Open;
                entry.opened_at = Some(Instant::now());
                entry.half_open_calls = 0;
            }
            State::Closed => {
                entry.failure_count += 1;
                if entry.failure_count >= self.config.failure_threshold {
                    entry.state = State::Open;
                    entry.opened_at = Some(Instant::now());
                }
            }
            State::Open => {}
        }
    }

    /// Must be called immediately after `allow` returns true while HALF_OPEN,
    /// so concurrent half-open probes are bounded.
    pub async fn note_half_open_call(&self, key: &str) {
        let mut states = self.states.lock().await;
        if let Some(entry) = states.get_mut(key)
            && entry.state == State::HalfOpen
        {
            entry.half_open_calls += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn opens_after_threshold_failures() {
        let breaker = CircuitBreaker::new(CircuitBreakerConfig {
            failure_threshold: 3,
            recovery_timeout: Duration::from_millis(50),
            half_open_max_calls: 1,
        });
        for _ in 0..2 {
            breaker.record_failure("op").await;
            assert!(breaker.allow("op").await);
        }
        breaker.record_failure("op").await;
        assert!(!breaker.allow("op").await);
    }

    #[tokio::test]
    async fn half_opens_after_recovery_timeout_and_closes_on_success() {
        let breaker = CircuitBreaker::new(CircuitBreakerConfig {
            failure_threshold: 1,
            recovery_timeout: Duration::from_millis(20),
            half_open_max_calls: 1,
        });
        breaker.record_failure("op").await;
        assert!(!breaker.allow("op").await);

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(breaker.allow("op").await); // transitions to half-open
        breaker.note_half_open_call("op").await;
        breaker.record_success("op").await;
        assert!(breaker.allow("op").await); // now closed
    }

    #[tokio::test]
    async fn half_open_failure_reopens() {
        let breaker = CircuitBreaker::new(CircuitBreakerConfig {
            failure_threshold: 1,
            recovery_timeout: Duration::from_millis(10),
            half_open_max_calls: 1,
        });
        breaker.record_failure("op").await;
        tokio::time::sleep(Duration::from_millis(15)).await;
        assert!(breaker.allow("op").await);
        breaker.record_failure("op").await;
        assert!(!breaker.allow("op").await);
    }
}
