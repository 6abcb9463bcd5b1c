//! Rate-limited, bounded-concurrency fetcher (spec §4.A).
//!
//! Two bounds are enforced simultaneously: a counting semaphore caps
//! in-flight hub calls, and a sliding 60s window caps throughput against
//! `base_rpm * adaptive_factor`. The fetcher never retries itself —
//! that's the error recovery layer's job (spec §4.B); it only decides
//! when the caller is allowed to make its one call.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use rand::Rng;
use tokio::sync::{Mutex, Semaphore};
use tokio_util::sync::CancellationToken;

const WINDOW: Duration = Duration::from_secs(60);
const JITTER_FACTOR: f64 = 0.1;
const BASE_BACKOFF: Duration = Duration::from_secs(1);
const MAX_BACKOFF: Duration = Duration::from_secs(60);
const SUCCESS_HISTORY: usize = 100;
const SUCCESS_RATE_THRESHOLD: f64 = 0.95;

/// Rate-limit indicator substrings (spec §4.A), checked against an
/// already-lowercased message.
const RATE_LIMIT_PHRASES: &[&str] = &[
    "rate limit",
    "too many requests",
    "quota exceeded",
    "throttled",
];

pub fn looks_rate_limited(status: Option<u16>, message_lower: &str) -> bool {
    status == Some(429) || RATE_LIMIT_PHRASES.iter().any(|p| message_lower.contains(p))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    RateLimited,
    Failure,
}

impl Outcome {
    /// Classify a completed hub call for [`Fetcher::report`] purposes.
    pub fn from_result<T>(result: &Result<T, crate::error::SyncError>) -> Self {
        match result {
            Ok(_) => Outcome::Success,
            Err(crate::error::SyncError::RateLimited) => Outcome::RateLimited,
            Err(_) => Outcome::Failure,
        }
    }
}

struct SlidingState {
    window: VecDeque<Instant>,
    adaptive_factor: f64,
    consecutive_rate_limits: u32,
    recent_outcomes: VecDeque<bool>,
}

impl SlidingState {
    fn new() -> Self {
        Self {
            window: VecDeque::new(),
            adaptive_factor: 1.0,
            consecutive_rate_limits: 0,
            recent_outcomes: VecDeque::new(),
        }
    }

    fn prune(&mut self, now: Instant) {
        while let Some(&front) = self.window.front() {
            if now.duration_since(front) >= WINDOW {
                self.window.pop_front();
            } else {
                break;
            }
        }
    }

    fn record_outcome(&mut self, success: bool) {
        self.recent_outcomes.push_back(success);
        if self.recent_outcomes.len() > SUCCESS_HISTORY {
            self.recent_outcomes.pop_front();
        }
    }

    fn success_rate(&self) -> f64 {
        if self.recent_outcomes.is_empty() {
            return 1.0;
        }
        let successes = self.recent_outcomes.iter().filter(|s| **s).count();
        successes as f64 / self.recent_outcomes.len() as f64
    }
}

/// RAII-ish permit returned by [`Fetcher::acquire`]. Callers must call
/// [`FetchPermit::report`] exactly once after issuing their hub call.
pub struct FetchPermit<'a> {
    fetcher: &'a Fetcher,
    _permit: tokio::sync::SemaphorePermit<'a>,
}

impl FetchPermit<'_> {
    pub async fn report(self, outcome: Outcome) {
        self.fetcher.report(outcome).await;
    }
}

pub struct Fetcher {
    semaphore: Semaphore,
    state: Mutex<SlidingState>,
    base_rpm: f64,
}

impl Fetcher {
    pub fn new(max_concurrency: usize, hourly_limit: u32) -> Self {
        Self {
            semaphore: Semaphore::new(max_concurrency),
            state: Mutex::new(SlidingState::new()),
            base_rpm: hourly_limit as f64 / 60.0,
        }
    }

    /// Block until permitted to perform one hub call, honoring both the
    /// concurrency semaphore and the throughput window. Resolves promptly
    /// on cancellation (spec §5), returning `None` in that case.
    pub async fn acquire(&self, cancel: &CancellationToken) -> Option<FetchPermit<'_>> {
        let permit = tokio::select! {
            biased;
            _ = cancel.cancelled() => return None,
            permit = self.semaphore.acquire() => permit.expect("semaphore not closed"),
        };

        loop {
            let sleep_for = {
                let mut state = self.state.lock().await;
                let now = Instant::now();
                state.prune(now);
                let target = (self.base_rpm * state.adaptive_factor).ceil().max(1.0) as usize;
                if state.window.len() < target {
                    state.window.push_back(now);
                    None
                } else {
                    let oldest = *state.window.front().expect("window non-empty when at capacity");
                    let wait = WINDOW.saturating_sub(now.duration_since(oldest));
                    Some(jittered(wait))
                }
            };

            match sleep_for {
                None => break,
                Some(wait) => {
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => return None,
                        _ = tokio::time::sleep(wait) => {}
                    }
                }
            }
        }

        Some(FetchPermit {
            fetcher: self,
            _permit: permit,
        })
    }

    async fn report(&self, outcome: Outcome) {
        let mut state = self.state.lock().await;
        match outcome {
            Outcome::Success => {
                state.consecutive_rate_limits = 0;
                state.record_outcome(true);
                if state.success_rate() > SUCCESS_RATE_THRESHOLD && state.adaptive_factor < 1.0 {
                    state.adaptive_factor = (state.adaptive_factor + 0.05).min(1.0);
                }
            }
            Outcome::RateLimited => {
                state.record_outcome(false);
                state.consecutive_rate_limits += 1;
                let n = state.consecutive_rate_limits;
                state.adaptive_factor =
                    (state.adaptive_factor - (0.1 * (1.0 + 0.5 * n as f64))).max(0.1);
                let backoff = exponential_backoff(n);
                drop(state);
                tokio::time::sleep(jittered(backoff)).await;
                return;
            }
            Outcome::Failure => {
                state.record_outcome(false);
            }
        }
    }

    #[cfg(test)]
    pub async fn adaptive_factor(&self) -> f64 {
        self.state.lock().await.adaptive_factor
    }
}

fn exponential_backoff(n: u32) -> Duration {
    let exp = BASE_BACKOFF.as_secs_f64() * 2f64.powi((n.saturating_sub(1)) as i32);
    Duration::from_secs_f64(exp.min(MAX_BACKOFF.as_secs_f64()))
}

fn jittered(base: Duration) -> Duration {
    let jitter_max = base.as_secs_f64() * JITTER_FACTOR;
    let jitter = rand::thread_rng().gen_range(0.0..=jitter_max.max(0.0));
    base + Duration::from_secs_f64(jitter)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limit_indicators_match_spec_list() {
        assert!(looks_rate_limited(Some(429), ""));
        assert!(looks_rate_limited(None, "too many requests, slow down"));
        assert!(looks_rate_limited(None, "quota exceeded for today"));
        assert!(looks_rate_limited(None, "request throttled"));
        assert!(!looks_rate_limited(Some(500), "internal server error"));
    }

    #[tokio::test]
    async fn acquire_respects_concurrency_bound() {
        let fetcher = Fetcher::new(1, 5000);
        let cancel = CancellationToken::new();
        let first = fetcher.acquire(&cancel).await.unwrap();

        let second_fut = fetcher.acquire(&cancel);
        tokio::pin!(second_fut);
        tokio::select! {
            _ = &mut second_fut => panic!("second acquire should not complete while first holds the only permit"),
            _ = tokio::time::sleep(Duration::from_millis(50)) => {}
        }

        first.report(Outcome::Success).await;
        let second = second_fut.await;
        assert!(second.is_some());
    }

    #[tokio::test]
    async fn acquire_returns_none_on_cancellation() {
        let fetcher = Fetcher::new(0, 5000);
        let cancel = CancellationToken::new();
        cancel.cancel();
        assert!(fetcher.acquire(&cancel).await.is_none());
    }

    #[tokio::test]
    async fn rate_limit_reduces_adaptive_factor() {
        let fetcher = Fetcher::new(10, 5000);
        let cancel = CancellationToken::new();
        let permit = fetcher.acquire(&cancel).await.unwrap();
        permit.report(Outcome::RateLimited).await;
        assert!(fetcher.adaptive_factor().await < 1.0);
    }
}
