pub mod alerts;
pub mod circuit_breaker;
pub mod classify;
pub mod retry;
pub mod rollback;

use std::path::PathBuf;
use std::time::Instant;

use crate::error::SyncError;
use crate::recovery::alerts::{to_alert_severity, AlertDispatcher};
use crate::recovery::circuit_breaker::CircuitBreaker;
use crate::recovery::classify::{classify, select_action, RecoveryAction};
use crate::recovery::retry::RetryPolicy;
use crate::recovery::rollback::RollbackManager;
use crate::types::{Alert, PhaseResult};

/// Orchestrator-scoped recovery layer: ties together classification, retry,
/// circuit breaking, rollback, and alerting (spec §4.B). Constructed once in
/// `main.rs` and passed explicitly into every component (spec §9 — no
/// singletons).
pub struct RecoveryLayer {
    pub circuit_breaker: CircuitBreaker,
    pub rollback: RollbackManager,
    pub alerts: AlertDispatcher,
    pub retry_policy: RetryPolicy,
}

impl RecoveryLayer {
    pub fn new(rollback: RollbackManager, alerts: AlertDispatcher) -> Self {
        Self {
            circuit_breaker: CircuitBreaker::new(Default::default()),
            rollback,
            alerts,
            retry_policy: RetryPolicy::default(),
        }
    }

    /// Run `op` under the circuit breaker for `key`, classifying and
    /// alerting on failure. Returns the operation's result unchanged; the
    /// caller (typically a phase runner) decides whether to retry.
    pub async fn guarded<T, F, Fut>(&self, key: &str, op: F) -> Result<T, SyncError>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<T, SyncError>>,
    {
        if !self.circuit_breaker.allow(key).await {
            return Err(SyncError::CircuitOpen(key.to_string()));
        }
        self.circuit_breaker.note_half_open_call(key).await;

        match op().await {
            Ok(value) => {
                self.circuit_breaker.record_success(key).await;
                Ok(value)
            }
            Err(error) => {
                self.circuit_breaker.record_failure(key).await;
                self.maybe_alert(key, &error).await;
                Err(error)
            }
        }
    }

    async fn maybe_alert(&self, category: &str, error: &SyncError) {
        let (kind, severity) = classify(error);
        if select_action(kind, severity) != RecoveryAction::Notify {
            return;
        }
        let alert = Alert {
            severity: to_alert_severity(severity),
            title: format!("{category} failed: {kind:?}"),
            message: error.to_string(),
            timestamp: chrono::Utc::now(),
            context: Default::default(),
            suggested_actions: alerts::suggested_actions(kind),
        };
        self.alerts
            .maybe_send(category, &format!("{kind:?}"), alert)
            .await;
    }

    /// Retry `op` per the configured [`RetryPolicy`], classifying each
    /// failure to decide whether another attempt is warranted.
    pub async fn retry<T, F, Fut>(&self, key: &str, mut op: F) -> Result<T, SyncError>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T, SyncError>>,
    {
        let mut attempt = 0;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(error) => {
                    let (_, severity) = classify(&error);
                    if !self.retry_policy.should_retry(&error, attempt, severity) {
                        self.maybe_alert(key, &error).await;
                        return Err(error);
                    }
                    let delay = self.retry_policy.delay_for(attempt, &error);
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }

    /// Run a named phase, converting any failure into a `PhaseResult` with
    /// `success=false` rather than letting it propagate (spec §4.H/§7).
    pub async fn run_phase<T, F, Fut>(
        &self,
        phase_name: &str,
        op: F,
    ) -> (Option<T>, PhaseResult)
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<(T, u64), SyncError>>,
    {
        let start = Instant::now();
        match op().await {
            Ok((value, count)) => (
                Some(value),
                PhaseResult::ok(phase_name, start.elapsed().as_secs_f64(), count),
            ),
            Err(error) => {
                self.maybe_alert(phase_name, &error).await;
                (
                    None,
                    PhaseResult::failed(phase_name, start.elapsed().as_secs_f64(), error.to_string()),
                )
            }
        }
    }

    pub async fn rollback_point(
        &self,
        tag: &str,
        files: &[PathBuf],
    ) -> Result<rollback::RollbackPoint, std::io::Error> {
        self.rollback.create_rollback_point(tag, files).await
    }
}

pub use classify::{ErrorKind, RecoveryAction as Action, Severity as ErrorSeverity};
