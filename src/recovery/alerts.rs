//! Alert emission (spec §4.B, §7): a well-formed alert object delivered
//! through every enabled channel, suppressed per identical key within a
//! cooldown window.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;

use crate::recovery::classify::{ErrorKind, Severity};
use crate::types::{Alert, AlertSeverity};

const COOLDOWN: Duration = Duration::from_secs(300);

/// An open-ended delivery target for alerts (email/webhook/log/issue-tracker).
/// Only a single interface method, per the redesign note in spec §9.
#[async_trait::async_trait]
pub trait AlertChannel: Send + Sync {
    async fn send(&self, alert: &Alert);
}

pub struct LogAlertChannel;

#[async_trait::async_trait]
impl AlertChannel for LogAlertChannel {
    async fn send(&self, alert: &Alert) {
        tracing::warn!(
            severity = ?alert.severity,
            title = %alert.title,
            message = %alert.message,
            "alert"
        );
    }
}

pub struct AlertDispatcher {
    channels: Vec<Box<dyn AlertChannel>>,
    last_sent: Mutex<HashMap<String, Instant>>,
}

impl AlertDispatcher {
    pub fn new(channels: Vec<Box<dyn AlertChannel>>) -> Self {
        Self {
            channels,
            last_sent: Mutex::new(HashMap::new()),
        }
    }

    /// Dedup key: category + exception type (spec §4.B).
    fn cooldown_key(category: &str, exception_type: &str) -> String {
        format!("{category}:{exception_type}")
    }

    pub async fn maybe_send(&self, category: &str, exception_type: &str, alert: Alert) {
        let key = Self::cooldown_key(category, exception_type);
        {
            let mut last_sent = self.last_sent.lock().await;
            if let Some(&when) = last_sent.get(&key)
                && when.elapsed() < COOLDOWN
            {
                return;
            }
            last_sent.insert(key, Instant::now());
        }
        for channel in &self.channels {
            channel.send(&alert).await;
        }
    }
}

pub fn severity_floor_met(severity: Severity) -> bool {
    severity >= Severity::Critical
}

pub fn to_alert_severity(severity: Severity) -> AlertSeverity {
    match severity {
        Severity::Emergency => AlertSeverity::Emergency,
        Severity::Critical => AlertSeverity::Critical,
        _ => AlertSeverity::Warning,
    }
}

/// Suggested actions specific to the error category (spec §7 example:
/// "for critical completeness: investigate discovery strategy failures;
/// consider full sync").
pub fn suggested_actions(kind: ErrorKind) -> Vec<String> {
    match kind {
        ErrorKind::RateLimit => vec![
            "lower max_concurrency or requests_per_second".to_string(),
            "verify the hub token is configured for the higher authenticated quota".to_string(),
        ],
        ErrorKind::Authentication => vec![
            "check the hub token is present and not expired".to_string(),
        ],
        ErrorKind::Network | ErrorKind::Timeout => vec![
            "retry once network connectivity to the hub is confirmed".to_string(),
        ],
        ErrorKind::System => vec![
            "check available disk space and filesystem permissions on the data directory".to_string(),
        ],
        ErrorKind::Data | ErrorKind::Validation => vec![
            "investigate discovery strategy failures".to_string(),
            "consider a full sync".to_string(),
        ],
        ErrorKind::Api | ErrorKind::Unknown => vec!["inspect the recorded error message".to_string()],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingChannel(Arc<AtomicUsize>);

    #[async_trait::async_trait]
    impl AlertChannel for CountingChannel {
        async fn send(&self, _alert: &Alert) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn sample_alert() -> Alert {
        Alert {
            severity: AlertSeverity::Critical,
            title: "completeness below threshold".into(),
            message: "only 80% processed".into(),
            timestamp: chrono::Utc::now(),
            context: HashMap::new(),
            suggested_actions: vec![],
        }
    }

    #[tokio::test]
    async fn identical_alert_key_suppressed_within_cooldown() {
        let count = Arc::new(AtomicUsize::new(0));
        let dispatcher = AlertDispatcher::new(vec![Box::new(CountingChannel(count.clone()))]);

        dispatcher.maybe_send("completeness", "ScoreBelowThreshold", sample_alert()).await;
        dispatcher.maybe_send("completeness", "ScoreBelowThreshold", sample_alert()).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn distinct_keys_both_deliver() {
        let count = Arc::new(AtomicUsize::new(0));
        let dispatcher = AlertDispatcher::new(vec![Box::new(CountingChannel(count.clone()))]);

        dispatcher.maybe_send("completeness", "ScoreBelowThreshold", sample_alert()).await;
        dispatcher.maybe_send("discovery", "StrategyFailed", sample_alert()).await;
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }
}
