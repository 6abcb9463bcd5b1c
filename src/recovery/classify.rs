//! Error classification (spec §4.B, §7): an ordered rule list mapping a
//! [`SyncError`] to a `(ErrorKind, Severity)` pair. A pure function —
//! no inheritance, per the redesign note in spec §9.

use crate::error::SyncError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Network,
    Api,
    Data,
    Validation,
    RateLimit,
    Authentication,
    Timeout,
    System,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
    Emergency,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryAction {
    Retry,
    WaitAndRetry,
    Skip,
    Fallback,
    Notify,
    Abort,
}

/// Classify an error's type and message against the ordered rule list
/// from spec §4.B.
pub fn classify(error: &SyncError) -> (ErrorKind, Severity) {
    let message = error.message_lower();
    let status = error.status();

    if matches!(error, SyncError::Network(_))
        || message.contains("network")
        || message.contains("connection")
        || message.contains("dns")
        || message.contains("socket")
    {
        return (ErrorKind::Network, Severity::Medium);
    }

    if matches!(error, SyncError::RateLimited)
        || status == Some(429)
        || crate::fetcher::looks_rate_limited(status, &message)
    {
        return (ErrorKind::RateLimit, Severity::Low);
    }

    if matches!(error, SyncError::Authentication(_))
        || status == Some(401)
        || status == Some(403)
        || message.contains("unauthorized")
        || message.contains("forbidden")
        || message.contains("authentication")
    {
        return (ErrorKind::Authentication, Severity::High);
    }

    if let Some(s) = status
        && (400..600).contains(&s)
    {
        return (ErrorKind::Api, Severity::Medium);
    }

    if matches!(error, SyncError::Validation(_) | SyncError::Data(_))
        || message.contains("validation")
        || message.contains("schema")
        || message.contains("malformed")
        || message.contains("parse")
    {
        return (ErrorKind::Data, Severity::Medium);
    }

    if matches!(error, SyncError::System(_) | SyncError::Io(_))
        || message.contains("memory")
        || message.contains("disk")
        || message.contains("permission")
        || message.contains("file not found")
        || message.contains("no such file")
    {
        return (ErrorKind::System, Severity::High);
    }

    if matches!(error, SyncError::Timeout(_)) || message.contains("timeout") {
        return (ErrorKind::Timeout, Severity::Medium);
    }

    (ErrorKind::Unknown, Severity::Medium)
}

/// Decide the recovery action for a classified error (spec §4.B).
pub fn select_action(kind: ErrorKind, severity: Severity) -> RecoveryAction {
    if severity == Severity::Critical || severity == Severity::Emergency {
        return RecoveryAction::Notify;
    }
    match kind {
        ErrorKind::RateLimit => RecoveryAction::WaitAndRetry,
        ErrorKind::Network | ErrorKind::Api | ErrorKind::Timeout => RecoveryAction::Retry,
        ErrorKind::Authentication if severity == Severity::High => RecoveryAction::Abort,
        ErrorKind::Data => RecoveryAction::Retry,
        ErrorKind::System => RecoveryAction::Notify,
        _ => RecoveryAction::Skip,
    }
}

/// Error categories that are never retried regardless of attempt count
/// (spec §4.B): authentication+critical, and data errors whose message
/// contains "malformed".
pub fn is_non_retryable(error: &SyncError, severity: Severity) -> bool {
    let (kind, _) = classify(error);
    if kind == ErrorKind::Authentication && severity == Severity::Critical {
        return true;
    }
    if kind == ErrorKind::Data && error.message_lower().contains("malformed") {
        return true;
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_rate_limit_before_generic_api() {
        let err = SyncError::Api {
            status: 429,
            message: "too many requests".into(),
        };
        assert_eq!(classify(&err).0, ErrorKind::RateLimit);
    }

    #[test]
    fn classifies_auth_as_high_severity() {
        let err = SyncError::Authentication("bad token".into());
        let (kind, severity) = classify(&err);
        assert_eq!(kind, ErrorKind::Authentication);
        assert_eq!(severity, Severity::High);
        assert_eq!(select_action(kind, severity), RecoveryAction::Abort);
    }

    #[test]
    fn classifies_generic_5xx_as_api() {
        let err = SyncError::Api {
            status: 503,
            message: "service unavailable".into(),
        };
        assert_eq!(classify(&err).0, ErrorKind::Api);
    }

    #[test]
    fn malformed_data_errors_are_non_retryable() {
        let err = SyncError::Data("malformed JSON body".into());
        assert!(is_non_retryable(&err, Severity::Medium));
    }

    #[test]
    fn well_formed_data_errors_are_retryable() {
        let err = SyncError::Data("missing field".into());
        assert!(!is_non_retryable(&err, Severity::Medium));
    }
}
