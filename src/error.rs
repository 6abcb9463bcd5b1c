use thiserror::Error;

/// Error taxonomy for every fallible operation in the pipeline.
///
/// Raw exceptions never propagate past the component that raised them;
/// [`crate::recovery::classify::classify`] maps each variant to an
/// `(ErrorKind, Severity)` pair before the error recovery layer decides
/// what to do with it.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("network error: {0}")]
    Network(String),

    #[error("request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("hub returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("rate limited by hub")]
    RateLimited,

    #[error("authentication failed: {0}")]
    Authentication(String),

    #[error("malformed data: {0}")]
    Data(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("timeout after {0}ms")]
    Timeout(u64),

    #[error("system error: {0}")]
    System(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("circuit breaker open for operation {0}")]
    CircuitOpen(String),

    #[error("cancelled")]
    Cancelled,

    #[error("{0}")]
    Unknown(String),
}

impl SyncError {
    /// Lowercased message text used by the classifier's substring rules.
    pub fn message_lower(&self) -> String {
        self.to_string().to_lowercase()
    }

    /// HTTP status code carried by the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            SyncError::Api { status, .. } => Some(*status),
            SyncError::Request(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
