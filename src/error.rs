use thiserror::Error;

/// Main error type for the trade-trigger poller
#[derive(Error, Debug)]
pub enum TriggerError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    // Lifecycle errors
    #[error("Poller already running")]
    AlreadyRunning,

    #[error("Instrument not found: {0}")]
    UnknownInstrument(String),

    // Network errors
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    // Serialization errors
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    // Collaborator errors
    #[error("Metric fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("Trade submission failed: {0}")]
    Sink(#[from] SinkError),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Generic errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

/// Result type alias for TriggerError
pub type Result<T> = std::result::Result<T, TriggerError>;

/// Failure of a metric source for one instrument.
///
/// Recovered locally by the poller: the instrument is skipped for the
/// current tick and the rest are still evaluated.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("metric fetch for {instrument} timed out after {elapsed_ms}ms")]
    Timeout { instrument: String, elapsed_ms: u64 },

    #[error("metric unavailable for {instrument}: {reason}")]
    Unavailable { instrument: String, reason: String },

    #[error("invalid metric value for {instrument}: {raw}")]
    InvalidValue { instrument: String, raw: String },
}

impl FetchError {
    pub fn instrument(&self) -> &str {
        match self {
            FetchError::Timeout { instrument, .. }
            | FetchError::Unavailable { instrument, .. }
            | FetchError::InvalidValue { instrument, .. } => instrument,
        }
    }
}

/// Failure of the downstream trade sink
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SinkError {
    #[error("trade intent rejected: {0}")]
    Rejected(String),

    #[error("trade sink unavailable: {0}")]
    Unavailable(String),

    #[error("trade sink closed")]
    Closed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_error_exposes_instrument() {
        let err = FetchError::Timeout {
            instrument: "SEI/USDT".to_string(),
            elapsed_ms: 3000,
        };
        assert_eq!(err.instrument(), "SEI/USDT");
        assert_eq!(
            err.to_string(),
            "metric fetch for SEI/USDT timed out after 3000ms"
        );
    }

    #[test]
    fn test_collaborator_errors_convert_into_trigger_error() {
        let err: TriggerError = SinkError::Closed.into();
        assert!(matches!(err, TriggerError::Sink(SinkError::Closed)));
        assert_eq!(err.to_string(), "Trade submission failed: trade sink closed");
    }
}
