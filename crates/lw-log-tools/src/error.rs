//! Log monitoring error types.

use thiserror::Error;

/// Faults raised while reading or scanning a log source.
///
/// Unparseable lines and policy hits are not errors; they are reported as
/// data inside a `ScanResult`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LogError {
    #[error("source unavailable: {source_id}: {reason}")]
    SourceUnavailable { source_id: String, reason: String },

    #[error("unknown source: {0}")]
    UnknownSource(String),

    #[error("timed out reading {source_id} after {timeout_ms}ms")]
    Timeout { source_id: String, timeout_ms: u64 },

    #[error("I/O error: {0}")]
    Io(String),

    #[error("{0}")]
    Other(String),
}

impl LogError {
    pub fn unavailable(source_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::SourceUnavailable {
            source_id: source_id.into(),
            reason: reason.into(),
        }
    }

    /// Attribute a read fault to `source_id`. The id it was raised under
    /// (a path, or `host:path`) is kept at the front of the reason.
    pub fn for_source(self, source_id: &str) -> Self {
        match self {
            Self::SourceUnavailable {
                source_id: raised_as,
                reason,
            } if raised_as != source_id => Self::SourceUnavailable {
                source_id: source_id.to_string(),
                reason: format!("{raised_as}: {reason}"),
            },
            Self::Timeout { timeout_ms, .. } => Self::Timeout {
                source_id: source_id.to_string(),
                timeout_ms,
            },
            other => other,
        }
    }
}

/// Convenience alias for log monitoring results.
pub type LogResult<T> = Result<T, LogError>;
