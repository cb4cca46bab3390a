//! Core log monitoring types: severities, classified lines, scan policy and
//! scan results.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::time::Duration;

// ── Severity ──────────────────────────────────────────────────

/// Log severity level, ordered from least to most severe.
///
/// Variant declaration order matters: `#[derive(Ord)]` uses it,
/// so Debug < Info < Warn < Error < Fatal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Debug,
    Info,
    #[serde(alias = "warning")]
    Warn,
    Error,
    #[serde(alias = "panic", alias = "critical")]
    Fatal,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
            Self::Fatal => "fatal",
        }
    }

    /// Case-insensitive lookup of a severity token as it appears in a log line.
    pub fn from_token(token: &str) -> Option<Self> {
        match token.to_ascii_lowercase().as_str() {
            "debug" | "trace" => Some(Self::Debug),
            "info" => Some(Self::Info),
            "warn" | "warning" => Some(Self::Warn),
            "error" | "err" => Some(Self::Error),
            "fatal" | "panic" | "critical" => Some(Self::Fatal),
            _ => None,
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Lines ─────────────────────────────────────────────────────

/// One complete line delivered by a `LogCursor`, before classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawLine {
    /// Line text without its terminator.
    pub text: String,
    /// Byte offset of the first byte of the line in the source.
    pub offset: u64,
    /// 1-based line number in the source (restarts after truncation).
    pub line_number: usize,
}

/// Outcome of classifying a line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LineKind {
    Structured {
        /// None when the date/time fields matched the grammar but are not a
        /// real calendar instant.
        timestamp: Option<NaiveDateTime>,
        severity: Severity,
        /// The severity token was not a known level and was mapped to Info.
        nonstandard_severity: bool,
        pid: u32,
        /// Emitting source file, e.g. `syncer.go`.
        component: String,
        /// Line number inside `component`.
        component_line: u32,
        message: String,
    },
    Unstructured,
}

/// A classified log line. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogLine {
    pub raw: String,
    pub offset: u64,
    pub line_number: usize,
    #[serde(flatten)]
    pub kind: LineKind,
}

impl LogLine {
    pub fn severity(&self) -> Option<Severity> {
        match &self.kind {
            LineKind::Structured { severity, .. } => Some(*severity),
            LineKind::Unstructured => None,
        }
    }

    pub fn message(&self) -> &str {
        match &self.kind {
            LineKind::Structured { message, .. } => message,
            LineKind::Unstructured => &self.raw,
        }
    }

    pub fn is_structured(&self) -> bool {
        matches!(self.kind, LineKind::Structured { .. })
    }
}

// ── Policy ────────────────────────────────────────────────────

/// Decides which lines of a source are exceptional.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanPolicy {
    /// Structured lines at or above this severity are exceptional.
    pub threshold: Severity,
    /// Flag lines that do not match the structured grammar.
    pub treat_unparseable_as_error: bool,
    /// Upper bound on a single poll of the source. None waits indefinitely.
    pub poll_timeout: Option<Duration>,
}

impl Default for ScanPolicy {
    fn default() -> Self {
        Self {
            threshold: Severity::Error,
            treat_unparseable_as_error: false,
            poll_timeout: None,
        }
    }
}

impl ScanPolicy {
    pub fn with_threshold(mut self, threshold: Severity) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_unparseable_as_error(mut self, enabled: bool) -> Self {
        self.treat_unparseable_as_error = enabled;
        self
    }

    pub fn with_poll_timeout(mut self, timeout: Duration) -> Self {
        self.poll_timeout = Some(timeout);
        self
    }

    /// Returns why `line` is exceptional under this policy, if it is.
    pub fn evaluate(&self, line: &LogLine) -> Option<ExceptionReason> {
        match line.severity() {
            Some(severity) if severity >= self.threshold => Some(ExceptionReason::SeverityAtOrAbove {
                threshold: self.threshold,
            }),
            Some(_) => None,
            None if self.treat_unparseable_as_error => Some(ExceptionReason::Unparseable),
            None => None,
        }
    }
}

// ── Scan results ──────────────────────────────────────────────

/// Why a line was flagged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum ExceptionReason {
    SeverityAtOrAbove { threshold: Severity },
    Unparseable,
}

/// A line the policy flagged, with the reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlaggedLine {
    pub line: LogLine,
    #[serde(flatten)]
    pub reason: ExceptionReason,
}

/// Exceptional lines found in one scan of one source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanResult {
    pub source_id: String,
    /// Number of complete lines examined by this scan.
    pub lines_scanned: usize,
    pub exceptions: Vec<FlaggedLine>,
}

impl ScanResult {
    pub fn empty(source_id: impl Into<String>) -> Self {
        Self {
            source_id: source_id.into(),
            lines_scanned: 0,
            exceptions: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.exceptions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exceptions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FlaggedLine> {
        self.exceptions.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn structured(severity: Severity) -> LogLine {
        LogLine {
            raw: String::new(),
            offset: 0,
            line_number: 1,
            kind: LineKind::Structured {
                timestamp: None,
                severity,
                nonstandard_severity: false,
                pid: 1,
                component: "syncer.go".into(),
                component_line: 1,
                message: "msg".into(),
            },
        }
    }

    fn unstructured() -> LogLine {
        LogLine {
            raw: "garbage".into(),
            offset: 0,
            line_number: 1,
            kind: LineKind::Unstructured,
        }
    }

    #[test]
    fn severity_ordering() {
        assert!(Severity::Debug < Severity::Info);
        assert!(Severity::Info < Severity::Warn);
        assert!(Severity::Warn < Severity::Error);
        assert!(Severity::Error < Severity::Fatal);
    }

    #[test]
    fn severity_tokens_are_case_insensitive() {
        assert_eq!(Severity::from_token("ERROR"), Some(Severity::Error));
        assert_eq!(Severity::from_token("error"), Some(Severity::Error));
        assert_eq!(Severity::from_token("Warning"), Some(Severity::Warn));
        assert_eq!(Severity::from_token("PANIC"), Some(Severity::Fatal));
        assert_eq!(Severity::from_token("NOTICE"), None);
    }

    #[test]
    fn severity_deserializes_aliases() {
        let s: Severity = serde_json::from_str(r#""warning""#).unwrap();
        assert_eq!(s, Severity::Warn);
        let s: Severity = serde_json::from_str(r#""fatal""#).unwrap();
        assert_eq!(s, Severity::Fatal);
    }

    #[test]
    fn default_policy_flags_error_and_above() {
        let policy = ScanPolicy::default();
        assert!(policy.evaluate(&structured(Severity::Info)).is_none());
        assert!(policy.evaluate(&structured(Severity::Warn)).is_none());
        assert_eq!(
            policy.evaluate(&structured(Severity::Error)),
            Some(ExceptionReason::SeverityAtOrAbove {
                threshold: Severity::Error
            })
        );
        assert!(policy.evaluate(&structured(Severity::Fatal)).is_some());
    }

    #[test]
    fn unparseable_ignored_by_default() {
        assert!(ScanPolicy::default().evaluate(&unstructured()).is_none());
    }

    #[test]
    fn unparseable_flagged_when_enabled() {
        let policy = ScanPolicy::default().with_unparseable_as_error(true);
        assert_eq!(
            policy.evaluate(&unstructured()),
            Some(ExceptionReason::Unparseable)
        );
    }

    #[test]
    fn lowered_threshold_flags_warnings() {
        let policy = ScanPolicy::default().with_threshold(Severity::Warn);
        assert!(policy.evaluate(&structured(Severity::Warn)).is_some());
        assert!(policy.evaluate(&structured(Severity::Info)).is_none());
    }
}
