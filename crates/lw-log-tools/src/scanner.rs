//! Exception scanner: applies a severity policy to newly appended lines.

use std::sync::Arc;

use crate::classifier;
use crate::cursor::LogCursor;
use crate::error::{LogError, LogResult};
use crate::source::LogSource;
use crate::types::{FlaggedLine, ScanPolicy, ScanResult};

/// Scans one log source for exceptional lines.
///
/// Each scan examines only the lines appended since the previous scan.
pub struct ExceptionScanner {
    cursor: LogCursor,
    policy: ScanPolicy,
    source: Arc<dyn LogSource>,
}

impl ExceptionScanner {
    pub fn new(
        source_id: impl Into<String>,
        path: impl Into<String>,
        policy: ScanPolicy,
        source: Arc<dyn LogSource>,
    ) -> Self {
        Self {
            cursor: LogCursor::new(source_id, path),
            policy,
            source,
        }
    }

    pub fn source_id(&self) -> &str {
        self.cursor.source_id()
    }

    pub fn path(&self) -> &str {
        self.cursor.path()
    }

    pub fn policy(&self) -> &ScanPolicy {
        &self.policy
    }

    pub fn cursor(&self) -> &LogCursor {
        &self.cursor
    }

    /// Replace the policy. The cursor position is kept.
    pub fn set_policy(&mut self, policy: ScanPolicy) {
        self.policy = policy;
    }

    /// Swap the backing source and path. A different path starts a new cursor.
    pub fn rebind(&mut self, path: &str, source: Arc<dyn LogSource>) {
        if path != self.cursor.path() {
            tracing::info!(
                source = %self.cursor.source_id(),
                old_path = %self.cursor.path(),
                new_path = %path,
                "log path changed, starting a new cursor"
            );
            self.cursor = LogCursor::new(self.cursor.source_id().to_string(), path);
        }
        self.source = source;
    }

    /// Poll the source and return the exceptional lines among the new ones.
    pub async fn scan(&mut self) -> LogResult<ScanResult> {
        let lines = match self.policy.poll_timeout {
            Some(timeout) => {
                tokio::time::timeout(timeout, self.cursor.poll(self.source.as_ref()))
                    .await
                    .map_err(|_| LogError::Timeout {
                        source_id: self.cursor.source_id().to_string(),
                        timeout_ms: timeout.as_millis() as u64,
                    })??
            }
            None => self.cursor.poll(self.source.as_ref()).await?,
        };

        let mut exceptions = Vec::new();
        for raw in &lines {
            let line = classifier::classify_raw(raw);
            if !line.is_structured() {
                tracing::debug!(
                    source = %self.cursor.source_id(),
                    line = line.line_number,
                    raw = %line.raw,
                    "unparseable log line"
                );
            }
            if let Some(reason) = self.policy.evaluate(&line) {
                tracing::info!(
                    source = %self.cursor.source_id(),
                    line = line.line_number,
                    severity = ?line.severity(),
                    message = %line.message(),
                    "exceptional log line"
                );
                exceptions.push(FlaggedLine { line, reason });
            }
        }

        Ok(ScanResult {
            source_id: self.cursor.source_id().to_string(),
            lines_scanned: lines.len(),
            exceptions,
        })
    }

    /// Scan and report whether any exceptional line was found.
    pub async fn has_exceptions(&mut self) -> LogResult<bool> {
        Ok(!self.scan().await?.is_empty())
    }
}
