//! Log analyzer: one exception scanner per monitored source, checked
//! together at explicit checkpoints.

use serde_json::json;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::task::JoinSet;

use crate::error::{LogError, LogResult};
use crate::scanner::ExceptionScanner;
use crate::source::LogSource;
use crate::types::{ScanPolicy, ScanResult};

// ── Report ────────────────────────────────────────────────────

/// Pass/fail reading of a `CheckReport`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// No exceptional lines (normal mode) or at least one (expect-errors mode).
    Passed,
    /// Normal mode found exceptional lines.
    ExceptionsFound { count: usize },
    /// Expect-errors mode found none.
    MissingExpectedErrors,
    /// At least one source could not be scanned.
    Faulted { sources: Vec<String> },
}

impl Verdict {
    pub fn is_failure(&self) -> bool {
        !matches!(self, Self::Passed)
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Passed => f.write_str("passed"),
            Self::ExceptionsFound { count } => write!(f, "found {count} exceptional log lines"),
            Self::MissingExpectedErrors => f.write_str("expected errors were not logged"),
            Self::Faulted { sources } => write!(f, "could not scan: {}", sources.join(", ")),
        }
    }
}

/// Per-source outcome of one `check_all` pass.
#[derive(Debug, Clone)]
pub struct CheckReport {
    /// The pass ran in expect-errors mode.
    pub expect_errors: bool,
    pub results: BTreeMap<String, LogResult<ScanResult>>,
}

impl CheckReport {
    /// Total exceptional lines across every source that scanned cleanly.
    pub fn exception_count(&self) -> usize {
        self.results
            .values()
            .filter_map(|r| r.as_ref().ok())
            .map(ScanResult::len)
            .sum()
    }

    /// Sources whose scan faulted, with the fault.
    pub fn faults(&self) -> Vec<(&str, &LogError)> {
        self.results
            .iter()
            .filter_map(|(id, r)| r.as_ref().err().map(|e| (id.as_str(), e)))
            .collect()
    }

    pub fn get(&self, source_id: &str) -> Option<&LogResult<ScanResult>> {
        self.results.get(source_id)
    }

    /// Interpret the report. In expect-errors mode the absence of any
    /// exceptional line is the failure.
    pub fn verdict(&self) -> Verdict {
        let faulted: Vec<String> = self
            .faults()
            .into_iter()
            .map(|(id, _)| id.to_string())
            .collect();
        if !faulted.is_empty() {
            return Verdict::Faulted { sources: faulted };
        }

        let count = self.exception_count();
        match (self.expect_errors, count) {
            (false, 0) => Verdict::Passed,
            (false, count) => Verdict::ExceptionsFound { count },
            (true, 0) => Verdict::MissingExpectedErrors,
            (true, _) => Verdict::Passed,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        let sources: serde_json::Map<String, serde_json::Value> = self
            .results
            .iter()
            .map(|(id, result)| {
                let value = match result {
                    Ok(scan) => json!({
                        "lines_scanned": scan.lines_scanned,
                        "exception_count": scan.len(),
                        "exceptions": scan.exceptions,
                    }),
                    Err(e) => json!({ "error": e.to_string() }),
                };
                (id.clone(), value)
            })
            .collect();

        let verdict = self.verdict();
        json!({
            "expect_errors": self.expect_errors,
            "verdict": verdict.to_string(),
            "failed": verdict.is_failure(),
            "exception_count": self.exception_count(),
            "sources": sources,
        })
    }
}

// ── Analyzer ──────────────────────────────────────────────────

/// Monitors a set of log sources for one session.
///
/// `check_all` takes `&mut self`, so it cannot overlap with itself on the
/// same analyzer.
pub struct LogAnalyzer {
    scanners: HashMap<String, ExceptionScanner>,
    expect_errors: bool,
}

impl LogAnalyzer {
    pub fn new() -> Self {
        Self {
            scanners: HashMap::new(),
            expect_errors: false,
        }
    }

    /// Enable or disable expect-errors mode for subsequent checks.
    pub fn set_expect_errors(&mut self, expect_errors: bool) {
        self.expect_errors = expect_errors;
    }

    pub fn expect_errors(&self) -> bool {
        self.expect_errors
    }

    /// Start monitoring `path` as `source_id`.
    ///
    /// Re-attaching an existing id replaces its policy and source but keeps
    /// the cursor, so already-seen lines are not scanned again.
    pub fn attach(
        &mut self,
        source_id: &str,
        path: &str,
        policy: ScanPolicy,
        source: Arc<dyn LogSource>,
    ) -> &ExceptionScanner {
        match self.scanners.entry(source_id.to_string()) {
            std::collections::hash_map::Entry::Occupied(entry) => {
                tracing::debug!(source = %source_id, "re-attaching log source");
                let scanner = entry.into_mut();
                scanner.set_policy(policy);
                scanner.rebind(path, source);
                scanner
            }
            std::collections::hash_map::Entry::Vacant(entry) => {
                tracing::info!(source = %source_id, path = %path, "attaching log source");
                entry.insert(ExceptionScanner::new(source_id, path, policy, source))
            }
        }
    }

    /// Stop monitoring `source_id`.
    pub fn detach(&mut self, source_id: &str) -> LogResult<()> {
        self.scanners
            .remove(source_id)
            .map(|_| tracing::info!(source = %source_id, "detached log source"))
            .ok_or_else(|| LogError::UnknownSource(source_id.to_string()))
    }

    pub fn is_attached(&self, source_id: &str) -> bool {
        self.scanners.contains_key(source_id)
    }

    /// Attached source ids, sorted.
    pub fn source_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.scanners.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.scanners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scanners.is_empty()
    }

    /// Scan a single attached source.
    pub async fn scan(&mut self, source_id: &str) -> LogResult<ScanResult> {
        self.scanners
            .get_mut(source_id)
            .ok_or_else(|| LogError::UnknownSource(source_id.to_string()))?
            .scan()
            .await
    }

    /// Scan every attached source concurrently and collect the results.
    ///
    /// Each scanner is moved into its own task and moved back once the task
    /// finishes; the report is built only after every task has joined. A
    /// fault in one source never affects the others. A scanner whose task
    /// panics is reported as faulted and dropped. Dropping the returned
    /// future before it completes loses every in-flight scanner.
    pub async fn check_all(&mut self) -> CheckReport {
        let ids = self.source_ids();
        let mut tasks = JoinSet::new();
        for (id, mut scanner) in self.scanners.drain() {
            tasks.spawn(async move {
                let result = scanner.scan().await;
                (id, scanner, result)
            });
        }

        let mut results = BTreeMap::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((id, scanner, result)) => {
                    if let Err(e) = &result {
                        tracing::warn!(source = %id, error = %e, "log scan failed");
                    }
                    self.scanners.insert(id.clone(), scanner);
                    results.insert(id, result);
                }
                Err(e) => tracing::error!(error = %e, "log scan task failed"),
            }
        }

        for id in ids {
            results
                .entry(id)
                .or_insert_with(|| Err(LogError::Other("scan task panicked".into())));
        }

        let report = CheckReport {
            expect_errors: self.expect_errors,
            results,
        };
        tracing::info!(
            sources = report.results.len(),
            exceptions = report.exception_count(),
            expect_errors = self.expect_errors,
            verdict = %report.verdict(),
            "log check complete"
        );
        report
    }
}

impl Default for LogAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}
