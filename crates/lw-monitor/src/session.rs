//! Monitoring session: the explicit context a test rig passes around
//! instead of process-wide fixture state.
//!
//! A session owns a set of hosts, the analyzer watching one log path on
//! each, and the expect-errors switch. Test lifecycle hooks call
//! `begin_step` / `end_step` around each step and `teardown` at the end.

use std::path::Path;
use std::sync::Arc;
use tokio::task::JoinSet;

use lw_host::{Host, HostError, HostLogSource};
use lw_log_tools::{CheckReport, LogAnalyzer, LogError, ScanPolicy, Verdict};

/// Errors from session lifecycle operations.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("host {host}: {source}")]
    Host {
        host: String,
        #[source]
        source: HostError,
    },

    #[error(transparent)]
    Log(#[from] LogError),

    #[error("step {step} failed: {verdict}")]
    StepFailed {
        step: String,
        verdict: Verdict,
        report: Box<CheckReport>,
    },

    #[error("host setup task failed: {0}")]
    Setup(String),
}

pub type SessionResult<T> = Result<T, SessionError>;

/// Construct hosts concurrently, one task per name. Hosts are returned in
/// the order of `names`; the first failure is returned after all tasks
/// have finished.
pub async fn setup_hosts<F, Fut>(names: Vec<String>, make: F) -> SessionResult<Vec<Arc<dyn Host>>>
where
    F: Fn(String) -> Fut,
    Fut: Future<Output = Result<Arc<dyn Host>, HostError>> + Send + 'static,
{
    let count = names.len();
    let mut tasks = JoinSet::new();
    for (i, name) in names.into_iter().enumerate() {
        let fut = make(name.clone());
        tasks.spawn(async move { (i, name, fut.await) });
    }

    let mut slots: Vec<Option<Arc<dyn Host>>> = (0..count).map(|_| None).collect();
    let mut first_error = None;
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((i, _, Ok(host))) => {
                tracing::info!(host = %host.name(), "host ready");
                slots[i] = Some(host);
            }
            Ok((_, name, Err(source))) => {
                tracing::error!(host = %name, error = %source, "host setup failed");
                first_error.get_or_insert(SessionError::Host { host: name, source });
            }
            Err(e) => {
                first_error.get_or_insert(SessionError::Setup(e.to_string()));
            }
        }
    }

    if let Some(err) = first_error {
        return Err(err);
    }
    Ok(slots.into_iter().flatten().collect())
}

/// A monitoring session over a set of hosts sharing one log path.
pub struct Session {
    hosts: Vec<Arc<dyn Host>>,
    analyzer: LogAnalyzer,
    log_path: String,
    policy: ScanPolicy,
    current_step: Option<String>,
}

impl Session {
    pub fn new(log_path: impl Into<String>, policy: ScanPolicy) -> Self {
        Self {
            hosts: Vec::new(),
            analyzer: LogAnalyzer::new(),
            log_path: log_path.into(),
            policy,
            current_step: None,
        }
    }

    pub fn with_hosts(mut self, hosts: Vec<Arc<dyn Host>>) -> Self {
        self.hosts = hosts;
        self
    }

    pub fn add_host(&mut self, host: Arc<dyn Host>) {
        self.hosts.push(host);
    }

    pub fn hosts(&self) -> &[Arc<dyn Host>] {
        &self.hosts
    }

    pub fn log_path(&self) -> &str {
        &self.log_path
    }

    pub fn analyzer(&self) -> &LogAnalyzer {
        &self.analyzer
    }

    pub fn analyzer_mut(&mut self) -> &mut LogAnalyzer {
        &mut self.analyzer
    }

    /// Expect the current step to log at least one exceptional line.
    /// Cleared again by `end_step`.
    pub fn set_expect_errors(&mut self, expect_errors: bool) {
        self.analyzer.set_expect_errors(expect_errors);
    }

    /// Write `content` as the log file on every host, creating its directory.
    pub async fn seed_log(&self, content: &[u8]) -> SessionResult<()> {
        let parent = Path::new(&self.log_path)
            .parent()
            .map(|p| p.to_string_lossy().into_owned())
            .filter(|p| !p.is_empty());

        for host in &self.hosts {
            let host_err = |source: HostError| SessionError::Host {
                host: host.name().to_string(),
                source,
            };
            if let Some(dir) = &parent {
                host.execute_checked(&format!("mkdir -p {}", shell_words::quote(dir)))
                    .await
                    .map_err(host_err)?;
            }
            host.write_file(&self.log_path, content)
                .await
                .map_err(host_err)?;
            tracing::debug!(host = %host.name(), path = %self.log_path, "seeded log");
        }
        Ok(())
    }

    /// Start a step: attach an analyzer source for every host.
    ///
    /// Hosts already attached keep their cursor, so lines seen in earlier
    /// steps are not reported again.
    pub fn begin_step(&mut self, name: &str) {
        tracing::info!("===== starting {name} =====");
        for host in &self.hosts {
            tracing::debug!(host = %host.name(), "attaching log analyzer");
            self.analyzer.attach(
                host.name(),
                &self.log_path,
                self.policy.clone(),
                Arc::new(HostLogSource::new(host.clone())),
            );
        }
        self.current_step = Some(name.to_string());
    }

    /// Finish a step: check every host's log and apply the verdict.
    ///
    /// In expect-errors mode a clean log is the failure. Either way the
    /// mode is reset to off afterwards.
    pub async fn end_step(&mut self) -> SessionResult<CheckReport> {
        let step = self.current_step.take().unwrap_or_default();
        tracing::info!(step = %step, "checking logs for exceptions");

        let report = self.analyzer.check_all().await;
        self.analyzer.set_expect_errors(false);

        let verdict = report.verdict();
        if verdict.is_failure() {
            tracing::warn!(step = %step, verdict = %verdict, "step failed log check");
            return Err(SessionError::StepFailed {
                step,
                verdict,
                report: Box::new(report),
            });
        }
        Ok(report)
    }

    /// Detach every source and clean up every host. All hosts are cleaned
    /// even if one fails; the first failure is returned.
    pub async fn teardown(&mut self) -> SessionResult<()> {
        for id in self.analyzer.source_ids() {
            self.analyzer.detach(&id)?;
        }

        let mut first_error = None;
        for host in self.hosts.drain(..) {
            if let Err(source) = host.cleanup().await {
                tracing::error!(host = %host.name(), error = %source, "cleanup failed");
                first_error.get_or_insert(SessionError::Host {
                    host: host.name().to_string(),
                    source,
                });
            }
        }
        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}
