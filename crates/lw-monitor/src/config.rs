//! Monitor configuration, loadable from TOML.

use serde::Deserialize;
use std::collections::HashSet;
use std::time::Duration;

use lw_log_tools::{ScanPolicy, Severity};

/// Top-level configuration for the monitor.
#[derive(Debug, Clone, Deserialize)]
pub struct MonitorConfig {
    /// Invert the verdict: a check fails when no exceptional line is found.
    #[serde(default)]
    pub expect_errors: bool,
    /// Seconds between checks. None runs a single check and exits.
    #[serde(default)]
    pub interval_secs: Option<u64>,
    /// Policy applied to every source unless overridden.
    #[serde(default)]
    pub defaults: PolicyConfig,
    /// Log sources to monitor.
    #[serde(default)]
    pub sources: Vec<SourceConfig>,
}

/// Scan policy settings.
#[derive(Debug, Clone, Deserialize)]
pub struct PolicyConfig {
    #[serde(default = "default_threshold")]
    pub threshold: Severity,
    #[serde(default)]
    pub treat_unparseable_as_error: bool,
    #[serde(default)]
    pub poll_timeout_ms: Option<u64>,
}

fn default_threshold() -> Severity {
    Severity::Error
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
            treat_unparseable_as_error: false,
            poll_timeout_ms: None,
        }
    }
}

impl PolicyConfig {
    pub fn to_policy(&self) -> ScanPolicy {
        ScanPolicy {
            threshold: self.threshold,
            treat_unparseable_as_error: self.treat_unparseable_as_error,
            poll_timeout: self.poll_timeout_ms.map(Duration::from_millis),
        }
    }
}

/// Where a source's log file lives.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HostConfig {
    /// This machine's filesystem.
    #[default]
    Local,
    /// Inside the named Docker container.
    Docker(String),
}

/// One monitored log source.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    pub id: String,
    pub path: String,
    #[serde(default)]
    pub host: HostConfig,
    #[serde(default)]
    pub threshold: Option<Severity>,
    #[serde(default)]
    pub treat_unparseable_as_error: Option<bool>,
    #[serde(default)]
    pub poll_timeout_ms: Option<u64>,
}

impl SourceConfig {
    /// Effective policy: per-source overrides on top of `defaults`.
    pub fn policy(&self, defaults: &PolicyConfig) -> ScanPolicy {
        let mut policy = defaults.to_policy();
        if let Some(threshold) = self.threshold {
            policy.threshold = threshold;
        }
        if let Some(flag) = self.treat_unparseable_as_error {
            policy.treat_unparseable_as_error = flag;
        }
        if let Some(ms) = self.poll_timeout_ms {
            policy.poll_timeout = Some(Duration::from_millis(ms));
        }
        policy
    }
}

impl MonitorConfig {
    /// Load config from a TOML file path.
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse and validate TOML config text.
    pub fn parse(contents: &str) -> anyhow::Result<Self> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        let mut seen = HashSet::new();
        for source in &self.sources {
            if source.id.trim().is_empty() {
                anyhow::bail!("source id must not be empty");
            }
            if source.path.trim().is_empty() {
                anyhow::bail!("source {} has an empty path", source.id);
            }
            if !seen.insert(source.id.as_str()) {
                anyhow::bail!("duplicate source id: {}", source.id);
            }
        }
        if self.interval_secs == Some(0) {
            anyhow::bail!("interval_secs must be greater than zero");
        }
        Ok(())
    }
}
