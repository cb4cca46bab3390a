//! Builds an analyzer from `MonitorConfig` and drives it from the CLI.

use std::sync::Arc;
use std::time::Duration;

use lw_host::{DockerHost, HostLogSource};
use lw_log_tools::{CheckReport, FileLogSource, LogAnalyzer, LogSource};

use crate::config::{HostConfig, MonitorConfig};

/// Log source for a configured host.
pub fn source_for(host: &HostConfig) -> Arc<dyn LogSource> {
    match host {
        HostConfig::Local => Arc::new(FileLogSource),
        HostConfig::Docker(container) => {
            Arc::new(HostLogSource::new(Arc::new(DockerHost::new(container.clone()))))
        }
    }
}

/// Attach every configured source to a fresh analyzer.
pub fn build_analyzer(config: &MonitorConfig) -> LogAnalyzer {
    build_analyzer_with(config, source_for)
}

/// Like `build_analyzer`, with a caller-supplied source per host.
pub fn build_analyzer_with<F>(config: &MonitorConfig, mut source_for: F) -> LogAnalyzer
where
    F: FnMut(&HostConfig) -> Arc<dyn LogSource>,
{
    let mut analyzer = LogAnalyzer::new();
    analyzer.set_expect_errors(config.expect_errors);
    for source in &config.sources {
        analyzer.attach(
            &source.id,
            &source.path,
            source.policy(&config.defaults),
            source_for(&source.host),
        );
    }
    analyzer
}

/// Run one check and print the report as JSON. Returns whether it passed.
pub async fn run_once(analyzer: &mut LogAnalyzer) -> anyhow::Result<bool> {
    let report = analyzer.check_all().await;
    emit(&report)?;
    Ok(!report.verdict().is_failure())
}

/// Check every `interval` until Ctrl-C, printing each report.
pub async fn run_watch(analyzer: &mut LogAnalyzer, interval: Duration) -> anyhow::Result<()> {
    let mut ticker = tokio::time::interval(interval);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let report = analyzer.check_all().await;
                emit(&report)?;
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("interrupted, stopping");
                return Ok(());
            }
        }
    }
}

fn emit(report: &CheckReport) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string(&report.to_json())?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use lw_log_tools::MockLogSource;

    const PATH: &str = "/var/log/calico/felix/current";

    #[tokio::test]
    async fn build_analyzer_attaches_every_source() {
        let config = MonitorConfig::parse(
            r#"
expect_errors = true

[[sources]]
id = "host1"
path = "/var/log/calico/felix/current"

[[sources]]
id = "host2"
path = "/var/log/calico/felix/current"
host = { docker = "host2" }
"#,
        )
        .unwrap();

        let mock = Arc::new(MockLogSource::with_felix_baseline(PATH));
        let mut analyzer = build_analyzer_with(&config, |_| mock.clone() as Arc<dyn LogSource>);
        assert_eq!(analyzer.source_ids(), vec!["host1", "host2"]);
        assert!(analyzer.expect_errors());

        // Baseline is INFO only, so expect-errors mode fails.
        assert!(!run_once(&mut analyzer).await.unwrap());
    }

    #[tokio::test]
    async fn local_source_reads_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("current");
        std::fs::write(
            &path,
            "2017-01-12 19:19:05.421 [ERROR][87] syncer.go 500: Watcher is out-of-sync.\n",
        )
        .unwrap();

        let config = MonitorConfig::parse(&format!(
            "[[sources]]\nid = \"local\"\npath = {:?}\n",
            path.to_str().unwrap()
        ))
        .unwrap();
        let mut analyzer = build_analyzer(&config);
        let report = analyzer.check_all().await;
        assert_eq!(report.exception_count(), 1);
    }
}
