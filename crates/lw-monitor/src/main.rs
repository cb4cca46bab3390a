//! LogWatch monitor: tails configured logs and reports exceptional lines.
//!
//! Prints one JSON report per check on stdout. With `interval_secs` set it
//! keeps checking until Ctrl-C; otherwise it checks once and exits non-zero
//! when the verdict is a failure.

use std::time::Duration;

use tracing_subscriber::EnvFilter;

use lw_monitor::config::MonitorConfig;
use lw_monitor::runner;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "lw-monitor starting");

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "/etc/logwatch/monitor.toml".to_string());

    let config = MonitorConfig::from_file(&config_path)?;
    tracing::info!(
        path = %config_path,
        sources = config.sources.len(),
        expect_errors = config.expect_errors,
        "config loaded"
    );

    let mut analyzer = runner::build_analyzer(&config);

    match config.interval_secs {
        Some(secs) => {
            tracing::info!(interval_secs = secs, "watching logs");
            runner::run_watch(&mut analyzer, Duration::from_secs(secs)).await?;
        }
        None => {
            if !runner::run_once(&mut analyzer).await? {
                tracing::warn!("log check failed");
                std::process::exit(1);
            }
        }
    }

    tracing::info!("lw-monitor stopped");
    Ok(())
}
