//! `LogSource` backed by a host's exec channel.
//!
//! Reads are two commands: `stat -c %s` for the current length, then
//! `tail -c +N` for everything past the cursor.

use async_trait::async_trait;
use std::sync::Arc;

use lw_log_tools::{LogError, LogResult, LogSource, ReadChunk};

use crate::error::HostError;
use crate::host::{ExecOutput, Host};

/// Reads log files that live on a `Host`.
pub struct HostLogSource {
    host: Arc<dyn Host>,
}

impl HostLogSource {
    pub fn new(host: Arc<dyn Host>) -> Self {
        Self { host }
    }

    pub fn host(&self) -> &Arc<dyn Host> {
        &self.host
    }

    fn source_id(&self, path: &str) -> String {
        format!("{}:{path}", self.host.name())
    }

    fn map_host_error(&self, path: &str, err: HostError) -> LogError {
        match err {
            HostError::Timeout(ms) => LogError::Timeout {
                source_id: self.source_id(path),
                timeout_ms: ms,
            },
            other => LogError::unavailable(self.source_id(path), other.to_string()),
        }
    }

    async fn run(&self, path: &str, command: &str) -> LogResult<ExecOutput> {
        self.host
            .execute(command)
            .await
            .map_err(|e| self.map_host_error(path, e))
    }
}

fn is_missing(output: &ExecOutput) -> bool {
    output.stderr.contains("No such file or directory")
}

#[async_trait]
impl LogSource for HostLogSource {
    async fn read(&self, path: &str, from_offset: u64) -> LogResult<ReadChunk> {
        let quoted = shell_words::quote(path);

        let stat = self.run(path, &format!("stat -c %s {quoted}")).await?;
        if !stat.success() {
            if is_missing(&stat) {
                return Ok(ReadChunk::missing(from_offset));
            }
            return Err(LogError::unavailable(
                self.source_id(path),
                stat.stderr.trim().to_string(),
            ));
        }
        let len: u64 = stat.stdout_lossy().trim().parse().map_err(|e| {
            LogError::Other(format!(
                "{}: unexpected stat output {:?}: {e}",
                self.source_id(path),
                stat.stdout_lossy()
            ))
        })?;

        if len < from_offset {
            return Ok(ReadChunk {
                bytes: Vec::new(),
                new_offset: from_offset,
                len,
                exists: true,
            });
        }

        // tail counts bytes from 1.
        let tail = self
            .run(path, &format!("tail -c +{} {quoted}", from_offset + 1))
            .await?;
        if !tail.success() {
            if is_missing(&tail) {
                return Ok(ReadChunk::missing(from_offset));
            }
            return Err(LogError::unavailable(
                self.source_id(path),
                tail.stderr.trim().to_string(),
            ));
        }

        let new_offset = from_offset + tail.stdout.len() as u64;
        tracing::trace!(
            host = %self.host.name(),
            path = %path,
            from_offset,
            new_offset,
            "read from host"
        );
        Ok(ReadChunk {
            bytes: tail.stdout,
            new_offset,
            len: len.max(new_offset),
            exists: true,
        })
    }
}
