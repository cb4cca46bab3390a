//! Local host backend: runs commands on this machine.
//!
//! Commands are tokenized with `shell-words` and executed directly via
//! `tokio::process::Command` (no shell interpretation), bounded by a timeout.

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::process::Command;

use crate::error::{HostError, HostResult};
use crate::host::{ExecOutput, Host, split_command};

/// Default command execution timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// The machine this process runs on.
pub struct LocalHost {
    name: String,
    timeout: Duration,
    /// Files created by `write_file`, removed again by `cleanup`.
    written: Mutex<Vec<PathBuf>>,
}

impl LocalHost {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            timeout: DEFAULT_TIMEOUT,
            written: Mutex::new(Vec::new()),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The list is a plain record of paths, still valid after a panic
    /// elsewhere poisoned the lock.
    fn written(&self) -> MutexGuard<'_, Vec<PathBuf>> {
        self.written.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl Host for LocalHost {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, command: &str) -> HostResult<ExecOutput> {
        let tokens = split_command(command)?;
        let (program, args) = (&tokens[0], &tokens[1..]);

        tracing::debug!(host = %self.name, command = %command, "executing");
        let result = tokio::time::timeout(self.timeout, async {
            Command::new(program)
                .args(args)
                .kill_on_drop(true)
                .output()
                .await
                .map_err(|e| HostError::Exec(format!("{program}: {e}")))
        })
        .await;

        let output = match result {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => return Err(e),
            Err(_) => return Err(HostError::Timeout(self.timeout.as_millis() as u64)),
        };

        Ok(ExecOutput {
            stdout: output.stdout,
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            exit_code: output.status.code(),
        })
    }

    async fn write_file(&self, path: &str, content: &[u8]) -> HostResult<()> {
        tokio::fs::write(path, content)
            .await
            .map_err(|e| HostError::Io(format!("{path}: {e}")))?;
        self.written().push(PathBuf::from(path));
        tracing::debug!(host = %self.name, path = %path, bytes = content.len(), "wrote file");
        Ok(())
    }

    async fn cleanup(&self) -> HostResult<()> {
        let written = std::mem::take(&mut *self.written());
        for path in written {
            match tokio::fs::remove_file(&path).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(HostError::Io(format!("{}: {e}", path.display()))),
            }
        }
        tracing::debug!(host = %self.name, "cleaned up");
        Ok(())
    }
}
