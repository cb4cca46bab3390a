//! The `Host` capability trait.

use async_trait::async_trait;

use crate::error::{HostError, HostResult};

/// Result of running a command on a host.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecOutput {
    pub stdout: Vec<u8>,
    pub stderr: String,
    pub exit_code: Option<i32>,
}

impl ExecOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    pub fn stdout_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }
}

/// A machine (local, container, remote) that log sources live on.
///
/// Lifecycle collaborators only need this capability, never a concrete
/// backend type.
#[async_trait]
pub trait Host: Send + Sync {
    /// Name used as the log source id for this host.
    fn name(&self) -> &str;

    /// Run a command. The string is split into argv with shell quoting rules
    /// but never interpreted by a shell.
    async fn execute(&self, command: &str) -> HostResult<ExecOutput>;

    /// Create or replace `path` with `content`.
    async fn write_file(&self, path: &str, content: &[u8]) -> HostResult<()>;

    /// Release whatever this host created.
    async fn cleanup(&self) -> HostResult<()>;

    /// Run a command and fail unless it exits with status 0.
    async fn execute_checked(&self, command: &str) -> HostResult<ExecOutput> {
        let output = self.execute(command).await?;
        if !output.success() {
            return Err(HostError::CommandFailed {
                command: command.to_string(),
                exit_code: output.exit_code,
                stderr: output.stderr.trim().to_string(),
            });
        }
        Ok(output)
    }
}

/// Split a command string into argv without shell interpretation.
pub(crate) fn split_command(command: &str) -> HostResult<Vec<String>> {
    let command = command.trim();
    if command.is_empty() {
        return Err(HostError::Empty);
    }
    let tokens = shell_words::split(command)
        .map_err(|e| HostError::Exec(format!("failed to parse command: {e}")))?;
    if tokens.is_empty() {
        return Err(HostError::Empty);
    }
    Ok(tokens)
}
