//! Host error types.

use thiserror::Error;

/// Errors from running commands or writing files on a host.
#[derive(Debug, Error)]
pub enum HostError {
    #[error("empty command")]
    Empty,

    #[error("command timed out after {0}ms")]
    Timeout(u64),

    #[error("execution failed: {0}")]
    Exec(String),

    #[error("`{command}` exited with {exit_code:?}: {stderr}")]
    CommandFailed {
        command: String,
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("I/O error: {0}")]
    Io(String),
}

/// Convenience alias for host results.
pub type HostResult<T> = Result<T, HostError>;
