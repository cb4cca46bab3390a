//! Docker host backend: runs commands inside an existing container via the
//! `docker` CLI.

use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::error::{HostError, HostResult};
use crate::host::{ExecOutput, Host, split_command};
use crate::local::DEFAULT_TIMEOUT;

/// A running container reached through `docker exec`.
///
/// The container is expected to exist already; `cleanup` force-removes it.
pub struct DockerHost {
    name: String,
    container: String,
    docker_bin: String,
    timeout: Duration,
}

impl DockerHost {
    /// Host named `name` backed by the container of the same name.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            container: name.clone(),
            name,
            docker_bin: "docker".to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_container(mut self, container: impl Into<String>) -> Self {
        self.container = container.into();
        self
    }

    pub fn with_docker_bin(mut self, docker_bin: impl Into<String>) -> Self {
        self.docker_bin = docker_bin.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn container(&self) -> &str {
        &self.container
    }

    /// argv for running `argv` inside the container.
    fn exec_args(&self, interactive: bool, argv: &[String]) -> Vec<String> {
        let mut args = vec!["exec".to_string()];
        if interactive {
            args.push("-i".to_string());
        }
        args.push(self.container.clone());
        args.extend(argv.iter().cloned());
        args
    }

    async fn run(&self, args: Vec<String>, stdin: Option<&[u8]>) -> HostResult<ExecOutput> {
        let bin = &self.docker_bin;
        let result = tokio::time::timeout(self.timeout, async {
            let mut child = Command::new(bin)
                .args(&args)
                .stdin(if stdin.is_some() {
                    Stdio::piped()
                } else {
                    Stdio::null()
                })
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .kill_on_drop(true)
                .spawn()
                .map_err(|e| HostError::Exec(format!("{bin}: {e}")))?;

            // stdin is fed from its own task while output is drained below,
            // so a child that echoes its input cannot fill the stdout pipe
            // and stall the writer.
            let feeder = match (stdin, child.stdin.take()) {
                (Some(content), Some(mut pipe)) => {
                    let content = content.to_vec();
                    Some(tokio::spawn(async move {
                        pipe.write_all(&content).await?;
                        pipe.shutdown().await
                    }))
                }
                _ => None,
            };

            let output = child
                .wait_with_output()
                .await
                .map_err(|e| HostError::Exec(format!("{bin}: {e}")))?;

            // A child that exits early breaks the pipe; its exit status and
            // stderr say more than the write error does.
            if let Some(feeder) = feeder {
                let fed = feeder
                    .await
                    .map_err(|e| HostError::Io(format!("{bin} stdin task: {e}")))?;
                if let Err(e) = fed {
                    if output.status.success() {
                        return Err(HostError::Io(format!("writing to {bin} stdin: {e}")));
                    }
                }
            }
            Ok::<_, HostError>(output)
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
}

#[async_trait]
impl Host for DockerHost {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, command: &str) -> HostResult<ExecOutput> {
        let argv = split_command(command)?;
        tracing::debug!(host = %self.name, container = %self.container, command = %command, "docker exec");
        self.run(self.exec_args(false, &argv), None).await
    }

    async fn write_file(&self, path: &str, content: &[u8]) -> HostResult<()> {
        let argv = vec!["tee".to_string(), path.to_string()];
        let output = self.run(self.exec_args(true, &argv), Some(content)).await?;
        if !output.success() {
            return Err(HostError::CommandFailed {
                command: format!("tee {path}"),
                exit_code: output.exit_code,
                stderr: output.stderr.trim().to_string(),
            });
        }
        tracing::debug!(host = %self.name, path = %path, bytes = content.len(), "wrote file");
        Ok(())
    }

    async fn cleanup(&self) -> HostResult<()> {
        tracing::info!(host = %self.name, container = %self.container, "removing container");
        let args = vec!["rm".to_string(), "-f".to_string(), self.container.clone()];
        let output = self.run(args, None).await?;
        if !output.success() {
            return Err(HostError::CommandFailed {
                command: format!("rm -f {}", self.container),
                exit_code: output.exit_code,
                stderr: output.stderr.trim().to_string(),
            });
        }
        Ok(())
    }
}
