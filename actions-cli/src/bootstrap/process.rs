//! External process invocation
//!
//! Launchers and the PATH update go through [`CommandRunner`] so that exit
//! status handling can be exercised without a real container runtime.

use crate::bootstrap::error::RunError;
use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

/// Runs an external command to completion and surfaces its exit status
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, program: &str, args: &[String]) -> Result<(), RunError>;
}

/// Runs commands on the host via `tokio::process`
#[derive(Debug, Clone, Default)]
pub struct SystemRunner {
    timeout: Option<Duration>,
}

impl SystemRunner {
    pub fn new(timeout: Option<Duration>) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl CommandRunner for SystemRunner {
    async fn run(&self, program: &str, args: &[String]) -> Result<(), RunError> {
        tracing::debug!(program, ?args, "running external command");

        let mut command = Command::new(program);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        let child = command.output();

        let output = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, child)
                .await
                .map_err(|_| RunError::TimedOut {
                    program: program.to_string(),
                    secs: limit.as_secs(),
                })?,
            None => child.await,
        }
        .map_err(|source| RunError::Spawn {
            program: program.to_string(),
            source,
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            tracing::debug!(program, code = ?output.status.code(), %stderr, "command failed");
            return Err(RunError::Exit {
                program: program.to_string(),
                code: output.status.code(),
                stderr,
            });
        }

        Ok(())
    }
}

/// Check if a command can be executed, by asking it for its version
pub async fn is_command_available(runner: &dyn CommandRunner, cmd: &str) -> bool {
    runner.run(cmd, &["--version".to_string()]).await.is_ok()
}

/// Pick the container runtime: an explicit choice wins, otherwise docker,
/// then podman. Falls back to docker so launch failures name the usual tool.
pub async fn detect_container_runtime(
    runner: &dyn CommandRunner,
    configured: Option<&str>,
) -> String {
    if let Some(runtime) = configured {
        return runtime.to_string();
    }

    for candidate in ["docker", "podman"] {
        if is_command_available(runner, candidate).await {
            return candidate.to_string();
        }
    }

    "docker".to_string()
}
