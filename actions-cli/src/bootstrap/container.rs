//! Background services launched as containers
//!
//! Each launcher issues a single detached `run` with restart policy
//! `always`. No health checking happens after the runtime accepts it.

use crate::bootstrap::error::{RunError, SetupError};
use crate::bootstrap::platform::Platform;
use crate::bootstrap::process::CommandRunner;
use crate::bootstrap::task::{SetupTask, TaskOutcome};
use async_trait::async_trait;
use std::io;
use std::path::Path;
use std::sync::Arc;

/// Exit status docker uses for errors in the daemon itself, which is what a
/// `run` against an already-running definition produces (moby/moby#14012)
pub const EXIT_GENERIC_RUNTIME_ERROR: i32 = 125;
/// Shell convention for "command not found"
pub const EXIT_COMMAND_NOT_FOUND: i32 = 127;

pub const PLACEMENT_CONTAINER_PORT: u16 = 50005;
const PLACEMENT_HOST_PORT_WINDOWS: u16 = 6050;

/// How a failed launch should be treated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchClass {
    AlreadyRunning,
    ToolMissing,
    OtherFailure,
}

pub fn classify_exit_code(code: Option<i32>) -> LaunchClass {
    match code {
        Some(EXIT_GENERIC_RUNTIME_ERROR) => LaunchClass::AlreadyRunning,
        Some(EXIT_COMMAND_NOT_FOUND) => LaunchClass::ToolMissing,
        _ => LaunchClass::OtherFailure,
    }
}

pub fn classify(err: &RunError) -> LaunchClass {
    match err {
        RunError::Spawn { source, .. } if source.kind() == io::ErrorKind::NotFound => {
            LaunchClass::ToolMissing
        }
        RunError::Exit { code, .. } => classify_exit_code(*code),
        _ => LaunchClass::OtherFailure,
    }
}

/// Where the image for a service comes from
#[derive(Debug, Clone)]
pub enum ImageSource {
    /// Fixed image reference
    Fixed(String),
    /// `<repository>:<version>`, tag chosen by the requested runtime version
    Versioned(String),
}

impl ImageSource {
    fn reference(&self, version: &str) -> String {
        match self {
            ImageSource::Fixed(image) => image.clone(),
            ImageSource::Versioned(repository) => format!("{repository}:{version}"),
        }
    }
}

/// Launch parameters for one background service
#[derive(Debug, Clone)]
pub struct ServiceSpec {
    /// Human readable name used in error messages
    pub component: String,
    pub image: ImageSource,
    pub host_port: u16,
    pub container_port: u16,
    pub entrypoint: Option<String>,
}

impl ServiceSpec {
    /// Placement (coordination) service, shipped in the runtime image
    pub fn placement(repository: &str, host_port: Option<u16>, platform: &Platform) -> Self {
        let default_port = if platform.is_windows() {
            PLACEMENT_HOST_PORT_WINDOWS
        } else {
            PLACEMENT_CONTAINER_PORT
        };

        Self {
            component: "placement service".to_string(),
            image: ImageSource::Versioned(repository.to_string()),
            host_port: host_port.unwrap_or(default_port),
            container_port: PLACEMENT_CONTAINER_PORT,
            entrypoint: Some("./placement".to_string()),
        }
    }

    /// Redis backing the runtime's state store
    pub fn state_store(image: &str, port: u16) -> Self {
        Self {
            component: "Redis state store".to_string(),
            image: ImageSource::Fixed(image.to_string()),
            host_port: port,
            container_port: port,
            entrypoint: None,
        }
    }

    /// Arguments for `<runtime> run ...`
    pub fn run_args(&self, version: &str) -> Vec<String> {
        let mut args = vec![
            "run".to_string(),
            "--restart".to_string(),
            "always".to_string(),
            "-d".to_string(),
            "-p".to_string(),
            format!("{}:{}", self.host_port, self.container_port),
        ];

        if let Some(entrypoint) = &self.entrypoint {
            args.push("--entrypoint".to_string());
            args.push(entrypoint.clone());
        }

        args.push(self.image.reference(version));
        args
    }
}

/// Setup task ensuring one service container is running
pub struct ContainerLauncher {
    spec: ServiceSpec,
    runtime: String,
    runner: Arc<dyn CommandRunner>,
}

impl ContainerLauncher {
    pub fn new(
        spec: ServiceSpec,
        runtime: impl Into<String>,
        runner: Arc<dyn CommandRunner>,
    ) -> Self {
        Self {
            spec,
            runtime: runtime.into(),
            runner,
        }
    }

    /// Turn a failed invocation into this task's outcome
    fn resolve_failure(&self, err: RunError) -> TaskOutcome {
        match classify(&err) {
            LaunchClass::AlreadyRunning => {
                tracing::info!(component = %self.spec.component, "already running");
                Ok(())
            }
            LaunchClass::ToolMissing => Err(SetupError::RuntimeMissing {
                component: self.spec.component.clone(),
                runtime: self.runtime.clone(),
            }),
            LaunchClass::OtherFailure => Err(SetupError::Launch {
                component: self.spec.component.clone(),
                source: err,
            }),
        }
    }
}

#[async_trait]
impl SetupTask for ContainerLauncher {
    fn name(&self) -> &str {
        &self.spec.component
    }

    async fn run(&self, _install_dir: &Path, version: &str) -> TaskOutcome {
        let args = self.spec.run_args(version);
        match self.runner.run(&self.runtime, &args).await {
            Ok(()) => Ok(()),
            Err(err) => self.resolve_failure(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bootstrap::platform::Os;
    use crate::bootstrap::process::fake::FakeRunner;

    const LINUX: Platform = Platform {
        os: Os::Linux,
        arch: "x86_64",
    };

    fn placement(runner: Arc<FakeRunner>) -> ContainerLauncher {
        ContainerLauncher::new(
            ServiceSpec::placement("actionscore.azurecr.io/actions", None, &LINUX),
            "docker",
            runner,
        )
    }

    #[test]
    fn test_exit_code_table() {
        assert_eq!(classify_exit_code(Some(125)), LaunchClass::AlreadyRunning);
        assert_eq!(classify_exit_code(Some(127)), LaunchClass::ToolMissing);
        assert_eq!(classify_exit_code(Some(1)), LaunchClass::OtherFailure);
        assert_eq!(classify_exit_code(Some(126)), LaunchClass::OtherFailure);
        assert_eq!(classify_exit_code(None), LaunchClass::OtherFailure);
    }

    #[test]
    fn test_spawn_not_found_is_tool_missing() {
        let err = RunError::Spawn {
            program: "docker".to_string(),
            source: io::Error::from(io::ErrorKind::NotFound),
        };
        assert_eq!(classify(&err), LaunchClass::ToolMissing);

        let denied = RunError::Spawn {
            program: "docker".to_string(),
            source: io::Error::from(io::ErrorKind::PermissionDenied),
        };
        assert_eq!(classify(&denied), LaunchClass::OtherFailure);
    }

    #[test]
    fn test_placement_args() {
        let spec = ServiceSpec::placement("actionscore.azurecr.io/actions", None, &LINUX);
        assert_eq!(
            spec.run_args("0.3.0"),
            vec![
                "run",
                "--restart",
                "always",
                "-d",
                "-p",
                "50005:50005",
                "--entrypoint",
                "./placement",
                "actionscore.azurecr.io/actions:0.3.0",
            ]
        );
    }

    #[test]
    fn test_placement_windows_host_port() {
        let windows = Platform {
            os: Os::Windows,
            arch: "x86_64",
        };
        let spec = ServiceSpec::placement("repo", None, &windows);
        assert_eq!(spec.host_port, 6050);
        assert_eq!(spec.container_port, 50005);
    }

    #[test]
    fn test_state_store_args() {
        let spec = ServiceSpec::state_store("redis", 6379);
        assert_eq!(
            spec.run_args("ignored"),
            vec!["run", "--restart", "always", "-d", "-p", "6379:6379", "redis"]
        );
    }

    #[tokio::test]
    async fn test_already_running_is_success() {
        let runner = Arc::new(FakeRunner::exiting(EXIT_GENERIC_RUNTIME_ERROR));
        let launcher = placement(runner.clone());

        assert!(launcher.run(Path::new("/tmp"), "0.3.0").await.is_ok());
        assert_eq!(runner.call_count(), 1);
    }

    #[tokio::test]
    async fn test_command_not_found_is_distinct() {
        let missing = placement(Arc::new(FakeRunner::exiting(EXIT_COMMAND_NOT_FOUND)))
            .run(Path::new("/tmp"), "0.3.0")
            .await
            .unwrap_err();
        let generic = placement(Arc::new(FakeRunner::exiting(1)))
            .run(Path::new("/tmp"), "0.3.0")
            .await
            .unwrap_err();

        assert!(matches!(missing, SetupError::RuntimeMissing { .. }));
        assert!(matches!(generic, SetupError::Launch { .. }));
        assert_ne!(missing.to_string(), generic.to_string());
        assert!(missing.to_string().contains("Make sure docker is installed"));
    }

    #[tokio::test]
    async fn test_invokes_configured_runtime() {
        let runner = Arc::new(FakeRunner::succeeding());
        let launcher = ContainerLauncher::new(
            ServiceSpec::state_store("redis", 6379),
            "podman",
            runner.clone(),
        );

        launcher.run(Path::new("/tmp"), "0.3.0").await.unwrap();

        let calls = runner.calls.lock().unwrap();
        assert_eq!(calls[0].0, "podman");
        assert_eq!(calls[0].1.last().map(String::as_str), Some("redis"));
    }
}
