//! `actions init`: install the runtime and start its companion services
//!
//! Resolves the install directory first, then hands the three setup tasks
//! to the orchestrator and reports its single pass/fail result.

use crate::bootstrap::progress::success_status;
use crate::bootstrap::{
    InstallerSettings, Orchestrator, PROGRESS_MESSAGE, Platform, Progress, SystemRunner, TaskPlan,
    detect_container_runtime, resolve_install_dir, standard_tasks,
};
use crate::config::Settings;
use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Args, Clone)]
pub struct InitArgs {
    /// Runtime version to install, e.g. 0.3.0
    #[arg(long, env = "ACTIONS_RUNTIME_VERSION", value_parser = parse_version)]
    pub runtime_version: String,

    /// Download the runtime archive even if it is already staged
    #[arg(long)]
    pub redownload: bool,

    /// Give up on each download / container launch after this many seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Staging directory (default: ~/.actions, C:\actions on Windows)
    #[arg(long)]
    pub install_dir: Option<PathBuf>,

    /// Directory the runtime binary is installed into (unix only)
    #[arg(long)]
    pub bin_dir: Option<PathBuf>,

    /// Container runtime executable (default: docker, falling back to podman)
    #[arg(long)]
    pub container_runtime: Option<String>,
}

/// The version is passed through untouched; it only has to be present
fn parse_version(raw: &str) -> Result<String, String> {
    let version = raw.trim();
    if version.is_empty() {
        return Err("runtime version must not be empty".to_string());
    }
    Ok(version.to_string())
}

impl InitArgs {
    /// Flags take precedence over the config file
    fn apply(&self, settings: &mut Settings) {
        if self.redownload {
            settings.redownload = true;
        }
        if let Some(secs) = self.timeout {
            settings.timeout_secs = Some(secs);
        }
        if let Some(dir) = &self.install_dir {
            settings.install_dir = Some(dir.clone());
        }
        if let Some(dir) = &self.bin_dir {
            settings.bin_dir = dir.clone();
        }
        if let Some(runtime) = &self.container_runtime {
            settings.container_runtime = Some(runtime.clone());
        }
    }
}

fn http_client(settings: &Settings) -> Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder();
    if let Some(timeout) = settings.timeout() {
        builder = builder.timeout(timeout);
    }
    builder.build().context("Failed to build HTTP client")
}

pub async fn run_init(args: InitArgs, mut settings: Settings) -> Result<()> {
    args.apply(&mut settings);
    let platform = Platform::current();
    tracing::debug!(%platform, version = %args.runtime_version, ?settings, "init");

    let install_dir = resolve_install_dir(&platform, settings.install_dir.as_deref())?;

    let runner = Arc::new(SystemRunner::new(settings.timeout()));
    let container_runtime =
        detect_container_runtime(runner.as_ref(), settings.container_runtime.as_deref()).await;
    tracing::debug!(%container_runtime, "using container runtime");

    let plan = TaskPlan {
        platform,
        installer: InstallerSettings {
            base_url: settings.download_base_url.clone(),
            binary_name: settings.binary_name.clone(),
            bin_dir: settings.bin_dir.clone(),
            redownload: settings.redownload,
        },
        runtime_image: settings.runtime_image.clone(),
        container_runtime,
        placement_port: settings.placement_port,
        state_store_image: settings.state_store_image.clone(),
        state_store_port: settings.state_store_port,
    };

    let orchestrator = Orchestrator::new(standard_tasks(plan, http_client(&settings)?, runner))
        .with_progress(Progress::terminal(&platform, PROGRESS_MESSAGE));

    let summary = orchestrator
        .run(&install_dir, &args.runtime_version)
        .await?;
    tracing::info!(tasks = ?summary.completed, "init complete");
    success_status(&format!(
        "Success! actions runtime {} is up and running",
        args.runtime_version
    ));

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> InitArgs {
        InitArgs {
            runtime_version: "0.3.0".to_string(),
            redownload: false,
            timeout: None,
            install_dir: None,
            bin_dir: None,
            container_runtime: None,
        }
    }

    #[test]
    fn test_parse_version() {
        assert_eq!(parse_version(" 0.3.0 ").unwrap(), "0.3.0");
        assert_eq!(parse_version("edge").unwrap(), "edge");
        assert!(parse_version("   ").is_err());
    }

    #[test]
    fn test_flags_override_settings() {
        let mut settings = Settings {
            container_runtime: Some("docker".to_string()),
            ..Settings::default()
        };
        let args = InitArgs {
            redownload: true,
            timeout: Some(15),
            bin_dir: Some(PathBuf::from("/opt/bin")),
            container_runtime: Some("podman".to_string()),
            ..args()
        };

        args.apply(&mut settings);

        assert!(settings.redownload);
        assert_eq!(settings.timeout_secs, Some(15));
        assert_eq!(settings.bin_dir, PathBuf::from("/opt/bin"));
        assert_eq!(settings.container_runtime.as_deref(), Some("podman"));
    }

    #[test]
    fn test_absent_flags_keep_settings() {
        let mut settings = Settings {
            redownload: true,
            timeout_secs: Some(5),
            ..Settings::default()
        };
        args().apply(&mut settings);

        assert!(settings.redownload);
        assert_eq!(settings.timeout_secs, Some(5));
        assert_eq!(settings.bin_dir, PathBuf::from("/usr/local/bin"));
    }
}
