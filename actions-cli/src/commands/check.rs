//! `actions check`: report what `init` has (or hasn't) set up on this host

use crate::bootstrap::install_dir::default_install_dir;
use crate::bootstrap::process::is_command_available;
use crate::bootstrap::{CommandRunner, Platform, SystemRunner};
use crate::config::Settings;
use anyhow::Result;
use std::path::PathBuf;

/// State of the host as far as the bootstrap is concerned
#[derive(Debug)]
pub struct CheckReport {
    pub install_dir: PathBuf,
    pub install_dir_exists: bool,
    /// First usable container runtime, if any
    pub container_runtime: Option<String>,
    /// Runtime executables that were probed
    pub probed_runtimes: Vec<String>,
    pub binary_path: PathBuf,
    pub binary_installed: bool,
}

impl CheckReport {
    pub fn all_met(&self) -> bool {
        self.install_dir_exists && self.container_runtime.is_some() && self.binary_installed
    }
}

/// First runtime from the candidates that answers `--version`
async fn find_container_runtime(
    runner: &dyn CommandRunner,
    candidates: &[String],
) -> Option<String> {
    for candidate in candidates {
        if is_command_available(runner, candidate).await {
            return Some(candidate.clone());
        }
    }
    None
}

pub async fn gather(
    settings: &Settings,
    platform: &Platform,
    runner: &dyn CommandRunner,
) -> Result<CheckReport> {
    let install_dir = match &settings.install_dir {
        Some(dir) => dir.clone(),
        None => default_install_dir(platform)?,
    };

    let probed_runtimes = match &settings.container_runtime {
        Some(runtime) => vec![runtime.clone()],
        None => vec!["docker".to_string(), "podman".to_string()],
    };
    let container_runtime = find_container_runtime(runner, &probed_runtimes).await;

    let binary_path = if platform.is_windows() {
        install_dir.join(format!("{}.exe", settings.binary_name))
    } else {
        settings.bin_dir.join(&settings.binary_name)
    };

    Ok(CheckReport {
        install_dir_exists: install_dir.is_dir(),
        install_dir,
        container_runtime,
        probed_runtimes,
        binary_installed: binary_path.is_file(),
        binary_path,
    })
}

fn mark(ok: bool) -> &'static str {
    if ok { "✅" } else { "❌" }
}

pub fn print_report(report: &CheckReport) {
    println!("🩺 actions environment check");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    println!(
        "  {} Install directory: {}",
        mark(report.install_dir_exists),
        report.install_dir.display()
    );

    match &report.container_runtime {
        Some(runtime) => println!("  {} Container runtime: {}", mark(true), runtime),
        None => println!(
            "  {} Container runtime: none found (tried {})",
            mark(false),
            report.probed_runtimes.join(", ")
        ),
    }

    println!(
        "  {} Runtime binary: {}",
        mark(report.binary_installed),
        report.binary_path.display()
    );

    println!();
    if report.all_met() {
        println!("✅ Ready to run actions");
    } else {
        println!("⚠️  Run `actions init --runtime-version <version>` to finish setup");
    }
}

pub async fn run_check(settings: Settings) -> Result<()> {
    let platform = Platform::current();
    let runner = SystemRunner::new(settings.timeout());

    let report = gather(&settings, &platform, &runner).await?;
    print_report(&report);

    if !report.all_met() {
        anyhow::bail!("actions environment is not fully set up");
    }
    Ok(())
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

    #[tokio::test]
    async fn test_fully_set_up_host() {
        let install = tempfile::tempdir().unwrap();
        let bin = tempfile::tempdir().unwrap();
        std::fs::write(bin.path().join("actionsrt"), b"bin").unwrap();

        let settings = Settings {
            install_dir: Some(install.path().to_path_buf()),
            bin_dir: bin.path().to_path_buf(),
            ..Settings::default()
        };
        let report = gather(&settings, &LINUX, &FakeRunner::succeeding())
            .await
            .unwrap();

        assert!(report.all_met());
        assert_eq!(report.container_runtime.as_deref(), Some("docker"));
    }

    #[tokio::test]
    async fn test_missing_pieces_reported() {
        let tmp = tempfile::tempdir().unwrap();
        let settings = Settings {
            install_dir: Some(tmp.path().join("absent")),
            bin_dir: tmp.path().to_path_buf(),
            ..Settings::default()
        };
        let runner = FakeRunner::exiting(127);

        let report = gather(&settings, &LINUX, &runner).await.unwrap();

        assert!(!report.install_dir_exists);
        assert!(!report.binary_installed);
        assert_eq!(report.container_runtime, None);
        assert_eq!(report.probed_runtimes, vec!["docker", "podman"]);
        assert_eq!(runner.call_count(), 2);
        assert!(!report.all_met());
    }

    #[tokio::test]
    async fn test_windows_binary_lives_in_install_dir() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("actionsrt.exe"), b"exe").unwrap();
        let windows = Platform {
            os: Os::Windows,
            arch: "x86_64",
        };
        let settings = Settings {
            install_dir: Some(tmp.path().to_path_buf()),
            container_runtime: Some("docker".to_string()),
            ..Settings::default()
        };

        let report = gather(&settings, &windows, &FakeRunner::succeeding())
            .await
            .unwrap();

        assert_eq!(report.binary_path, tmp.path().join("actionsrt.exe"));
        assert!(report.binary_installed);
    }
}
