//! User configuration for `actions`
//!
//! Read from `~/.actions/config.toml` when present. Every key is optional;
//! CLI flags are applied on top by the commands.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_CONFIG_PATH: &str = "~/.actions/config.toml";
pub const DEFAULT_DOWNLOAD_BASE_URL: &str = "https://actionsreleases.blob.core.windows.net/release";
pub const DEFAULT_RUNTIME_IMAGE: &str = "actionscore.azurecr.io/actions";

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Release storage the runtime archive is fetched from
    pub download_base_url: String,
    /// Repository of the runtime image; tagged with the requested version
    pub runtime_image: String,
    pub binary_name: String,
    /// Staging directory; `C:\actions` or `~/.actions` when unset
    pub install_dir: Option<PathBuf>,
    /// Where the binary is installed on unix hosts
    pub bin_dir: PathBuf,
    /// `docker`, `podman`, ...; detected when unset
    pub container_runtime: Option<String>,
    /// Host port for the placement service; 50005 (6050 on Windows) when unset
    pub placement_port: Option<u16>,
    pub state_store_image: String,
    pub state_store_port: u16,
    pub redownload: bool,
    /// Upper bound for each download and container invocation. No limit when unset.
    pub timeout_secs: Option<u64>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            download_base_url: DEFAULT_DOWNLOAD_BASE_URL.to_string(),
            runtime_image: DEFAULT_RUNTIME_IMAGE.to_string(),
            binary_name: "actionsrt".to_string(),
            install_dir: None,
            bin_dir: PathBuf::from("/usr/local/bin"),
            container_runtime: None,
            placement_port: None,
            state_store_image: "redis".to_string(),
            state_store_port: 6379,
            redownload: false,
            timeout_secs: None,
        }
    }
}

impl Settings {
    /// Load settings from `path`, or from the default location if none given
    ///
    /// A missing default file yields the defaults; a missing explicit file
    /// is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(&expand_path(path)),
            None => {
                let default = expand_path(Path::new(DEFAULT_CONFIG_PATH));
                if default.exists() {
                    Self::from_file(&default)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;

        Self::parse(&content).with_context(|| format!("Failed to parse {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        let mut settings: Self = toml::from_str(content)?;
        settings.install_dir = settings.install_dir.map(|dir| expand_path(&dir));
        settings.bin_dir = expand_path(&settings.bin_dir);
        Ok(settings)
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

/// Expand a leading `~` to the home directory
fn expand_path(path: &Path) -> PathBuf {
    match path.to_str() {
        Some(raw) => PathBuf::from(shellexpand::tilde(raw).as_ref()),
        None => path.to_path_buf(),
    }
}
