//! Staging directory for downloads and extracted artifacts
//!
//! `C:\actions` on Windows, `~/.actions` everywhere else.

use crate::bootstrap::error::SetupError;
use crate::bootstrap::platform::Platform;
use std::fs;
use std::path::{Path, PathBuf};

pub const WINDOWS_INSTALL_DIR: &str = r"C:\actions";
const HOME_INSTALL_DIR: &str = ".actions";

/// Default staging directory for the given platform
pub fn default_install_dir(platform: &Platform) -> Result<PathBuf, SetupError> {
    if platform.is_windows() {
        return Ok(PathBuf::from(WINDOWS_INSTALL_DIR));
    }

    dirs::home_dir()
        .map(|home| home.join(HOME_INSTALL_DIR))
        .ok_or(SetupError::NoHomeDir)
}

/// Create the directory (owner-only rwx) if it is missing
pub fn ensure_install_dir(path: &Path) -> Result<PathBuf, SetupError> {
    if !path.is_dir() {
        create_private_dir(path).map_err(|source| SetupError::InstallDir {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(path = %path.display(), "created install directory");
    }

    Ok(path.to_path_buf())
}

/// Resolve the staging directory, honouring an override, and make sure it exists
pub fn resolve_install_dir(
    platform: &Platform,
    override_dir: Option<&Path>,
) -> Result<PathBuf, SetupError> {
    let path = match override_dir {
        Some(dir) => dir.to_path_buf(),
        None => default_install_dir(platform)?,
    };
    ensure_install_dir(&path)
}

#[cfg(unix)]
fn create_private_dir(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::DirBuilderExt;

    fs::DirBuilder::new().recursive(true).mode(0o700).create(path)
}

#[cfg(not(unix))]
fn create_private_dir(path: &Path) -> std::io::Result<()> {
    fs::create_dir_all(path)
}
