//! Runtime binary installer
//!
//! Download -> extract -> relocate -> make executable. Each stage consumes
//! the path produced by the previous one and the first failure
//! short-circuits the rest.

use crate::bootstrap::error::{DownloadError, ExtractError, RelocateError, SetupError};
use crate::bootstrap::platform::Platform;
use crate::bootstrap::process::CommandRunner;
use crate::bootstrap::task::{SetupTask, TaskOutcome};
use async_trait::async_trait;
use std::ffi::OsString;
use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;

/// Knobs for where the binary comes from and where it ends up
#[derive(Debug, Clone)]
pub struct InstallerSettings {
    pub base_url: String,
    pub binary_name: String,
    /// Unix destination, normally `/usr/local/bin`
    pub bin_dir: PathBuf,
    /// Fetch again even if the archive is already staged
    pub redownload: bool,
}

/// `<base>/<version>/<binary>_<os>_<arch>.zip`
pub fn download_url(base: &str, version: &str, binary: &str, platform: &Platform) -> String {
    format!(
        "{}/{version}/{binary}_{}_{}.zip",
        base.trim_end_matches('/'),
        platform.os.release_name(),
        platform.release_arch()
    )
}

/// Stream `url` into `dir`, named after the last URL segment
///
/// An archive that is already staged is reused unless `redownload` is set.
/// The body is written to a `.part` file first so an interrupted transfer
/// never looks like a finished one.
pub async fn download_file(
    client: &reqwest::Client,
    dir: &Path,
    url: &str,
    redownload: bool,
) -> Result<PathBuf, DownloadError> {
    let file_name = url.rsplit('/').next().unwrap_or(url);
    let path = dir.join(file_name);

    if !redownload && tokio::fs::try_exists(&path).await? {
        tracing::debug!(path = %path.display(), "archive already downloaded, skipping");
        return Ok(path);
    }

    let partial = dir.join(format!("{file_name}.part"));
    let response = client.get(url).send().await?.error_for_status()?;

    if let Err(err) = write_body(response, &partial).await {
        if let Err(cleanup) = tokio::fs::remove_file(&partial).await {
            tracing::debug!(
                path = %partial.display(),
                error = %cleanup,
                "could not remove partial download"
            );
        }
        return Err(err);
    }

    tokio::fs::rename(&partial, &path).await?;
    Ok(path)
}

async fn write_body(mut response: reqwest::Response, dest: &Path) -> Result<(), DownloadError> {
    let mut out = tokio::fs::File::create(dest).await?;
    while let Some(chunk) = response.chunk().await? {
        out.write_all(&chunk).await?;
    }
    out.flush().await?;
    Ok(())
}

/// Extract only the first entry of a zip archive into `target_dir`
///
/// Release archives hold a single binary; anything after the first entry
/// is ignored and never written.
pub fn extract_first_entry(archive: &Path, target_dir: &Path) -> Result<PathBuf, ExtractError> {
    let mut zip = zip::ZipArchive::new(File::open(archive)?)?;
    if zip.is_empty() {
        return Err(ExtractError::Empty);
    }

    let mut entry = zip.by_index(0)?;
    let file_name = entry
        .enclosed_name()
        .filter(|_| !entry.is_dir())
        .and_then(|path| path.file_name().map(PathBuf::from))
        .ok_or_else(|| ExtractError::InvalidEntry(entry.name().to_string()))?;

    let extracted = target_dir.join(file_name);

    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    apply_entry_mode(&mut options, entry.unix_mode());

    let mut out = options.open(&extracted)?;
    io::copy(&mut entry, &mut out)?;

    Ok(extracted)
}

#[cfg(unix)]
fn apply_entry_mode(options: &mut OpenOptions, mode: Option<u32>) {
    use std::os::unix::fs::OpenOptionsExt;

    if let Some(mode) = mode {
        options.mode(mode & 0o7777);
    }
}

#[cfg(not(unix))]
fn apply_entry_mode(_options: &mut OpenOptions, _mode: Option<u32>) {}

/// Whether `dir` already appears in a PATH value, ignoring case
pub fn path_contains(path_var: &str, dir: &str) -> bool {
    path_var.to_lowercase().contains(&dir.to_lowercase())
}

/// Persistently append `dir` to the user's PATH via `SETX`
///
/// Returns whether PATH was changed.
pub async fn register_on_path(
    runner: &dyn CommandRunner,
    path_var: &str,
    dir: &Path,
) -> Result<bool, RelocateError> {
    let dir = dir.to_string_lossy();
    if path_contains(path_var, &dir) {
        return Ok(false);
    }

    runner
        .run("SETX", &["PATH".to_string(), format!("{path_var};{dir}")])
        .await
        .map_err(RelocateError::PathUpdate)?;
    Ok(true)
}

/// The process PATH as a string, refusing values `SETX` would clobber
///
/// An unset or non-Unicode PATH cannot be appended to faithfully, and
/// `SETX PATH` replaces the saved value wholesale.
pub fn readable_path_var(raw: Option<OsString>) -> Result<String, RelocateError> {
    raw.ok_or(RelocateError::PathUnreadable)?
        .into_string()
        .map_err(|_| RelocateError::PathUnreadable)
}

/// Windows: the install directory becomes part of PATH and the binary lives
/// there as `<binary>.exe`
pub async fn relocate_windows(
    runner: &dyn CommandRunner,
    path_var: &str,
    extracted: &Path,
    install_dir: &Path,
    binary: &str,
) -> Result<PathBuf, RelocateError> {
    register_on_path(runner, path_var, install_dir).await?;

    let dest = install_dir.join(format!("{binary}.exe"));
    if extracted != dest {
        tokio::fs::copy(extracted, &dest).await?;
    }
    Ok(dest)
}

/// Unix: copy the extracted file into `bin_dir` under its own name
pub async fn relocate_unix(extracted: &Path, bin_dir: &Path) -> Result<PathBuf, RelocateError> {
    let file_name = extracted
        .file_name()
        .ok_or_else(|| RelocateError::NoFileName(extracted.to_path_buf()))?;
    let dest = bin_dir.join(file_name);

    let bytes = tokio::fs::read(extracted).await?;
    tokio::fs::write(&dest, bytes).await?;
    Ok(dest)
}

/// Mark the installed binary executable by everyone; no-op on Windows
pub async fn make_executable(platform: &Platform, path: &Path) -> io::Result<()> {
    if platform.is_windows() {
        return Ok(());
    }
    set_mode(path, 0o777).await
}

#[cfg(unix)]
async fn set_mode(path: &Path, mode: u32) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(mode)).await
}

#[cfg(not(unix))]
async fn set_mode(_path: &Path, _mode: u32) -> io::Result<()> {
    Ok(())
}

/// Setup task installing the runtime binary
pub struct BinaryInstaller {
    settings: InstallerSettings,
    platform: Platform,
    client: reqwest::Client,
    runner: Arc<dyn CommandRunner>,
}

impl BinaryInstaller {
    pub fn new(
        settings: InstallerSettings,
        platform: Platform,
        client: reqwest::Client,
        runner: Arc<dyn CommandRunner>,
    ) -> Self {
        Self {
            settings,
            platform,
            client,
            runner,
        }
    }

    async fn relocate(
        &self,
        path_var: Option<OsString>,
        extracted: &Path,
        install_dir: &Path,
    ) -> Result<PathBuf, RelocateError> {
        if self.platform.is_windows() {
            let path_var = readable_path_var(path_var)?;
            relocate_windows(
                self.runner.as_ref(),
                &path_var,
                extracted,
                install_dir,
                &self.settings.binary_name,
            )
            .await
        } else {
            relocate_unix(extracted, &self.settings.bin_dir).await
        }
    }

    /// Run the four stages, returning the final binary location
    pub async fn install(&self, install_dir: &Path, version: &str) -> Result<PathBuf, SetupError> {
        let binary = &self.settings.binary_name;
        let url = download_url(&self.settings.base_url, version, binary, &self.platform);

        tracing::info!(%url, "downloading runtime binary");
        let archive = download_file(&self.client, install_dir, &url, self.settings.redownload)
            .await
            .map_err(|source| SetupError::Download {
                binary: binary.clone(),
                source,
            })?;

        let target_dir = install_dir.to_path_buf();
        let staged = archive.clone();
        let extracted =
            tokio::task::spawn_blocking(move || extract_first_entry(&staged, &target_dir))
                .await
                .map_err(ExtractError::from)
                .and_then(|result| result)
                .map_err(|source| SetupError::Extract {
                    binary: binary.clone(),
                    source,
                })?;
        tracing::debug!(
            archive = %archive.display(),
            extracted = %extracted.display(),
            "extracted"
        );

        let installed = self
            .relocate(std::env::var_os("PATH"), &extracted, install_dir)
            .await
            .map_err(|source| SetupError::Relocate {
                binary: binary.clone(),
                source,
            })?;

        make_executable(&self.platform, &installed)
            .await
            .map_err(|source| SetupError::MakeExecutable {
                binary: binary.clone(),
                source,
            })?;

        tracing::info!(path = %installed.display(), "runtime binary installed");
        Ok(installed)
    }
}

#[async_trait]
impl SetupTask for BinaryInstaller {
    fn name(&self) -> &str {
        "runtime binary"
    }

    async fn run(&self, install_dir: &Path, version: &str) -> TaskOutcome {
        self.install(install_dir, version).await.map(|_| ())
    }
}

/// Release archives and a one-shot HTTP server for tests
#[cfg(test)]
pub(crate) mod fixtures {
    use std::io::{Cursor, Write};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use zip::write::SimpleFileOptions;

    pub fn zip_bytes(entries: &[(&str, &str)]) -> Vec<u8> {
        let options = SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Stored)
            .unix_permissions(0o755);

        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        for (name, body) in entries {
            writer.start_file(*name, options).unwrap();
            writer.write_all(body.as_bytes()).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    /// Serve one raw HTTP response on a loopback port, then hang up
    pub async fn serve_raw(response: Vec<u8>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = [0u8; 4096];
            let _ = socket.read(&mut request).await;

            socket.write_all(&response).await.unwrap();
            let _ = socket.shutdown().await;
        });

        format!("http://{addr}")
    }

    /// Serve a single complete HTTP response on a loopback port
    pub async fn serve_once(status_line: &'static str, body: Vec<u8>) -> String {
        let mut response = format!(
            "HTTP/1.1 {status_line}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            body.len()
        )
        .into_bytes();
        response.extend_from_slice(&body);
        serve_raw(response).await
    }

    pub fn client() -> reqwest::Client {
        reqwest::Client::builder().no_proxy().build().unwrap()
    }
}
