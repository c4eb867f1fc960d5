//! Error types for the bootstrap steps
//!
//! Every setup task classifies its own failures into a [`SetupError`];
//! the orchestrator only relays them. Messages name the failing stage and
//! leave details to the `source()` chain.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Failure of an external process invocation
#[derive(Debug, Error)]
pub enum RunError {
    #[error("failed to start `{program}`")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("`{program}` exited with {}", exit_label(*code, stderr))]
    Exit {
        program: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("`{program}` did not finish within {secs}s")]
    TimedOut { program: String, secs: u64 },
}

fn exit_label(code: Option<i32>, stderr: &str) -> String {
    let status = match code {
        Some(code) => format!("status {code}"),
        None => "no status (terminated by signal)".to_string(),
    };

    match stderr.lines().last() {
        Some(line) if !line.trim().is_empty() => format!("{status}: {}", line.trim()),
        _ => status,
    }
}

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Io(#[from] io::Error),
}

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error(transparent)]
    Zip(#[from] zip::result::ZipError),

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("archive contains no entries")]
    Empty,

    #[error("archive entry `{0}` does not name a file")]
    InvalidEntry(String),

    #[error("extraction worker failed")]
    Join(#[from] tokio::task::JoinError),
}

#[derive(Debug, Error)]
pub enum RelocateError {
    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("failed to update PATH")]
    PathUpdate(#[source] RunError),

    #[error("PATH is unset or not valid Unicode; refusing to overwrite it")]
    PathUnreadable,

    #[error("{} has no file name", .0.display())]
    NoFileName(PathBuf),
}

/// The single outcome error a setup task reports to the orchestrator
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("could not determine the current user's home directory")]
    NoHomeDir,

    #[error("failed to prepare install directory {}", path.display())]
    InstallDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Error downloading {binary} binary")]
    Download {
        binary: String,
        #[source]
        source: DownloadError,
    },

    #[error("Error extracting {binary} binary")]
    Extract {
        binary: String,
        #[source]
        source: ExtractError,
    },

    #[error("Error moving {binary} binary to path")]
    Relocate {
        binary: String,
        #[source]
        source: RelocateError,
    },

    #[error("Error making {binary} binary executable")]
    MakeExecutable {
        binary: String,
        #[source]
        source: io::Error,
    },

    #[error("Failed to launch {component}. Make sure {runtime} is installed and running")]
    RuntimeMissing { component: String, runtime: String },

    #[error("Failed to launch {component}")]
    Launch {
        component: String,
        #[source]
        source: RunError,
    },

    #[error("setup task `{task}` panicked")]
    Panicked { task: String },
}
