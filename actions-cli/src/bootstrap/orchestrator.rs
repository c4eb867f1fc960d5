//! Parallel initialization orchestrator
//!
//! Fans out every setup task at once and fans their outcomes back in over a
//! single channel. Each task owns one sender and writes exactly one report;
//! the channel closes when the last sender is dropped, so draining always
//! terminates.
//!
//! The first failure drained is returned immediately. Sibling tasks are not
//! cancelled and run to completion in the background.

use crate::bootstrap::error::SetupError;
use crate::bootstrap::install_dir::ensure_install_dir;
use crate::bootstrap::progress::Progress;
use crate::bootstrap::task::{SetupTask, TaskOutcome};
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;

/// What a task sent back
#[derive(Debug)]
struct TaskReport {
    task: String,
    outcome: TaskOutcome,
}

/// Result of a fully successful run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitSummary {
    /// Task names in the order their outcomes were drained
    pub completed: Vec<String>,
}

pub struct Orchestrator {
    tasks: Vec<Arc<dyn SetupTask>>,
    progress: Progress,
}

impl Orchestrator {
    pub fn new(tasks: Vec<Arc<dyn SetupTask>>) -> Self {
        Self {
            tasks,
            progress: Progress::hidden(),
        }
    }

    pub fn with_progress(mut self, progress: Progress) -> Self {
        self.progress = progress;
        self
    }

    pub fn task_names(&self) -> Vec<&str> {
        self.tasks.iter().map(|task| task.name()).collect()
    }

    /// Create the install directory, then run every task concurrently in it
    pub async fn run(&self, install_dir: &Path, version: &str) -> Result<InitSummary, SetupError> {
        ensure_install_dir(install_dir)?;

        let expected = self.tasks.len();
        // One slot per task: a late write never blocks once we stop reading
        let (tx, mut rx) = mpsc::channel::<TaskReport>(expected.max(1));

        self.progress.start();

        for task in &self.tasks {
            spawn_task(
                Arc::clone(task),
                install_dir.to_path_buf(),
                version.to_string(),
                tx.clone(),
            );
        }
        drop(tx);

        let mut completed = Vec::with_capacity(expected);
        while let Some(report) = rx.recv().await {
            match report.outcome {
                Ok(()) => {
                    tracing::debug!(task = %report.task, "setup task finished");
                    completed.push(report.task);
                }
                Err(err) => {
                    tracing::debug!(task = %report.task, error = %err, "setup task failed");
                    self.progress.abandon();
                    return Err(err);
                }
            }
        }

        self.progress.finish_success();
        Ok(InitSummary { completed })
    }
}

/// Start one task; it reports exactly once, panics included
fn spawn_task(
    task: Arc<dyn SetupTask>,
    install_dir: PathBuf,
    version: String,
    tx: mpsc::Sender<TaskReport>,
) {
    tokio::spawn(async move {
        let name = task.name().to_string();
        tracing::debug!(task = %name, "setup task started");

        let outcome = AssertUnwindSafe(task.run(&install_dir, &version))
            .catch_unwind()
            .await
            .unwrap_or_else(|_| Err(SetupError::Panicked { task: name.clone() }));

        // The orchestrator may already have returned on a sibling's failure
        let _ = tx.send(TaskReport { task: name, outcome }).await;
    });
}
