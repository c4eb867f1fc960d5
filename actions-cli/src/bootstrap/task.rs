//! The unit of work the orchestrator fans out

use crate::bootstrap::error::SetupError;
use async_trait::async_trait;
use std::path::Path;

/// Outcome reported by a setup task, exactly once per run
pub type TaskOutcome = Result<(), SetupError>;

/// One independently runnable step of `actions init`
///
/// Tasks hold no state between runs; everything they need arrives as the
/// shared install directory and the requested runtime version.
#[async_trait]
pub trait SetupTask: Send + Sync {
    /// Short name used in logs and panic reports
    fn name(&self) -> &str;

    async fn run(&self, install_dir: &Path, version: &str) -> TaskOutcome;
}
