//! Local environment bootstrap
//!
//! `init` prepares a host to run the actions runtime:
//! - Install directory (`~/.actions` / `C:\actions`)
//! - `actionsrt` binary download + install
//! - Placement service container
//! - Redis state store container
//!
//! The three setup tasks are independent and run concurrently.

pub mod container;
pub mod error;
pub mod install_dir;
pub mod installer;
pub mod orchestrator;
pub mod platform;
pub mod process;
pub mod progress;
pub mod task;

pub use container::{ContainerLauncher, LaunchClass, ServiceSpec, classify, classify_exit_code};
pub use error::SetupError;
pub use install_dir::resolve_install_dir;
pub use installer::{BinaryInstaller, InstallerSettings};
pub use orchestrator::{InitSummary, Orchestrator};
pub use platform::Platform;
pub use process::{CommandRunner, SystemRunner, detect_container_runtime};
pub use progress::Progress;
pub use task::{SetupTask, TaskOutcome};

use std::sync::Arc;

pub const PROGRESS_MESSAGE: &str = "Downloading binaries and setting up components...";

/// Everything needed to build the standard set of setup tasks
pub struct TaskPlan {
    pub platform: Platform,
    pub installer: InstallerSettings,
    pub runtime_image: String,
    pub container_runtime: String,
    pub placement_port: Option<u16>,
    pub state_store_image: String,
    pub state_store_port: u16,
}

/// Binary installer, placement service and state store, in that order
pub fn standard_tasks(
    plan: TaskPlan,
    client: reqwest::Client,
    runner: Arc<dyn CommandRunner>,
) -> Vec<Arc<dyn SetupTask>> {
    let placement =
        ServiceSpec::placement(&plan.runtime_image, plan.placement_port, &plan.platform);
    let state_store = ServiceSpec::state_store(&plan.state_store_image, plan.state_store_port);

    vec![
        Arc::new(BinaryInstaller::new(
            plan.installer,
            plan.platform,
            client,
            Arc::clone(&runner),
        )),
        Arc::new(ContainerLauncher::new(
            placement,
            plan.container_runtime.clone(),
            Arc::clone(&runner),
        )),
        Arc::new(ContainerLauncher::new(
            state_store,
            plan.container_runtime,
            runner,
        )),
    ]
}
