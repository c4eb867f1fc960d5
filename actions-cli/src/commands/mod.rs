pub mod check;
pub mod init;

use crate::config::Settings;
use anyhow::Result;
use clap::Subcommand;

#[derive(Debug, Subcommand, Clone)]
pub enum Commands {
    /// Install the runtime binary and start the placement + state store containers
    #[clap(alias = "install")]
    Init(init::InitArgs),

    /// Report which parts of the local environment are set up
    Check,
}

/// Dispatch a parsed subcommand
pub async fn handle_command(cmd: Commands, settings: Settings) -> Result<()> {
    match cmd {
        Commands::Init(args) => init::run_init(args, settings).await,
        Commands::Check => check::run_check(settings).await,
    }
}
