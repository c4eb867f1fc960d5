use actions_cli::bootstrap::progress::failure_status;
use actions_cli::commands::{Commands, handle_command};
use actions_cli::config::Settings;
use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "actions", version, about = "Set up a local actions runtime environment")]
struct Cli {
    /// Config file (default: ~/.actions/config.toml)
    #[arg(long, global = true, env = "ACTIONS_CONFIG")]
    config: Option<PathBuf>,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Logs go to stderr so they never tear the spinner on stdout.
/// `RUST_LOG` overrides `--verbose`.
fn init_tracing(verbose: bool) {
    let fallback = if verbose { "actions_cli=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    let settings = Settings::load(cli.config.as_deref())?;
    handle_command(cli.command, settings).await
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            failure_status(&format!("{err:#}"));
            ExitCode::FAILURE
        }
    }
}
