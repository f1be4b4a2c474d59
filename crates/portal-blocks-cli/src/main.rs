//! portal-blocks — entry point.

use std::path::PathBuf;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

use portal_blocks::{ChromiumLauncher, DataDir, SyncOrchestrator, SyncOutcome};
use portal_blocks_cli::config::{self, Overrides};
use portal_blocks_cli::report::{failure_message, ConsoleGroup, StatusReport};

#[derive(Parser)]
#[command(
    name = "portal-blocks",
    about = "Sync the Battlefield Portal rules-editor block catalog, version, and i18n",
    version
)]
struct Cli {
    /// Directory holding the synced files (also DATA_DIR).
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Headed browser with a persistent profile; reuse an existing login (also DEBUG).
    #[arg(long, global = true)]
    debug: bool,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in, snapshot the block catalog, and update version and i18n (default).
    Sync,

    /// Show what the data directory currently holds.
    Status {
        /// Print as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Generate shell completion scripts.
    Completions {
        /// Shell type (bash, zsh, fish, powershell, elvish).
        shell: Shell,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let dotenv = dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Some(path) = dotenv {
        tracing::debug!(path = %path.display(), "Loaded environment file");
    }

    let overrides = Overrides {
        data_dir: cli.data_dir,
        debug: cli.debug,
    };

    match cli.command.unwrap_or(Commands::Sync) {
        Commands::Sync => {
            let config = config::from_env(&overrides);
            let endpoints = config.endpoints.clone();
            tracing::debug!(mode = ?config.mode, data_dir = %config.data_dir.display(), "Resolved configuration");

            let group = ConsoleGroup::open(
                "Get Block Names",
                config::in_github_actions() && !config.skip,
            );
            let result = SyncOrchestrator::new(config, ChromiumLauncher).run().await;
            drop(group);

            match result {
                Ok(SyncOutcome::Skipped) => {}
                Ok(SyncOutcome::Completed(report)) => {
                    tracing::info!(
                        blocks = report.blocks,
                        version = report.version.current,
                        i18n_updated = report.localization_fetched,
                        "Sync complete"
                    );
                }
                Err(e) => {
                    eprintln!("{}", failure_message(&e, &endpoints));
                    std::process::exit(1);
                }
            }
        }

        Commands::Status { json } => {
            let data_dir =
                config::resolve_data_dir(overrides.data_dir.as_ref(), |key| std::env::var(key).ok());
            let report = StatusReport::collect(&DataDir::new(data_dir))?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("{}", report.render());
            }
        }

        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "portal-blocks", &mut std::io::stdout());
        }
    }

    Ok(())
}
