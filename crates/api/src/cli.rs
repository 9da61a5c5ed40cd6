//! Command-line surface: the HTTP server plus one-shot maintenance commands.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use tracing::info;

use stockpulse_infra::{NightlyImportRunner, RunOutcome};

use crate::app::{self, services::build_services, AppServices};
use crate::config::AppConfig;

/// Inventory API with stock-depletion insights.
///
/// All settings come from environment variables (`DATABASE_URL`,
/// `REDIS_URL`, `BIND_ADDR`, ...).
#[derive(Debug, Parser)]
#[command(name = "stockpulse", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the HTTP server (default).
    Serve,

    /// Recompute and store the name embedding of every product.
    GenerateEmbeddings,

    /// Apply an inventory CSV once and print the report.
    ///
    /// Defaults to `NIGHTLY_IMPORT_CSV` when no path is given.
    ImportInventory {
        path: Option<PathBuf>,
    },
}

pub async fn run(cli: Cli, config: AppConfig) -> anyhow::Result<()> {
    let services = Arc::new(build_services(&config).await?);

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config, services).await,
        Command::GenerateEmbeddings => {
            let count = services.search.regenerate_embeddings().await?;
            println!("Generated embeddings for {count} products");
            Ok(())
        }
        Command::ImportInventory { path } => {
            let Some(path) = path.or_else(|| config.nightly_csv.clone()) else {
                bail!("no CSV path given and NIGHTLY_IMPORT_CSV is not set");
            };
            let runner = NightlyImportRunner::new(path);
            match runner
                .run_now(services.sync.clone(), Some(services.insights.clone()))
                .await?
            {
                RunOutcome::Completed { report, delivered } => {
                    println!("{}\n\n{}", report.subject, report.body);
                    if !delivered {
                        eprintln!("warning: the report could not be delivered");
                    }
                }
                RunOutcome::Skipped => println!("Another import is already running"),
            }
            Ok(())
        }
    }
}

async fn serve(config: AppConfig, services: Arc<AppServices>) -> anyhow::Result<()> {
    let nightly = services
        .nightly
        .as_ref()
        .map(|runner| runner.spawn(services.sync.clone(), Some(services.insights.clone())));
    if nightly.is_none() {
        info!("NIGHTLY_IMPORT_CSV not set; nightly import disabled");
    }

    let app = app::build_app(services);
    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    info!(addr = %listener.local_addr()?, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown requested");
        })
        .await
        .context("http server failed")?;

    if let Some(handle) = nightly {
        handle.shutdown().await;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_subcommand_means_serve() {
        let cli = Cli::try_parse_from(["stockpulse"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn import_inventory_takes_optional_path() {
        let cli = Cli::try_parse_from(["stockpulse", "import-inventory", "/tmp/stock.csv"]).unwrap();
        match cli.command {
            Some(Command::ImportInventory { path }) => {
                assert_eq!(path, Some(PathBuf::from("/tmp/stock.csv")))
            }
            other => panic!("unexpected command: {other:?}"),
        }

        let cli = Cli::try_parse_from(["stockpulse", "generate-embeddings"]).unwrap();
        assert!(matches!(cli.command, Some(Command::GenerateEmbeddings)));
    }
}
