use clap::Parser;

use stockpulse_api::cli::{self, Cli};
use stockpulse_api::config::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    stockpulse_observability::init();

    let cli = Cli::parse();
    let config = AppConfig::from_env()?;

    cli::run(cli, config).await
}
