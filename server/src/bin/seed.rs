// server/src/bin/seed.rs

//! Seeds the configured store with demo data and exits.

use market_server::config::{AppConfig, LogFormat};
use market_server::state::open_store;
use market_server::{init_tracing, seed};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  let config = AppConfig::from_env();
  init_tracing(config.as_ref().map(|c| c.log_format).unwrap_or(LogFormat::Pretty));
  let config = config?;

  let store = open_store(&config).await?;
  let report = seed::run(&store, &config.seed_password).await?;
  tracing::info!(created = report.created, skipped = report.skipped, "Seed complete.");
  Ok(())
}
