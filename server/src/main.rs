// server/src/main.rs

use actix_web::{web as actix_data, App, HttpServer};
use market_server::config::{AppConfig, LogFormat};
use market_server::state::{open_store, AppState};
use market_server::{init_tracing, seed, web};
use std::sync::Arc;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
  // Configuration comes first so LOG_FORMAT can shape the subscriber.
  let config = AppConfig::from_env();
  init_tracing(config.as_ref().map(|c| c.log_format).unwrap_or(LogFormat::Pretty));
  tracing::info!("Starting marketplace server...");

  let app_config = match config {
    Ok(cfg) => Arc::new(cfg),
    Err(e) => {
      tracing::error!(error = %e, "Failed to load application configuration.");
      return Err(std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string()));
    }
  };
  tracing::debug!(config = ?app_config, "Loaded configuration.");

  let store = match open_store(&app_config).await {
    Ok(store) => store,
    Err(e) => {
      tracing::error!(error = %e, "Failed to open the document store.");
      return Err(std::io::Error::other(e.to_string()));
    }
  };

  if app_config.seed_db {
    match seed::run(&store, &app_config.seed_password).await {
      Ok(report) => tracing::info!(created = report.created, skipped = report.skipped, "Database seeded."),
      Err(e) => tracing::error!(error = %e, "Failed to seed database."),
    }
  }

  let app_state = match AppState::new(app_config.clone(), store) {
    Ok(state) => state,
    Err(e) => {
      tracing::error!(error = %e, "Failed to build application state.");
      return Err(std::io::Error::other(e.to_string()));
    }
  };

  let server_address = app_config.bind_address();
  tracing::info!("Attempting to bind server to {}...", server_address);

  HttpServer::new(move || {
    App::new()
      .app_data(actix_data::Data::new(app_state.clone()))
      .wrap(tracing_actix_web::TracingLogger::default())
      .configure(web::configure_app_routes)
  })
  .bind(&server_address)?
  .run()
  .await
}
