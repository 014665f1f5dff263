// server/src/lib.rs

//! HTTP server for the marketplace: actix-web routes around the `market`
//! domain library, with Postgres, local-disk storage and KHQR adapters.

pub mod config;
pub mod db;
pub mod errors;
pub mod identity;
pub mod seed;
pub mod services;
pub mod state;
pub mod storage;
pub mod web;

pub use crate::config::AppConfig;
pub use crate::errors::{AppError, Result};
pub use crate::state::AppState;

use crate::config::LogFormat;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;

/// Installs the global subscriber: `RUST_LOG` filtering (default `info`),
/// span close events, and JSON lines when `LOG_FORMAT=json`.
pub fn init_tracing(format: LogFormat) {
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
  let builder = tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_span_events(FmtSpan::CLOSE); // Log when spans close, showing duration
  match format {
    LogFormat::Json => builder.json().init(),
    LogFormat::Pretty => builder.init(),
  }
}
