// server/src/state.rs

use crate::config::{AppConfig, StoreBackend};
use crate::db::PgDocumentStore;
use crate::errors::{AppError, Result};
use crate::identity::IdentityService;
use crate::services::khqr_gateway::HttpKhqrGateway;
use crate::services::payment_mock::MockKhqrGateway;
use crate::storage::{LocalStorage, UrlSigner};
use market::payment::KhqrGateway;
use market::Store;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Clone)]
pub struct AppState {
  pub store: Store,
  pub config: Arc<AppConfig>,
  pub identity: Arc<IdentityService>,
  pub storage: Arc<LocalStorage>,
  pub gateway: Arc<dyn KhqrGateway>,
}

impl AppState {
  /// Wires every adapter around an already opened store.
  pub fn new(config: Arc<AppConfig>, store: Store) -> Result<Self> {
    let identity = IdentityService::new(&config.jwt_secret, &config.jwt_issuer, config.token_ttl_hours);
    let signer = UrlSigner::new(
      &config.storage_url_secret,
      &config.public_base_url,
      config.signed_url_ttl_days,
    );
    let storage = LocalStorage::new(config.storage_dir.clone(), signer);
    let gateway = khqr_gateway(&config)?;

    Ok(AppState {
      store,
      identity: Arc::new(identity),
      storage: Arc::new(storage),
      gateway,
      config,
    })
  }
}

fn khqr_gateway(config: &AppConfig) -> Result<Arc<dyn KhqrGateway>> {
  match (&config.khqr_api_base_url, &config.khqr_api_token) {
    (Some(base_url), Some(token)) => {
      let gateway = HttpKhqrGateway::new(
        base_url,
        token,
        config.khqr_merchant.clone(),
        Duration::from_millis(config.khqr_check_timeout_ms),
      )
      .map_err(|e| AppError::Config(format!("KHQR gateway: {:#}", e)))?;
      info!(%base_url, "Using HTTP KHQR gateway.");
      Ok(Arc::new(gateway))
    }
    _ => {
      warn!("KHQR_API_BASE_URL/KHQR_API_TOKEN not set; every KHQR check will report paid.");
      Ok(Arc::new(MockKhqrGateway::new(config.khqr_merchant.clone())))
    }
  }
}

/// Opens the configured store backend, creating the Postgres schema if needed.
pub async fn open_store(config: &AppConfig) -> Result<Store> {
  match config.store_backend {
    StoreBackend::Memory => {
      warn!("Using the in-memory store; data is lost on restart.");
      Ok(Store::in_memory())
    }
    StoreBackend::Postgres => {
      let url = config
        .database_url
        .as_deref()
        .ok_or_else(|| AppError::Config("DATABASE_URL is required for the postgres backend".to_string()))?;
      let backend = PgDocumentStore::connect(url, config.database_max_connections).await?;
      backend.migrate().await?;
      Ok(Store::new(backend))
    }
  }
}
