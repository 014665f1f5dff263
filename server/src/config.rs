// server/src/config.rs

use crate::errors::{AppError, Result};
use dotenvy::dotenv;
use market::payment::KhqrMerchant;
use market::ChatMediaPolicy;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
  Postgres,
  Memory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
  Pretty,
  Json,
}

#[derive(Clone)]
pub struct AppConfig {
  pub server_host: String,
  pub server_port: u16,

  pub store_backend: StoreBackend,
  /// Required when `store_backend` is Postgres.
  pub database_url: Option<String>,
  pub database_max_connections: u32,

  pub jwt_secret: String,
  pub jwt_issuer: String,
  pub token_ttl_hours: i64,

  pub storage_dir: PathBuf,
  pub public_base_url: String,
  pub storage_url_secret: String,
  pub signed_url_ttl_days: i64,
  pub chat_media: ChatMediaPolicy,

  pub khqr_api_base_url: Option<String>,
  pub khqr_api_token: Option<String>,
  pub khqr_merchant: KhqrMerchant,
  pub khqr_check_timeout_ms: u64,

  pub seed_db: bool,
  pub seed_password: String,
  pub log_format: LogFormat,
}

impl std::fmt::Debug for AppConfig {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("AppConfig")
      .field("server_host", &self.server_host)
      .field("server_port", &self.server_port)
      .field("store_backend", &self.store_backend)
      .field("database_url", &self.database_url.as_ref().map(|_| "[REDACTED]"))
      .field("storage_dir", &self.storage_dir)
      .field("public_base_url", &self.public_base_url)
      .field("chat_media", &self.chat_media)
      .field("khqr_api_base_url", &self.khqr_api_base_url)
      .field("khqr_merchant", &self.khqr_merchant)
      .field("seed_db", &self.seed_db)
      .field("log_format", &self.log_format)
      .finish_non_exhaustive()
  }
}

fn parse<T>(var_name: &str, raw: Option<String>, default: T) -> Result<T>
where
  T: FromStr,
  T::Err: std::fmt::Display,
{
  match raw {
    Some(value) => value
      .trim()
      .parse::<T>()
      .map_err(|e| AppError::Config(format!("Invalid {} value '{}': {}", var_name, value, e))),
    None => Ok(default),
  }
}

impl AppConfig {
  pub fn from_env() -> Result<Self> {
    dotenv().ok(); // Load .env file if present
    Self::from_lookup(|var_name| env::var(var_name).ok())
  }

  /// Builds the configuration from any variable source. Empty values count
  /// as unset.
  pub fn from_lookup<F>(lookup: F) -> Result<Self>
  where
    F: Fn(&str) -> Option<String>,
  {
    let get_env = |var_name: &str| lookup(var_name).filter(|v| !v.trim().is_empty());
    let require = |var_name: &str| {
      get_env(var_name).ok_or_else(|| AppError::Config(format!("Missing environment variable '{}'", var_name)))
    };

    let server_host = get_env("SERVER_HOST").unwrap_or_else(|| "127.0.0.1".to_string());
    let server_port = parse("SERVER_PORT", get_env("SERVER_PORT"), 8080u16)?;

    let store_backend = match get_env("STORE_BACKEND").map(|v| v.to_ascii_lowercase()).as_deref() {
      None | Some("postgres") => StoreBackend::Postgres,
      Some("memory") => StoreBackend::Memory,
      Some(other) => {
        return Err(AppError::Config(format!(
          "Invalid STORE_BACKEND '{}': expected 'postgres' or 'memory'",
          other
        )))
      }
    };
    let database_url = match store_backend {
      StoreBackend::Postgres => Some(require("DATABASE_URL")?),
      StoreBackend::Memory => get_env("DATABASE_URL"),
    };
    let database_max_connections = parse("DATABASE_MAX_CONNECTIONS", get_env("DATABASE_MAX_CONNECTIONS"), 10u32)?;

    let jwt_secret = require("JWT_SECRET")?;
    let jwt_issuer = get_env("JWT_ISSUER").unwrap_or_else(|| "market".to_string());
    let token_ttl_hours = parse("TOKEN_TTL_HOURS", get_env("TOKEN_TTL_HOURS"), 24i64)?;
    if token_ttl_hours <= 0 {
      return Err(AppError::Config("TOKEN_TTL_HOURS must be positive".to_string()));
    }

    let storage_dir = PathBuf::from(get_env("STORAGE_DIR").unwrap_or_else(|| "./data/uploads".to_string()));
    let public_base_url = get_env("PUBLIC_BASE_URL")
      .unwrap_or_else(|| format!("http://{}:{}", server_host, server_port))
      .trim_end_matches('/')
      .to_string();
    let storage_url_secret = get_env("STORAGE_URL_SECRET").unwrap_or_else(|| jwt_secret.clone());
    let signed_url_ttl_days = parse("SIGNED_URL_TTL_DAYS", get_env("SIGNED_URL_TTL_DAYS"), 3650i64)?;

    let media_defaults = ChatMediaPolicy::default();
    let chat_media = ChatMediaPolicy {
      max_image_bytes: parse(
        "CHAT_IMAGE_MAX_BYTES",
        get_env("CHAT_IMAGE_MAX_BYTES"),
        media_defaults.max_image_bytes,
      )?,
      inline_fallback: parse(
        "CHAT_INLINE_FALLBACK",
        get_env("CHAT_INLINE_FALLBACK"),
        media_defaults.inline_fallback,
      )?,
      inline_max_bytes: parse(
        "CHAT_INLINE_MAX_BYTES",
        get_env("CHAT_INLINE_MAX_BYTES"),
        media_defaults.inline_max_bytes,
      )?,
    };

    let khqr_merchant = KhqrMerchant {
      account_id: get_env("KHQR_ACCOUNT_ID").unwrap_or_else(|| "market@bank".to_string()),
      merchant_name: get_env("KHQR_MERCHANT_NAME").unwrap_or_else(|| "Market".to_string()),
      merchant_city: get_env("KHQR_MERCHANT_CITY").unwrap_or_else(|| "Phnom Penh".to_string()),
      currency: get_env("KHQR_CURRENCY")
        .unwrap_or_else(|| "USD".to_string())
        .to_ascii_uppercase(),
    };
    if khqr_merchant.currency != "USD" && khqr_merchant.currency != "KHR" {
      return Err(AppError::Config(format!(
        "Invalid KHQR_CURRENCY '{}': expected USD or KHR",
        khqr_merchant.currency
      )));
    }

    let seed_db = parse("SEED_DB", get_env("SEED_DB"), false)?;
    let log_format = match get_env("LOG_FORMAT").map(|v| v.to_ascii_lowercase()).as_deref() {
      Some("json") => LogFormat::Json,
      _ => LogFormat::Pretty,
    };

    Ok(Self {
      server_host,
      server_port,
      store_backend,
      database_url,
      database_max_connections,
      jwt_secret,
      jwt_issuer,
      token_ttl_hours,
      storage_dir,
      public_base_url,
      storage_url_secret,
      signed_url_ttl_days,
      chat_media,
      khqr_api_base_url: get_env("KHQR_API_BASE_URL").map(|u| u.trim_end_matches('/').to_string()),
      khqr_api_token: get_env("KHQR_API_TOKEN"),
      khqr_merchant,
      khqr_check_timeout_ms: parse("KHQR_CHECK_TIMEOUT_MS", get_env("KHQR_CHECK_TIMEOUT_MS"), 8000u64)?,
      seed_db,
      seed_password: get_env("SEED_PASSWORD").unwrap_or_else(|| "market-demo-123".to_string()),
      log_format,
    })
  }

  pub fn bind_address(&self) -> String {
    format!("{}:{}", self.server_host, self.server_port)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::collections::HashMap;

  fn config(vars: &[(&str, &str)]) -> Result<AppConfig> {
    let vars: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
    AppConfig::from_lookup(|k| vars.get(k).cloned())
  }

  #[test]
  fn memory_backend_needs_only_a_secret() {
    let cfg = config(&[("STORE_BACKEND", "memory"), ("JWT_SECRET", "s3cret")]).unwrap();
    assert_eq!(cfg.store_backend, StoreBackend::Memory);
    assert_eq!(cfg.bind_address(), "127.0.0.1:8080");
    assert_eq!(cfg.public_base_url, "http://127.0.0.1:8080");
    assert_eq!(cfg.storage_url_secret, "s3cret");
    assert_eq!(cfg.chat_media, ChatMediaPolicy::default());
    assert_eq!(cfg.khqr_check_timeout_ms, 8000);
    assert_eq!(cfg.khqr_merchant.currency, "USD");
  }

  #[test]
  fn postgres_backend_requires_database_url() {
    let err = config(&[("JWT_SECRET", "s3cret")]).unwrap_err();
    assert!(matches!(err, AppError::Config(ref m) if m.contains("DATABASE_URL")));
  }

  #[test]
  fn invalid_values_are_config_errors() {
    assert!(matches!(
      config(&[("STORE_BACKEND", "memory"), ("JWT_SECRET", "x"), ("SERVER_PORT", "http")]),
      Err(AppError::Config(_))
    ));
    assert!(matches!(
      config(&[("STORE_BACKEND", "memory"), ("JWT_SECRET", "x"), ("CHAT_INLINE_FALLBACK", "maybe")]),
      Err(AppError::Config(_))
    ));
    assert!(matches!(
      config(&[("STORE_BACKEND", "sqlite"), ("JWT_SECRET", "x")]),
      Err(AppError::Config(_))
    ));
  }

  #[test]
  fn chat_media_overrides_are_read() {
    let cfg = config(&[
      ("STORE_BACKEND", "memory"),
      ("JWT_SECRET", "x"),
      ("CHAT_INLINE_FALLBACK", "true"),
      ("CHAT_INLINE_MAX_BYTES", "1024"),
      ("PUBLIC_BASE_URL", "https://api.example.com/"),
    ])
    .unwrap();
    assert!(cfg.chat_media.inline_fallback);
    assert_eq!(cfg.chat_media.inline_max_bytes, 1024);
    assert_eq!(cfg.public_base_url, "https://api.example.com");
  }
}
