// core/src/services/mod.rs

//! Domain services. Each module owns one or two collections and exposes
//! free async functions taking the [`Store`] handle and, where the call is
//! made on someone's behalf, the [`Caller`].
//!
//! Role gating happens at the HTTP edge; ownership and participant checks
//! live here because they need the stored documents.

pub mod admin;
pub mod catalog;
pub mod chat;
pub mod finder;
pub mod order;
pub mod payment;
pub mod post;
pub mod provider;
pub mod user;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;

use crate::error::{MarketError, MarketResult};
use crate::store::{DocPath, Store};

pub(crate) fn now() -> DateTime<Utc> {
  Utc::now()
}

/// Random document id (32 lowercase hex characters).
pub fn new_id() -> String {
  uuid::Uuid::new_v4().simple().to_string()
}

pub(crate) fn doc_path(collection: &str, id: &str) -> MarketResult<DocPath> {
  DocPath::new(collection, id).map_err(|_| MarketError::validation(format!("invalid id '{}'", id)))
}

/// Loads and decodes a document, mapping absence to a 404 naming `what`.
pub(crate) async fn load<T: DeserializeOwned>(store: &Store, path: &DocPath, what: &str) -> MarketResult<T> {
  store
    .get_as::<T>(path)
    .await?
    .ok_or_else(|| MarketError::not_found(format!("{} not found", what)))
}

/// Trims and drops empty optional strings.
pub(crate) fn clean(value: Option<String>) -> Option<String> {
  value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}
