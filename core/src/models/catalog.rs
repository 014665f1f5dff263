// core/src/models/catalog.rs

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
  #[serde(default)]
  pub id: String,
  pub name: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub icon_url: Option<String>,
  #[serde(default)]
  pub sort_order: i32,
  #[serde(default = "default_true")]
  pub active: bool,
}

/// A bookable service within a category (`services` collection).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceItem {
  #[serde(default)]
  pub id: String,
  pub category_id: String,
  #[serde(default)]
  pub category_name: String,
  pub name: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub base_rate_per_hour: Option<f64>,
  #[serde(default = "default_true")]
  pub active: bool,
}

fn default_true() -> bool {
  true
}
