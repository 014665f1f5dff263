// core/src/models/promo.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::auth::Role;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscountType {
  Percent,
  Fixed,
}

/// Stored under `promoCodes/{CODE}`; the id is the upper-cased code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromoCode {
  #[serde(default)]
  pub id: String,
  pub code: String,
  pub discount_type: DiscountType,
  pub discount_value: f64,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub min_subtotal: Option<f64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub max_discount: Option<f64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub usage_limit: Option<u64>,
  #[serde(default)]
  pub used_count: u64,
  #[serde(default = "default_active")]
  pub active: bool,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub starts_at: Option<DateTime<Utc>>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub ends_at: Option<DateTime<Utc>>,
  /// Empty means every role may redeem the code.
  #[serde(default)]
  pub target_roles: Vec<Role>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
}

fn default_active() -> bool {
  true
}

impl PromoCode {
  /// Canonical form used both as the stored code and as the document id.
  pub fn normalize(code: &str) -> String {
    code.trim().to_ascii_uppercase()
  }
}
