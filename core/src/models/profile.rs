// core/src/models/profile.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderType {
  #[default]
  Individual,
  Company,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinderProfile {
  #[serde(default)]
  pub id: String,
  pub uid: String,
  pub name: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub phone: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub avatar_url: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub bio: Option<String>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderProfile {
  #[serde(default)]
  pub id: String,
  pub uid: String,
  pub name: String,
  #[serde(default)]
  pub provider_type: ProviderType,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub company_name: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub rate_per_hour: Option<f64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub max_workers: Option<u32>,
  #[serde(default)]
  pub categories: Vec<String>,
  #[serde(default)]
  pub services: Vec<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub bio: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub avatar_url: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub phone: Option<String>,
  #[serde(default)]
  pub rating: f64,
  #[serde(default)]
  pub rating_count: u64,
  #[serde(default)]
  pub rating_total: f64,
  #[serde(default)]
  pub verified: bool,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl ProviderProfile {
  /// Most workers this provider can send to one order.
  pub fn worker_cap(&self) -> u32 {
    match self.provider_type {
      ProviderType::Individual => 1,
      ProviderType::Company => self.max_workers.unwrap_or(1).max(1),
    }
  }

  pub fn role_label(&self) -> &'static str {
    match self.provider_type {
      ProviderType::Individual => "Individual Provider",
      ProviderType::Company => "Company",
    }
  }
}
