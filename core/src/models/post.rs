// core/src/models/post.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
  #[default]
  Open,
  Closed,
}

impl PostStatus {
  pub fn as_str(&self) -> &'static str {
    match self {
      PostStatus::Open => "open",
      PostStatus::Closed => "closed",
    }
  }
}

/// A finder asking for help (`finderPosts`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinderPost {
  #[serde(default)]
  pub id: String,
  pub finder_uid: String,
  #[serde(default)]
  pub finder_name: String,
  pub category_name: String,
  pub service_name: String,
  pub title: String,
  #[serde(default)]
  pub description: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub budget: Option<f64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub location: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub preferred_date: Option<String>,
  #[serde(default)]
  pub status: PostStatus,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

/// A provider advertising a service (`providerPosts`). Open posts define
/// which services the provider can currently be booked for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderPost {
  #[serde(default)]
  pub id: String,
  pub provider_uid: String,
  #[serde(default)]
  pub provider_name: String,
  pub category_name: String,
  pub service_name: String,
  pub title: String,
  #[serde(default)]
  pub description: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub rate_per_hour: Option<f64>,
  #[serde(default)]
  pub status: PostStatus,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}
