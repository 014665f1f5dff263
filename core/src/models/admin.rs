// core/src/models/admin.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::auth::Role;

/// Presence of `admins/{uid}` grants the admin role.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminRecord {
  #[serde(default)]
  pub id: String,
  pub uid: String,
  #[serde(default)]
  pub name: String,
  pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminBroadcast {
  #[serde(default)]
  pub id: String,
  pub title: String,
  pub body: String,
  /// Roles the broadcast targets; empty means everyone.
  #[serde(default)]
  pub audience: Vec<Role>,
  pub created_by: String,
  pub created_at: DateTime<Utc>,
}
