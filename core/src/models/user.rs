// core/src/models/user.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::auth::Role;

/// `users/{uid}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
  #[serde(default)]
  pub id: String,
  pub uid: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub email: Option<String>,
  pub name: String,
  pub role: Role,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub phone: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub avatar_url: Option<String>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

/// `users/{uid}/app/settings`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppSettings {
  #[serde(default = "default_language")]
  pub language: String,
  #[serde(default = "default_true")]
  pub notifications_enabled: bool,
  #[serde(default)]
  pub dark_mode: bool,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub updated_at: Option<DateTime<Utc>>,
}

impl Default for AppSettings {
  fn default() -> Self {
    AppSettings {
      language: default_language(),
      notifications_enabled: true,
      dark_mode: false,
      updated_at: None,
    }
  }
}

fn default_language() -> String {
  "en".to_string()
}

fn default_true() -> bool {
  true
}

/// `users/{uid}/addresses/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
  #[serde(default)]
  pub id: String,
  #[serde(default)]
  pub label: String,
  pub line1: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub line2: Option<String>,
  pub city: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub province: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub latitude: Option<f64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub longitude: Option<f64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub note: Option<String>,
  #[serde(default)]
  pub is_default: bool,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TicketStatus {
  #[default]
  Open,
  Closed,
}

/// `users/{uid}/helpTickets/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HelpTicket {
  #[serde(default)]
  pub id: String,
  pub subject: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub category: Option<String>,
  #[serde(default)]
  pub status: TicketStatus,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub last_message: Option<String>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

/// `users/{uid}/helpTickets/{id}/messages/{messageId}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HelpTicketMessage {
  #[serde(default)]
  pub id: String,
  pub sender_uid: String,
  /// `user` or `admin`.
  pub sender_role: String,
  pub text: String,
  pub created_at: DateTime<Utc>,
}

/// Local sign-in credentials written by the seeder (`authAccounts/{uid}`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthAccount {
  #[serde(default)]
  pub id: String,
  pub uid: String,
  pub email: String,
  pub password_hash: String,
  pub role: Role,
  pub name: String,
}
