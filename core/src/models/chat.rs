// core/src/models/chat.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantMeta {
  pub name: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub role: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub avatar_url: Option<String>,
}

/// `chats/{threadId}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatThread {
  #[serde(default)]
  pub id: String,
  #[serde(default = "direct")]
  pub r#type: String,
  pub participants: Vec<String>,
  #[serde(default)]
  pub participant_meta: BTreeMap<String, ParticipantMeta>,
  #[serde(default)]
  pub unread: BTreeMap<String, u64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub last_message: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub last_message_at: Option<DateTime<Utc>>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub last_sender_uid: Option<String>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

fn direct() -> String {
  "direct".to_string()
}

impl ChatThread {
  pub fn has_participant(&self, uid: &str) -> bool {
    self.participants.iter().any(|p| p == uid)
  }

  pub fn unread_for(&self, uid: &str) -> u64 {
    self.unread.get(uid).copied().unwrap_or(0)
  }
}

/// `chats/{threadId}/messages/{messageId}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
  #[serde(default)]
  pub id: String,
  pub thread_id: String,
  pub sender_uid: String,
  #[serde(default)]
  pub sender_name: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub text: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub image_url: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub image_path: Option<String>,
  /// The image is stored as a data URI in `image_url` instead of a storage link.
  #[serde(default)]
  pub image_inline: bool,
  pub created_at: DateTime<Utc>,
  #[serde(default)]
  pub seen_by: Vec<String>,
}
