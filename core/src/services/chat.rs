// core/src/services/chat.rs

//! Direct chat threads between two users.
//!
//! A thread between `a` and `b` always lives at `chats/{min(a,b)}_{max(a,b)}`,
//! so both sides converge on the same document without a lookup. Each
//! participant has an unread counter keyed by uid; senders reset their own
//! and bump everyone else's with server-side increments.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info, instrument, warn};

use super::{clean, doc_path, load, new_id, now};
use crate::auth::Caller;
use crate::error::{MarketError, MarketResult};
use crate::models::collections::{CHATS, FINDERS, MESSAGES, PROVIDERS, USERS};
use crate::models::{ChatMessage, ChatThread, FinderProfile, ParticipantMeta, ProviderProfile, UserProfile};
use crate::storage::{sanitize_filename, DataUriImage, ObjectStorage};
use crate::store::{DocPath, FieldPath, FieldTransform, Filter, Precondition, Query, Store, StoreError, WriteBatch};
use crate::validation::{self, Validate};

/// Text of the message that opens a new thread when the caller sends none.
pub const DEFAULT_OPENING_MESSAGE: &str = "Hi! I'd like to connect.";

/// Preview text stored on the thread for image-only messages.
const IMAGE_PREVIEW: &str = "[image]";

/// Limits applied to images attached to chat messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChatMediaPolicy {
  pub max_image_bytes: usize,
  /// Store the data URI on the message when the upload fails.
  pub inline_fallback: bool,
  pub inline_max_bytes: usize,
}

impl Default for ChatMediaPolicy {
  fn default() -> Self {
    ChatMediaPolicy {
      max_image_bytes: 5 * 1024 * 1024,
      inline_fallback: false,
      inline_max_bytes: 300 * 1024,
    }
  }
}

/// Id of the direct thread between two users, independent of argument order.
pub fn direct_thread_id(a: &str, b: &str) -> String {
  if a <= b {
    format!("{}_{}", a, b)
  } else {
    format!("{}_{}", b, a)
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenDirectInput {
  pub recipient_uid: String,
  /// Overrides the default opening message.
  #[serde(default)]
  pub message: Option<String>,
}

impl Validate for OpenDirectInput {
  fn validate(&self) -> MarketResult<()> {
    validation::required("recipientUid", &self.recipient_uid)?;
    if let Some(message) = &self.message {
      validation::max_len("message", message, 2000)?;
    }
    Ok(())
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageInput {
  #[serde(default)]
  pub text: Option<String>,
  /// `data:<mime>;base64,<payload>`.
  #[serde(default)]
  pub image: Option<String>,
  #[serde(default)]
  pub file_name: Option<String>,
}

impl Validate for SendMessageInput {
  fn validate(&self) -> MarketResult<()> {
    let has_text = self.text.as_deref().is_some_and(|t| !t.trim().is_empty());
    let has_image = self.image.as_deref().is_some_and(|i| !i.trim().is_empty());
    if !has_text && !has_image {
      return Err(MarketError::validation("a message needs text or an image"));
    }
    if let Some(text) = &self.text {
      validation::max_len("text", text, 4000)?;
    }
    Ok(())
  }
}

/// A thread as seen by one participant.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadView {
  #[serde(flatten)]
  pub thread: ChatThread,
  pub unread_count: u64,
}

impl ThreadView {
  fn for_caller(thread: ChatThread, uid: &str) -> Self {
    let unread_count = thread.unread_for(uid);
    ThreadView { thread, unread_count }
  }
}

fn thread_path(thread_id: &str) -> MarketResult<DocPath> {
  doc_path(CHATS, thread_id)
}

fn unread_field(uid: &str) -> FieldPath {
  FieldPath::from_segments(["unread", uid])
}

/// Display metadata for a participant: the user document first, then the
/// role profiles. `None` when the uid is unknown everywhere.
async fn lookup_meta(store: &Store, uid: &str) -> MarketResult<Option<ParticipantMeta>> {
  if let Some(user) = store.get_as::<UserProfile>(&doc_path(USERS, uid)?).await? {
    return Ok(Some(ParticipantMeta {
      name: user.name,
      role: Some(user.role.to_string()),
      avatar_url: user.avatar_url,
    }));
  }
  if let Some(provider) = store.get_as::<ProviderProfile>(&doc_path(PROVIDERS, uid)?).await? {
    return Ok(Some(ParticipantMeta {
      name: provider.name,
      role: Some("provider".to_string()),
      avatar_url: provider.avatar_url,
    }));
  }
  if let Some(finder) = store.get_as::<FinderProfile>(&doc_path(FINDERS, uid)?).await? {
    return Ok(Some(ParticipantMeta {
      name: finder.name,
      role: Some("finder".to_string()),
      avatar_url: finder.avatar_url,
    }));
  }
  Ok(None)
}

async fn caller_meta(store: &Store, caller: &Caller) -> MarketResult<ParticipantMeta> {
  Ok(lookup_meta(store, &caller.uid).await?.unwrap_or_else(|| ParticipantMeta {
    name: caller.display_name(),
    role: caller.role.map(|r| r.to_string()),
    avatar_url: caller.picture.clone(),
  }))
}

/// Loads a thread and checks the caller takes part in it.
async fn participant_thread(store: &Store, caller: &Caller, thread_id: &str) -> MarketResult<(DocPath, ChatThread)> {
  let path = thread_path(thread_id)?;
  let thread: ChatThread = load(store, &path, "chat thread").await?;
  if !thread.has_participant(&caller.uid) {
    return Err(MarketError::forbidden("you are not a participant of this chat"));
  }
  Ok((path, thread))
}

/// Returning to an existing thread refreshes the caller's metadata and
/// clears only the caller's unread counter.
///
/// The stored participants must be exactly the caller and the recipient:
/// uids may contain `_`, so two different pairs can share a thread id.
async fn reopen(
  store: &Store,
  caller: &Caller,
  recipient_uid: &str,
  path: DocPath,
  meta: ParticipantMeta,
) -> MarketResult<ChatThread> {
  let existing: ChatThread = load(store, &path, "chat thread").await?;
  let mut expected = vec![caller.uid.clone(), recipient_uid.to_string()];
  expected.sort();
  let mut stored = existing.participants;
  stored.sort();
  if stored != expected {
    return Err(MarketError::forbidden("you are not a participant of this chat"));
  }

  let at = now();
  store
    .update(
      path.clone(),
      vec![
        (
          FieldPath::from_segments(["participantMeta", caller.uid.as_str()]),
          FieldTransform::set(&meta)?,
        ),
        (unread_field(&caller.uid), FieldTransform::set(0u64)?),
        (FieldPath::parse("updatedAt"), FieldTransform::set(at)?),
      ],
    )
    .await?;
  load(store, &path, "chat thread").await
}

/// Opens (or returns to) the direct thread between the caller and the
/// recipient. A new thread is seeded with the caller's opening message.
#[instrument(name = "chat::open_direct", skip(store, caller, input), fields(uid = %caller.uid, recipient = %input.recipient_uid))]
pub async fn open_direct(store: &Store, caller: &Caller, input: OpenDirectInput) -> MarketResult<ThreadView> {
  let recipient_uid = input.recipient_uid.trim().to_string();
  if recipient_uid == caller.uid {
    return Err(MarketError::validation("you cannot open a chat with yourself"));
  }
  let thread_id = direct_thread_id(&caller.uid, &recipient_uid);
  let path = thread_path(&thread_id)?;
  let mine = caller_meta(store, caller).await?;

  if store.get(&path).await?.is_some() {
    let thread = reopen(store, caller, &recipient_uid, path, mine).await?;
    return Ok(ThreadView::for_caller(thread, &caller.uid));
  }

  let theirs = lookup_meta(store, &recipient_uid)
    .await?
    .ok_or_else(|| MarketError::not_found("recipient not found"))?;

  let at = now();
  let text = clean(input.message).unwrap_or_else(|| DEFAULT_OPENING_MESSAGE.to_string());
  let message = ChatMessage {
    id: new_id(),
    thread_id: thread_id.clone(),
    sender_uid: caller.uid.clone(),
    sender_name: mine.name.clone(),
    text: Some(text.clone()),
    image_url: None,
    image_path: None,
    image_inline: false,
    created_at: at,
    seen_by: vec![caller.uid.clone()],
  };

  let mut participants = vec![caller.uid.clone(), recipient_uid.clone()];
  participants.sort();
  let thread = ChatThread {
    id: thread_id.clone(),
    r#type: "direct".to_string(),
    participants,
    participant_meta: BTreeMap::from([(caller.uid.clone(), mine.clone()), (recipient_uid.clone(), theirs)]),
    unread: BTreeMap::from([(caller.uid.clone(), 0), (recipient_uid.clone(), 1)]),
    last_message: Some(text),
    last_message_at: Some(at),
    last_sender_uid: Some(caller.uid.clone()),
    created_at: at,
    updated_at: at,
  };

  let mut batch = WriteBatch::new();
  batch.require(path.clone(), Precondition::Missing);
  batch.set(path.clone(), &thread)?;
  batch.set(path.child(MESSAGES, &message.id)?, &message)?;
  match store.commit(batch).await {
    Ok(()) => {
      info!(thread_id = %thread.id, "Direct chat opened.");
      Ok(ThreadView::for_caller(thread, &caller.uid))
    }
    Err(StoreError::PreconditionFailed { .. }) => {
      debug!(%thread_id, "Thread was opened concurrently; reopening instead.");
      let thread = reopen(store, caller, &recipient_uid, path, mine).await?;
      Ok(ThreadView::for_caller(thread, &caller.uid))
    }
    Err(e) => Err(e.into()),
  }
}

/// The caller's threads, most recently active first.
#[instrument(name = "chat::list_threads", skip(store, caller), fields(uid = %caller.uid))]
pub async fn list_threads(store: &Store, caller: &Caller) -> MarketResult<Vec<ThreadView>> {
  let mut threads: Vec<ChatThread> = store
    .query_as(Query::collection(CHATS).filter(Filter::array_contains("participants", caller.uid.as_str())))
    .await?;
  threads.sort_by(|a, b| {
    let a_at = a.last_message_at.unwrap_or(a.updated_at);
    let b_at = b.last_message_at.unwrap_or(b.updated_at);
    b_at.cmp(&a_at)
  });
  Ok(
    threads
      .into_iter()
      .map(|thread| ThreadView::for_caller(thread, &caller.uid))
      .collect(),
  )
}

/// Messages of a thread in send order.
#[instrument(name = "chat::list_messages", skip(store, caller), fields(uid = %caller.uid))]
pub async fn list_messages(store: &Store, caller: &Caller, thread_id: &str) -> MarketResult<Vec<ChatMessage>> {
  let (path, _) = participant_thread(store, caller, thread_id).await?;
  let mut messages: Vec<ChatMessage> = store.query_as(Query::collection(path.subcollection(MESSAGES)?)).await?;
  messages.sort_by(|a, b| a.created_at.cmp(&b.created_at));
  Ok(messages)
}

/// Where a chat image ended up.
struct StoredImage {
  url: String,
  path: Option<String>,
  inline: bool,
}

async fn store_image(
  storage: &dyn ObjectStorage,
  policy: &ChatMediaPolicy,
  thread_id: &str,
  message_id: &str,
  data_uri: &str,
  file_name: Option<&str>,
) -> MarketResult<StoredImage> {
  let image = DataUriImage::parse(data_uri)?;
  if image.bytes.len() > policy.max_image_bytes {
    return Err(MarketError::validation(format!(
      "image is too large ({} bytes, limit {})",
      image.bytes.len(),
      policy.max_image_bytes
    )));
  }

  let name = file_name
    .map(sanitize_filename)
    .filter(|n| !n.is_empty())
    .unwrap_or_else(|| format!("image.{}", image.extension()));
  let object_path = format!(
    "chat_uploads/{}/{}_{}_{}",
    thread_id,
    now().timestamp_millis(),
    message_id,
    name
  );
  let size = image.bytes.len();

  match storage.upload(&object_path, image.bytes, &image.mime).await {
    Ok(stored) => Ok(StoredImage {
      url: stored.url,
      path: Some(stored.path),
      inline: false,
    }),
    Err(e) if policy.inline_fallback && size <= policy.inline_max_bytes => {
      warn!(error = %e, %object_path, size, "Image upload failed; storing inline.");
      Ok(StoredImage {
        url: data_uri.trim().to_string(),
        path: None,
        inline: true,
      })
    }
    Err(e) => Err(MarketError::Storage(e.context(format!("uploading {}", object_path)))),
  }
}

/// Appends a message and updates the thread summary and unread counters in
/// one batch.
#[instrument(name = "chat::send_message", skip(store, storage, policy, caller, input), fields(uid = %caller.uid))]
pub async fn send_message(
  store: &Store,
  storage: &dyn ObjectStorage,
  policy: &ChatMediaPolicy,
  caller: &Caller,
  thread_id: &str,
  input: SendMessageInput,
) -> MarketResult<ChatMessage> {
  let (path, thread) = participant_thread(store, caller, thread_id).await?;
  let message_id = new_id();

  let image = match input.image.as_deref().map(str::trim).filter(|i| !i.is_empty()) {
    Some(data_uri) => Some(
      store_image(
        storage,
        policy,
        &thread.id,
        &message_id,
        data_uri,
        input.file_name.as_deref(),
      )
      .await?,
    ),
    None => None,
  };

  let sender_name = match thread.participant_meta.get(&caller.uid) {
    Some(meta) => meta.name.clone(),
    None => caller.display_name(),
  };
  let at = now();
  let text = clean(input.text);
  let message = ChatMessage {
    id: message_id,
    thread_id: thread.id.clone(),
    sender_uid: caller.uid.clone(),
    sender_name,
    text: text.clone(),
    image_url: image.as_ref().map(|i| i.url.clone()),
    image_path: image.as_ref().and_then(|i| i.path.clone()),
    image_inline: image.as_ref().is_some_and(|i| i.inline),
    created_at: at,
    seen_by: vec![caller.uid.clone()],
  };

  let mut fields = vec![
    (
      FieldPath::parse("lastMessage"),
      FieldTransform::set(text.unwrap_or_else(|| IMAGE_PREVIEW.to_string()))?,
    ),
    (FieldPath::parse("lastMessageAt"), FieldTransform::set(at)?),
    (FieldPath::parse("lastSenderUid"), FieldTransform::set(&caller.uid)?),
    (FieldPath::parse("updatedAt"), FieldTransform::set(at)?),
    (unread_field(&caller.uid), FieldTransform::set(0u64)?),
  ];
  for other in thread.participants.iter().filter(|p| **p != caller.uid) {
    fields.push((unread_field(other), FieldTransform::increment(1)));
  }

  let mut batch = WriteBatch::new();
  batch.require(path.clone(), Precondition::Exists);
  batch.set(path.child(MESSAGES, &message.id)?, &message)?;
  batch.update(path, fields);
  store.commit(batch).await?;

  debug!(thread_id = %thread.id, message_id = %message.id, inline = message.image_inline, "Message sent.");
  Ok(message)
}

/// Clears the caller's unread counter.
#[instrument(name = "chat::mark_read", skip(store, caller), fields(uid = %caller.uid))]
pub async fn mark_read(store: &Store, caller: &Caller, thread_id: &str) -> MarketResult<()> {
  let (path, _) = participant_thread(store, caller, thread_id).await?;
  let mut batch = WriteBatch::new();
  batch.require(path.clone(), Precondition::Exists);
  batch.update(path, vec![(unread_field(&caller.uid), FieldTransform::set(0u64)?)]);
  store.commit(batch).await?;
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn thread_id_ignores_argument_order() {
    assert_eq!(direct_thread_id("zed", "amy"), "amy_zed");
    assert_eq!(direct_thread_id("amy", "zed"), "amy_zed");
  }

  #[test]
  fn unread_field_keeps_dotted_uids_in_one_segment() {
    let field = unread_field("user.with.dots");
    assert_eq!(field.segments(), ["unread".to_string(), "user.with.dots".to_string()]);
  }

  #[test]
  fn message_needs_text_or_image() {
    let empty = SendMessageInput {
      text: Some("  ".into()),
      image: None,
      file_name: None,
    };
    assert!(empty.validate().is_err());
    let text = SendMessageInput {
      text: Some("hello".into()),
      image: None,
      file_name: None,
    };
    assert!(text.validate().is_ok());
  }
}
