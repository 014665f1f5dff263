// tests/chat_tests.rs
mod common;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use common::*;
use market::services::chat::{self, ChatMediaPolicy, OpenDirectInput, SendMessageInput, DEFAULT_OPENING_MESSAGE};
use market::storage::{ObjectStorage, StoredObject};
use market::{MarketError, Store};
use parking_lot::Mutex;
use serial_test::serial;

#[derive(Default)]
struct RecordingStorage {
  uploads: Mutex<Vec<String>>,
}

#[async_trait::async_trait]
impl ObjectStorage for RecordingStorage {
  async fn upload(&self, path: &str, _bytes: Vec<u8>, _content_type: &str) -> anyhow::Result<StoredObject> {
    self.uploads.lock().push(path.to_string());
    Ok(StoredObject {
      path: path.to_string(),
      url: format!("https://files.test/{}", path),
    })
  }
}

struct BrokenStorage;

#[async_trait::async_trait]
impl ObjectStorage for BrokenStorage {
  async fn upload(&self, _path: &str, _bytes: Vec<u8>, _content_type: &str) -> anyhow::Result<StoredObject> {
    anyhow::bail!("bucket unavailable")
  }
}

fn open(recipient: &str, message: Option<&str>) -> OpenDirectInput {
  OpenDirectInput {
    recipient_uid: recipient.to_string(),
    message: message.map(str::to_string),
  }
}

fn text(body: &str) -> SendMessageInput {
  SendMessageInput {
    text: Some(body.to_string()),
    image: None,
    file_name: None,
  }
}

fn png_data_uri(len: usize) -> String {
  format!("data:image/png;base64,{}", STANDARD.encode(vec![7u8; len]))
}

#[tokio::test]
#[serial]
async fn test_opening_twice_from_either_side_reuses_thread() {
  setup_tracing();
  let store = Store::in_memory();
  let alice = register_finder(&store, "alice").await;
  let bob = register_provider(&store, "bob", 15.0).await;

  let first = chat::open_direct(&store, &alice, open("bob", None)).await.unwrap();
  assert_eq!(first.thread.id, "alice_bob");
  assert_eq!(first.thread.id, chat::direct_thread_id("bob", "alice"));
  assert_eq!(first.thread.unread_for("bob"), 1);
  assert_eq!(first.unread_count, 0);

  let second = chat::open_direct(&store, &bob, open("alice", Some("hello again"))).await.unwrap();
  assert_eq!(second.thread.id, first.thread.id);
  assert_eq!(second.unread_count, 0);
  assert_eq!(second.thread.unread_for("alice"), 0);

  let messages = chat::list_messages(&store, &alice, &first.thread.id).await.unwrap();
  assert_eq!(messages.len(), 1);
  assert_eq!(messages[0].text.as_deref(), Some(DEFAULT_OPENING_MESSAGE));
}

#[tokio::test]
#[serial]
async fn test_initiator_reopening_keeps_recipient_unread() {
  setup_tracing();
  let store = Store::in_memory();
  let alice = register_finder(&store, "alice").await;
  register_provider(&store, "bob", 15.0).await;

  chat::open_direct(&store, &alice, open("bob", None)).await.unwrap();
  let again = chat::open_direct(&store, &alice, open("bob", None)).await.unwrap();
  assert_eq!(again.unread_count, 0);
  assert_eq!(again.thread.unread_for("bob"), 1);

  let messages = chat::list_messages(&store, &alice, &again.thread.id).await.unwrap();
  assert_eq!(messages.len(), 1);
}

#[tokio::test]
#[serial]
async fn test_colliding_thread_id_is_not_reopened_by_another_pair() {
  setup_tracing();
  let store = Store::in_memory();
  let first = register_finder(&store, "a_b").await;
  register_provider(&store, "c", 15.0).await;
  let other = register_finder(&store, "a").await;
  register_provider(&store, "b_c", 15.0).await;

  let thread = chat::open_direct(&store, &first, open("c", Some("secret plan"))).await.unwrap();
  assert_eq!(thread.thread.id, "a_b_c");
  assert_eq!(chat::direct_thread_id("a", "b_c"), "a_b_c");

  let err = chat::open_direct(&store, &other, open("b_c", None)).await.unwrap_err();
  assert!(matches!(err, MarketError::Forbidden(_)));

  // The existing pair's thread is untouched.
  let threads = chat::list_threads(&store, &first).await.unwrap();
  assert_eq!(threads.len(), 1);
  let stored = &threads[0].thread;
  assert_eq!(stored.participants, vec!["a_b".to_string(), "c".to_string()]);
  assert!(!stored.participant_meta.contains_key("a"));
  assert!(!stored.unread.contains_key("a"));
  assert_eq!(stored.unread_for("c"), 1);
}

#[tokio::test]
#[serial]
async fn test_send_bumps_other_unread_and_read_clears_own() {
  setup_tracing();
  let store = Store::in_memory();
  let storage = RecordingStorage::default();
  let policy = ChatMediaPolicy::default();
  let alice = register_finder(&store, "alice").await;
  let bob = register_provider(&store, "bob", 15.0).await;
  let thread = chat::open_direct(&store, &alice, open("bob", Some("Are you free Friday?"))).await.unwrap();
  let id = thread.thread.id.clone();

  chat::send_message(&store, &storage, &policy, &alice, &id, text("At 9?")).await.unwrap();
  let threads = chat::list_threads(&store, &bob).await.unwrap();
  assert_eq!(threads.len(), 1);
  assert_eq!(threads[0].unread_count, 2);
  assert_eq!(threads[0].thread.last_message.as_deref(), Some("At 9?"));

  chat::send_message(&store, &storage, &policy, &bob, &id, text("Yes")).await.unwrap();
  let threads = chat::list_threads(&store, &bob).await.unwrap();
  assert_eq!(threads[0].unread_count, 0);
  let threads = chat::list_threads(&store, &alice).await.unwrap();
  assert_eq!(threads[0].unread_count, 1);
  assert_eq!(threads[0].thread.last_sender_uid.as_deref(), Some("bob"));

  chat::mark_read(&store, &alice, &id).await.unwrap();
  let threads = chat::list_threads(&store, &alice).await.unwrap();
  assert_eq!(threads[0].unread_count, 0);

  let messages = chat::list_messages(&store, &bob, &id).await.unwrap();
  assert_eq!(messages.len(), 3);
}

#[tokio::test]
#[serial]
async fn test_outsiders_are_forbidden_and_unknown_threads_missing() {
  setup_tracing();
  let store = Store::in_memory();
  let storage = RecordingStorage::default();
  let policy = ChatMediaPolicy::default();
  let alice = register_finder(&store, "alice").await;
  register_provider(&store, "bob", 15.0).await;
  let eve = register_finder(&store, "eve").await;
  let thread = chat::open_direct(&store, &alice, open("bob", None)).await.unwrap();

  let err = chat::list_messages(&store, &eve, &thread.thread.id).await.unwrap_err();
  assert!(matches!(err, MarketError::Forbidden(_)));
  let err = chat::send_message(&store, &storage, &policy, &eve, &thread.thread.id, text("hi"))
    .await
    .unwrap_err();
  assert!(matches!(err, MarketError::Forbidden(_)));
  let err = chat::mark_read(&store, &eve, &thread.thread.id).await.unwrap_err();
  assert!(matches!(err, MarketError::Forbidden(_)));

  let err = chat::list_messages(&store, &alice, "nobody_here").await.unwrap_err();
  assert!(matches!(err, MarketError::NotFound(_)));
}

#[tokio::test]
#[serial]
async fn test_image_upload_path_and_limits() {
  setup_tracing();
  let store = Store::in_memory();
  let storage = RecordingStorage::default();
  let policy = ChatMediaPolicy {
    max_image_bytes: 1024,
    inline_fallback: false,
    inline_max_bytes: 512,
  };
  let alice = register_finder(&store, "alice").await;
  register_provider(&store, "bob", 15.0).await;
  let id = chat::open_direct(&store, &alice, open("bob", None)).await.unwrap().thread.id;

  let input = SendMessageInput {
    text: None,
    image: Some(png_data_uri(100)),
    file_name: Some("my photo.png".into()),
  };
  let sent = chat::send_message(&store, &storage, &policy, &alice, &id, input).await.unwrap();
  let path = sent.image_path.clone().unwrap();
  assert!(path.starts_with(&format!("chat_uploads/{}/", id)));
  assert!(path.ends_with(&format!("_{}_my_photo.png", sent.id)));
  assert!(!sent.image_inline);
  assert_eq!(storage.uploads.lock().len(), 1);

  let too_big = SendMessageInput {
    text: None,
    image: Some(png_data_uri(2048)),
    file_name: None,
  };
  let err = chat::send_message(&store, &storage, &policy, &alice, &id, too_big).await.unwrap_err();
  assert!(matches!(err, MarketError::Validation(_)));

  let not_image = SendMessageInput {
    text: None,
    image: Some(format!("data:text/plain;base64,{}", STANDARD.encode("hi"))),
    file_name: None,
  };
  let err = chat::send_message(&store, &storage, &policy, &alice, &id, not_image).await.unwrap_err();
  assert!(matches!(err, MarketError::Validation(_)));
}

#[tokio::test]
#[serial]
async fn test_inline_fallback_when_upload_fails() {
  setup_tracing();
  let store = Store::in_memory();
  let alice = register_finder(&store, "alice").await;
  register_provider(&store, "bob", 15.0).await;
  let id = chat::open_direct(&store, &alice, open("bob", None)).await.unwrap().thread.id;
  let image = png_data_uri(100);

  let strict = ChatMediaPolicy {
    max_image_bytes: 1024,
    inline_fallback: false,
    inline_max_bytes: 512,
  };
  let input = SendMessageInput {
    text: None,
    image: Some(image.clone()),
    file_name: None,
  };
  let err = chat::send_message(&store, &BrokenStorage, &strict, &alice, &id, input.clone())
    .await
    .unwrap_err();
  assert_eq!(err.status_code(), 500);

  let lenient = ChatMediaPolicy {
    inline_fallback: true,
    ..strict
  };
  let sent = chat::send_message(&store, &BrokenStorage, &lenient, &alice, &id, input).await.unwrap();
  assert!(sent.image_inline);
  assert_eq!(sent.image_url.as_deref(), Some(image.as_str()));
  assert!(sent.image_path.is_none());
}
