// tests/store_tests.rs
mod common;

use common::*;
use market::store::{DocPath, FieldPath, FieldTransform, Filter, Precondition, Query, WriteBatch};
use market::{Store, StoreError};
use serde_json::json;
use serial_test::serial;

fn path(raw: &str) -> DocPath {
  DocPath::parse(raw).unwrap()
}

#[tokio::test]
#[serial]
async fn test_batch_is_all_or_nothing() {
  setup_tracing();
  let store = Store::in_memory();
  store.set(path("things/a"), &json!({"n": 1})).await.unwrap();

  let mut batch = WriteBatch::new();
  batch.set(path("things/b"), &json!({"n": 2})).unwrap();
  batch.require(path("things/a"), Precondition::Missing);
  let err = store.commit(batch).await.unwrap_err();
  assert!(matches!(err, StoreError::PreconditionFailed { .. }));
  assert!(store.get(&path("things/b")).await.unwrap().is_none());
}

#[tokio::test]
#[serial]
async fn test_versions_and_transaction_conflicts() {
  setup_tracing();
  let store = Store::in_memory();
  store.set(path("counters/c"), &json!({"value": 1})).await.unwrap();
  assert_eq!(store.get(&path("counters/c")).await.unwrap().unwrap().version, 1);

  let mut tx = store.transaction();
  let doc = tx.get(&path("counters/c")).await.unwrap().unwrap();
  assert_eq!(doc.data["value"], json!(1));

  // Someone else writes between the read and the commit.
  store
    .update(path("counters/c"), vec![(FieldPath::parse("value"), FieldTransform::increment(5))])
    .await
    .unwrap();

  tx.set(path("counters/c"), &json!({"value": 2})).unwrap();
  let err = tx.commit().await.unwrap_err();
  assert!(matches!(err, StoreError::PreconditionFailed { .. }));

  let current = store.get(&path("counters/c")).await.unwrap().unwrap();
  assert_eq!(current.data["value"], json!(6));
  assert_eq!(current.version, 2);
}

#[tokio::test]
#[serial]
async fn test_queries_filter_and_scope_to_collection() {
  setup_tracing();
  let store = Store::in_memory();
  store
    .set(path("chats/a_b"), &json!({"participants": ["a", "b"], "meta": {"kind": "direct"}}))
    .await
    .unwrap();
  store
    .set(path("chats/a_c"), &json!({"participants": ["a", "c"], "meta": {"kind": "group"}}))
    .await
    .unwrap();
  store
    .set(path("chats/a_b/messages/m1"), &json!({"participants": ["a"]}))
    .await
    .unwrap();

  let with_b = store
    .query(Query::collection("chats").filter(Filter::array_contains("participants", "b")))
    .await
    .unwrap();
  assert_eq!(with_b.len(), 1);
  assert_eq!(with_b[0].id(), "a_b");

  let with_a = store
    .query(Query::collection("chats").filter(Filter::array_contains("participants", "a")))
    .await
    .unwrap();
  assert_eq!(with_a.len(), 2);

  let groups = store
    .query(Query::collection("chats").filter(Filter::equals("meta.kind", "group")))
    .await
    .unwrap();
  assert_eq!(groups.len(), 1);
  assert_eq!(groups[0].id(), "a_c");

  let limited = store.query(Query::collection("chats").limit(1)).await.unwrap();
  assert_eq!(limited.len(), 1);
  assert_eq!(limited[0].id(), "a_b");

  let messages = store.query(Query::collection("chats/a_b/messages")).await.unwrap();
  assert_eq!(messages.len(), 1);
}

#[tokio::test]
#[serial]
async fn test_update_addresses_uid_keys_with_dots() {
  setup_tracing();
  let store = Store::in_memory();
  let thread = path("chats/x");
  store.set(thread.clone(), &json!({"unread": {}})).await.unwrap();
  store
    .update(
      thread.clone(),
      vec![
        (FieldPath::from_segments(["unread", "jane.doe"]), FieldTransform::increment(1)),
        (FieldPath::from_segments(["unread", "jane.doe"]), FieldTransform::increment(1)),
      ],
    )
    .await
    .unwrap();
  let doc = store.get(&thread).await.unwrap().unwrap();
  assert_eq!(doc.data["unread"]["jane.doe"], json!(2));
  assert!(doc.data["unread"].get("jane").is_none());
}
