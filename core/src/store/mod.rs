// core/src/store/mod.rs

//! Document store abstraction.
//!
//! Every service talks to persistence through [`Store`], a cheap clonable
//! handle over a [`DocumentStore`] backend. Backends only need three
//! capabilities: point reads, bounded collection scans with simple filters,
//! and atomic commits of a [`WriteBatch`]. Transactions are layered on top
//! as optimistic version checks (see [`Transaction`]).

mod batch;
pub mod memory;
mod path;

pub use batch::{apply_op, check_precondition, to_object, FieldTransform, Precondition, WriteBatch, WriteOp};
pub use memory::MemoryStore;
pub use path::{DocPath, FieldPath};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, instrument};

/// Upper bound on documents read by a single collection scan.
pub const MAX_SCAN: usize = 500;

#[derive(Debug, Error)]
pub enum StoreError {
  #[error("invalid document path '{0}'")]
  InvalidPath(String),

  #[error("precondition failed for '{path}': {reason}")]
  PreconditionFailed { path: String, reason: String },

  #[error("document '{path}' could not be decoded: {source}")]
  Decode {
    path: String,
    #[source]
    source: serde_json::Error,
  },

  #[error("value could not be encoded: {0}")]
  Encode(#[source] serde_json::Error),

  #[error("documents must be JSON objects, got {0}")]
  NotAnObject(String),

  #[error("store backend failure: {0}")]
  Backend(#[source] anyhow::Error),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// A stored document with its bookkeeping metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
  pub path: DocPath,
  pub data: Map<String, Value>,
  /// Starts at 1 and grows by one on every committed write.
  pub version: u64,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl Document {
  pub fn id(&self) -> &str {
    self.path.id()
  }

  /// Deserialises the document, exposing its id as an `id` field when the
  /// stored data does not carry one.
  pub fn decode<T: DeserializeOwned>(&self) -> StoreResult<T> {
    let mut data = self.data.clone();
    data
      .entry("id".to_string())
      .or_insert_with(|| Value::String(self.id().to_string()));
    serde_json::from_value(Value::Object(data)).map_err(|source| StoreError::Decode {
      path: self.path.to_string(),
      source,
    })
  }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
  Eq(FieldPath, Value),
  /// The field is an array holding this value.
  ArrayContains(FieldPath, Value),
}

impl Filter {
  pub fn equals<T: Into<Value>>(field: &str, value: T) -> Self {
    Filter::Eq(FieldPath::parse(field), value.into())
  }

  pub fn array_contains<T: Into<Value>>(field: &str, value: T) -> Self {
    Filter::ArrayContains(FieldPath::parse(field), value.into())
  }

  pub fn matches(&self, data: &Map<String, Value>) -> bool {
    match self {
      Filter::Eq(field, expected) => lookup(data, field) == Some(expected),
      Filter::ArrayContains(field, expected) => match lookup(data, field) {
        Some(Value::Array(items)) => items.contains(expected),
        _ => false,
      },
    }
  }
}

/// Reads a nested field from a document body.
pub fn lookup<'a>(data: &'a Map<String, Value>, field: &FieldPath) -> Option<&'a Value> {
  let (first, rest) = field.segments().split_first()?;
  let mut current = data.get(first)?;
  for segment in rest {
    current = current.as_object()?.get(segment)?;
  }
  Some(current)
}

/// Bounded scan of one collection. Results come back in creation order.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
  pub collection: String,
  pub filters: Vec<Filter>,
  pub limit: usize,
}

impl Query {
  pub fn collection(collection: impl Into<String>) -> Self {
    Query {
      collection: collection.into(),
      filters: Vec::new(),
      limit: MAX_SCAN,
    }
  }

  pub fn filter(mut self, filter: Filter) -> Self {
    self.filters.push(filter);
    self
  }

  pub fn limit(mut self, limit: usize) -> Self {
    self.limit = limit.min(MAX_SCAN);
    self
  }
}

/// Capabilities a persistence backend must provide.
#[async_trait]
pub trait DocumentStore: Send + Sync + 'static {
  async fn get(&self, path: &DocPath) -> StoreResult<Option<Document>>;

  async fn query(&self, query: Query) -> StoreResult<Vec<Document>>;

  /// Checks every precondition and applies every op atomically.
  async fn commit(&self, batch: WriteBatch) -> StoreResult<()>;
}

/// Shared handle to the configured backend.
#[derive(Clone)]
pub struct Store(Arc<dyn DocumentStore>);

impl std::fmt::Debug for Store {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str("Store")
  }
}

impl Store {
  pub fn new<S: DocumentStore>(backend: S) -> Self {
    Store(Arc::new(backend))
  }

  pub fn from_arc(backend: Arc<dyn DocumentStore>) -> Self {
    Store(backend)
  }

  pub fn in_memory() -> Self {
    Store::new(MemoryStore::new())
  }

  pub async fn get(&self, path: &DocPath) -> StoreResult<Option<Document>> {
    self.0.get(path).await
  }

  pub async fn get_as<T: DeserializeOwned>(&self, path: &DocPath) -> StoreResult<Option<T>> {
    match self.0.get(path).await? {
      Some(doc) => doc.decode().map(Some),
      None => Ok(None),
    }
  }

  pub async fn query(&self, query: Query) -> StoreResult<Vec<Document>> {
    self.0.query(query).await
  }

  pub async fn query_as<T: DeserializeOwned>(&self, query: Query) -> StoreResult<Vec<T>> {
    self.0.query(query).await?.iter().map(|doc| doc.decode::<T>()).collect()
  }

  pub async fn commit(&self, batch: WriteBatch) -> StoreResult<()> {
    if batch.is_empty() && batch.preconditions.is_empty() {
      return Ok(());
    }
    self.0.commit(batch).await
  }

  pub async fn set<T: Serialize + ?Sized>(&self, path: DocPath, value: &T) -> StoreResult<()> {
    let mut batch = WriteBatch::new();
    batch.set(path, value)?;
    self.commit(batch).await
  }

  pub async fn update(&self, path: DocPath, fields: Vec<(FieldPath, FieldTransform)>) -> StoreResult<()> {
    let mut batch = WriteBatch::new();
    batch.update(path, fields);
    self.commit(batch).await
  }

  pub async fn delete(&self, path: DocPath) -> StoreResult<()> {
    let mut batch = WriteBatch::new();
    batch.delete(path);
    self.commit(batch).await
  }

  pub fn transaction(&self) -> Transaction<'_> {
    Transaction {
      store: self,
      batch: WriteBatch::new(),
      read: HashSet::new(),
    }
  }
}

/// Read-then-write unit of work.
///
/// Each document read through the transaction pins the version it had; the
/// commit fails with [`StoreError::PreconditionFailed`] if any of them was
/// written in the meantime (or appeared, for documents read as missing).
pub struct Transaction<'a> {
  store: &'a Store,
  batch: WriteBatch,
  read: HashSet<DocPath>,
}

impl<'a> Transaction<'a> {
  pub async fn get(&mut self, path: &DocPath) -> StoreResult<Option<Document>> {
    let doc = self.store.get(path).await?;
    if self.read.insert(path.clone()) {
      let precondition = match &doc {
        Some(doc) => Precondition::Version(doc.version),
        None => Precondition::Missing,
      };
      self.batch.require(path.clone(), precondition);
    }
    Ok(doc)
  }

  pub fn set<T: Serialize + ?Sized>(&mut self, path: DocPath, value: &T) -> StoreResult<&mut Self> {
    self.batch.set(path, value)?;
    Ok(self)
  }

  pub fn update(&mut self, path: DocPath, fields: Vec<(FieldPath, FieldTransform)>) -> &mut Self {
    self.batch.update(path, fields);
    self
  }

  pub fn require(&mut self, path: DocPath, precondition: Precondition) -> &mut Self {
    self.batch.require(path, precondition);
    self
  }

  #[instrument(name = "store::transaction_commit", skip(self), fields(reads = self.read.len(), writes = self.batch.ops.len()))]
  pub async fn commit(self) -> StoreResult<()> {
    debug!("Committing transaction.");
    self.store.commit(self.batch).await
  }
}
