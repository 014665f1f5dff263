// core/src/store/memory.rs

//! In-process [`DocumentStore`] backend.
//!
//! Used by the test suites and by `STORE_BACKEND=memory` deployments. All
//! state sits behind one `parking_lot::RwLock`; the guard is never held
//! across an `.await`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use tracing::trace;

use super::{apply_op, check_precondition, DocPath, Document, DocumentStore, Query, StoreResult, WriteBatch};

#[derive(Debug, Clone)]
struct StoredDoc {
  data: Map<String, Value>,
  version: u64,
  seq: u64,
  created_at: DateTime<Utc>,
  updated_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct MemoryState {
  docs: BTreeMap<DocPath, StoredDoc>,
  next_seq: u64,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
  state: RwLock<MemoryState>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn len(&self) -> usize {
    self.state.read().docs.len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }
}

fn to_document(path: &DocPath, stored: &StoredDoc) -> Document {
  Document {
    path: path.clone(),
    data: stored.data.clone(),
    version: stored.version,
    created_at: stored.created_at,
    updated_at: stored.updated_at,
  }
}

#[async_trait]
impl DocumentStore for MemoryStore {
  async fn get(&self, path: &DocPath) -> StoreResult<Option<Document>> {
    let state = self.state.read();
    Ok(state.docs.get(path).map(|stored| to_document(path, stored)))
  }

  async fn query(&self, query: Query) -> StoreResult<Vec<Document>> {
    let state = self.state.read();
    let mut matches: Vec<(&DocPath, &StoredDoc)> = state
      .docs
      .iter()
      .filter(|(path, _)| path.collection() == query.collection)
      .filter(|(_, stored)| query.filters.iter().all(|f| f.matches(&stored.data)))
      .collect();
    matches.sort_by_key(|(_, stored)| stored.seq);
    Ok(
      matches
        .into_iter()
        .take(query.limit)
        .map(|(path, stored)| to_document(path, stored))
        .collect(),
    )
  }

  async fn commit(&self, batch: WriteBatch) -> StoreResult<()> {
    let mut state = self.state.write();

    for (path, precondition) in &batch.preconditions {
      let current = state.docs.get(path).map(|stored| stored.version);
      check_precondition(path, *precondition, current)?;
    }

    // Stage every op first so a failure leaves the state untouched.
    let now = Utc::now();
    let mut staged: HashMap<DocPath, Option<StoredDoc>> = HashMap::new();
    let mut next_seq = state.next_seq;
    for op in &batch.ops {
      let path = op.path();
      let previous = match staged.get(path) {
        Some(entry) => entry.clone(),
        None => state.docs.get(path).cloned(),
      };
      let next = apply_op(previous.as_ref().map(|stored| stored.data.clone()), op).map(|data| match &previous {
        Some(prev) => StoredDoc {
          data,
          version: prev.version + 1,
          seq: prev.seq,
          created_at: prev.created_at,
          updated_at: now,
        },
        None => {
          next_seq += 1;
          StoredDoc {
            data,
            version: 1,
            seq: next_seq,
            created_at: now,
            updated_at: now,
          }
        }
      });
      staged.insert(path.clone(), next);
    }

    trace!(ops = batch.ops.len(), "Applying staged memory writes.");
    state.next_seq = next_seq;
    for (path, entry) in staged {
      match entry {
        Some(stored) => {
          state.docs.insert(path, stored);
        }
        None => {
          state.docs.remove(&path);
        }
      }
    }
    Ok(())
  }
}
