// server/src/db.rs

//! PostgreSQL backend for the document store.
//!
//! Every document is one row of the `documents` table with its body in a
//! JSONB column. Commits run in one SQL transaction holding row locks on
//! every document the batch touches.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use market::store::{
  apply_op, check_precondition, DocPath, Document, DocumentStore, Filter, Query, StoreError, StoreResult, WriteBatch,
};
use serde_json::{Map, Value};
use sqlx::postgres::PgPoolOptions;
use sqlx::types::Json;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, info, instrument};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS documents (
  path        TEXT PRIMARY KEY,
  collection  TEXT NOT NULL,
  data        JSONB NOT NULL,
  version     BIGINT NOT NULL,
  seq         BIGSERIAL,
  created_at  TIMESTAMPTZ NOT NULL,
  updated_at  TIMESTAMPTZ NOT NULL
);
CREATE INDEX IF NOT EXISTS documents_collection_seq_idx ON documents (collection, seq);
"#;

#[derive(Debug, FromRow)]
struct DocumentRow {
  path: String,
  data: Json<Map<String, Value>>,
  version: i64,
  created_at: DateTime<Utc>,
  updated_at: DateTime<Utc>,
}

impl DocumentRow {
  fn into_document(self) -> StoreResult<Document> {
    Ok(Document {
      path: DocPath::parse(&self.path)?,
      data: self.data.0,
      version: self.version as u64,
      created_at: self.created_at,
      updated_at: self.updated_at,
    })
  }
}

fn backend(err: sqlx::Error) -> StoreError {
  StoreError::Backend(anyhow::Error::new(err))
}

#[derive(Clone)]
pub struct PgDocumentStore {
  pool: PgPool,
}

impl PgDocumentStore {
  pub fn new(pool: PgPool) -> Self {
    PgDocumentStore { pool }
  }

  pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
    let pool = PgPoolOptions::new()
      .max_connections(max_connections)
      .connect(database_url)
      .await?;
    info!("Successfully connected to the database.");
    Ok(Self::new(pool))
  }

  /// Creates the `documents` table when it does not exist yet.
  pub async fn migrate(&self) -> Result<(), sqlx::Error> {
    sqlx::raw_sql(SCHEMA).execute(&self.pool).await?;
    debug!("Document schema ensured.");
    Ok(())
  }

  pub fn pool(&self) -> &PgPool {
    &self.pool
  }
}

fn push_filter(builder: &mut QueryBuilder<'_, Postgres>, filter: &Filter) {
  builder.push(" AND ");
  match filter {
    Filter::Eq(field, value) => {
      builder.push("(data #> ");
      builder.push_bind(field.segments().to_vec());
      builder.push(") = ");
      builder.push_bind(Json(value.clone()));
    }
    Filter::ArrayContains(field, value) => {
      builder.push("(data #> ");
      builder.push_bind(field.segments().to_vec());
      builder.push(") @> ");
      builder.push_bind(Json(Value::Array(vec![value.clone()])));
    }
  }
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
  async fn get(&self, path: &DocPath) -> StoreResult<Option<Document>> {
    let row: Option<DocumentRow> = sqlx::query_as(
      "SELECT path, data, version, created_at, updated_at FROM documents WHERE path = $1",
    )
    .bind(path.as_str())
    .fetch_optional(&self.pool)
    .await
    .map_err(backend)?;
    row.map(DocumentRow::into_document).transpose()
  }

  #[instrument(name = "pg_store::query", skip(self, query), fields(collection = %query.collection, filters = query.filters.len()))]
  async fn query(&self, query: Query) -> StoreResult<Vec<Document>> {
    let mut builder: QueryBuilder<'_, Postgres> =
      QueryBuilder::new("SELECT path, data, version, created_at, updated_at FROM documents WHERE collection = ");
    builder.push_bind(query.collection.clone());
    for filter in &query.filters {
      push_filter(&mut builder, filter);
    }
    builder.push(" ORDER BY seq LIMIT ");
    builder.push_bind(query.limit as i64);

    let rows: Vec<DocumentRow> = builder
      .build_query_as()
      .fetch_all(&self.pool)
      .await
      .map_err(backend)?;
    rows.into_iter().map(DocumentRow::into_document).collect()
  }

  #[instrument(name = "pg_store::commit", skip(self, batch), fields(ops = batch.ops.len(), preconditions = batch.preconditions.len()))]
  async fn commit(&self, batch: WriteBatch) -> StoreResult<()> {
    let mut tx = self.pool.begin().await.map_err(backend)?;

    // Lock in a stable order so concurrent commits cannot deadlock.
    let touched: BTreeSet<String> = batch
      .preconditions
      .iter()
      .map(|(path, _)| path.as_str().to_string())
      .chain(batch.ops.iter().map(|op| op.path().as_str().to_string()))
      .collect();
    let touched: Vec<String> = touched.into_iter().collect();
    let rows: Vec<DocumentRow> = sqlx::query_as(
      "SELECT path, data, version, created_at, updated_at FROM documents WHERE path = ANY($1) ORDER BY path FOR UPDATE",
    )
    .bind(touched.as_slice())
    .fetch_all(&mut *tx)
    .await
    .map_err(backend)?;
    let existing: HashMap<String, DocumentRow> = rows.into_iter().map(|row| (row.path.clone(), row)).collect();

    for (path, precondition) in &batch.preconditions {
      let current = existing.get(path.as_str()).map(|row| row.version as u64);
      check_precondition(path, *precondition, current)?;
    }

    // Stage the final state of every touched document.
    let mut staged: HashMap<DocPath, Option<Map<String, Value>>> = HashMap::new();
    for op in &batch.ops {
      let path = op.path();
      let previous = match staged.get(path) {
        Some(entry) => entry.clone(),
        None => existing.get(path.as_str()).map(|row| row.data.0.clone()),
      };
      staged.insert(path.clone(), apply_op(previous, op));
    }

    let now = Utc::now();
    for (path, next) in staged {
      let prior = existing.get(path.as_str());
      match (next, prior) {
        (Some(data), Some(row)) => {
          sqlx::query("UPDATE documents SET data = $2, version = $3, updated_at = $4 WHERE path = $1")
            .bind(path.as_str())
            .bind(Json(data))
            .bind(row.version + 1)
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(backend)?;
        }
        (Some(data), None) => {
          // No row was there to lock; a concurrent commit may have created it since.
          let result = sqlx::query(
            "INSERT INTO documents (path, collection, data, version, created_at, updated_at) \
             VALUES ($1, $2, $3, 1, $4, $4) ON CONFLICT (path) DO NOTHING",
          )
          .bind(path.as_str())
          .bind(path.collection())
          .bind(Json(data))
          .bind(now)
          .execute(&mut *tx)
          .await
          .map_err(backend)?;
          if result.rows_affected() == 0 {
            return Err(StoreError::PreconditionFailed {
              path: path.to_string(),
              reason: "document was created concurrently".to_string(),
            });
          }
        }
        (None, Some(_)) => {
          sqlx::query("DELETE FROM documents WHERE path = $1")
            .bind(path.as_str())
            .execute(&mut *tx)
            .await
            .map_err(backend)?;
        }
        (None, None) => {}
      }
    }

    tx.commit().await.map_err(backend)?;
    Ok(())
  }
}
