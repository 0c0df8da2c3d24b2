//! The SQLite implementation of [`DocumentStore`].

use std::path::Path;

use chrono::{Duration, Utc};
use padron_core::store::{
  BatchOp, Collection, DocumentStore, Fields, Order, Query, StoredDocument,
};
use rusqlite::{OptionalExtension as _, types::Value as SqlValue};
use uuid::Uuid;

use crate::{
  Error, Result,
  encode::{
    RawDocument, encode_dt, encode_fields, encode_filter_value, field_path, strip_reserved,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Padrón backend stored in a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  pub(crate) conn:      tokio_rusqlite::Connection,
  pub(crate) token_ttl: Duration,
}

/// How long a bearer token stays valid after sign-in.
pub const DEFAULT_TOKEN_TTL: Duration = Duration::hours(12);

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn, token_ttl: DEFAULT_TOKEN_TTL };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, for tests and throwaway sessions.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn, token_ttl: DEFAULT_TOKEN_TTL };
    store.init_schema().await?;
    Ok(store)
  }

  pub fn with_token_ttl(mut self, ttl: Duration) -> Self {
    self.token_ttl = ttl;
    self
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Run raw SQL against the underlying connection.
  #[cfg(test)]
  pub(crate) async fn execute_batch(&self, sql: &'static str) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        conn.execute_batch(sql)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

fn new_doc_id() -> String { Uuid::new_v4().simple().to_string() }

// ─── DocumentStore impl ──────────────────────────────────────────────────────

impl DocumentStore for SqliteStore {
  type Error = Error;

  async fn add(&self, collection: Collection, fields: Fields) -> Result<StoredDocument> {
    let now = Utc::now();
    let doc = StoredDocument {
      id:         new_doc_id(),
      created_at: now,
      updated_at: now,
      fields:     strip_reserved(fields),
    };

    let id_str     = doc.id.clone();
    let at_str     = encode_dt(now);
    let fields_str = encode_fields(&doc.fields)?;

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO documents (collection, doc_id, created_at, updated_at, fields)
           VALUES (?1, ?2, ?3, ?3, ?4)",
          rusqlite::params![collection.as_str(), id_str, at_str, fields_str],
        )?;
        Ok(())
      })
      .await?;

    tracing::debug!(collection = %collection, id = %doc.id, "document added");
    Ok(doc)
  }

  async fn get(&self, collection: Collection, id: &str) -> Result<Option<StoredDocument>> {
    let id_str = id.to_owned();

    let raw: Option<RawDocument> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {} FROM documents WHERE collection = ?1 AND doc_id = ?2",
                RawDocument::COLUMNS
              ),
              rusqlite::params![collection.as_str(), id_str],
              RawDocument::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawDocument::into_document).transpose()
  }

  async fn query(&self, collection: Collection, query: &Query) -> Result<Vec<StoredDocument>> {
    let mut sql = format!(
      "SELECT {} FROM documents WHERE collection = ?",
      RawDocument::COLUMNS
    );
    let mut params: Vec<SqlValue> = vec![SqlValue::Text(collection.as_str().to_owned())];

    for filter in &query.filters {
      sql.push_str(" AND json_extract(fields, ?) IS ?");
      params.push(SqlValue::Text(field_path(&filter.field)?));
      params.push(encode_filter_value(&filter.value));
    }

    match &query.order {
      Order::CreatedDesc => sql.push_str(" ORDER BY created_at DESC, seq DESC"),
      Order::FieldAsc(field) => {
        sql.push_str(" ORDER BY json_extract(fields, ?) ASC, seq ASC");
        params.push(SqlValue::Text(field_path(field)?));
      }
    }

    // LIMIT -1 is "no limit" in SQLite.
    sql.push_str(" LIMIT ?");
    params.push(SqlValue::Integer(
      query.limit.map_or(-1, |l| i64::try_from(l).unwrap_or(i64::MAX)),
    ));

    let raws: Vec<RawDocument> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(params), RawDocument::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawDocument::into_document).collect()
  }

  async fn update(
    &self,
    collection: Collection,
    id: &str,
    fields: Fields,
  ) -> Result<StoredDocument> {
    let patch  = strip_reserved(fields);
    let id_str = id.to_owned();
    let at_str = encode_dt(Utc::now());

    // Read, merge and write in one transaction.
    let raw: Option<RawDocument> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let current: Option<String> = tx
          .query_row(
            "SELECT fields FROM documents WHERE collection = ?1 AND doc_id = ?2",
            rusqlite::params![collection.as_str(), id_str],
            |r| r.get(0),
          )
          .optional()?;

        let Some(current) = current else {
          return Ok(None);
        };

        let mut merged: Fields = serde_json::from_str(&current)
          .map_err(|e| tokio_rusqlite::Error::Other(Box::new(e)))?;
        merged.extend(patch);
        let merged_str = serde_json::to_string(&merged)
          .map_err(|e| tokio_rusqlite::Error::Other(Box::new(e)))?;

        tx.execute(
          "UPDATE documents SET fields = ?1, updated_at = ?2
           WHERE collection = ?3 AND doc_id = ?4",
          rusqlite::params![merged_str, at_str, collection.as_str(), id_str],
        )?;

        let row = tx.query_row(
          &format!(
            "SELECT {} FROM documents WHERE collection = ?1 AND doc_id = ?2",
            RawDocument::COLUMNS
          ),
          rusqlite::params![collection.as_str(), id_str],
          RawDocument::from_row,
        )?;
        tx.commit()?;
        Ok(Some(row))
      })
      .await?;

    match raw {
      Some(raw) => raw.into_document(),
      None => Err(Error::DocumentNotFound {
        collection: collection.as_str(),
        id:         id.to_owned(),
      }),
    }
  }

  async fn delete(&self, collection: Collection, id: &str) -> Result<()> {
    let id_str = id.to_owned();

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "DELETE FROM documents WHERE collection = ?1 AND doc_id = ?2",
          rusqlite::params![collection.as_str(), id_str],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn commit(&self, batch: Vec<BatchOp>) -> Result<()> {
    let count = batch.len();

    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        for op in &batch {
          match op {
            BatchOp::Delete { collection, id } => {
              tx.execute(
                "DELETE FROM documents WHERE collection = ?1 AND doc_id = ?2",
                rusqlite::params![collection.as_str(), id],
              )?;
            }
          }
        }
        tx.commit()?;
        Ok(())
      })
      .await?;

    tracing::debug!(ops = count, "batch committed");
    Ok(())
  }
}
