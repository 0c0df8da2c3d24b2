//! The `DocumentStore` trait and supporting query types.
//!
//! The store is schemaless: a document is a JSON object of fields plus the
//! store-assigned id and timestamps. Typed records live one level up, in
//! [`crate::personnel`] and [`crate::zone`], and convert through the
//! [`Document`] trait.

use std::future::Future;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned, ser::Error as _};
use serde_json::{Map, Value};
use strum::{AsRefStr, Display, EnumString};

use crate::{Error, Result};

/// Field map of a schemaless document.
pub type Fields = Map<String, Value>;

// ─── Error codes ─────────────────────────────────────────────────────────────

/// Provider error codes shared by every backend and by the gateway's lookup
/// table.
pub mod code {
  pub const NOT_FOUND: &str = "not-found";
  pub const PERMISSION_DENIED: &str = "permission-denied";
  pub const UNAUTHENTICATED: &str = "unauthenticated";
  pub const INVALID_ARGUMENT: &str = "invalid-argument";
  pub const FAILED_PRECONDITION: &str = "failed-precondition";
  pub const UNAVAILABLE: &str = "unavailable";

  pub const AUTH_EMAIL_IN_USE: &str = "auth/email-already-in-use";
  pub const AUTH_INVALID_EMAIL: &str = "auth/invalid-email";
  pub const AUTH_WEAK_PASSWORD: &str = "auth/weak-password";
  pub const AUTH_USER_DISABLED: &str = "auth/user-disabled";
  pub const AUTH_USER_NOT_FOUND: &str = "auth/user-not-found";
  pub const AUTH_WRONG_PASSWORD: &str = "auth/wrong-password";
  pub const AUTH_INVALID_CREDENTIAL: &str = "auth/invalid-credential";
  pub const AUTH_REQUIRES_RECENT_LOGIN: &str = "auth/requires-recent-login";
  pub const AUTH_NETWORK_FAILED: &str = "auth/network-request-failed";
}

/// An error raised by a backend, carrying the provider code the gateway
/// translates into its own taxonomy.
pub trait BackendError: std::error::Error + Send + Sync + 'static {
  /// The provider error code, e.g. `"permission-denied"`. `None` when the
  /// failure has no stable code.
  fn code(&self) -> Option<&str>;
}

// ─── Collections ─────────────────────────────────────────────────────────────

/// The named collections the registry writes to.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  AsRefStr,
  Display,
  EnumString,
)]
pub enum Collection {
  #[serde(rename = "personal")]
  #[strum(serialize = "personal")]
  Personnel,
  #[serde(rename = "zonas")]
  #[strum(serialize = "zonas")]
  Zones,
}

impl Collection {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Personnel => "personal",
      Self::Zones => "zonas",
    }
  }
}

// ─── Documents ───────────────────────────────────────────────────────────────

/// A document as returned by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredDocument {
  pub id:         String,
  /// Store-assigned on insert; never changes.
  pub created_at: DateTime<Utc>,
  /// Store-assigned on insert and on every update.
  pub updated_at: DateTime<Utc>,
  pub fields:     Fields,
}

/// A typed record living in one collection.
///
/// The default [`Document::from_stored`] folds the id and timestamps into
/// the field map under `id`, `createdAt` and `updatedAt` and deserialises.
pub trait Document: DeserializeOwned + Sized {
  const COLLECTION: Collection;

  fn from_stored(doc: StoredDocument) -> Result<Self> {
    let StoredDocument { id, created_at, updated_at, mut fields } = doc;
    fields.insert("id".to_owned(), Value::String(id.clone()));
    fields.insert("createdAt".to_owned(), serde_json::to_value(created_at)?);
    fields.insert("updatedAt".to_owned(), serde_json::to_value(updated_at)?);
    serde_json::from_value(Value::Object(fields)).map_err(|source| {
      Error::MalformedDocument {
        collection: Self::COLLECTION.as_str(),
        id,
        source,
      }
    })
  }
}

/// Serialise a draft or patch struct into a field map.
pub fn to_fields<T: Serialize>(value: &T) -> Result<Fields> {
  match serde_json::to_value(value)? {
    Value::Object(fields) => Ok(fields),
    _ => Err(Error::Serialization(serde_json::Error::custom(
      "documents must serialise to a JSON object",
    ))),
  }
}

// ─── Queries ─────────────────────────────────────────────────────────────────

/// An equality condition on one top-level field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldFilter {
  pub field: String,
  pub value: Value,
}

impl FieldFilter {
  pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
    Self { field: field.into(), value: value.into() }
  }
}

/// Result ordering for [`DocumentStore::query`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "by", content = "field", rename_all = "snake_case")]
pub enum Order {
  /// Newest first by `createdAt`.
  #[default]
  CreatedDesc,
  /// Ascending by a top-level field.
  FieldAsc(String),
}

/// Parameters for [`DocumentStore::query`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Query {
  /// All filters must hold.
  #[serde(default)]
  pub filters: Vec<FieldFilter>,
  #[serde(default)]
  pub order:   Order,
  pub limit:   Option<usize>,
}

impl Query {
  pub fn filter(mut self, filter: FieldFilter) -> Self {
    self.filters.push(filter);
    self
  }

  pub fn order(mut self, order: Order) -> Self {
    self.order = order;
    self
  }

  pub fn limit(mut self, limit: usize) -> Self {
    self.limit = Some(limit);
    self
  }
}

/// One write inside an atomic [`DocumentStore::commit`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum BatchOp {
  Delete { collection: Collection, id: String },
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over the document database backing the registry.
///
/// Implemented by `padron-store-sqlite` (in-process) and by the HTTP client
/// in `padron-cli` (remote). All methods return `Send` futures so gateway
/// calls can be spawned onto a multi-threaded runtime.
pub trait DocumentStore: Send + Sync {
  type Error: BackendError;

  /// Insert a new document with a store-assigned id and timestamps.
  fn add(
    &self,
    collection: Collection,
    fields: Fields,
  ) -> impl Future<Output = Result<StoredDocument, Self::Error>> + Send;

  /// Fetch one document. `None` if absent.
  fn get(
    &self,
    collection: Collection,
    id: &str,
  ) -> impl Future<Output = Result<Option<StoredDocument>, Self::Error>> + Send;

  fn query(
    &self,
    collection: Collection,
    query: &Query,
  ) -> impl Future<Output = Result<Vec<StoredDocument>, Self::Error>> + Send;

  /// Shallow-merge `fields` into an existing document and bump
  /// `updatedAt`. Fails with code `not-found` if the document is absent.
  fn update(
    &self,
    collection: Collection,
    id: &str,
    fields: Fields,
  ) -> impl Future<Output = Result<StoredDocument, Self::Error>> + Send;

  /// Delete one document. Deleting an absent document succeeds.
  fn delete(
    &self,
    collection: Collection,
    id: &str,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send;

  /// Apply every op or none of them.
  fn commit(
    &self,
    batch: Vec<BatchOp>,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send;
}
