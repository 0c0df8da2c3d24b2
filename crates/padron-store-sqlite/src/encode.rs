//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are RFC 3339 UTC strings with fixed microsecond precision and
//! a `Z` suffix, so lexical order is chronological order. Field maps are
//! compact JSON.

use chrono::{DateTime, SecondsFormat, Utc};
use padron_core::store::{Fields, StoredDocument};
use rusqlite::types::Value as SqlValue;
use serde_json::Value;

use crate::{Error, Result};

/// Keys the store owns; stripped from any field map a client writes.
pub const RESERVED_FIELDS: [&str; 3] = ["id", "createdAt", "updatedAt"];

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Fields ──────────────────────────────────────────────────────────────────

pub fn strip_reserved(mut fields: Fields) -> Fields {
  for key in RESERVED_FIELDS {
    fields.remove(key);
  }
  fields
}

pub fn encode_fields(fields: &Fields) -> Result<String> { Ok(serde_json::to_string(fields)?) }

pub fn decode_fields(s: &str) -> Result<Fields> { Ok(serde_json::from_str(s)?) }

/// JSON path for a top-level field, e.g. `$."zoneName"`.
pub fn field_path(field: &str) -> Result<String> {
  let plain = !field.is_empty()
    && field.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
  if !plain {
    return Err(Error::InvalidField(field.to_owned()));
  }
  Ok(format!("$.\"{field}\""))
}

/// Bind a JSON value so it compares equal to what `json_extract` yields.
/// Booleans come back from SQLite as 0/1 integers.
pub fn encode_filter_value(value: &Value) -> SqlValue {
  match value {
    Value::Null => SqlValue::Null,
    Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
    Value::Number(n) => match n.as_i64() {
      Some(i) => SqlValue::Integer(i),
      None => SqlValue::Real(n.as_f64().unwrap_or_default()),
    },
    Value::String(s) => SqlValue::Text(s.clone()),
    other => SqlValue::Text(other.to_string()),
  }
}

// ─── Raw rows ────────────────────────────────────────────────────────────────

/// A `documents` row as read from SQLite, before decoding.
pub struct RawDocument {
  pub doc_id:     String,
  pub created_at: String,
  pub updated_at: String,
  pub fields:     String,
}

impl RawDocument {
  pub const COLUMNS: &'static str = "doc_id, created_at, updated_at, fields";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      doc_id:     row.get(0)?,
      created_at: row.get(1)?,
      updated_at: row.get(2)?,
      fields:     row.get(3)?,
    })
  }

  pub fn into_document(self) -> Result<StoredDocument> {
    Ok(StoredDocument {
      id:         self.doc_id,
      created_at: decode_dt(&self.created_at)?,
      updated_at: decode_dt(&self.updated_at)?,
      fields:     decode_fields(&self.fields)?,
    })
  }
}
