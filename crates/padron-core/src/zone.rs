//! Zones: named geographic groupings that personnel records point at by
//! name.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::store::{Collection, Document};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Zone {
  pub id:          String,
  /// Unique by convention only.
  pub name:        String,
  #[serde(default)]
  pub description: Option<String>,
  #[serde(default = "default_active")]
  pub active:      bool,
  pub created_at:  DateTime<Utc>,
  pub updated_at:  DateTime<Utc>,
  #[serde(default)]
  pub created_by:  Option<String>,
  #[serde(default)]
  pub updated_by:  Option<String>,
}

fn default_active() -> bool { true }

impl Document for Zone {
  const COLLECTION: Collection = Collection::Zones;
}

/// Input to the zone gateway's `create`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewZone {
  pub name:        String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
  /// Defaults to `true`.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub active:      Option<bool>,
}

impl NewZone {
  pub fn named(name: impl Into<String>) -> Self {
    Self { name: name.into(), description: None, active: None }
  }
}

/// A partial zone update. Only `Some` fields are written; a description of
/// `Some(None)` is written as `null`, which clears it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZonePatch {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub name:        Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "present")]
  pub description: Option<Option<String>>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub active:      Option<bool>,
}

/// Tells an explicit `null` apart from a missing key.
fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
  D: Deserializer<'de>,
  T: Deserialize<'de>,
{
  T::deserialize(deserializer).map(Some)
}
