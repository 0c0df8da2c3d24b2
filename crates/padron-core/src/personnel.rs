//! Personnel records: the staff members the registry manages.
//!
//! A record points at its zone by *name*, not by id. The reference is only
//! checked when a zone is deleted, so renaming a zone leaves dangling names
//! behind.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use crate::store::{Collection, Document};

/// Whether a staff member is currently active.
#[derive(
  Debug,
  Clone,
  Copy,
  Default,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash,
  Serialize,
  Deserialize,
  AsRefStr,
  Display,
  EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PersonnelStatus {
  #[default]
  Active,
  Inactive,
}

impl PersonnelStatus {
  /// Label shown in the admin panel.
  pub fn label(self) -> &'static str {
    match self {
      Self::Active => "Activo",
      Self::Inactive => "Inactivo",
    }
  }
}

/// A stored personnel record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Personnel {
  pub id:          String,
  pub national_id: String,
  pub given_names: String,
  pub surnames:    String,
  pub phone:       String,
  #[serde(default)]
  pub zone_name:   Option<String>,
  #[serde(default)]
  pub status:      PersonnelStatus,
  pub created_at:  DateTime<Utc>,
  pub updated_at:  DateTime<Utc>,
  #[serde(default)]
  pub created_by:  Option<String>,
  #[serde(default)]
  pub updated_by:  Option<String>,
}

impl Personnel {
  pub fn full_name(&self) -> String {
    format!("{} {}", self.given_names, self.surnames)
  }

  /// Two-letter avatar initials, e.g. `"AQ"` for Ana Quispe.
  pub fn initials(&self) -> String {
    self
      .given_names
      .chars()
      .next()
      .into_iter()
      .chain(self.surnames.chars().next())
      .flat_map(char::to_uppercase)
      .collect()
  }
}

impl Document for Personnel {
  const COLLECTION: Collection = Collection::Personnel;
}

/// Input to the personnel gateway's `create`. Timestamps and the creator
/// are stamped on the way in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPersonnel {
  pub national_id: String,
  pub given_names: String,
  pub surnames:    String,
  pub phone:       String,
  pub zone_name:   String,
  /// Defaults to [`PersonnelStatus::Active`].
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub status:      Option<PersonnelStatus>,
}

/// A partial update. Only `Some` fields are written.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonnelPatch {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub national_id: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub given_names: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub surnames:    Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub phone:       Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub zone_name:   Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub status:      Option<PersonnelStatus>,
}

impl PersonnelPatch {
  pub fn is_empty(&self) -> bool { self == &Self::default() }
}

impl From<NewPersonnel> for PersonnelPatch {
  fn from(n: NewPersonnel) -> Self {
    Self {
      national_id: Some(n.national_id),
      given_names: Some(n.given_names),
      surnames:    Some(n.surnames),
      phone:       Some(n.phone),
      zone_name:   Some(n.zone_name),
      status:      n.status,
    }
  }
}
