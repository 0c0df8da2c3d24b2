//! [`PersonnelGateway`]: CRUD, bulk delete and statistics for personnel
//! records.

use std::{collections::BTreeMap, sync::Arc};

use chrono::{DateTime, Datelike as _, Local, TimeZone as _, Utc};
use padron_core::{
  identity::IdentityProvider,
  listing::ListFilter,
  personnel::{NewPersonnel, Personnel, PersonnelPatch, PersonnelStatus},
  store::{BatchOp, Collection, Document as _, DocumentStore, Query, to_fields},
  validate,
};
use serde::Serialize;
use serde_json::Value;

use crate::{GatewayError, Result, check, error::translate, require_session};

/// How many of the newest records [`PersonnelGateway::list`] fetches before
/// filtering.
pub const DEFAULT_LIST_WINDOW: usize = 100;

const NOT_FOUND: &str = "Personal no encontrado";

// ─── Stats ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonnelStats {
  pub total:          usize,
  pub active:         usize,
  /// `total - active`.
  pub inactive:       usize,
  pub new_this_month: usize,
  /// Zone name → record count. Records without a zone are not counted.
  pub by_zone:        BTreeMap<String, usize>,
}

/// Aggregate `records`. `month_start` is the first instant of the current
/// calendar month.
pub fn compute_stats(records: &[Personnel], month_start: DateTime<Utc>) -> PersonnelStats {
  let total = records.len();
  let active = records
    .iter()
    .filter(|p| p.status == PersonnelStatus::Active)
    .count();
  let new_this_month = records.iter().filter(|p| p.created_at >= month_start).count();

  let mut by_zone = BTreeMap::new();
  for zone in records.iter().filter_map(|p| p.zone_name.as_deref()) {
    if !zone.is_empty() {
      *by_zone.entry(zone.to_owned()).or_insert(0) += 1;
    }
  }

  PersonnelStats {
    total,
    active,
    inactive: total - active,
    new_this_month,
    by_zone,
  }
}

/// Midnight on the first day of `now`'s month, in local time.
pub fn local_month_start(now: DateTime<Local>) -> DateTime<Utc> {
  now
    .date_naive()
    .with_day(1)
    .and_then(|d| d.and_hms_opt(0, 0, 0))
    .and_then(|naive| Local.from_local_datetime(&naive).earliest())
    .unwrap_or(now)
    .with_timezone(&Utc)
}

// ─── Gateway ─────────────────────────────────────────────────────────────────

pub struct PersonnelGateway<S, I> {
  store:    Arc<S>,
  identity: Arc<I>,
  window:   usize,
}

impl<S, I> Clone for PersonnelGateway<S, I> {
  fn clone(&self) -> Self {
    Self {
      store:    self.store.clone(),
      identity: self.identity.clone(),
      window:   self.window,
    }
  }
}

impl<S, I> PersonnelGateway<S, I>
where
  S: DocumentStore,
  I: IdentityProvider,
{
  pub fn new(store: Arc<S>, identity: Arc<I>) -> Self {
    Self { store, identity, window: DEFAULT_LIST_WINDOW }
  }

  pub fn with_window(mut self, window: usize) -> Self {
    self.window = window.max(1);
    self
  }

  pub async fn create(&self, draft: NewPersonnel) -> Result<Personnel> {
    let session = require_session(self.identity.as_ref())?;

    let mut fields = to_fields(&draft)?;
    check(&validate::PERSONNEL, &fields, false)?;
    fields.insert(
      "status".into(),
      Value::String(draft.status.unwrap_or_default().to_string()),
    );
    fields.insert("createdBy".into(), Value::String(session.uid.clone()));

    let doc = self
      .store
      .add(Collection::Personnel, fields)
      .await
      .map_err(translate)?;
    tracing::info!(id = %doc.id, by = %session.uid, "personnel created");
    Ok(Personnel::from_stored(doc)?)
  }

  pub async fn get_by_id(&self, id: &str) -> Result<Personnel> {
    let doc = self
      .store
      .get(Collection::Personnel, id)
      .await
      .map_err(translate)?
      .ok_or_else(|| GatewayError::NotFound(NOT_FOUND.to_owned()))?;
    Ok(Personnel::from_stored(doc)?)
  }

  /// The newest records (up to the configured window, newest first), then
  /// `filter` applied to that window only.
  pub async fn list(&self, filter: &ListFilter) -> Result<Vec<Personnel>> {
    let docs = self
      .store
      .query(Collection::Personnel, &Query::default().limit(self.window))
      .await
      .map_err(translate)?;
    let records = docs
      .into_iter()
      .map(Personnel::from_stored)
      .collect::<padron_core::Result<Vec<_>>>()?;

    let total = records.len();
    let kept: Vec<Personnel> = filter.apply(&records).into_iter().cloned().collect();
    tracing::debug!(fetched = total, kept = kept.len(), "personnel listed");
    Ok(kept)
  }

  /// The `n` newest records.
  pub async fn recent(&self, n: usize) -> Result<Vec<Personnel>> {
    let docs = self
      .store
      .query(Collection::Personnel, &Query::default().limit(n))
      .await
      .map_err(translate)?;
    Ok(
      docs
        .into_iter()
        .map(Personnel::from_stored)
        .collect::<padron_core::Result<_>>()?,
    )
  }

  /// Write the present fields of `patch` and stamp `updatedBy`.
  pub async fn update(&self, id: &str, patch: PersonnelPatch) -> Result<Personnel> {
    let session = require_session(self.identity.as_ref())?;

    let mut fields = to_fields(&patch)?;
    check(&validate::PERSONNEL, &fields, true)?;
    fields.insert("updatedBy".into(), Value::String(session.uid.clone()));

    let doc = self
      .store
      .update(Collection::Personnel, id, fields)
      .await
      .map_err(translate)?;
    tracing::info!(id, by = %session.uid, "personnel updated");
    Ok(Personnel::from_stored(doc)?)
  }

  pub async fn update_status(&self, id: &str, status: PersonnelStatus) -> Result<Personnel> {
    self
      .update(id, PersonnelPatch { status: Some(status), ..Default::default() })
      .await
  }

  pub async fn delete(&self, id: &str) -> Result<()> {
    let session = require_session(self.identity.as_ref())?;
    self
      .store
      .delete(Collection::Personnel, id)
      .await
      .map_err(translate)?;
    tracing::info!(id, by = %session.uid, "personnel deleted");
    Ok(())
  }

  /// Delete every id in one atomic batch: all of them or none.
  pub async fn bulk_delete(&self, ids: &[String]) -> Result<()> {
    let session = require_session(self.identity.as_ref())?;
    let batch = ids
      .iter()
      .map(|id| BatchOp::Delete { collection: Collection::Personnel, id: id.clone() })
      .collect();
    self.store.commit(batch).await.map_err(translate)?;
    tracing::info!(count = ids.len(), by = %session.uid, "personnel bulk-deleted");
    Ok(())
  }

  /// Aggregate over every record in the collection.
  pub async fn stats(&self) -> Result<PersonnelStats> {
    let docs = self
      .store
      .query(Collection::Personnel, &Query::default())
      .await
      .map_err(translate)?;
    let records = docs
      .into_iter()
      .map(Personnel::from_stored)
      .collect::<padron_core::Result<Vec<_>>>()?;
    Ok(compute_stats(&records, local_month_start(Local::now())))
  }
}

#[cfg(test)]
mod tests {
  use chrono::Duration;

  use super::*;

  fn person(id: &str, zone: Option<&str>, status: PersonnelStatus, at: DateTime<Utc>) -> Personnel {
    Personnel {
      id:          id.into(),
      national_id: "12345678".into(),
      given_names: "Ana".into(),
      surnames:    "Quispe".into(),
      phone:       "987654321".into(),
      zone_name:   zone.map(Into::into),
      status,
      created_at:  at,
      updated_at:  at,
      created_by:  None,
      updated_by:  None,
    }
  }

  #[test]
  fn stats_count_month_and_zones() {
    let month = Utc.with_ymd_and_hms(2024, 6, 1, 5, 0, 0).unwrap();
    let records = vec![
      person("a", Some("Zona Sur"), PersonnelStatus::Active, month),
      person("b", Some("Zona Sur"), PersonnelStatus::Inactive, month + Duration::days(3)),
      person("c", Some("Zona Norte"), PersonnelStatus::Active, month - Duration::seconds(1)),
      person("d", None, PersonnelStatus::Active, month - Duration::days(40)),
    ];

    let stats = compute_stats(&records, month);
    assert_eq!(stats.total, 4);
    assert_eq!(stats.active, 3);
    assert_eq!(stats.inactive, 1);
    assert_eq!(stats.new_this_month, 2);
    assert_eq!(stats.by_zone.get("Zona Sur"), Some(&2));
    assert_eq!(stats.by_zone.get("Zona Norte"), Some(&1));
    assert_eq!(stats.by_zone.len(), 2);
  }

  #[test]
  fn month_start_is_local_midnight_on_the_first() {
    let now = Local.with_ymd_and_hms(2024, 3, 17, 15, 30, 0).unwrap();
    let start = local_month_start(now).with_timezone(&Local);
    assert_eq!((start.day(), start.month()), (1, 3));
    assert_eq!(start.time(), chrono::NaiveTime::MIN);
  }
}
