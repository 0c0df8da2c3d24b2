//! [`ZoneGateway`]: zones and the referential check that guards their
//! deletion.

use std::{collections::BTreeMap, sync::Arc};

use padron_core::{
  identity::IdentityProvider,
  personnel::Personnel,
  store::{Collection, Document as _, DocumentStore, FieldFilter, Order, Query, to_fields},
  validate,
  zone::{NewZone, Zone, ZonePatch},
};
use serde::Serialize;
use serde_json::Value;

use crate::{GatewayError, Result, check, error::translate, require_session};

const NOT_FOUND: &str = "Zona no encontrada";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoneStats {
  pub total:             usize,
  pub active:            usize,
  pub inactive:          usize,
  /// Zone name → personnel count, over the whole personnel collection.
  pub personnel_by_zone: BTreeMap<String, usize>,
}

pub struct ZoneGateway<S, I> {
  store:    Arc<S>,
  identity: Arc<I>,
}

impl<S, I> Clone for ZoneGateway<S, I> {
  fn clone(&self) -> Self {
    Self { store: self.store.clone(), identity: self.identity.clone() }
  }
}

impl<S, I> ZoneGateway<S, I>
where
  S: DocumentStore,
  I: IdentityProvider,
{
  pub fn new(store: Arc<S>, identity: Arc<I>) -> Self { Self { store, identity } }

  async fn fetch(&self, query: Query) -> Result<Vec<Zone>> {
    let docs = self
      .store
      .query(Collection::Zones, &query)
      .await
      .map_err(translate)?;
    Ok(
      docs
        .into_iter()
        .map(Zone::from_stored)
        .collect::<padron_core::Result<_>>()?,
    )
  }

  /// Create a zone and return it, so callers can add it to an option list
  /// without re-fetching.
  pub async fn create(&self, draft: NewZone) -> Result<Zone> {
    let session = require_session(self.identity.as_ref())?;

    let mut fields = to_fields(&draft)?;
    check(&validate::ZONE, &fields, false)?;
    fields.insert("active".into(), Value::Bool(draft.active.unwrap_or(true)));
    fields.insert("createdBy".into(), Value::String(session.uid.clone()));

    let doc = self
      .store
      .add(Collection::Zones, fields)
      .await
      .map_err(translate)?;
    tracing::info!(id = %doc.id, name = %draft.name, "zone created");
    Ok(Zone::from_stored(doc)?)
  }

  pub async fn get_by_id(&self, id: &str) -> Result<Zone> {
    let doc = self
      .store
      .get(Collection::Zones, id)
      .await
      .map_err(translate)?
      .ok_or_else(|| GatewayError::NotFound(NOT_FOUND.to_owned()))?;
    Ok(Zone::from_stored(doc)?)
  }

  /// Every zone, by name ascending.
  pub async fn list(&self) -> Result<Vec<Zone>> {
    self
      .fetch(Query::default().order(Order::FieldAsc("name".into())))
      .await
  }

  /// Active zones, by name ascending.
  pub async fn list_active(&self) -> Result<Vec<Zone>> {
    self
      .fetch(
        Query::default()
          .filter(FieldFilter::eq("active", true))
          .order(Order::FieldAsc("name".into())),
      )
      .await
  }

  pub async fn update(&self, id: &str, patch: ZonePatch) -> Result<Zone> {
    let session = require_session(self.identity.as_ref())?;

    let mut fields = to_fields(&patch)?;
    check(&validate::ZONE, &fields, true)?;
    fields.insert("updatedBy".into(), Value::String(session.uid.clone()));

    let doc = self
      .store
      .update(Collection::Zones, id, fields)
      .await
      .map_err(translate)?;
    tracing::info!(id, by = %session.uid, "zone updated");
    Ok(Zone::from_stored(doc)?)
  }

  /// Personnel records whose `zoneName` is exactly `name`.
  pub async fn personnel_count(&self, name: &str) -> Result<usize> {
    let docs = self
      .store
      .query(
        Collection::Personnel,
        &Query::default().filter(FieldFilter::eq("zoneName", name)),
      )
      .await
      .map_err(translate)?;
    Ok(docs.len())
  }

  /// Delete a zone unless some personnel record still names it.
  pub async fn delete(&self, id: &str) -> Result<()> {
    let session = require_session(self.identity.as_ref())?;

    let zone = self.get_by_id(id).await?;
    let count = self.personnel_count(&zone.name).await?;
    if count > 0 {
      tracing::info!(zone = %zone.name, count, "zone still referenced");
      return Err(GatewayError::ZoneInUse { zone: zone.name, count });
    }

    self
      .store
      .delete(Collection::Zones, id)
      .await
      .map_err(translate)?;
    tracing::info!(id, name = %zone.name, by = %session.uid, "zone deleted");
    Ok(())
  }

  pub async fn stats(&self) -> Result<ZoneStats> {
    let zones = self.fetch(Query::default()).await?;
    let personnel = self
      .store
      .query(Collection::Personnel, &Query::default())
      .await
      .map_err(translate)?
      .into_iter()
      .map(Personnel::from_stored)
      .collect::<padron_core::Result<Vec<_>>>()?;

    let total = zones.len();
    let active = zones.iter().filter(|z| z.active).count();
    let mut personnel_by_zone = BTreeMap::new();
    for name in personnel.iter().filter_map(|p| p.zone_name.as_deref()) {
      if !name.is_empty() {
        *personnel_by_zone.entry(name.to_owned()).or_insert(0) += 1;
      }
    }

    Ok(ZoneStats {
      total,
      active,
      inactive: total - active,
      personnel_by_zone,
    })
  }
}
