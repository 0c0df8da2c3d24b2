//! The dashboard summary.

use padron_core::{identity::IdentityProvider, personnel::Personnel, store::DocumentStore};
use serde::Serialize;

use crate::{Gateways, PersonnelStats, Result};

/// How many records the "recent" panel shows.
pub const RECENT_COUNT: usize = 5;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
  pub personnel:  PersonnelStats,
  pub zone_count: usize,
  pub recent:     Vec<Personnel>,
}

impl<S, I> Gateways<S, I>
where
  S: DocumentStore,
  I: IdentityProvider,
{
  pub async fn dashboard(&self) -> Result<Dashboard> {
    let personnel = self.personnel.stats().await?;
    let zone_count = self.zones.list().await?.len();
    let recent = self.personnel.recent(RECENT_COUNT).await?;
    Ok(Dashboard { personnel, zone_count, recent })
  }
}
