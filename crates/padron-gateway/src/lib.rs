//! Per-entity gateways over the Padrón backends.
//!
//! Each gateway turns a CRUD intent into [`DocumentStore`] and
//! [`IdentityProvider`] calls and hands back typed records. Backend errors
//! never escape untranslated: every failure comes out as a
//! [`GatewayError`], mapped through the fixed table in [`error`].
//!
//! [`DocumentStore`]: padron_core::store::DocumentStore
//! [`IdentityProvider`]: padron_core::identity::IdentityProvider

pub mod auth;
pub mod dashboard;
pub mod error;
pub mod personnel;
pub mod zones;

use std::sync::Arc;

use padron_core::{
  identity::IdentityProvider,
  session::Session,
  store::{DocumentStore, Fields},
  validate::Schema,
};

pub use auth::AuthService;
pub use dashboard::Dashboard;
pub use error::{ErrorKind, GatewayError, Result};
pub use personnel::{PersonnelGateway, PersonnelStats};
pub use zones::{ZoneGateway, ZoneStats};

/// Every gateway over one store/identity pair. Cloning is cheap.
pub struct Gateways<S, I> {
  pub personnel: PersonnelGateway<S, I>,
  pub zones:     ZoneGateway<S, I>,
  pub auth:      AuthService<I>,
}

impl<S, I> Clone for Gateways<S, I> {
  fn clone(&self) -> Self {
    Self {
      personnel: self.personnel.clone(),
      zones:     self.zones.clone(),
      auth:      self.auth.clone(),
    }
  }
}

impl<S, I> Gateways<S, I>
where
  S: DocumentStore,
  I: IdentityProvider,
{
  pub fn new(store: Arc<S>, identity: Arc<I>) -> Self {
    Self {
      personnel: PersonnelGateway::new(store.clone(), identity.clone()),
      zones:     ZoneGateway::new(store, identity.clone()),
      auth:      AuthService::new(identity),
    }
  }

  /// Override how many of the newest personnel records `list` fetches.
  pub fn with_list_window(mut self, window: usize) -> Self {
    self.personnel = self.personnel.with_window(window);
    self
  }
}

/// Run `schema` over `fields`. With `partial`, only errors on fields that
/// are present count, so patches can be checked against a full schema.
pub(crate) fn check(schema: &Schema, fields: &Fields, partial: bool) -> Result<()> {
  match schema.validate(fields) {
    Ok(()) => Ok(()),
    Err(mut errors) => {
      if partial {
        errors.retain(|field, _| fields.contains_key(field));
      }
      if errors.is_empty() {
        Ok(())
      } else {
        Err(GatewayError::ValidationFailed(errors))
      }
    }
  }
}

/// The signed-in session, or `Unauthenticated`.
pub(crate) fn require_session<I: IdentityProvider>(identity: &I) -> Result<Session> {
  identity.current_session().ok_or_else(GatewayError::not_signed_in)
}
