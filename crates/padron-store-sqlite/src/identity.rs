//! [`LocalIdentity`]: an in-process identity provider over the account
//! table, for running the admin panel directly against a database file.

use std::sync::{Arc, Mutex, PoisonError};

use padron_core::{
  identity::{IdentityProvider, SessionBroadcaster, SessionSubscription},
  session::Session,
};

use crate::{Error, Result, SqliteStore};

/// Holds the signed-in session in memory. Cloning shares the session and
/// its subscribers.
#[derive(Clone)]
pub struct LocalIdentity {
  store:   SqliteStore,
  current: Arc<Mutex<Option<Session>>>,
  hub:     SessionBroadcaster,
}

impl LocalIdentity {
  pub fn new(store: SqliteStore) -> Self {
    Self {
      store,
      current: Arc::default(),
      hub: SessionBroadcaster::new(),
    }
  }

  fn set_current(&self, session: Option<Session>) {
    *self.current.lock().unwrap_or_else(PoisonError::into_inner) = session.clone();
    self.hub.publish(session);
  }
}

impl IdentityProvider for LocalIdentity {
  type Error = Error;

  async fn sign_in(&self, email: &str, password: &str) -> Result<Session> {
    let session = self.store.authenticate(email, password).await?.session();
    tracing::info!(uid = %session.uid, "signed in");
    self.set_current(Some(session.clone()));
    Ok(session)
  }

  async fn sign_out(&self) -> Result<()> {
    self.set_current(None);
    Ok(())
  }

  fn current_session(&self) -> Option<Session> {
    self.current.lock().unwrap_or_else(PoisonError::into_inner).clone()
  }

  /// The first notification is the session as it stands when subscribing.
  fn subscribe(&self) -> SessionSubscription { self.hub.subscribe_seeded(self.current_session()) }

  async fn send_password_reset(&self, email: &str) -> Result<()> {
    self.store.request_password_reset(email).await
  }

  async fn change_password(&self, current: &str, new: &str) -> Result<()> {
    let uid = self.current_session().ok_or(Error::NotSignedIn)?.uid;
    self.store.change_password(&uid, current, new).await
  }
}
