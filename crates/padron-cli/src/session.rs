//! The identity session holder.
//!
//! Built once at startup and handed to the app. It owns the only session
//! subscription the panel makes; a background task folds provider
//! notifications into an [`AuthState`] that the UI reads through a
//! `watch` receiver. [`SessionHolder::shutdown`] consumes the holder and
//! releases the subscription.

use std::{sync::Arc, time::Duration};

use padron_core::{identity::IdentityProvider, session::Session};
use padron_gateway::{GatewayError, error::translate};
use tokio::{
  sync::{oneshot, watch},
  task::JoinHandle,
};

/// How long to wait for the provider's first notification.
pub const WATCHDOG: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
  /// Waiting for the provider to report who is signed in.
  Connecting,
  Authenticated(Session),
  Anonymous,
}

impl AuthState {
  fn from_session(session: Option<Session>) -> Self {
    match session {
      Some(session) => Self::Authenticated(session),
      None => Self::Anonymous,
    }
  }

  pub fn session(&self) -> Option<&Session> {
    match self {
      Self::Authenticated(session) => Some(session),
      _ => None,
    }
  }

  pub fn is_connecting(&self) -> bool { matches!(self, Self::Connecting) }
}

pub struct SessionHolder<I> {
  identity: Arc<I>,
  state:    Arc<watch::Sender<AuthState>>,
  stop:     oneshot::Sender<()>,
  task:     JoinHandle<()>,
}

impl<I> SessionHolder<I>
where
  I: IdentityProvider + 'static,
{
  /// Subscribe to `identity` and start following its notifications. Must be
  /// called inside a tokio runtime.
  pub fn start(identity: Arc<I>) -> Self {
    let (state, _) = watch::channel(AuthState::Connecting);
    let state = Arc::new(state);
    let (stop, mut stopped) = oneshot::channel();
    let mut subscription = identity.subscribe();

    let task = tokio::spawn({
      let identity = identity.clone();
      let state = state.clone();
      async move {
        let watchdog = tokio::time::sleep(WATCHDOG);
        tokio::pin!(watchdog);
        let mut armed = true;

        loop {
          tokio::select! {
            _ = &mut stopped => break,
            event = subscription.recv() => match event {
              Some(session) => {
                armed = false;
                state.send_replace(AuthState::from_session(session));
              }
              None => break,
            },
            _ = &mut watchdog, if armed => {
              armed = false;
              if state.borrow().is_connecting() {
                tracing::warn!("no session notification after {WATCHDOG:?}");
                state.send_replace(AuthState::from_session(identity.current_session()));
              }
            }
          }
        }
        subscription.unsubscribe();
      }
    });

    Self { identity, state, stop, task }
  }

  pub fn watch(&self) -> watch::Receiver<AuthState> { self.state.subscribe() }

  pub fn current(&self) -> AuthState { self.state.borrow().clone() }

  /// Sign out. On failure the error comes back and the state is untouched.
  pub async fn logout(&self) -> Result<(), GatewayError> {
    self.identity.sign_out().await.map_err(translate)?;
    self.state.send_replace(AuthState::Anonymous);
    Ok(())
  }

  /// Sign out if still signed in, then shut down. Used on exit so a
  /// session does not outlive the panel.
  pub async fn close(self) {
    if self.identity.current_session().is_some()
      && let Err(e) = self.logout().await
    {
      tracing::warn!(error = %e, "sign-out on exit failed");
    }
    self.shutdown().await;
  }

  /// Stop following the provider and release the subscription.
  pub async fn shutdown(self) {
    self.stop.send(()).ok();
    if let Err(e) = self.task.await {
      tracing::error!(error = %e, "session task failed");
    }
  }
}

#[cfg(test)]
mod tests {
  use std::sync::{
    Mutex,
    atomic::{AtomicBool, Ordering},
  };

  use padron_core::{
    identity::{SessionBroadcaster, SessionSubscription},
    store::BackendError,
  };
  use thiserror::Error;

  use super::*;

  #[derive(Debug, Error)]
  #[error("provider unavailable")]
  struct Down;

  impl BackendError for Down {
    fn code(&self) -> Option<&str> { Some("unavailable") }
  }

  /// A provider that only speaks when told to.
  #[derive(Default)]
  struct Quiet {
    hub:           SessionBroadcaster,
    current:       Mutex<Option<Session>>,
    fail_sign_out: AtomicBool,
  }

  impl Quiet {
    fn announce(&self, session: Option<Session>) {
      *self.current.lock().unwrap() = session.clone();
      self.hub.publish(session);
    }
  }

  impl IdentityProvider for Quiet {
    type Error = Down;

    async fn sign_in(&self, _: &str, _: &str) -> Result<Session, Down> { Err(Down) }

    async fn sign_out(&self) -> Result<(), Down> {
      if self.fail_sign_out.load(Ordering::SeqCst) {
        return Err(Down);
      }
      self.announce(None);
      Ok(())
    }

    fn current_session(&self) -> Option<Session> { self.current.lock().unwrap().clone() }

    fn subscribe(&self) -> SessionSubscription { self.hub.subscribe() }

    async fn send_password_reset(&self, _: &str) -> Result<(), Down> { Ok(()) }

    async fn change_password(&self, _: &str, _: &str) -> Result<(), Down> { Ok(()) }
  }

  fn ana() -> Session {
    Session {
      uid:          "u1".into(),
      email:        "ana@example.com".into(),
      display_name: Some("Ana".into()),
    }
  }

  #[tokio::test(start_paused = true)]
  async fn watchdog_leaves_connecting_after_ten_seconds() {
    let provider = Arc::new(Quiet::default());
    let holder = SessionHolder::start(provider.clone());
    let mut rx = holder.watch();

    tokio::time::sleep(Duration::from_secs(9)).await;
    assert_eq!(*rx.borrow(), AuthState::Connecting);

    rx.changed().await.unwrap();
    assert_eq!(*rx.borrow(), AuthState::Anonymous);
    holder.shutdown().await;
  }

  #[tokio::test(start_paused = true)]
  async fn watchdog_uses_the_provider_snapshot() {
    let provider = Arc::new(Quiet::default());
    *provider.current.lock().unwrap() = Some(ana());
    let holder = SessionHolder::start(provider.clone());
    let mut rx = holder.watch();

    rx.changed().await.unwrap();
    assert_eq!(*rx.borrow(), AuthState::Authenticated(ana()));
    holder.shutdown().await;
  }

  #[tokio::test]
  async fn notifications_drive_the_state() {
    let provider = Arc::new(Quiet::default());
    let holder = SessionHolder::start(provider.clone());
    let mut rx = holder.watch();

    provider.announce(Some(ana()));
    rx.changed().await.unwrap();
    assert_eq!(rx.borrow().session(), Some(&ana()));

    provider.announce(None);
    rx.changed().await.unwrap();
    assert_eq!(*rx.borrow(), AuthState::Anonymous);
    holder.shutdown().await;
  }

  #[tokio::test]
  async fn failed_logout_keeps_the_session() {
    let provider = Arc::new(Quiet::default());
    let holder = SessionHolder::start(provider.clone());
    let mut rx = holder.watch();
    provider.announce(Some(ana()));
    rx.changed().await.unwrap();

    provider.fail_sign_out.store(true, Ordering::SeqCst);
    assert!(holder.logout().await.is_err());
    assert_eq!(holder.current(), AuthState::Authenticated(ana()));

    provider.fail_sign_out.store(false, Ordering::SeqCst);
    holder.logout().await.unwrap();
    assert_eq!(holder.current(), AuthState::Anonymous);
    holder.shutdown().await;
  }

  #[tokio::test]
  async fn close_signs_out_and_unsubscribes() {
    let provider = Arc::new(Quiet::default());
    let holder = SessionHolder::start(provider.clone());
    provider.announce(Some(ana()));

    holder.close().await;
    assert_eq!(provider.current_session(), None);
    assert_eq!(provider.hub.subscriber_count(), 0);
  }

  #[tokio::test]
  async fn one_subscription_for_the_holder_lifetime() {
    let provider = Arc::new(Quiet::default());
    let holder = SessionHolder::start(provider.clone());
    assert_eq!(provider.hub.subscriber_count(), 1);

    provider.announce(Some(ana()));
    provider.announce(None);
    assert_eq!(provider.hub.subscriber_count(), 1);

    holder.shutdown().await;
    assert_eq!(provider.hub.subscriber_count(), 0);
  }
}
