//! The `IdentityProvider` trait and session-change fan-out.
//!
//! Providers notify subscribers whenever the signed-in identity changes.
//! A subscription is an explicit handle: [`SessionSubscription::unsubscribe`]
//! consumes it, so the release runs exactly once. Dropping the handle
//! releases it too.

use std::{
  collections::HashMap,
  fmt,
  future::Future,
  sync::{Arc, Mutex, MutexGuard, PoisonError, Weak},
};

use tokio::sync::mpsc;

use crate::{session::Session, store::BackendError};

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over the identity provider that owns sign-in state.
pub trait IdentityProvider: Send + Sync {
  type Error: BackendError;

  /// Sign in with an email/password credential. On success every
  /// subscriber is notified with the new session.
  fn sign_in(
    &self,
    email: &str,
    password: &str,
  ) -> impl Future<Output = Result<Session, Self::Error>> + Send;

  /// Sign out. On success every subscriber is notified with `None`.
  fn sign_out(&self) -> impl Future<Output = Result<(), Self::Error>> + Send;

  /// The session as the provider currently sees it.
  fn current_session(&self) -> Option<Session>;

  /// Subscribe to session changes.
  fn subscribe(&self) -> SessionSubscription;

  /// Ask the provider to start a password reset for `email`.
  fn send_password_reset(
    &self,
    email: &str,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send;

  /// Change the signed-in user's password after re-checking `current`.
  fn change_password(
    &self,
    current: &str,
    new: &str,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send;
}

// ─── Subscription handle ─────────────────────────────────────────────────────

type Release = Box<dyn FnOnce() + Send>;

/// A live session-change subscription.
pub struct SessionSubscription {
  events:  mpsc::UnboundedReceiver<Option<Session>>,
  release: Option<Release>,
}

impl SessionSubscription {
  /// Build a handle from a receiver and the closure that detaches it from
  /// its provider.
  pub fn new(
    events: mpsc::UnboundedReceiver<Option<Session>>,
    release: impl FnOnce() + Send + 'static,
  ) -> Self {
    Self { events, release: Some(Box::new(release)) }
  }

  /// Wait for the next notification. `None` once the provider is gone.
  pub async fn recv(&mut self) -> Option<Option<Session>> { self.events.recv().await }

  /// Detach from the provider.
  pub fn unsubscribe(mut self) { self.release_now(); }

  fn release_now(&mut self) {
    if let Some(release) = self.release.take() {
      release();
    }
  }
}

impl Drop for SessionSubscription {
  fn drop(&mut self) { self.release_now(); }
}

impl fmt::Debug for SessionSubscription {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("SessionSubscription")
      .field("released", &self.release.is_none())
      .finish()
  }
}

// ─── Broadcaster ─────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct Listeners {
  next_id: u64,
  senders: HashMap<u64, mpsc::UnboundedSender<Option<Session>>>,
}

/// Fan-out of session changes to any number of subscribers. Providers embed
/// one and call [`SessionBroadcaster::publish`] after every sign-in or
/// sign-out.
#[derive(Debug, Clone, Default)]
pub struct SessionBroadcaster {
  inner: Arc<Mutex<Listeners>>,
}

fn lock(listeners: &Mutex<Listeners>) -> MutexGuard<'_, Listeners> {
  listeners.lock().unwrap_or_else(PoisonError::into_inner)
}

impl SessionBroadcaster {
  pub fn new() -> Self { Self::default() }

  /// Subscribe without an initial notification.
  pub fn subscribe(&self) -> SessionSubscription {
    let (tx, rx) = mpsc::unbounded_channel();
    self.attach(tx, rx)
  }

  /// Subscribe and immediately queue `current` as the first notification.
  pub fn subscribe_seeded(&self, current: Option<Session>) -> SessionSubscription {
    let (tx, rx) = mpsc::unbounded_channel();
    tx.send(current).ok();
    self.attach(tx, rx)
  }

  fn attach(
    &self,
    tx: mpsc::UnboundedSender<Option<Session>>,
    rx: mpsc::UnboundedReceiver<Option<Session>>,
  ) -> SessionSubscription {
    let id = {
      let mut listeners = lock(&self.inner);
      let id = listeners.next_id;
      listeners.next_id += 1;
      listeners.senders.insert(id, tx);
      id
    };

    let weak: Weak<Mutex<Listeners>> = Arc::downgrade(&self.inner);
    SessionSubscription::new(rx, move || {
      if let Some(inner) = weak.upgrade() {
        lock(&inner).senders.remove(&id);
      }
    })
  }

  /// Notify every live subscriber. Subscribers whose receiver is gone are
  /// pruned.
  pub fn publish(&self, session: Option<Session>) {
    lock(&self.inner)
      .senders
      .retain(|_, tx| tx.send(session.clone()).is_ok());
  }

  pub fn subscriber_count(&self) -> usize { lock(&self.inner).senders.len() }
}
