//! [`AuthService`]: sign-in, sign-out and password flows over an
//! [`IdentityProvider`], with inputs checked against their schemas first.

use std::sync::Arc;

use padron_core::{
  identity::IdentityProvider,
  session::Session,
  validate::{self, string_map},
};

use crate::{Result, check, error::translate, require_session};

pub struct AuthService<I> {
  identity: Arc<I>,
}

impl<I> Clone for AuthService<I> {
  fn clone(&self) -> Self { Self { identity: self.identity.clone() } }
}

impl<I: IdentityProvider> AuthService<I> {
  pub fn new(identity: Arc<I>) -> Self { Self { identity } }

  pub fn current_session(&self) -> Option<Session> { self.identity.current_session() }

  pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session> {
    check(
      &validate::LOGIN,
      &string_map([("email", email), ("password", password)]),
      false,
    )?;
    self.identity.sign_in(email, password).await.map_err(translate)
  }

  pub async fn sign_out(&self) -> Result<()> { self.identity.sign_out().await.map_err(translate) }

  pub async fn send_password_reset(&self, email: &str) -> Result<()> {
    check(&validate::PASSWORD_RESET, &string_map([("email", email)]), false)?;
    self
      .identity
      .send_password_reset(email)
      .await
      .map_err(translate)
  }

  /// Change the signed-in user's password. `confirm` must repeat `new`.
  pub async fn change_password(&self, current: &str, new: &str, confirm: &str) -> Result<()> {
    require_session(self.identity.as_ref())?;
    check(
      &validate::CHANGE_PASSWORD,
      &string_map([
        ("currentPassword", current),
        ("newPassword", new),
        ("confirmNewPassword", confirm),
      ]),
      false,
    )?;
    self
      .identity
      .change_password(current, new)
      .await
      .map_err(translate)
  }
}
