//! Handlers for the `/auth` routes.

use axum::{Json, extract::State, http::StatusCode};
use padron_core::{
  session::Session,
  wire::{Credentials, PasswordChange, PasswordResetRequest, SignedIn},
};

use crate::{
  AppState,
  auth::{ApiKey, Caller},
  error::ApiError,
};

/// `POST /auth/sign-in`
pub async fn sign_in(
  State(state): State<AppState>,
  _key: ApiKey,
  Json(body): Json<Credentials>,
) -> Result<Json<SignedIn>, ApiError> {
  let account = state.store.authenticate(&body.email, &body.password).await?;
  let token = state.store.issue_token(&account.uid).await?;
  tracing::info!(uid = %account.uid, "signed in");
  Ok(Json(SignedIn { token, session: account.session() }))
}

/// `POST /auth/sign-out`
pub async fn sign_out(
  State(state): State<AppState>,
  caller: Caller,
) -> Result<StatusCode, ApiError> {
  state.store.revoke_token(&caller.token).await?;
  tracing::info!(uid = %caller.session.uid, "signed out");
  Ok(StatusCode::NO_CONTENT)
}

/// `GET /auth/session`
pub async fn session(caller: Caller) -> Json<Session> { Json(caller.session) }

/// `POST /auth/password-reset`
pub async fn password_reset(
  State(state): State<AppState>,
  _key: ApiKey,
  Json(body): Json<PasswordResetRequest>,
) -> Result<StatusCode, ApiError> {
  state.store.request_password_reset(&body.email).await?;
  Ok(StatusCode::ACCEPTED)
}

/// `POST /auth/password`
///
/// Every token of the account is revoked, so a fresh one is issued for the
/// caller.
pub async fn change_password(
  State(state): State<AppState>,
  caller: Caller,
  Json(body): Json<PasswordChange>,
) -> Result<Json<SignedIn>, ApiError> {
  let uid = caller.session.uid.clone();
  state
    .store
    .change_password(&uid, &body.current_password, &body.new_password)
    .await?;
  let token = state.store.issue_token(&uid).await?;
  Ok(Json(SignedIn { token, session: caller.session }))
}
