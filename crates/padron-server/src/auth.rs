//! Request extractors for the API key and the bearer token.

use axum::{
  extract::{FromRequestParts, RawPathParams},
  http::{header, request::Parts},
};
use padron_core::{session::Session, wire::API_KEY_HEADER};

use crate::{AppState, error::ApiError};

/// Zero-size marker: present in the handler means the request carried the
/// right API key for the right project.
pub struct ApiKey;

/// The signed-in caller behind a bearer token.
pub struct Caller {
  pub session: Session,
  pub token:   String,
}

/// Check the `x-api-key` header and the `{project}` path segment.
pub async fn verify_api_key(parts: &mut Parts, state: &AppState) -> Result<(), ApiError> {
  let key = parts
    .headers
    .get(API_KEY_HEADER)
    .and_then(|v| v.to_str().ok())
    .ok_or(ApiError::InvalidApiKey)?;
  if key != state.config.api_key {
    tracing::warn!("request with wrong API key");
    return Err(ApiError::InvalidApiKey);
  }

  let params = RawPathParams::from_request_parts(parts, state)
    .await
    .map_err(|_| ApiError::UnknownProject(String::new()))?;
  let project = params
    .iter()
    .find(|(name, _)| *name == "project")
    .map(|(_, value)| value.to_owned())
    .unwrap_or_default();
  if project != state.config.project_id {
    return Err(ApiError::UnknownProject(project));
  }
  Ok(())
}

fn bearer(parts: &Parts) -> Option<&str> {
  parts
    .headers
    .get(header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .and_then(|v| v.strip_prefix("Bearer "))
    .map(str::trim)
    .filter(|t| !t.is_empty())
}

impl FromRequestParts<AppState> for ApiKey {
  type Rejection = ApiError;

  async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
    verify_api_key(parts, state).await?;
    Ok(ApiKey)
  }
}

impl FromRequestParts<AppState> for Caller {
  type Rejection = ApiError;

  async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
    verify_api_key(parts, state).await?;
    let token = bearer(parts).ok_or(ApiError::Unauthenticated)?.to_owned();
    let session = state.store.session_for_token(&token).await.map_err(token_error)?;
    Ok(Caller { session, token })
  }
}

/// A bad token is a 401; anything else is a store failure.
fn token_error(e: padron_store_sqlite::Error) -> ApiError {
  match e {
    padron_store_sqlite::Error::InvalidToken => ApiError::Unauthenticated,
    other => ApiError::Store(other),
  }
}

#[cfg(test)]
mod tests {
  use padron_core::store::code;

  use super::*;
  use crate::error::INTERNAL;

  #[test]
  fn only_bad_tokens_are_unauthenticated() {
    let e = token_error(padron_store_sqlite::Error::InvalidToken);
    assert_eq!(e.code(), code::UNAUTHENTICATED);

    let e = token_error(padron_store_sqlite::Error::DateParse("garbled".into()));
    assert!(matches!(e, ApiError::Store(_)));
    assert_eq!(e.code(), INTERNAL);

    let e = token_error(padron_store_sqlite::Error::Json(
      serde_json::from_str::<serde_json::Value>("{").unwrap_err(),
    ));
    assert_ne!(e.code(), code::UNAUTHENTICATED);
  }
}
