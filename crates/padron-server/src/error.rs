//! API error type and [`axum::response::IntoResponse`] implementation.
//!
//! Every failure leaves as `{"code": ..., "error": ...}` with a provider
//! code the client-side gateway knows how to translate.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use padron_core::{
  store::{BackendError as _, code},
  wire::ErrorBody,
};
use thiserror::Error;

/// Code for failures with no provider code of their own.
pub const INTERNAL: &str = "internal";

#[derive(Debug, Error)]
pub enum ApiError {
  #[error("missing or invalid API key")]
  InvalidApiKey,

  #[error("unknown project {0:?}")]
  UnknownProject(String),

  #[error("missing or invalid bearer token")]
  Unauthenticated,

  #[error("unknown collection {0:?}")]
  UnknownCollection(String),

  #[error("document {0} not found")]
  DocumentNotFound(String),

  #[error("store error: {0}")]
  Store(#[from] padron_store_sqlite::Error),
}

fn status_for(code: &str) -> StatusCode {
  match code {
    code::NOT_FOUND => StatusCode::NOT_FOUND,
    code::PERMISSION_DENIED | code::AUTH_USER_DISABLED => StatusCode::FORBIDDEN,
    code::UNAUTHENTICATED => StatusCode::UNAUTHORIZED,
    code::INVALID_ARGUMENT => StatusCode::BAD_REQUEST,
    code::FAILED_PRECONDITION | code::AUTH_EMAIL_IN_USE => StatusCode::CONFLICT,
    code::UNAVAILABLE => StatusCode::SERVICE_UNAVAILABLE,
    c if c.starts_with("auth/") => StatusCode::BAD_REQUEST,
    _ => StatusCode::INTERNAL_SERVER_ERROR,
  }
}

impl ApiError {
  pub fn code(&self) -> &str {
    match self {
      Self::InvalidApiKey => code::PERMISSION_DENIED,
      Self::UnknownProject(_) | Self::DocumentNotFound(_) => code::NOT_FOUND,
      Self::Unauthenticated => code::UNAUTHENTICATED,
      Self::UnknownCollection(_) => code::INVALID_ARGUMENT,
      Self::Store(e) => e.code().unwrap_or(INTERNAL),
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let code = self.code().to_owned();
    let status = status_for(&code);
    if status.is_server_error() {
      tracing::error!(error = %self, "request failed");
    }
    let body = ErrorBody { code, error: self.to_string() };
    (status, Json(body)).into_response()
  }
}
