//! JSON HTTP service for Padrón.
//!
//! Exposes the SQLite document store and account table to remote admin
//! panels. Every route lives under `/v1/projects/{project}` and needs the
//! project's API key in the `x-api-key` header; document routes also need a
//! bearer token from sign-in.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/auth/sign-in` | `{email, password}` → `{token, session}` |
//! | `POST` | `/auth/sign-out` | revokes the bearer token |
//! | `GET`  | `/auth/session` | the caller's session |
//! | `POST` | `/auth/password-reset` | `{email}` |
//! | `POST` | `/auth/password` | `{currentPassword, newPassword}` → `{token, session}` |
//! | `POST` | `/collections/{c}/documents` | add |
//! | `POST` | `/collections/{c}/query` | body is a `Query` |
//! | `GET` `PATCH` `DELETE` | `/collections/{c}/documents/{id}` | |
//! | `POST` | `/batch` | `{ops: [...]}`, applied atomically |

pub mod auth;
pub mod error;
pub mod handlers;

pub use error::ApiError;

use std::{path::PathBuf, sync::Arc};

use axum::{
  Router,
  routing::{get, post},
};
use padron_store_sqlite::SqliteStore;
use serde::Deserialize;
use tower_http::trace::TraceLayer;

use handlers::{documents, identity};

// ─── Configuration ───────────────────────────────────────────────────────────

/// Runtime server configuration, read from an optional TOML file and
/// `PADRON_*` environment variables.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  pub host:            String,
  pub port:            u16,
  #[serde(default)]
  pub project_id:      String,
  #[serde(default)]
  pub api_key:         String,
  pub store_path:      PathBuf,
  /// Bearer token lifetime.
  #[serde(default = "default_token_ttl_hours")]
  pub token_ttl_hours: i64,
}

fn default_token_ttl_hours() -> i64 { padron_store_sqlite::DEFAULT_TOKEN_TTL.num_hours() }

impl ServerConfig {
  /// Fail fast on settings the service cannot run without.
  pub fn validate(&self) -> Result<(), String> {
    if self.project_id.trim().is_empty() {
      return Err("project_id is not set (PADRON_PROJECT_ID)".into());
    }
    if self.api_key.trim().is_empty() {
      return Err("api_key is not set (PADRON_API_KEY)".into());
    }
    if !(1..=24 * 365).contains(&self.token_ttl_hours) {
      return Err("token_ttl_hours must be between 1 and 8760 (PADRON_TOKEN_TTL_HOURS)".into());
    }
    Ok(())
  }
}

// ─── Application state ───────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
#[derive(Clone)]
pub struct AppState {
  pub store:  Arc<SqliteStore>,
  pub config: Arc<ServerConfig>,
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// Build the service router for `state`.
pub fn router(state: AppState) -> Router {
  Router::new()
    .route("/v1/projects/{project}/auth/sign-in", post(identity::sign_in))
    .route("/v1/projects/{project}/auth/sign-out", post(identity::sign_out))
    .route("/v1/projects/{project}/auth/session", get(identity::session))
    .route("/v1/projects/{project}/auth/password-reset", post(identity::password_reset))
    .route("/v1/projects/{project}/auth/password", post(identity::change_password))
    .route(
      "/v1/projects/{project}/collections/{collection}/documents",
      post(documents::add),
    )
    .route(
      "/v1/projects/{project}/collections/{collection}/query",
      post(documents::query),
    )
    .route(
      "/v1/projects/{project}/collections/{collection}/documents/{id}",
      get(documents::get_one)
        .patch(documents::update)
        .delete(documents::delete),
    )
    .route("/v1/projects/{project}/batch", post(documents::batch))
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}

#[cfg(test)]
mod tests;
