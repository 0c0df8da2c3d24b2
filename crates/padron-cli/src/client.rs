//! Async HTTP client for `padron-server`.
//!
//! [`RemoteStore`] and [`RemoteIdentity`] implement the core backend traits
//! over the JSON API, so the gateways run unchanged against a remote
//! project. Both share one [`ApiClient`], which holds the bearer token that
//! sign-in hands out.

use std::{
  sync::{Arc, Mutex, PoisonError},
  time::Duration,
};

use anyhow::Context as _;
use padron_core::{
  identity::{IdentityProvider, SessionBroadcaster, SessionSubscription},
  session::Session,
  store::{
    BackendError, BatchOp, Collection, DocumentStore, Fields, Query, StoredDocument, code,
  },
  wire::{
    API_KEY_HEADER, Batch, Credentials, ErrorBody, PasswordChange, PasswordResetRequest,
    SignedIn, project_prefix,
  },
};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use thiserror::Error;

/// Connection settings for a Padrón project.
#[derive(Debug, Clone)]
pub struct RemoteConfig {
  pub base_url:   String,
  pub project_id: String,
  pub api_key:    String,
}

// ─── Errors ──────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ClientError {
  #[error("request failed: {0}")]
  Http(#[from] reqwest::Error),

  #[error("{message} ({code}, HTTP {status})")]
  Api {
    status:  u16,
    code:    String,
    message: String,
  },

  #[error("not signed in")]
  NotSignedIn,
}

impl BackendError for ClientError {
  fn code(&self) -> Option<&str> {
    match self {
      Self::Http(e) if e.is_decode() => None,
      Self::Http(_) => Some(code::UNAVAILABLE),
      Self::Api { code: c, .. } => Some(c),
      Self::NotSignedIn => Some(code::UNAUTHENTICATED),
    }
  }
}

/// Code for an error response whose body could not be read.
fn fallback_code(status: StatusCode) -> &'static str {
  match status {
    StatusCode::UNAUTHORIZED => code::UNAUTHENTICATED,
    StatusCode::FORBIDDEN => code::PERMISSION_DENIED,
    StatusCode::NOT_FOUND => code::NOT_FOUND,
    StatusCode::CONFLICT => code::FAILED_PRECONDITION,
    s if s.is_server_error() => code::UNAVAILABLE,
    _ => code::INVALID_ARGUMENT,
  }
}

type Result<T, E = ClientError> = std::result::Result<T, E>;

// ─── Client ──────────────────────────────────────────────────────────────────

/// Cheap to clone; the inner [`reqwest::Client`] and token are shared.
#[derive(Clone)]
pub struct ApiClient {
  http:   Client,
  config: Arc<RemoteConfig>,
  token:  Arc<Mutex<Option<String>>>,
}

impl ApiClient {
  pub fn new(config: RemoteConfig) -> anyhow::Result<Self> {
    let http = Client::builder()
      .timeout(Duration::from_secs(30))
      .build()
      .context("failed to build HTTP client")?;
    Ok(Self {
      http,
      config: Arc::new(config),
      token: Arc::default(),
    })
  }

  fn url(&self, path: &str) -> String {
    format!(
      "{}{}{}",
      self.config.base_url.trim_end_matches('/'),
      project_prefix(&self.config.project_id),
      path
    )
  }

  fn token(&self) -> Option<String> {
    self.token.lock().unwrap_or_else(PoisonError::into_inner).clone()
  }

  fn set_token(&self, token: Option<String>) {
    *self.token.lock().unwrap_or_else(PoisonError::into_inner) = token;
  }

  fn request(&self, method: Method, path: &str) -> RequestBuilder {
    let req = self
      .http
      .request(method, self.url(path))
      .header(API_KEY_HEADER, &self.config.api_key);
    match self.token() {
      Some(token) => req.bearer_auth(token),
      None => req,
    }
  }

  async fn check(resp: Response) -> Result<Response> {
    let status = resp.status();
    if status.is_success() {
      return Ok(resp);
    }
    let (code, message) = match resp.json::<ErrorBody>().await {
      Ok(body) => (body.code, body.error),
      Err(_) => (fallback_code(status).to_owned(), status.to_string()),
    };
    tracing::debug!(status = status.as_u16(), %code, "request rejected");
    Err(ClientError::Api { status: status.as_u16(), code, message })
  }

  async fn send<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T> {
    let resp = Self::check(req.send().await?).await?;
    Ok(resp.json().await?)
  }

  async fn send_empty(&self, req: RequestBuilder) -> Result<()> {
    Self::check(req.send().await?).await?;
    Ok(())
  }
}

// ─── Documents ───────────────────────────────────────────────────────────────

/// [`DocumentStore`] over the server's collection routes.
#[derive(Clone)]
pub struct RemoteStore {
  api: ApiClient,
}

impl RemoteStore {
  pub fn new(api: ApiClient) -> Self { Self { api } }
}

fn documents(collection: Collection) -> String {
  format!("/collections/{}/documents", collection.as_str())
}

fn document(collection: Collection, id: &str) -> String {
  format!("/collections/{}/documents/{id}", collection.as_str())
}

impl DocumentStore for RemoteStore {
  type Error = ClientError;

  async fn add(&self, collection: Collection, fields: Fields) -> Result<StoredDocument> {
    let req = self.api.request(Method::POST, &documents(collection)).json(&fields);
    self.api.send(req).await
  }

  async fn get(&self, collection: Collection, id: &str) -> Result<Option<StoredDocument>> {
    let req = self.api.request(Method::GET, &document(collection, id));
    match self.api.send(req).await {
      Ok(doc) => Ok(Some(doc)),
      Err(ClientError::Api { code: c, .. }) if c == code::NOT_FOUND => Ok(None),
      Err(e) => Err(e),
    }
  }

  async fn query(&self, collection: Collection, query: &Query) -> Result<Vec<StoredDocument>> {
    let path = format!("/collections/{}/query", collection.as_str());
    let req = self.api.request(Method::POST, &path).json(query);
    self.api.send(req).await
  }

  async fn update(&self, collection: Collection, id: &str, fields: Fields) -> Result<StoredDocument> {
    let req = self.api.request(Method::PATCH, &document(collection, id)).json(&fields);
    self.api.send(req).await
  }

  async fn delete(&self, collection: Collection, id: &str) -> Result<()> {
    let req = self.api.request(Method::DELETE, &document(collection, id));
    self.api.send_empty(req).await
  }

  async fn commit(&self, batch: Vec<BatchOp>) -> Result<()> {
    let req = self.api.request(Method::POST, "/batch").json(&Batch { ops: batch });
    self.api.send_empty(req).await
  }
}

// ─── Identity ────────────────────────────────────────────────────────────────

/// [`IdentityProvider`] over the server's `/auth` routes. The session lives
/// in memory; a restart starts signed out.
#[derive(Clone)]
pub struct RemoteIdentity {
  api:     ApiClient,
  current: Arc<Mutex<Option<Session>>>,
  hub:     SessionBroadcaster,
}

impl RemoteIdentity {
  pub fn new(api: ApiClient) -> Self {
    Self {
      api,
      current: Arc::default(),
      hub: SessionBroadcaster::new(),
    }
  }

  fn set_current(&self, session: Option<Session>) {
    *self.current.lock().unwrap_or_else(PoisonError::into_inner) = session.clone();
    self.hub.publish(session);
  }
}

impl IdentityProvider for RemoteIdentity {
  type Error = ClientError;

  async fn sign_in(&self, email: &str, password: &str) -> Result<Session> {
    let body = Credentials { email: email.to_owned(), password: password.to_owned() };
    let req = self.api.request(Method::POST, "/auth/sign-in").json(&body);
    let signed: SignedIn = self.api.send(req).await?;
    self.api.set_token(Some(signed.token));
    self.set_current(Some(signed.session.clone()));
    Ok(signed.session)
  }

  async fn sign_out(&self) -> Result<()> {
    if self.api.token().is_some() {
      let req = self.api.request(Method::POST, "/auth/sign-out");
      self.api.send_empty(req).await?;
    }
    self.api.set_token(None);
    self.set_current(None);
    Ok(())
  }

  fn current_session(&self) -> Option<Session> {
    self.current.lock().unwrap_or_else(PoisonError::into_inner).clone()
  }

  fn subscribe(&self) -> SessionSubscription { self.hub.subscribe_seeded(self.current_session()) }

  async fn send_password_reset(&self, email: &str) -> Result<()> {
    let body = PasswordResetRequest { email: email.to_owned() };
    let req = self.api.request(Method::POST, "/auth/password-reset").json(&body);
    self.api.send_empty(req).await
  }

  async fn change_password(&self, current: &str, new: &str) -> Result<()> {
    if self.api.token().is_none() {
      return Err(ClientError::NotSignedIn);
    }
    let body = PasswordChange {
      current_password: current.to_owned(),
      new_password:     new.to_owned(),
    };
    let req = self.api.request(Method::POST, "/auth/password").json(&body);
    let signed: SignedIn = self.api.send(req).await?;
    self.api.set_token(Some(signed.token));
    Ok(())
  }
}
