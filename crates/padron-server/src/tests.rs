//! Router tests driven through `tower::ServiceExt::oneshot` against an
//! in-memory store.

use std::{path::PathBuf, sync::Arc};

use axum::{
  body::Body,
  http::{Request, StatusCode, header},
  response::Response,
};
use padron_core::wire::{API_KEY_HEADER, ErrorBody, SignedIn};
use padron_store_sqlite::{NewAccount, SqliteStore};
use serde_json::{Value, json};
use tower::ServiceExt as _;

use super::*;

const KEY: &str = "test-key";
const PASSWORD: &str = "Secreto123";

async fn make_state() -> AppState {
  let store = SqliteStore::open_in_memory().await.unwrap();
  store
    .create_account(NewAccount {
      email:        "admin@example.com".into(),
      password:     PASSWORD.into(),
      display_name: Some("Admin".into()),
    })
    .await
    .unwrap();

  AppState {
    store:  Arc::new(store),
    config: Arc::new(ServerConfig {
      host:            "127.0.0.1".to_string(),
      port:            8787,
      project_id:      "demo".to_string(),
      api_key:         KEY.to_string(),
      store_path:      PathBuf::from(":memory:"),
      token_ttl_hours: 12,
    }),
  }
}

async fn call(
  state: &AppState,
  method: &str,
  uri: &str,
  token: Option<&str>,
  body: Option<Value>,
) -> Response {
  let mut builder = Request::builder()
    .method(method)
    .uri(uri)
    .header(API_KEY_HEADER, KEY);
  if let Some(token) = token {
    builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
  }
  let body = match body {
    Some(v) => {
      builder = builder.header(header::CONTENT_TYPE, "application/json");
      Body::from(v.to_string())
    }
    None => Body::empty(),
  };
  router(state.clone()).oneshot(builder.body(body).unwrap()).await.unwrap()
}

async fn json_body(resp: Response) -> Value {
  let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
  serde_json::from_slice(&bytes).unwrap()
}

async fn error_code(resp: Response) -> String {
  let body: ErrorBody = serde_json::from_value(json_body(resp).await).unwrap();
  body.code
}

async fn sign_in(state: &AppState) -> String {
  let resp = call(
    state,
    "POST",
    "/v1/projects/demo/auth/sign-in",
    None,
    Some(json!({ "email": "admin@example.com", "password": PASSWORD })),
  )
  .await;
  assert_eq!(resp.status(), StatusCode::OK);
  let signed: SignedIn = serde_json::from_value(json_body(resp).await).unwrap();
  signed.token
}

// ── Gatekeeping ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn missing_api_key_is_forbidden() {
  let state = make_state().await;
  let req = Request::builder()
    .method("POST")
    .uri("/v1/projects/demo/auth/sign-in")
    .header(header::CONTENT_TYPE, "application/json")
    .body(Body::from(json!({ "email": "a@b.co", "password": "x" }).to_string()))
    .unwrap();
  let resp = router(state).oneshot(req).await.unwrap();
  assert_eq!(resp.status(), StatusCode::FORBIDDEN);
  assert_eq!(error_code(resp).await, "permission-denied");
}

#[tokio::test]
async fn wrong_project_is_not_found() {
  let state = make_state().await;
  let resp = call(&state, "GET", "/v1/projects/other/auth/session", None, None).await;
  assert_eq!(resp.status(), StatusCode::NOT_FOUND);
  assert_eq!(error_code(resp).await, "not-found");
}

#[tokio::test]
async fn documents_need_a_bearer_token() {
  let state = make_state().await;
  let resp = call(
    &state,
    "POST",
    "/v1/projects/demo/collections/zonas/query",
    None,
    Some(json!({})),
  )
  .await;
  assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
  assert_eq!(error_code(resp).await, "unauthenticated");

  let resp = call(
    &state,
    "POST",
    "/v1/projects/demo/collections/zonas/query",
    Some("not-a-token"),
    Some(json!({})),
  )
  .await;
  assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

// ── Identity ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn wrong_password_keeps_its_provider_code() {
  let state = make_state().await;
  let resp = call(
    &state,
    "POST",
    "/v1/projects/demo/auth/sign-in",
    None,
    Some(json!({ "email": "admin@example.com", "password": "Incorrecta1" })),
  )
  .await;
  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
  assert_eq!(error_code(resp).await, "auth/wrong-password");
}

#[tokio::test]
async fn session_reflects_the_token_and_sign_out_revokes_it() {
  let state = make_state().await;
  let token = sign_in(&state).await;

  let resp = call(&state, "GET", "/v1/projects/demo/auth/session", Some(&token), None).await;
  assert_eq!(resp.status(), StatusCode::OK);
  let session = json_body(resp).await;
  assert_eq!(session["email"], json!("admin@example.com"));
  assert_eq!(session["displayName"], json!("Admin"));

  let resp = call(&state, "POST", "/v1/projects/demo/auth/sign-out", Some(&token), None).await;
  assert_eq!(resp.status(), StatusCode::NO_CONTENT);

  let resp = call(&state, "GET", "/v1/projects/demo/auth/session", Some(&token), None).await;
  assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn password_change_swaps_the_token() {
  let state = make_state().await;
  let old = sign_in(&state).await;

  let resp = call(
    &state,
    "POST",
    "/v1/projects/demo/auth/password",
    Some(&old),
    Some(json!({ "currentPassword": PASSWORD, "newPassword": "Nuevo4567" })),
  )
  .await;
  assert_eq!(resp.status(), StatusCode::OK);
  let signed: SignedIn = serde_json::from_value(json_body(resp).await).unwrap();
  assert_ne!(signed.token, old);

  let resp = call(&state, "GET", "/v1/projects/demo/auth/session", Some(&old), None).await;
  assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
  let resp = call(&state, "GET", "/v1/projects/demo/auth/session", Some(&signed.token), None).await;
  assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn password_reset_for_unknown_email_is_reported() {
  let state = make_state().await;
  let resp = call(
    &state,
    "POST",
    "/v1/projects/demo/auth/password-reset",
    None,
    Some(json!({ "email": "nadie@example.com" })),
  )
  .await;
  assert_eq!(error_code(resp).await, "auth/user-not-found");

  let resp = call(
    &state,
    "POST",
    "/v1/projects/demo/auth/password-reset",
    None,
    Some(json!({ "email": "admin@example.com" })),
  )
  .await;
  assert_eq!(resp.status(), StatusCode::ACCEPTED);
}

// ── Documents ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn document_round_trip() {
  let state = make_state().await;
  let token = sign_in(&state).await;

  let resp = call(
    &state,
    "POST",
    "/v1/projects/demo/collections/zonas/documents",
    Some(&token),
    Some(json!({ "name": "Zona Norte", "active": true })),
  )
  .await;
  assert_eq!(resp.status(), StatusCode::CREATED);
  let created = json_body(resp).await;
  let id = created["id"].as_str().unwrap().to_owned();
  let doc_uri = format!("/v1/projects/demo/collections/zonas/documents/{id}");

  let resp = call(&state, "PATCH", &doc_uri, Some(&token), Some(json!({ "active": false }))).await;
  assert_eq!(resp.status(), StatusCode::OK);
  let patched = json_body(resp).await;
  assert_eq!(patched["fields"]["name"], json!("Zona Norte"));
  assert_eq!(patched["fields"]["active"], json!(false));

  let resp = call(
    &state,
    "POST",
    "/v1/projects/demo/collections/zonas/query",
    Some(&token),
    Some(json!({ "filters": [{ "field": "active", "value": false }] })),
  )
  .await;
  let found = json_body(resp).await;
  assert_eq!(found.as_array().map(Vec::len), Some(1));

  let resp = call(&state, "DELETE", &doc_uri, Some(&token), None).await;
  assert_eq!(resp.status(), StatusCode::NO_CONTENT);

  let resp = call(&state, "GET", &doc_uri, Some(&token), None).await;
  assert_eq!(resp.status(), StatusCode::NOT_FOUND);
  assert_eq!(error_code(resp).await, "not-found");
}

#[tokio::test]
async fn patching_a_missing_document_is_not_found() {
  let state = make_state().await;
  let token = sign_in(&state).await;
  let resp = call(
    &state,
    "PATCH",
    "/v1/projects/demo/collections/personal/documents/nope",
    Some(&token),
    Some(json!({ "status": "inactive" })),
  )
  .await;
  assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unknown_collection_is_invalid_argument() {
  let state = make_state().await;
  let token = sign_in(&state).await;
  let resp = call(
    &state,
    "POST",
    "/v1/projects/demo/collections/socios/documents",
    Some(&token),
    Some(json!({ "name": "x" })),
  )
  .await;
  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
  assert_eq!(error_code(resp).await, "invalid-argument");
}

#[tokio::test]
async fn batch_deletes_every_listed_document() {
  let state = make_state().await;
  let token = sign_in(&state).await;

  let mut ids = Vec::new();
  for name in ["Ana", "Luis"] {
    let resp = call(
      &state,
      "POST",
      "/v1/projects/demo/collections/personal/documents",
      Some(&token),
      Some(json!({ "firstName": name })),
    )
    .await;
    ids.push(json_body(resp).await["id"].as_str().unwrap().to_owned());
  }

  let ops: Vec<Value> = ids
    .iter()
    .map(|id| json!({ "op": "delete", "collection": "personal", "id": id }))
    .collect();
  let resp = call(&state, "POST", "/v1/projects/demo/batch", Some(&token), Some(json!({ "ops": ops }))).await;
  assert_eq!(resp.status(), StatusCode::NO_CONTENT);

  let resp = call(
    &state,
    "POST",
    "/v1/projects/demo/collections/personal/query",
    Some(&token),
    Some(json!({})),
  )
  .await;
  assert_eq!(json_body(resp).await, json!([]));
}

#[test]
fn config_validation_rejects_blank_credentials() {
  let mut cfg = ServerConfig {
    host:            "127.0.0.1".into(),
    port:            8787,
    project_id:      "demo".into(),
    api_key:         String::new(),
    store_path:      PathBuf::from("padron.db"),
    token_ttl_hours: 12,
  };
  assert!(cfg.validate().is_err());
  cfg.api_key = "k".into();
  assert!(cfg.validate().is_ok());
  cfg.project_id = " ".into();
  assert!(cfg.validate().is_err());
  cfg.project_id = "demo".into();
  cfg.token_ttl_hours = 0;
  assert!(cfg.validate().is_err());
}
