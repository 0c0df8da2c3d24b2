//! Handlers for the document routes.
//!
//! Collection names in paths are the stored names (`personal`, `zonas`);
//! anything else is rejected with `invalid-argument`.

use std::str::FromStr as _;

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use padron_core::{
  store::{Collection, DocumentStore as _, Fields, Query, StoredDocument},
  wire::Batch,
};

use crate::{AppState, auth::Caller, error::ApiError};

fn collection(name: &str) -> Result<Collection, ApiError> {
  Collection::from_str(name).map_err(|_| ApiError::UnknownCollection(name.to_owned()))
}

// ─── Add ─────────────────────────────────────────────────────────────────────

/// `POST /collections/{collection}/documents`
pub async fn add(
  State(state): State<AppState>,
  caller: Caller,
  Path((_project, name)): Path<(String, String)>,
  Json(fields): Json<Fields>,
) -> Result<impl IntoResponse, ApiError> {
  let collection = collection(&name)?;
  let doc = state.store.add(collection, fields).await?;
  tracing::debug!(%collection, id = %doc.id, uid = %caller.session.uid, "document added");
  Ok((StatusCode::CREATED, Json(doc)))
}

// ─── Query ───────────────────────────────────────────────────────────────────

/// `POST /collections/{collection}/query`
pub async fn query(
  State(state): State<AppState>,
  _caller: Caller,
  Path((_project, name)): Path<(String, String)>,
  Json(query): Json<Query>,
) -> Result<Json<Vec<StoredDocument>>, ApiError> {
  let collection = collection(&name)?;
  Ok(Json(state.store.query(collection, &query).await?))
}

// ─── Single document ─────────────────────────────────────────────────────────

/// `GET /collections/{collection}/documents/{id}`
pub async fn get_one(
  State(state): State<AppState>,
  _caller: Caller,
  Path((_project, name, id)): Path<(String, String, String)>,
) -> Result<Json<StoredDocument>, ApiError> {
  let collection = collection(&name)?;
  state
    .store
    .get(collection, &id)
    .await?
    .map(Json)
    .ok_or(ApiError::DocumentNotFound(id))
}

/// `PATCH /collections/{collection}/documents/{id}`: shallow merge.
pub async fn update(
  State(state): State<AppState>,
  caller: Caller,
  Path((_project, name, id)): Path<(String, String, String)>,
  Json(fields): Json<Fields>,
) -> Result<Json<StoredDocument>, ApiError> {
  let collection = collection(&name)?;
  let doc = state.store.update(collection, &id, fields).await?;
  tracing::debug!(%collection, %id, uid = %caller.session.uid, "document updated");
  Ok(Json(doc))
}

/// `DELETE /collections/{collection}/documents/{id}`
pub async fn delete(
  State(state): State<AppState>,
  caller: Caller,
  Path((_project, name, id)): Path<(String, String, String)>,
) -> Result<StatusCode, ApiError> {
  let collection = collection(&name)?;
  state.store.delete(collection, &id).await?;
  tracing::info!(%collection, %id, uid = %caller.session.uid, "document deleted");
  Ok(StatusCode::NO_CONTENT)
}

// ─── Batch ───────────────────────────────────────────────────────────────────

/// `POST /batch`
pub async fn batch(
  State(state): State<AppState>,
  caller: Caller,
  Json(batch): Json<Batch>,
) -> Result<StatusCode, ApiError> {
  let count = batch.ops.len();
  state.store.commit(batch.ops).await?;
  tracing::info!(count, uid = %caller.session.uid, "batch committed");
  Ok(StatusCode::NO_CONTENT)
}
