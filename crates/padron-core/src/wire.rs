//! Request and response bodies of the `padron-server` HTTP surface, shared
//! by the server and its clients.

use serde::{Deserialize, Serialize};

use crate::{session::Session, store::BatchOp};

/// Header carrying the project's API key on every request.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Path prefix of every route for `project`.
pub fn project_prefix(project: &str) -> String { format!("/v1/projects/{project}") }

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
  pub email:    String,
  pub password: String,
}

/// Returned by sign-in and password change. The token goes in
/// `Authorization: Bearer <token>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedIn {
  pub token:   String,
  pub session: Session,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasswordResetRequest {
  pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordChange {
  pub current_password: String,
  pub new_password:     String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Batch {
  pub ops: Vec<BatchOp>,
}

/// Body of every non-2xx response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
  pub code:  String,
  pub error: String,
}
