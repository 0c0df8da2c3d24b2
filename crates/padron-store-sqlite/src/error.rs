//! Error type for `padron-store-sqlite`.

use padron_core::store::{BackendError, code};
use rusqlite::ErrorCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] padron_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  #[error("document {id} not found in {collection}")]
  DocumentNotFound { collection: &'static str, id: String },

  /// Field names must be plain identifiers to be used in a JSON path.
  #[error("invalid field name {0:?}")]
  InvalidField(String),

  #[error("an account already exists for {0}")]
  EmailInUse(String),

  #[error("no account for {0}")]
  UnknownAccount(String),

  #[error("wrong password")]
  WrongPassword,

  #[error("account {0} is disabled")]
  AccountDisabled(String),

  #[error("invalid or revoked token")]
  InvalidToken,

  #[error("not signed in")]
  NotSignedIn,

  #[error("password hashing failed: {0}")]
  PasswordHash(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl From<argon2::password_hash::Error> for Error {
  fn from(e: argon2::password_hash::Error) -> Self { Self::PasswordHash(e.to_string()) }
}

fn database_code(e: &tokio_rusqlite::Error) -> &'static str {
  match e {
    tokio_rusqlite::Error::Rusqlite(rusqlite::Error::SqliteFailure(f, _))
      if f.code == ErrorCode::ConstraintViolation =>
    {
      code::FAILED_PRECONDITION
    }
    _ => code::UNAVAILABLE,
  }
}

impl BackendError for Error {
  fn code(&self) -> Option<&str> {
    Some(match self {
      Self::Database(e) => database_code(e),
      Self::DocumentNotFound { .. } => code::NOT_FOUND,
      Self::InvalidField(_) => code::INVALID_ARGUMENT,
      Self::EmailInUse(_) => code::AUTH_EMAIL_IN_USE,
      Self::UnknownAccount(_) => code::AUTH_USER_NOT_FOUND,
      Self::WrongPassword => code::AUTH_WRONG_PASSWORD,
      Self::AccountDisabled(_) => code::AUTH_USER_DISABLED,
      Self::InvalidToken | Self::NotSignedIn => code::UNAUTHENTICATED,
      Self::Core(_) | Self::Json(_) | Self::DateParse(_) | Self::PasswordHash(_) => {
        return None;
      }
    })
  }
}
