//! Error types for `padron-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("no validation schema named {0:?}")]
  UnknownSchema(String),

  #[error("document {id} in {collection} is malformed: {source}")]
  MalformedDocument {
    collection: &'static str,
    id:         String,
    #[source]
    source:     serde_json::Error,
  },

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
