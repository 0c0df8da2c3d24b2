//! SQLite backend for the Padrón registry.
//!
//! One database file holds both halves of the hosted backend: the
//! schemaless document collections behind [`DocumentStore`] and the account
//! table behind sign-in. Everything goes through [`tokio_rusqlite`], so
//! database access runs on a dedicated thread without blocking the async
//! runtime.
//!
//! [`DocumentStore`]: padron_core::store::DocumentStore

mod accounts;
mod encode;
mod identity;
mod schema;
mod store;

pub mod error;

pub use accounts::{Account, NewAccount};
pub use error::{Error, Result};
pub use identity::LocalIdentity;
pub use store::{DEFAULT_TOKEN_TTL, SqliteStore};

#[cfg(test)]
mod tests;
