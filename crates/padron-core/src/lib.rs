//! Core types and trait definitions for the Padrón personnel registry.
//!
//! This crate is free of HTTP and database dependencies. It holds the
//! record types, the validation schemas, the list-view pipeline and the two
//! backend seams ([`store::DocumentStore`] and [`identity::IdentityProvider`])
//! that every other crate builds on.

pub mod error;
pub mod identity;
pub mod listing;
pub mod personnel;
pub mod session;
pub mod store;
pub mod validate;
pub mod wire;
pub mod zone;

pub use error::{Error, Result};
