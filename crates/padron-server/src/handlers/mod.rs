//! axum handlers, one module per route group.

pub mod documents;
pub mod identity;
