//! Folio - headless content backend
//!
//! Folio stores user-defined content types and their entries in MongoDB
//! and serves them over a JSON REST API. Writes are gated by the roles
//! each content type grants per HTTP method.
//!
//! ## Modules
//!
//! - **db**: document store trait, MongoDB and in-memory backends, schemas
//! - **query**: query-string to store filter translation
//! - **auth**: password hashing, JWTs, role-based access checks
//! - **services**: role, content type, content and user registries
//! - **routes**: HTTP handlers and the response envelope

pub mod auth;
pub mod config;
pub mod db;
pub mod query;
pub mod routes;
pub mod server;
pub mod services;
pub mod types;

pub use config::Args;
pub use server::{run, AppState};
pub use types::{FolioError, Result};
