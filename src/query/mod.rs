//! Query translation
//!
//! Turns flat HTTP query parameters into store filter documents.

mod filter;

pub use filter::{translate, FieldRegistry, FilterField, FilterKind, QueryParams};
