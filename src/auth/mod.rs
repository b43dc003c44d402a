//! Authentication and authorization for Folio
//!
//! Provides:
//! - JWT token generation and validation
//! - Password hashing with Argon2
//! - The access gate deciding who may call what

pub mod gate;
pub mod jwt;
pub mod password;

pub use gate::{AccessGate, Caller};
pub use jwt::{extract_token_from_header, Claims, JwtValidator, TokenInput, TokenValidationResult};
pub use password::{hash_password, verify_password};
