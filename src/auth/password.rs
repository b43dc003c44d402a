//! Argon2id password hashing
//!
//! Hashes are PHC strings carrying their own salt and parameters, so stored
//! hashes stay verifiable if the defaults change.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

use crate::types::{FolioError, Result};

/// Hash a plaintext password for storage
pub fn hash_password(password: &str) -> Result<String> {
    if password.is_empty() {
        return Err(FolioError::InvalidArgument("password must not be empty".into()));
    }
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| FolioError::Internal(format!("password hashing failed: {e}")))
}

/// Check a plaintext password against a stored hash
///
/// A corrupt stored hash is an internal error, not a mismatch.
pub fn verify_password(password: &str, stored: &str) -> Result<bool> {
    let parsed = PasswordHash::new(stored)
        .map_err(|e| FolioError::Internal(format!("stored password hash unreadable: {e}")))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}
