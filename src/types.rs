//! Shared error and result types for Folio

use thiserror::Error;

/// Error kinds surfaced to callers
///
/// Every [`FolioError`] collapses onto one of these; the HTTP layer maps
/// kinds onto status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Conflict,
    InvalidArgument,
    Unauthorized,
    Timeout,
    Internal,
}

/// Errors produced by Folio
#[derive(Error, Debug)]
pub enum FolioError {
    /// Entity, collection or role absent
    #[error("Not found: {0}")]
    NotFound(String),

    /// Uniqueness violation
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Malformed identifier, filter value or request body
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Missing/invalid token or access denied
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Store call exceeded its deadline
    #[error("Timed out: {0}")]
    Timeout(String),

    /// Store or driver failure
    #[error("Database error: {0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl FolioError {
    /// Classify this error for the caller
    pub fn kind(&self) -> ErrorKind {
        match self {
            FolioError::NotFound(_) => ErrorKind::NotFound,
            FolioError::Conflict(_) => ErrorKind::Conflict,
            FolioError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            FolioError::Unauthorized(_) => ErrorKind::Unauthorized,
            FolioError::Timeout(_) => ErrorKind::Timeout,
            FolioError::Database(_)
            | FolioError::Config(_)
            | FolioError::Io(_)
            | FolioError::Internal(_) => ErrorKind::Internal,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }
}

impl From<bson::de::Error> for FolioError {
    fn from(e: bson::de::Error) -> Self {
        FolioError::Internal(format!("Failed to decode document: {e}"))
    }
}

impl From<bson::ser::Error> for FolioError {
    fn from(e: bson::ser::Error) -> Self {
        FolioError::InvalidArgument(format!("Failed to encode document: {e}"))
    }
}

pub type Result<T> = std::result::Result<T, FolioError>;
