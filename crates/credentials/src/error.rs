//! Error types for credential operations

/// Errors from the password hasher and the user store.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("username already exists: {0}")]
    DuplicateUsername(String),

    #[error("password hashing failed: {0}")]
    Hash(String),

    #[error("invalid user record: {0}")]
    InvalidRecord(String),
}

/// Result alias for credential operations.
pub type Result<T> = std::result::Result<T, Error>;
