//! Error types shared by store backends.

use thiserror::Error;

/// Failure of a store backend.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The store could not be reached (transport failure or server error).
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// The store answered but refused the request (auth, schema, bad input).
    #[error("Store rejected request: {0}")]
    Rejected(String),

    /// A uniqueness constraint was violated.
    #[error("Record already exists: {0}")]
    Conflict(String),

    #[error("Malformed store record: {0}")]
    Malformed(String),

    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

impl StoreError {
    /// Whether the failure came from reaching the store rather than from the
    /// store refusing the request.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, StoreError::Unavailable(_))
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict(_))
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(error: serde_json::Error) -> Self {
        StoreError::Malformed(error.to_string())
    }
}

/// Result type alias for store operations
pub type Result<T> = std::result::Result<T, StoreError>;
