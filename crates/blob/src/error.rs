use thiserror::Error;

/// Errors that can occur during asset storage operations.
#[derive(Debug, Error)]
pub enum AssetError {
    /// The requested asset was not found.
    #[error("asset not found: {0}")]
    NotFound(String),

    /// The asset exceeds the maximum allowed size.
    #[error("asset too large: {size} bytes exceeds limit of {limit} bytes")]
    TooLarge {
        /// Actual size.
        size: u64,
        /// Maximum allowed size.
        limit: u64,
    },

    /// Something is already stored at the target location.
    #[error("asset already exists: {0}")]
    AlreadyExists(String),

    /// The asset reference does not belong to this store.
    #[error("invalid asset reference: {0}")]
    InvalidRef(String),

    /// A storage backend error occurred.
    #[error("asset storage error: {0}")]
    Storage(String),
}

impl From<std::io::Error> for AssetError {
    fn from(e: std::io::Error) -> Self {
        Self::Storage(e.to_string())
    }
}
