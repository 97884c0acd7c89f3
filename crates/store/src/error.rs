use thiserror::Error;

use ephemera_core::{AssetId, CoreError};

/// Errors from structural store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The identifier is already taken by a live record.
    ///
    /// With 128-bit random identifiers this indicates a broken generator; the
    /// existing record is left untouched.
    #[error("asset id collision: {0}")]
    IdCollision(AssetId),
}

/// Errors from the lifecycle service entry points.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The identifier generator failed.
    #[error(transparent)]
    Id(#[from] CoreError),

    /// The store refused the record.
    #[error(transparent)]
    Store(#[from] StoreError),
}
