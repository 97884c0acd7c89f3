use async_trait::async_trait;
use bytes::Bytes;

use ephemera_core::{AssetId, AssetRef};

use crate::error::AssetError;

/// Storage backend for the original bytes of uploaded assets.
///
/// The metadata store never touches bytes directly: it holds the returned
/// [`AssetRef`] and calls [`release`](Self::release) once the record is gone.
#[async_trait]
pub trait AssetStore: Send + Sync {
    /// Store the bytes of a new asset and return a handle to them.
    ///
    /// Never overwrites: if the target is already occupied the call fails
    /// with [`AssetError::AlreadyExists`] and the existing bytes are left as
    /// they are.
    async fn put(
        &self,
        id: &AssetId,
        filename: &str,
        content_type: &str,
        data: Bytes,
    ) -> Result<AssetRef, AssetError>;

    /// Read the full contents of an asset.
    async fn read(&self, asset: &AssetRef) -> Result<Bytes, AssetError>;

    /// Release the bytes behind `asset`. Returns `true` if they existed.
    ///
    /// Releasing an asset that is already gone is `Ok(false)`, not an error.
    async fn release(&self, asset: &AssetRef) -> Result<bool, AssetError>;
}
