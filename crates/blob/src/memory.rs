use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use ephemera_core::{AssetId, AssetRef};

use crate::error::AssetError;
use crate::store::AssetStore;

/// In-memory [`AssetStore`] backed by a [`DashMap`].
///
/// Nothing survives a restart, which matches the metadata store. Useful for
/// tests and for deployments that do not want originals on disk.
#[derive(Debug, Default)]
pub struct MemoryAssetStore {
    blobs: DashMap<String, Bytes>,
}

impl MemoryAssetStore {
    /// Create a new, empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of assets currently held.
    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    /// Whether the store holds no assets.
    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }

    /// Whether the bytes behind `asset` are still held.
    pub fn contains(&self, asset: &AssetRef) -> bool {
        self.blobs.contains_key(asset.as_str())
    }
}

#[async_trait]
impl AssetStore for MemoryAssetStore {
    async fn put(
        &self,
        id: &AssetId,
        filename: &str,
        _content_type: &str,
        data: Bytes,
    ) -> Result<AssetRef, AssetError> {
        let key = format!("mem://{id}/{filename}");
        match self.blobs.entry(key.clone()) {
            Entry::Occupied(_) => Err(AssetError::AlreadyExists(key)),
            Entry::Vacant(vacant) => {
                vacant.insert(data);
                Ok(AssetRef::new(key))
            }
        }
    }

    async fn read(&self, asset: &AssetRef) -> Result<Bytes, AssetError> {
        self.blobs
            .get(asset.as_str())
            .map(|entry| entry.value().clone())
            .ok_or_else(|| AssetError::NotFound(asset.to_string()))
    }

    async fn release(&self, asset: &AssetRef) -> Result<bool, AssetError> {
        Ok(self.blobs.remove(asset.as_str()).is_some())
    }
}
