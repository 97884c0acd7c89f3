//! Filesystem-backed asset storage.
//!
//! Originals live flat under a single upload directory as `{id}-{filename}`.
//! The asset reference is the file path itself.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use ephemera_core::{AssetId, AssetRef};

use crate::error::AssetError;
use crate::store::AssetStore;

/// Name used when the client supplies no usable filename.
const FALLBACK_FILENAME: &str = "upload";

/// [`AssetStore`] writing each asset to a file under `root`.
#[derive(Debug, Clone)]
pub struct FsAssetStore {
    root: PathBuf,
    max_bytes: Option<u64>,
}

impl FsAssetStore {
    /// Open (creating if needed) an asset directory.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self, AssetError> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await?;
        Ok(Self {
            root,
            max_bytes: None,
        })
    }

    /// Reject assets larger than `limit` bytes.
    #[must_use]
    pub fn with_max_bytes(mut self, limit: u64) -> Self {
        self.max_bytes = Some(limit);
        self
    }

    /// Directory holding the stored files.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map an asset reference back to a path, refusing anything outside `root`.
    fn resolve(&self, asset: &AssetRef) -> Result<PathBuf, AssetError> {
        let path = PathBuf::from(asset.as_str());
        if path.parent() != Some(self.root.as_path()) {
            return Err(AssetError::InvalidRef(asset.to_string()));
        }
        Ok(path)
    }
}

/// Reduce a client-supplied filename to its final component.
fn sanitize_filename(filename: &str) -> &str {
    // Clients on Windows send backslash-separated paths.
    let last = filename.rsplit(['/', '\\']).next().unwrap_or_default();
    match last.trim() {
        "" | "." | ".." => FALLBACK_FILENAME,
        name => name,
    }
}

async fn write_all(file: &mut tokio::fs::File, data: &[u8]) -> std::io::Result<()> {
    file.write_all(data).await?;
    file.flush().await
}

#[async_trait]
impl AssetStore for FsAssetStore {
    async fn put(
        &self,
        id: &AssetId,
        filename: &str,
        _content_type: &str,
        data: Bytes,
    ) -> Result<AssetRef, AssetError> {
        let size = data.len() as u64;
        if let Some(limit) = self.max_bytes
            && size > limit
        {
            return Err(AssetError::TooLarge { size, limit });
        }

        let path = self
            .root
            .join(format!("{id}-{}", sanitize_filename(filename)));
        let mut file = match tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
        {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(AssetError::AlreadyExists(path.display().to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        if let Err(e) = write_all(&mut file, &data).await {
            // Do not leave a truncated file behind.
            let _ = tokio::fs::remove_file(&path).await;
            return Err(e.into());
        }
        debug!(asset_id = %id, path = %path.display(), size, "asset written");

        Ok(AssetRef::new(path.to_string_lossy().into_owned()))
    }

    async fn read(&self, asset: &AssetRef) -> Result<Bytes, AssetError> {
        let path = self.resolve(asset)?;
        match tokio::fs::read(&path).await {
            Ok(data) => Ok(Bytes::from(data)),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(AssetError::NotFound(asset.to_string())),
            Err(e) => Err(e.into()),
        }
    }

    async fn release(&self, asset: &AssetRef) -> Result<bool, AssetError> {
        let path = self.resolve(asset)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}
