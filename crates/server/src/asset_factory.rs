use std::sync::Arc;

use ephemera_blob::{AssetStore, FsAssetStore, MemoryAssetStore};
use tracing::info;

use crate::config::StorageConfig;
use crate::error::ServerError;

/// Create the asset store selected by `[storage] backend`.
pub async fn create_asset_store(config: &StorageConfig) -> Result<Arc<dyn AssetStore>, ServerError> {
    let store: Arc<dyn AssetStore> = match config.backend.as_str() {
        "fs" => {
            let store = FsAssetStore::open(&config.upload_dir)
                .await
                .map_err(|e| ServerError::Config(format!("upload_dir {}: {e}", config.upload_dir)))?
                .with_max_bytes(config.max_upload_bytes as u64);
            info!(upload_dir = %store.root().display(), "using filesystem asset store");
            Arc::new(store)
        }
        "memory" => {
            info!("using in-memory asset store");
            Arc::new(MemoryAssetStore::new())
        }
        other => {
            return Err(ServerError::Config(format!(
                "unknown storage backend '{other}', expected 'fs' or 'memory'"
            )));
        }
    };
    Ok(store)
}
