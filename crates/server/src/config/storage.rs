use serde::Deserialize;

use crate::error::ServerError;

/// Asset storage configuration.
#[derive(Debug, Deserialize)]
pub struct StorageConfig {
    /// Backend: `"fs"` (files under `upload_dir`) or `"memory"`.
    #[serde(default = "default_backend")]
    pub backend: String,
    /// Directory for uploaded originals when `backend = "fs"`.
    #[serde(default = "default_upload_dir")]
    pub upload_dir: String,
    /// Largest accepted upload request, in bytes (default: 10 MiB).
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            upload_dir: default_upload_dir(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

impl StorageConfig {
    pub(crate) fn validate(&self) -> Result<(), ServerError> {
        if self.max_upload_bytes == 0 {
            return Err(ServerError::Config(
                "[storage] max_upload_bytes must be greater than zero".into(),
            ));
        }
        if self.backend == "fs" && self.upload_dir.trim().is_empty() {
            return Err(ServerError::Config(
                "[storage] upload_dir is required for the fs backend".into(),
            ));
        }
        Ok(())
    }
}

fn default_backend() -> String {
    "fs".to_owned()
}

fn default_upload_dir() -> String {
    "uploaded-img".to_owned()
}

fn default_max_upload_bytes() -> usize {
    10 * 1024 * 1024
}
