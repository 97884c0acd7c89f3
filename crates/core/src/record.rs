use chrono::{DateTime, Utc};
use tokio::time::Instant;

use crate::types::{AssetId, AssetRef};

/// Metadata for one uploaded asset.
///
/// This is a point-in-time snapshot. The store owns the live copy and hands
/// out clones; `first_viewed_at` in a snapshot never changes once it is set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetRecord {
    /// Unique identifier, also the key in the store.
    pub id: AssetId,
    /// Handle to the stored bytes, released when the record is destroyed.
    pub asset_ref: AssetRef,
    /// Declared MIME type (e.g. `"image/png"`).
    pub media_kind: String,
    /// Monotonic upload time; drives the unviewed grace period.
    pub uploaded_at: Instant,
    /// Wall-clock upload time, for logs and status output only.
    pub created_at: DateTime<Utc>,
    /// Monotonic time of the first view, if any.
    pub first_viewed_at: Option<Instant>,
}

impl AssetRecord {
    /// Create an unviewed record stamped with the current time.
    #[must_use]
    pub fn new(id: AssetId, asset_ref: AssetRef, media_kind: impl Into<String>) -> Self {
        Self {
            id,
            asset_ref,
            media_kind: media_kind.into(),
            uploaded_at: Instant::now(),
            created_at: Utc::now(),
            first_viewed_at: None,
        }
    }

    /// Whether the record has been viewed at least once.
    pub fn is_viewed(&self) -> bool {
        self.first_viewed_at.is_some()
    }
}
