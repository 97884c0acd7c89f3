//! Lifecycle entry points used by the HTTP layer.
//!
//! The service owns no state of its own beyond the store and the identifier
//! source. It turns raw store results into [`ViewState`] values so handlers
//! only have to pick a page.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info};

use ephemera_core::{AssetId, AssetRecord, AssetRef, IdGenerator, RandomIdGenerator, ViewState};

use crate::error::ServiceError;
use crate::store::{EphemeralStore, RemovalCause};

/// Upload, view and asset-fetch logic on top of an [`EphemeralStore`].
#[derive(Clone)]
pub struct LifecycleService {
    store: EphemeralStore,
    ids: Arc<dyn IdGenerator>,
}

impl std::fmt::Debug for LifecycleService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LifecycleService")
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}

impl LifecycleService {
    /// Service generating identifiers from the OS random source.
    pub fn new(store: EphemeralStore) -> Self {
        Self::with_id_generator(store, Arc::new(RandomIdGenerator::new()))
    }

    /// Service with a caller-supplied identifier source.
    pub fn with_id_generator(store: EphemeralStore, ids: Arc<dyn IdGenerator>) -> Self {
        Self { store, ids }
    }

    /// The underlying store.
    pub fn store(&self) -> &EphemeralStore {
        &self.store
    }

    /// Configured view window.
    pub fn view_duration(&self) -> Duration {
        self.store.policy().view_duration
    }

    /// Draw a fresh identifier for an upload about to be written.
    pub fn allocate_id(&self) -> Result<AssetId, ServiceError> {
        Ok(self.ids.generate()?)
    }

    /// Record an asset whose bytes are already stored under `asset_ref`.
    ///
    /// On collision nothing is overwritten and the caller still owns the
    /// stored bytes.
    pub fn register(
        &self,
        id: AssetId,
        media_kind: &str,
        asset_ref: AssetRef,
    ) -> Result<AssetRecord, ServiceError> {
        let record = AssetRecord::new(id, asset_ref, media_kind);
        self.store.insert(record.clone())?;
        info!(asset_id = %record.id, media_kind, "asset uploaded");
        Ok(record)
    }

    /// Allocate an identifier and register an already stored asset under it.
    pub fn on_upload(&self, media_kind: &str, asset_ref: AssetRef) -> Result<AssetId, ServiceError> {
        let id = self.allocate_id()?;
        self.register(id, media_kind, asset_ref).map(|record| record.id)
    }

    /// Handle a request for the view page of `id`.
    ///
    /// The first call for a live record starts its countdown. A record whose
    /// window has already closed is reaped on the spot and reported as
    /// [`ViewState::Expired`].
    pub async fn on_view_request(&self, id: &str) -> ViewState {
        let Some(view) = self.store.mark_first_view(id) else {
            debug!(asset_id = id, "view request for unknown asset");
            return ViewState::NotFound;
        };

        let now = Instant::now();
        let policy = self.store.policy();
        if policy.is_expired(&view.record, now) {
            self.store.reap_expired(id).await;
            return ViewState::Expired;
        }

        let remaining = policy.remaining(&view.record, now);
        if view.is_first_view {
            ViewState::FirstView { remaining }
        } else {
            ViewState::Continuing { remaining }
        }
    }

    /// Handle a request for the raw asset of `id`.
    ///
    /// Returns the record only while it may be served. Expired records are
    /// reaped and reported as absent, so the bytes are never served after the
    /// window closes even if the countdown task is late. Never starts a
    /// countdown.
    pub async fn on_asset_request(&self, id: &str) -> Option<AssetRecord> {
        let record = self.store.lookup(id)?;
        if self.store.is_expired(&record) {
            if self.store.reap_expired(id).await {
                debug!(asset_id = id, cause = %RemovalCause::Expired, "expired asset reaped on fetch");
            }
            return None;
        }
        Some(record)
    }
}
