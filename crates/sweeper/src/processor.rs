use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{Instant, interval_at};
use tracing::{debug, info};

use ephemera_store::EphemeralStore;

/// Configuration for the sweep processor.
#[derive(Debug, Clone)]
pub struct SweepConfig {
    /// Time between sweeps (default: 300 seconds). The first sweep runs one
    /// full interval after start.
    pub interval: Duration,
    /// Whether sweeping is enabled (default: true). A disabled processor only
    /// waits for shutdown.
    pub enabled: bool,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(300),
            enabled: true,
        }
    }
}

/// Outcome of one sweep cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Records that looked eligible when the snapshot was taken.
    pub candidates: usize,
    /// Records actually removed.
    pub removed: usize,
    /// Candidates that were viewed or removed by someone else in between.
    pub skipped: usize,
}

/// Periodically removes unviewed assets past their grace period.
pub struct SweepProcessor {
    config: SweepConfig,
    store: EphemeralStore,
    shutdown_rx: mpsc::Receiver<()>,
}

impl SweepProcessor {
    /// Create a new sweep processor.
    pub fn new(config: SweepConfig, store: EphemeralStore, shutdown_rx: mpsc::Receiver<()>) -> Self {
        Self {
            config,
            store,
            shutdown_rx,
        }
    }

    /// Run one sweep over the store.
    ///
    /// Candidates are snapshotted first and each is then removed through the
    /// store's conditional removal, which re-checks eligibility under the
    /// record lock. A view that lands between snapshot and removal keeps the
    /// record alive.
    pub async fn sweep_once(&self) -> SweepReport {
        let candidates = self.store.sweep_candidates();
        let mut report = SweepReport {
            candidates: candidates.len(),
            ..SweepReport::default()
        };

        for id in &candidates {
            if self.store.remove_if_unviewed_expired(id).await {
                report.removed += 1;
            } else {
                debug!(asset_id = %id, "sweep candidate no longer eligible");
                report.skipped += 1;
            }
        }

        if report.removed > 0 {
            info!(
                removed = report.removed,
                skipped = report.skipped,
                remaining = self.store.len(),
                "sweep cycle complete"
            );
        }
        report
    }

    /// Run the processor until shutdown is signaled.
    pub async fn run(&mut self) {
        info!(
            interval_seconds = self.config.interval.as_secs_f64(),
            enabled = self.config.enabled,
            "sweep processor starting"
        );

        let mut sweep_interval = interval_at(Instant::now() + self.config.interval, self.config.interval);

        loop {
            tokio::select! {
                _ = self.shutdown_rx.recv() => {
                    info!("sweep processor received shutdown signal");
                    break;
                }
                _ = sweep_interval.tick(), if self.config.enabled => {
                    self.sweep_once().await;
                }
            }
        }

        info!("sweep processor stopped");
    }
}

/// Builder for creating a sweep processor.
#[derive(Default)]
pub struct SweepProcessorBuilder {
    config: SweepConfig,
    store: Option<EphemeralStore>,
}

impl SweepProcessorBuilder {
    /// Create a new builder with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the configuration.
    #[must_use]
    pub fn config(mut self, config: SweepConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the store to sweep.
    #[must_use]
    pub fn store(mut self, store: EphemeralStore) -> Self {
        self.store = Some(store);
        self
    }

    /// Build the sweep processor.
    ///
    /// Returns the processor and a shutdown sender.
    pub fn build(self) -> Result<(SweepProcessor, mpsc::Sender<()>), &'static str> {
        let store = self.store.ok_or("store is required")?;
        if self.config.interval.is_zero() {
            return Err("sweep interval must be greater than zero");
        }

        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        Ok((SweepProcessor::new(self.config, store, shutdown_rx), shutdown_tx))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use bytes::Bytes;
    use ephemera_blob::{AssetError, AssetStore, MemoryAssetStore};
    use ephemera_core::{AssetId, AssetRecord, AssetRef, LifecyclePolicy};

    use super::*;

    const MINUTE: Duration = Duration::from_secs(60);

    fn store() -> (EphemeralStore, Arc<MemoryAssetStore>) {
        let assets = Arc::new(MemoryAssetStore::new());
        let policy = LifecyclePolicy::new(MINUTE, 5 * MINUTE, Duration::from_secs(30));
        let store = EphemeralStore::new(Arc::clone(&assets) as Arc<dyn AssetStore>, policy);
        (store, assets)
    }

    async fn upload(store: &EphemeralStore, assets: &MemoryAssetStore, id: &str) -> AssetRef {
        let id = AssetId::new(id);
        let asset = assets
            .put(&id, "cat.png", "image/png", Bytes::from_static(b"png"))
            .await
            .unwrap();
        store
            .insert(AssetRecord::new(id, asset.clone(), "image/png"))
            .unwrap();
        asset
    }

    fn processor(store: &EphemeralStore) -> (SweepProcessor, mpsc::Sender<()>) {
        SweepProcessorBuilder::new()
            .config(SweepConfig {
                interval: MINUTE,
                enabled: true,
            })
            .store(store.clone())
            .build()
            .unwrap()
    }

    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn unviewed_asset_removed_after_grace_period() {
        let (store, assets) = store();
        let asset = upload(&store, &assets, "a").await;
        let (processor, _tx) = processor(&store);

        tokio::time::advance(5 * MINUTE).await;
        assert_eq!(processor.sweep_once().await.removed, 0, "exactly 5m is not past the grace period");
        assert!(store.lookup("a").is_some());

        tokio::time::advance(Duration::from_secs(1)).await;
        let report = processor.sweep_once().await;
        assert_eq!(
            report,
            SweepReport {
                candidates: 1,
                removed: 1,
                skipped: 0
            }
        );
        assert!(store.lookup("a").is_none());
        assert!(!assets.contains(&asset));
        assert_eq!(store.metrics().snapshot().removed_sweep, 1);
    }

    /// Backend that accepts writes but can never delete.
    struct ReadOnlyAssets;

    #[async_trait]
    impl AssetStore for ReadOnlyAssets {
        async fn put(
            &self,
            id: &AssetId,
            _filename: &str,
            _content_type: &str,
            _data: Bytes,
        ) -> Result<AssetRef, AssetError> {
            Ok(AssetRef::new(format!("ro://{id}")))
        }

        async fn read(&self, asset: &AssetRef) -> Result<Bytes, AssetError> {
            Err(AssetError::NotFound(asset.to_string()))
        }

        async fn release(&self, _asset: &AssetRef) -> Result<bool, AssetError> {
            Err(AssetError::Storage("read-only file system".into()))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn release_failure_does_not_stop_the_sweep() {
        let policy = LifecyclePolicy::new(MINUTE, 5 * MINUTE, Duration::from_secs(30));
        let store = EphemeralStore::new(Arc::new(ReadOnlyAssets), policy);
        for id in ["first", "second"] {
            store
                .insert(AssetRecord::new(
                    AssetId::new(id),
                    AssetRef::new(format!("ro://{id}")),
                    "image/png",
                ))
                .unwrap();
        }
        let (processor, _tx) = processor(&store);

        tokio::time::advance(6 * MINUTE).await;
        let report = processor.sweep_once().await;

        assert_eq!(report.removed, 2);
        assert!(store.is_empty());
        assert_eq!(store.metrics().snapshot().release_failures, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn sweep_never_deletes_viewed_assets() {
        let (store, assets) = store();
        upload(&store, &assets, "unviewed").await;

        // Viewed long ago, with no countdown armed, so only the sweep could
        // touch it.
        let mut viewed = AssetRecord::new(AssetId::new("viewed"), AssetRef::new("mem://viewed"), "image/png");
        viewed.first_viewed_at = Some(Instant::now());
        store.insert(viewed).unwrap();

        let (processor, _tx) = processor(&store);
        tokio::time::advance(60 * MINUTE).await;

        let report = processor.sweep_once().await;
        assert_eq!(report.removed, 1);
        assert!(store.lookup("viewed").is_some());
        assert!(store.lookup("unviewed").is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn young_assets_survive() {
        let (store, assets) = store();
        upload(&store, &assets, "young").await;
        let (processor, _tx) = processor(&store);

        tokio::time::advance(4 * MINUTE).await;
        assert_eq!(processor.sweep_once().await, SweepReport::default());
        assert_eq!(store.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn run_loop_sweeps_on_interval_and_stops_on_shutdown() {
        let (store, assets) = store();
        upload(&store, &assets, "a").await;
        let (mut processor, tx) = processor(&store);
        let handle = tokio::spawn(async move { processor.run().await });
        settle().await;

        // Ticks at 1m..5m find nothing eligible.
        for _ in 0..5 {
            tokio::time::advance(MINUTE).await;
            settle().await;
        }
        assert!(store.lookup("a").is_some());

        // The 6m tick is past the 5m grace period.
        tokio::time::advance(MINUTE).await;
        settle().await;
        assert!(store.lookup("a").is_none());

        tx.send(()).await.unwrap();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn disabled_processor_only_waits_for_shutdown() {
        let (store, assets) = store();
        upload(&store, &assets, "a").await;
        let (mut processor, tx) = SweepProcessorBuilder::new()
            .config(SweepConfig {
                interval: MINUTE,
                enabled: false,
            })
            .store(store.clone())
            .build()
            .unwrap();
        let handle = tokio::spawn(async move { processor.run().await });

        for _ in 0..10 {
            tokio::time::advance(MINUTE).await;
            settle().await;
        }
        assert!(store.lookup("a").is_some());

        tx.send(()).await.unwrap();
        handle.await.unwrap();
    }

    #[test]
    fn builder_requires_store_and_positive_interval() {
        assert!(SweepProcessorBuilder::new().build().is_err());

        let assets: Arc<dyn AssetStore> = Arc::new(MemoryAssetStore::new());
        let store = EphemeralStore::new(assets, LifecyclePolicy::default());
        let result = SweepProcessorBuilder::new()
            .config(SweepConfig {
                interval: Duration::ZERO,
                enabled: true,
            })
            .store(store)
            .build();
        assert!(result.is_err());
    }
}
