//! The in-memory asset metadata store.
//!
//! Records live in a [`DashMap`] (sharded locks for structural changes and
//! concurrent reads). Each record carries its own mutex guarding the
//! first-view cell, so first-view detection for one asset never serializes
//! behind views of another.
//!
//! Lock order is always map shard, then record. Paths that need the record
//! lock without a structural change clone the record's `Arc` and drop the
//! shard guard first. Asset bytes are released only after the record has left
//! the map, never while a lock is held.

use std::fmt;
use std::sync::{Arc, Weak};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use parking_lot::Mutex;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use ephemera_blob::AssetStore;
use ephemera_core::{AssetId, AssetRecord, AssetRef, LifecyclePolicy};

use crate::error::StoreError;
use crate::metrics::StoreMetrics;

/// Why a record is being removed. Used for logging and metrics only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalCause {
    /// The per-asset countdown armed on first view fired.
    Countdown,
    /// The periodic sweep found the asset unviewed past its grace period.
    Sweep,
    /// A read path observed the view window closed before the timer ran.
    Expired,
}

impl fmt::Display for RemovalCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Countdown => "countdown",
            Self::Sweep => "sweep",
            Self::Expired => "expired",
        })
    }
}

/// Result of [`EphemeralStore::mark_first_view`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirstView {
    /// `true` for exactly one caller per record: the one that started the
    /// countdown.
    pub is_first_view: bool,
    /// Snapshot taken under the record lock, with `first_viewed_at` set.
    pub record: AssetRecord,
}

/// Mutable part of a record, guarded by the record's own lock.
#[derive(Debug, Default)]
struct ViewCell {
    first_viewed_at: Option<Instant>,
    /// Set once the record has been taken out of the map. A viewer holding a
    /// stale `Arc` must not start a countdown on a removed record.
    reaped: bool,
}

/// A live record as held by the map.
#[derive(Debug)]
struct LiveRecord {
    id: AssetId,
    asset_ref: AssetRef,
    media_kind: String,
    uploaded_at: Instant,
    created_at: DateTime<Utc>,
    cell: Mutex<ViewCell>,
}

impl LiveRecord {
    fn snapshot_with(&self, first_viewed_at: Option<Instant>) -> AssetRecord {
        AssetRecord {
            id: self.id.clone(),
            asset_ref: self.asset_ref.clone(),
            media_kind: self.media_kind.clone(),
            uploaded_at: self.uploaded_at,
            created_at: self.created_at,
            first_viewed_at,
        }
    }

    fn snapshot(&self) -> AssetRecord {
        let first_viewed_at = self.cell.lock().first_viewed_at;
        self.snapshot_with(first_viewed_at)
    }
}

impl From<AssetRecord> for LiveRecord {
    fn from(record: AssetRecord) -> Self {
        Self {
            id: record.id,
            asset_ref: record.asset_ref,
            media_kind: record.media_kind,
            uploaded_at: record.uploaded_at,
            created_at: record.created_at,
            cell: Mutex::new(ViewCell {
                first_viewed_at: record.first_viewed_at,
                reaped: false,
            }),
        }
    }
}

struct Inner {
    records: DashMap<AssetId, Arc<LiveRecord>>,
    assets: Arc<dyn AssetStore>,
    policy: LifecyclePolicy,
    metrics: Arc<StoreMetrics>,
}

/// Concurrent store of live asset records.
///
/// Cheap to clone; clones share the same records.
#[derive(Clone)]
pub struct EphemeralStore {
    inner: Arc<Inner>,
}

impl fmt::Debug for EphemeralStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EphemeralStore")
            .field("records", &self.inner.records.len())
            .field("policy", &self.inner.policy)
            .finish_non_exhaustive()
    }
}

impl EphemeralStore {
    /// Create an empty store releasing asset bytes through `assets`.
    pub fn new(assets: Arc<dyn AssetStore>, policy: LifecyclePolicy) -> Self {
        Self::with_metrics(assets, policy, Arc::new(StoreMetrics::default()))
    }

    /// Create an empty store that reports into existing metrics.
    pub fn with_metrics(
        assets: Arc<dyn AssetStore>,
        policy: LifecyclePolicy,
        metrics: Arc<StoreMetrics>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                records: DashMap::new(),
                assets,
                policy,
                metrics,
            }),
        }
    }

    /// The lifecycle policy in force.
    pub fn policy(&self) -> &LifecyclePolicy {
        &self.inner.policy
    }

    /// Shared lifecycle counters.
    pub fn metrics(&self) -> &Arc<StoreMetrics> {
        &self.inner.metrics
    }

    /// Number of live records (including expired ones not yet reaped).
    pub fn len(&self) -> usize {
        self.inner.records.len()
    }

    /// Whether the store holds no records.
    pub fn is_empty(&self) -> bool {
        self.inner.records.is_empty()
    }

    /// Add a new record.
    ///
    /// Fails with [`StoreError::IdCollision`] if the identifier is live; the
    /// existing record is never overwritten.
    pub fn insert(&self, record: AssetRecord) -> Result<(), StoreError> {
        match self.inner.records.entry(record.id.clone()) {
            Entry::Occupied(_) => {
                self.inner.metrics.increment_id_collisions();
                error!(asset_id = %record.id, "refusing to overwrite live asset record");
                Err(StoreError::IdCollision(record.id))
            }
            Entry::Vacant(vacant) => {
                debug!(asset_id = %record.id, media_kind = %record.media_kind, "asset record inserted");
                vacant.insert(Arc::new(LiveRecord::from(record)));
                self.inner.metrics.increment_inserted();
                Ok(())
            }
        }
    }

    /// Consistent snapshot of a record, or `None` if absent.
    ///
    /// An expired record that has not been reaped yet is still returned;
    /// callers that serve content must check [`is_expired`](Self::is_expired).
    pub fn lookup(&self, id: &str) -> Option<AssetRecord> {
        self.inner.records.get(id).map(|live| live.snapshot())
    }

    /// Atomically detect the first view of a record.
    ///
    /// Under the record lock: if `first_viewed_at` is unset, set it to now,
    /// arm the one-shot countdown and report `is_first_view = true`.
    /// Otherwise return the unchanged record with `is_first_view = false`.
    /// Exactly one of any number of concurrent callers sees `true`.
    ///
    /// Must be called from within a Tokio runtime (the countdown is a spawned
    /// task).
    pub fn mark_first_view(&self, id: &str) -> Option<FirstView> {
        // Clone the Arc so the shard guard is released before the record lock.
        let live = self.inner.records.get(id).map(|r| Arc::clone(r.value()))?;

        let mut cell = live.cell.lock();
        if cell.reaped {
            return None;
        }

        let is_first_view = cell.first_viewed_at.is_none();
        if is_first_view {
            let viewed_at = Instant::now();
            cell.first_viewed_at = Some(viewed_at);
            self.arm_countdown(live.id.clone(), viewed_at);
            self.inner.metrics.increment_first_views();
            info!(
                asset_id = %live.id,
                view_seconds = self.inner.policy.view_duration.as_secs_f64(),
                "first view, countdown started"
            );
        } else {
            self.inner.metrics.increment_repeat_views();
        }

        let record = live.snapshot_with(cell.first_viewed_at);
        drop(cell);

        Some(FirstView {
            is_first_view,
            record,
        })
    }

    /// Whether `record`'s view window has closed as of now.
    pub fn is_expired(&self, record: &AssetRecord) -> bool {
        self.inner.policy.is_expired(record, Instant::now())
    }

    /// Remove a record and release its asset.
    ///
    /// Idempotent: returns `true` only for the call that actually removed the
    /// record; absent identifiers are a no-op.
    pub async fn remove(&self, id: &str, cause: RemovalCause) -> bool {
        let removed = self.inner.records.remove_if(id, |_, live| {
            live.cell.lock().reaped = true;
            true
        });
        let Some((_, live)) = removed else {
            return false;
        };
        self.release(&live, cause).await;
        true
    }

    /// Remove a record only if it is still unviewed and past its grace
    /// period.
    ///
    /// The check runs under the shard write lock and the record lock, so a
    /// view racing with the sweep either lands first (and the record stays)
    /// or observes the record as gone.
    pub async fn remove_if_unviewed_expired(&self, id: &str) -> bool {
        let policy = self.inner.policy;
        self.remove_where(id, RemovalCause::Sweep, |uploaded_at, first_viewed_at, now| {
            policy.unviewed_expired(uploaded_at, first_viewed_at, now)
        })
        .await
    }

    /// Remove a record only if its view window has closed.
    ///
    /// Used by read paths that observe an expired record before its countdown
    /// task has run.
    pub async fn reap_expired(&self, id: &str) -> bool {
        let policy = self.inner.policy;
        self.remove_where(id, RemovalCause::Expired, |_, first_viewed_at, now| {
            policy.view_expired(first_viewed_at, now)
        })
        .await
    }

    /// Identifiers of records currently eligible for the unviewed sweep.
    pub fn sweep_candidates(&self) -> Vec<AssetId> {
        let now = Instant::now();
        let policy = self.inner.policy;
        self.inner
            .records
            .iter()
            .filter(|entry| {
                let live = entry.value();
                let first_viewed_at = live.cell.lock().first_viewed_at;
                policy.unviewed_expired(live.uploaded_at, first_viewed_at, now)
            })
            .map(|entry| entry.key().clone())
            .collect()
    }

    async fn remove_where<F>(&self, id: &str, cause: RemovalCause, predicate: F) -> bool
    where
        F: Fn(Instant, Option<Instant>, Instant) -> bool,
    {
        let now = Instant::now();
        let removed = self.inner.records.remove_if(id, |_, live| {
            let mut cell = live.cell.lock();
            let eligible = predicate(live.uploaded_at, cell.first_viewed_at, now);
            if eligible {
                cell.reaped = true;
            }
            eligible
        });

        match removed {
            Some((_, live)) => {
                self.release(&live, cause).await;
                true
            }
            None => false,
        }
    }

    /// Release the asset of a record that has already left the map.
    ///
    /// Release failures are logged and counted; they never put the record
    /// back.
    async fn release(&self, live: &LiveRecord, cause: RemovalCause) {
        self.inner.metrics.increment_removed(cause);
        match self.inner.assets.release(&live.asset_ref).await {
            Ok(existed) => {
                info!(
                    asset_id = %live.id,
                    asset_ref = %live.asset_ref,
                    cause = %cause,
                    asset_existed = existed,
                    "asset removed"
                );
            }
            Err(e) => {
                self.inner.metrics.increment_release_failures();
                warn!(
                    asset_id = %live.id,
                    asset_ref = %live.asset_ref,
                    cause = %cause,
                    error = %e,
                    "asset record removed but releasing its bytes failed"
                );
            }
        }
    }

    /// Spawn the one-shot deletion for a record first viewed at `viewed_at`.
    ///
    /// The deadline is fixed from `viewed_at`, not from when the task is
    /// first polled. The task holds only a weak handle, so a dropped store is
    /// not kept alive by pending countdowns.
    fn arm_countdown(&self, id: AssetId, viewed_at: Instant) {
        let inner: Weak<Inner> = Arc::downgrade(&self.inner);
        let deadline = viewed_at + self.inner.policy.view_duration;
        tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            if let Some(inner) = inner.upgrade() {
                let store = EphemeralStore { inner };
                if !store.remove(&id, RemovalCause::Countdown).await {
                    debug!(asset_id = %id, "countdown fired for an already removed asset");
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::time::Duration;

    use async_trait::async_trait;
    use bytes::Bytes;
    use ephemera_blob::{AssetError, MemoryAssetStore};
    use tokio::sync::Barrier;

    use super::*;

    fn policy() -> LifecyclePolicy {
        LifecyclePolicy::new(
            Duration::from_secs(300),
            Duration::from_secs(300),
            Duration::from_secs(30),
        )
    }

    fn store() -> (EphemeralStore, Arc<MemoryAssetStore>) {
        let assets = Arc::new(MemoryAssetStore::new());
        let store = EphemeralStore::new(Arc::clone(&assets) as Arc<dyn AssetStore>, policy());
        (store, assets)
    }

    async fn insert(store: &EphemeralStore, assets: &MemoryAssetStore, id: &str) -> AssetRecord {
        let id = AssetId::new(id);
        let asset = assets
            .put(&id, "cat.png", "image/png", Bytes::from_static(b"png"))
            .await
            .unwrap();
        let record = AssetRecord::new(id, asset, "image/png");
        store.insert(record.clone()).unwrap();
        record
    }

    /// Let spawned countdown tasks run after the paused clock moved.
    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    /// Asset backend whose releases always fail.
    struct BrokenAssets;

    #[async_trait]
    impl AssetStore for BrokenAssets {
        async fn put(
            &self,
            id: &AssetId,
            _filename: &str,
            _content_type: &str,
            _data: Bytes,
        ) -> Result<AssetRef, AssetError> {
            Ok(AssetRef::new(format!("broken://{id}")))
        }

        async fn read(&self, asset: &AssetRef) -> Result<Bytes, AssetError> {
            Err(AssetError::NotFound(asset.to_string()))
        }

        async fn release(&self, _asset: &AssetRef) -> Result<bool, AssetError> {
            Err(AssetError::Storage("disk on fire".into()))
        }
    }

    #[tokio::test]
    async fn insert_and_lookup() {
        let (store, assets) = store();
        let record = insert(&store, &assets, "a1").await;

        let found = store.lookup("a1").expect("record should be live");
        assert_eq!(found, record);
        assert!(store.lookup("missing").is_none());
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn insert_refuses_to_overwrite() {
        let (store, assets) = store();
        let original = insert(&store, &assets, "dup").await;

        let impostor = AssetRecord::new(AssetId::new("dup"), AssetRef::new("mem://other"), "image/gif");
        let err = store.insert(impostor).unwrap_err();
        assert!(matches!(err, StoreError::IdCollision(ref id) if id.as_str() == "dup"));

        assert_eq!(store.lookup("dup").unwrap().asset_ref, original.asset_ref);
        assert_eq!(store.metrics().snapshot().id_collisions, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn mark_first_view_sets_once() {
        let (store, assets) = store();
        insert(&store, &assets, "v1").await;

        let first = store.mark_first_view("v1").unwrap();
        assert!(first.is_first_view);
        let viewed_at = first.record.first_viewed_at.expect("timestamp set");

        tokio::time::advance(Duration::from_secs(5)).await;

        let second = store.mark_first_view("v1").unwrap();
        assert!(!second.is_first_view);
        assert_eq!(second.record.first_viewed_at, Some(viewed_at));

        let snap = store.metrics().snapshot();
        assert_eq!(snap.first_views, 1);
        assert_eq!(snap.repeat_views, 1);
    }

    #[tokio::test]
    async fn mark_first_view_on_missing_is_none() {
        let (store, _assets) = store();
        assert!(store.mark_first_view("nope").is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn concurrent_first_view_has_exactly_one_winner() {
        const CALLERS: usize = 64;

        let (store, assets) = store();
        insert(&store, &assets, "race").await;

        let barrier = Arc::new(Barrier::new(CALLERS));
        let mut handles = Vec::with_capacity(CALLERS);
        for _ in 0..CALLERS {
            let store = store.clone();
            let barrier = Arc::clone(&barrier);
            handles.push(tokio::spawn(async move {
                barrier.wait().await;
                store.mark_first_view("race").expect("record is live")
            }));
        }

        let mut winners = 0;
        let mut timestamps = HashSet::new();
        for h in handles {
            let view = h.await.expect("task should not panic");
            if view.is_first_view {
                winners += 1;
            }
            timestamps.insert(view.record.first_viewed_at.expect("timestamp set"));
        }

        assert_eq!(winners, 1, "exactly one caller observes the first view");
        assert_eq!(timestamps.len(), 1, "all callers agree on the first-view instant");
    }

    #[tokio::test(start_paused = true)]
    async fn two_viewers_share_the_winning_timestamp() {
        let (store, assets) = store();
        insert(&store, &assets, "pair").await;

        let a = store.clone();
        let b = store.clone();
        let (left, right) = tokio::join!(
            async move { a.mark_first_view("pair").unwrap() },
            async move { b.mark_first_view("pair").unwrap() },
        );

        assert_ne!(left.is_first_view, right.is_first_view);
        assert_eq!(left.record.first_viewed_at, right.record.first_viewed_at);
    }

    #[tokio::test(start_paused = true)]
    async fn countdown_removes_record_after_view_duration() {
        let (store, assets) = store();
        let record = insert(&store, &assets, "b").await;

        tokio::time::advance(Duration::from_secs(60)).await;
        let view = store.mark_first_view("b").unwrap();
        assert!(view.is_first_view);

        tokio::time::advance(Duration::from_secs(29)).await;
        settle().await;
        let current = store.lookup("b").expect("still live at 1m29s");
        assert!(!store.is_expired(&current));

        tokio::time::advance(Duration::from_secs(2)).await;
        settle().await;
        assert!(store.is_expired(&view.record), "expired at 1m31s");
        assert!(store.lookup("b").is_none(), "countdown removed the record");
        assert!(!assets.contains(&record.asset_ref), "asset bytes released");
        assert_eq!(store.metrics().snapshot().removed_countdown, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn countdown_deadline_is_fixed_at_first_view() {
        let (store, assets) = store();
        insert(&store, &assets, "late-poll").await;

        store.mark_first_view("late-poll").unwrap();
        // The timer task gets its first poll only after the whole window.
        tokio::time::advance(Duration::from_secs(31)).await;
        settle().await;

        assert!(store.lookup("late-poll").is_none());
        assert_eq!(store.metrics().snapshot().removed_countdown, 1);
    }

    #[tokio::test]
    async fn remove_is_idempotent() {
        let (store, assets) = store();
        let record = insert(&store, &assets, "gone").await;

        assert!(store.remove("gone", RemovalCause::Countdown).await);
        assert!(!store.remove("gone", RemovalCause::Countdown).await);
        assert!(!store.remove("never-existed", RemovalCause::Countdown).await);

        assert!(store.lookup("gone").is_none());
        assert!(!assets.contains(&record.asset_ref));
        assert_eq!(store.metrics().snapshot().removed_countdown, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn late_countdown_after_reap_is_noop() {
        let (store, assets) = store();
        insert(&store, &assets, "early").await;

        store.mark_first_view("early").unwrap();
        // Taken out before the timer task ever runs.
        assert!(store.remove("early", RemovalCause::Expired).await);

        tokio::time::advance(Duration::from_secs(31)).await;
        settle().await;

        let snap = store.metrics().snapshot();
        assert_eq!(snap.removed_expired, 1);
        assert_eq!(snap.removed_countdown, 0, "late timer must not count a removal");
    }

    #[tokio::test(start_paused = true)]
    async fn removed_record_cannot_start_a_countdown() {
        let (store, assets) = store();
        insert(&store, &assets, "stale").await;

        // Hold a handle the way a viewer would between lookup and lock.
        let live = store.inner.records.get("stale").map(|r| Arc::clone(r.value())).unwrap();
        store.remove("stale", RemovalCause::Countdown).await;

        assert!(live.cell.lock().reaped);
        assert!(store.mark_first_view("stale").is_none());
    }

    #[tokio::test]
    async fn release_failure_still_removes_record() {
        let store = EphemeralStore::new(Arc::new(BrokenAssets), policy());
        store
            .insert(AssetRecord::new(
                AssetId::new("x"),
                AssetRef::new("broken://x"),
                "image/png",
            ))
            .unwrap();

        assert!(store.remove("x", RemovalCause::Countdown).await);
        assert!(store.lookup("x").is_none());
        assert_eq!(store.metrics().snapshot().release_failures, 1);
    }

    /// Insert a record that already carries a first-view time, without
    /// arming a countdown, so expiry paths can be driven by the clock alone.
    fn insert_viewed(store: &EphemeralStore, id: &str) {
        let mut record = AssetRecord::new(AssetId::new(id), AssetRef::new(format!("mem://{id}")), "image/png");
        record.first_viewed_at = Some(Instant::now());
        store.insert(record).unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn conditional_sweep_removal_respects_views() {
        let (store, assets) = store();
        insert(&store, &assets, "old-unviewed").await;
        insert_viewed(&store, "old-viewed");

        tokio::time::advance(Duration::from_secs(301)).await;

        assert_eq!(store.sweep_candidates(), vec![AssetId::new("old-unviewed")]);
        assert!(store.remove_if_unviewed_expired("old-unviewed").await);
        assert!(!store.remove_if_unviewed_expired("old-viewed").await);
        assert!(!store.remove_if_unviewed_expired("old-unviewed").await);
        assert!(store.lookup("old-viewed").is_some());
        assert_eq!(store.metrics().snapshot().removed_sweep, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn sweep_removal_skips_young_records() {
        let (store, assets) = store();
        insert(&store, &assets, "young").await;

        tokio::time::advance(Duration::from_secs(299)).await;
        assert!(store.sweep_candidates().is_empty());
        assert!(!store.remove_if_unviewed_expired("young").await);
        assert!(store.lookup("young").is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn reap_expired_only_after_view_window() {
        let (store, assets) = store();
        insert_viewed(&store, "r");
        insert(&store, &assets, "unviewed").await;

        tokio::time::advance(Duration::from_secs(30)).await;
        assert!(!store.reap_expired("r").await, "window is inclusive of its end");
        assert!(!store.reap_expired("unviewed").await);
        assert!(!store.reap_expired("missing").await);

        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(store.reap_expired("r").await);
        assert!(store.lookup("r").is_none());
        assert!(store.lookup("unviewed").is_some());
        assert_eq!(store.metrics().snapshot().removed_expired, 1);
    }
}
