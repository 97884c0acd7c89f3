use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use crate::store::RemovalCause;

/// Atomic counters tracking asset lifecycle events.
///
/// All counters use relaxed ordering. For a consistent point-in-time view,
/// call [`snapshot`](Self::snapshot).
#[derive(Debug, Default)]
pub struct StoreMetrics {
    /// Records inserted.
    pub inserted: AtomicU64,
    /// Inserts refused because the identifier was already live.
    pub id_collisions: AtomicU64,
    /// View requests that started a countdown.
    pub first_views: AtomicU64,
    /// View requests on an already running countdown.
    pub repeat_views: AtomicU64,
    /// Records removed by their countdown timer.
    pub removed_countdown: AtomicU64,
    /// Records removed by the unviewed sweep.
    pub removed_sweep: AtomicU64,
    /// Expired records reaped by a read path before their timer fired.
    pub removed_expired: AtomicU64,
    /// Asset releases that failed (the record was removed regardless).
    pub release_failures: AtomicU64,
}

impl StoreMetrics {
    /// Increment the inserted counter.
    pub fn increment_inserted(&self) {
        self.inserted.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment the id collision counter.
    pub fn increment_id_collisions(&self) {
        self.id_collisions.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment the first view counter.
    pub fn increment_first_views(&self) {
        self.first_views.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment the repeat view counter.
    pub fn increment_repeat_views(&self) {
        self.repeat_views.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment the removal counter matching `cause`.
    pub fn increment_removed(&self, cause: RemovalCause) {
        let counter = match cause {
            RemovalCause::Countdown => &self.removed_countdown,
            RemovalCause::Sweep => &self.removed_sweep,
            RemovalCause::Expired => &self.removed_expired,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment the release failure counter.
    pub fn increment_release_failures(&self) {
        self.release_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Take a point-in-time snapshot of all counters.
    pub fn snapshot(&self) -> StoreMetricsSnapshot {
        StoreMetricsSnapshot {
            inserted: self.inserted.load(Ordering::Relaxed),
            id_collisions: self.id_collisions.load(Ordering::Relaxed),
            first_views: self.first_views.load(Ordering::Relaxed),
            repeat_views: self.repeat_views.load(Ordering::Relaxed),
            removed_countdown: self.removed_countdown.load(Ordering::Relaxed),
            removed_sweep: self.removed_sweep.load(Ordering::Relaxed),
            removed_expired: self.removed_expired.load(Ordering::Relaxed),
            release_failures: self.release_failures.load(Ordering::Relaxed),
        }
    }
}

/// A plain data snapshot of [`StoreMetrics`] at a point in time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StoreMetricsSnapshot {
    pub inserted: u64,
    pub id_collisions: u64,
    pub first_views: u64,
    pub repeat_views: u64,
    pub removed_countdown: u64,
    pub removed_sweep: u64,
    pub removed_expired: u64,
    pub release_failures: u64,
}
