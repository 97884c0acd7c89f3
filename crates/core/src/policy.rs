//! Self-destruct policy for uploaded assets.
//!
//! An asset moves through three states:
//!
//! ```text
//! Uploaded --first view--> Viewing --view_duration elapsed--> Gone
//!    |                                                         ^
//!    +------------- unviewed_expiry elapsed (sweep) -----------+
//! ```
//!
//! The functions here are pure: they take the relevant timestamps and a `now`
//! and never touch the store. Both the store's countdown and the periodic
//! sweep consult them.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::record::AssetRecord;

/// Externally visible lifecycle state of an asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    /// Uploaded and never viewed.
    Uploaded,
    /// Viewed; the countdown is running.
    Viewing,
    /// Absent, or expired and awaiting removal.
    Gone,
}

/// Durations that drive asset expiry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LifecyclePolicy {
    /// How often the sweep scans for unviewed assets.
    pub cleanup_interval: Duration,
    /// How long an unviewed asset may live.
    pub unviewed_expiry: Duration,
    /// How long an asset remains viewable after its first view.
    pub view_duration: Duration,
}

impl Default for LifecyclePolicy {
    fn default() -> Self {
        Self {
            cleanup_interval: Self::DEFAULT_CLEANUP_INTERVAL,
            unviewed_expiry: Self::DEFAULT_UNVIEWED_EXPIRY,
            view_duration: Self::DEFAULT_VIEW_DURATION,
        }
    }
}

impl LifecyclePolicy {
    pub const DEFAULT_CLEANUP_INTERVAL: Duration = Duration::from_secs(5 * 60);
    pub const DEFAULT_UNVIEWED_EXPIRY: Duration = Duration::from_secs(5 * 60);
    pub const DEFAULT_VIEW_DURATION: Duration = Duration::from_secs(30);

    /// Create a policy from explicit durations.
    #[must_use]
    pub fn new(
        cleanup_interval: Duration,
        unviewed_expiry: Duration,
        view_duration: Duration,
    ) -> Self {
        Self {
            cleanup_interval,
            unviewed_expiry,
            view_duration,
        }
    }

    /// `true` once more than `view_duration` has passed since the first view.
    ///
    /// An unviewed asset is never expired by this rule.
    pub fn view_expired(&self, first_viewed_at: Option<Instant>, now: Instant) -> bool {
        first_viewed_at.is_some_and(|viewed| now.saturating_duration_since(viewed) > self.view_duration)
    }

    /// `true` for an unviewed asset older than `unviewed_expiry`.
    ///
    /// Viewed assets are never eligible, whatever their age.
    pub fn unviewed_expired(
        &self,
        uploaded_at: Instant,
        first_viewed_at: Option<Instant>,
        now: Instant,
    ) -> bool {
        first_viewed_at.is_none() && now.saturating_duration_since(uploaded_at) > self.unviewed_expiry
    }

    /// Record-level form of [`view_expired`](Self::view_expired).
    pub fn is_expired(&self, record: &AssetRecord, now: Instant) -> bool {
        self.view_expired(record.first_viewed_at, now)
    }

    /// Record-level form of [`unviewed_expired`](Self::unviewed_expired).
    pub fn should_sweep(&self, record: &AssetRecord, now: Instant) -> bool {
        self.unviewed_expired(record.uploaded_at, record.first_viewed_at, now)
    }

    /// Classify a (possibly absent) record.
    ///
    /// An expired record that has not been physically removed yet is already
    /// [`LifecycleState::Gone`]. An unviewed record past its grace period is
    /// still `Uploaded` until the sweep removes it.
    pub fn state(&self, record: Option<&AssetRecord>, now: Instant) -> LifecycleState {
        match record {
            None => LifecycleState::Gone,
            Some(r) if self.is_expired(r, now) => LifecycleState::Gone,
            Some(r) if r.is_viewed() => LifecycleState::Viewing,
            Some(_) => LifecycleState::Uploaded,
        }
    }

    /// Time left in the view window.
    ///
    /// Saturates at zero; an unviewed asset reports the full window.
    pub fn remaining(&self, record: &AssetRecord, now: Instant) -> Duration {
        match record.first_viewed_at {
            Some(viewed) => self
                .view_duration
                .saturating_sub(now.saturating_duration_since(viewed)),
            None => self.view_duration,
        }
    }
}
