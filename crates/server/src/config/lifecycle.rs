use std::time::Duration;

use serde::Deserialize;

use ephemera_core::LifecyclePolicy;

use crate::error::ServerError;

/// Expiry timings, in seconds.
#[derive(Debug, Deserialize)]
pub struct LifecycleConfig {
    /// How often the sweep looks for unviewed uploads (default: 300).
    #[serde(default = "default_cleanup_interval")]
    pub cleanup_interval_seconds: u64,
    /// How long an upload may sit unviewed (default: 300).
    #[serde(default = "default_unviewed_expiry")]
    pub unviewed_expiry_seconds: u64,
    /// How long an upload stays viewable after its first view (default: 30).
    #[serde(default = "default_view_duration")]
    pub view_duration_seconds: u64,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            cleanup_interval_seconds: default_cleanup_interval(),
            unviewed_expiry_seconds: default_unviewed_expiry(),
            view_duration_seconds: default_view_duration(),
        }
    }
}

impl LifecycleConfig {
    /// The policy these settings describe.
    pub fn policy(&self) -> LifecyclePolicy {
        LifecyclePolicy::new(
            Duration::from_secs(self.cleanup_interval_seconds),
            Duration::from_secs(self.unviewed_expiry_seconds),
            Duration::from_secs(self.view_duration_seconds),
        )
    }

    pub(crate) fn validate(&self) -> Result<(), ServerError> {
        for (name, value) in [
            ("cleanup_interval_seconds", self.cleanup_interval_seconds),
            ("unviewed_expiry_seconds", self.unviewed_expiry_seconds),
            ("view_duration_seconds", self.view_duration_seconds),
        ] {
            if value == 0 {
                return Err(ServerError::Config(format!(
                    "[lifecycle] {name} must be greater than zero"
                )));
            }
        }
        Ok(())
    }
}

fn default_cleanup_interval() -> u64 {
    LifecyclePolicy::DEFAULT_CLEANUP_INTERVAL.as_secs()
}

fn default_unviewed_expiry() -> u64 {
    LifecyclePolicy::DEFAULT_UNVIEWED_EXPIRY.as_secs()
}

fn default_view_duration() -> u64 {
    LifecyclePolicy::DEFAULT_VIEW_DURATION.as_secs()
}
