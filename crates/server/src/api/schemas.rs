use serde::Serialize;

use ephemera_store::StoreMetricsSnapshot;

/// Body of `GET /health`.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Always `"ok"` while the server is answering.
    pub status: String,
    /// Records currently held (including expired ones not yet reaped).
    pub live_assets: usize,
    /// Configured view window, in seconds.
    pub view_duration_seconds: u64,
    /// Lifecycle counters since startup.
    pub metrics: StoreMetricsSnapshot,
}
