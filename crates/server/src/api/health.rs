use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;

use super::AppState;
use super::schemas::HealthResponse;

/// `GET /health` -- returns service status together with a metrics snapshot.
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let store = state.service.store();

    let body = HealthResponse {
        status: "ok".into(),
        live_assets: store.len(),
        view_duration_seconds: state.service.view_duration().as_secs(),
        metrics: store.metrics().snapshot(),
    };

    (StatusCode::OK, Json(body))
}
