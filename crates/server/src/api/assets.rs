use axum::extract::{Path, State};
use axum::http::header::{CACHE_CONTROL, CONTENT_TYPE, X_CONTENT_TYPE_OPTIONS};
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use tracing::debug;

use ephemera_blob::AssetError;

use super::AppState;
use crate::error::ServerError;

/// `GET /img/{id}` -- raw bytes of a viewable asset.
///
/// Never starts a countdown. Unknown and expired identifiers are both 404.
pub async fn image(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ServerError> {
    let record = state
        .service
        .on_asset_request(&id)
        .await
        .ok_or(ServerError::NotFound)?;

    let data = match state.assets.read(&record.asset_ref).await {
        Ok(data) => data,
        // Removed between the lookup and the read.
        Err(AssetError::NotFound(_)) => {
            debug!(asset_id = %id, "asset bytes vanished during fetch");
            return Err(ServerError::NotFound);
        }
        Err(e) => return Err(e.into()),
    };

    let content_type = HeaderValue::from_str(&record.media_kind)
        .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"));

    Ok((
        StatusCode::OK,
        [
            (CONTENT_TYPE, content_type),
            (CACHE_CONTROL, HeaderValue::from_static("no-store")),
            (X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff")),
        ],
        data,
    )
        .into_response())
}
