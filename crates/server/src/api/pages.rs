//! HTML pages: upload form, share link, countdown and expired.

use axum::extract::{Multipart, Path, State};
use axum::http::header::{CACHE_CONTROL, HOST};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use bytes::Bytes;
use tracing::{info, warn};

use ephemera_core::{AssetId, ViewState};

use super::AppState;
use crate::error::ServerError;
use crate::templates::{
    EXPIRED_PAGE, SHARE_PAGE, ShareContext, UPLOAD_PAGE, VIEW_PAGE, ViewContext,
};
use crate::thumbnail;

/// Multipart field carrying the image.
const IMAGE_FIELD: &str = "image";

/// Raster formats accepted for upload. Anything else could be rendered by a
/// browser as active content when served back from `/img`.
const ACCEPTED_TYPES: &[&str] = &[
    "image/png",
    "image/jpeg",
    "image/gif",
    "image/webp",
    "image/bmp",
];

/// Normalize a declared content type and check it against [`ACCEPTED_TYPES`].
fn accepted_media_kind(content_type: &str) -> Result<String, ServerError> {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    if ACCEPTED_TYPES.contains(&essence.as_str()) {
        Ok(essence)
    } else {
        Err(ServerError::UnsupportedMediaType(content_type.to_owned()))
    }
}

/// `GET /` -- the upload form.
pub async fn home(State(state): State<AppState>) -> Result<Html<String>, ServerError> {
    Ok(Html(
        state.templates.render(UPLOAD_PAGE, minijinja::context! {})?,
    ))
}

/// A file pulled out of the upload form.
struct UploadedFile {
    filename: String,
    content_type: String,
    data: Bytes,
}

async fn read_image_field(multipart: &mut Multipart) -> Result<UploadedFile, ServerError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_owned();
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_owned();
        let data = field.bytes().await?;
        return Ok(UploadedFile {
            filename,
            content_type,
            data,
        });
    }
    Err(ServerError::BadRequest(format!(
        "missing form field '{IMAGE_FIELD}'"
    )))
}

/// Build the public link for a freshly uploaded asset.
fn share_link(external_url: Option<&str>, headers: &HeaderMap, id: &AssetId) -> String {
    let base = match external_url {
        Some(url) => url.trim_end_matches('/').to_owned(),
        None => {
            let host = headers
                .get(HOST)
                .and_then(|h| h.to_str().ok())
                .unwrap_or("localhost");
            format!("http://{host}")
        }
    };
    format!("{base}/view/{id}")
}

/// `POST /upload` -- store the image and show its share link.
pub async fn upload(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<Html<String>, ServerError> {
    let file = read_image_field(&mut multipart).await?;
    let media_kind = accepted_media_kind(&file.content_type)?;
    let size = file.data.len();

    let id = state.service.allocate_id()?;
    // Fails without touching anything if the target is already taken.
    let asset_ref = state
        .assets
        .put(&id, &file.filename, &media_kind, file.data.clone())
        .await?;

    if let Err(e) = state
        .service
        .register(id.clone(), &media_kind, asset_ref.clone())
    {
        // These bytes were written by this request and the record was
        // refused, so nothing else will ever release them.
        if let Err(release_err) = state.assets.release(&asset_ref).await {
            warn!(asset_id = %id, error = %release_err, "failed to release orphaned upload");
        }
        return Err(e.into());
    }

    info!(asset_id = %id, size, media_kind = %media_kind, "upload stored");

    let preview = preview(&id, file.data, media_kind).await;
    let policy = state.service.store().policy();
    let link = share_link(state.external_url.as_deref(), &headers, &id);
    let page = state.templates.render(
        SHARE_PAGE,
        ShareContext {
            link: &link,
            thumbnail: preview.as_deref(),
            view_seconds: policy.view_duration.as_secs(),
            unviewed_minutes: policy.unviewed_expiry.as_secs().div_ceil(60),
        },
    )?;
    Ok(Html(page))
}

/// Share-page preview. A failure only costs the preview.
async fn preview(id: &AssetId, data: Bytes, media_kind: String) -> Option<String> {
    let result =
        tokio::task::spawn_blocking(move || thumbnail::data_uri(&data, &media_kind)).await;
    match result {
        Ok(Ok(uri)) => Some(uri),
        Ok(Err(e)) => {
            warn!(asset_id = %id, error = %e, "could not create thumbnail");
            None
        }
        Err(e) => {
            warn!(asset_id = %id, error = %e, "thumbnail task failed");
            None
        }
    }
}

/// `GET /view/{id}` -- countdown page, or the expired page.
///
/// The first request for an identifier starts its countdown. Unknown and
/// expired identifiers render the same page.
pub async fn view(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ServerError> {
    let view_state = state.service.on_view_request(&id).await;

    let Some(remaining) = view_state.remaining() else {
        let page = state
            .templates
            .render(EXPIRED_PAGE, minijinja::context! {})?;
        return Ok((StatusCode::GONE, Html(page)).into_response());
    };

    let image_url = format!("/img/{id}");
    let page = state.templates.render(
        VIEW_PAGE,
        ViewContext {
            image_url: &image_url,
            duration: state.service.view_duration().as_secs_f64(),
            time_remaining: remaining.as_secs_f64(),
            first_view: matches!(view_state, ViewState::FirstView { .. }),
        },
    )?;

    Ok((
        StatusCode::OK,
        [(CACHE_CONTROL, "no-store")],
        Html(page),
    )
        .into_response())
}
