use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::error;

use ephemera_blob::AssetError;
use ephemera_store::ServiceError;

/// Errors that can occur when running the Ephemera server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// A configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// An I/O error (e.g. binding the listener).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The request was malformed.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// The upload is not an accepted image type.
    #[error("unsupported media type: {0}")]
    UnsupportedMediaType(String),

    /// The multipart body could not be read.
    #[error("could not read upload: {0}")]
    Multipart(#[from] MultipartError),

    /// Unknown or expired asset.
    #[error("not found")]
    NotFound,

    /// The asset backend failed.
    #[error("asset storage error: {0}")]
    Asset(#[from] AssetError),

    /// The lifecycle service refused the operation.
    #[error("lifecycle error: {0}")]
    Lifecycle(#[from] ServiceError),

    /// A page template failed to render.
    #[error("template error: {0}")]
    Template(#[from] minijinja::Error),
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::UnsupportedMediaType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Self::Multipart(e) => e.status(),
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Asset(AssetError::TooLarge { .. }) => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Asset(AssetError::NotFound(_)) => StatusCode::NOT_FOUND,
            Self::Config(_)
            | Self::Io(_)
            | Self::Asset(_)
            | Self::Lifecycle(_)
            | Self::Template(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            error!(error = %self, "request failed");
        }

        let body = serde_json::json!({ "error": self.to_string() });
        (status, axum::Json(body)).into_response()
    }
}
