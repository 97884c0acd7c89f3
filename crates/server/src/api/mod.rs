pub mod assets;
pub mod health;
pub mod pages;
pub mod schemas;

use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use ephemera_blob::AssetStore;
use ephemera_store::LifecycleService;

use crate::templates::Templates;

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Upload, view and fetch logic.
    pub service: LifecycleService,
    /// Where the original bytes live.
    pub assets: Arc<dyn AssetStore>,
    /// Compiled page templates.
    pub templates: Arc<Templates>,
    /// Base URL for share links. `None` derives it from the `Host` header.
    pub external_url: Option<String>,
    /// Largest accepted request body, in bytes.
    pub max_upload_bytes: usize,
}

/// Build the Axum router with all routes and middleware.
pub fn router(state: AppState) -> Router {
    let body_limit = state.max_upload_bytes;

    Router::new()
        .route("/", get(pages::home))
        .route("/upload", post(pages::upload))
        .route("/view/{id}", get(pages::view))
        .route("/img/{id}", get(assets::image))
        .route("/health", get(health::health))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
