//! HTTP front end for the Rowsight extraction core.
//!
//! Exposes a single `POST /extract` endpoint taking multipart PDF uploads,
//! plus a static upload page at `/`. All extraction behavior lives in
//! `rowsight-core`; this crate only adapts it to HTTP.

pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use rowsight_core::{Rasterizer, TableBackend, TableSchema};

/// Uploads larger than this are rejected before they reach a handler.
pub const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Shared per-process state handed to every request.
#[derive(Clone)]
pub struct AppState {
    pub schema: Arc<TableSchema>,
    pub backends: Vec<Arc<dyn TableBackend>>,
    pub rasterizer: Arc<dyn Rasterizer>,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(routes::index))
        .route("/extract", post(routes::extract))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
