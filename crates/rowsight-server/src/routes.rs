//! Route handlers for the extraction service.

use axum::extract::{Multipart, State};
use axum::response::Html;
use axum::Json;
use tokio_util::sync::CancellationToken;
use tracing::info;

use rowsight_core::{run_batch, BatchResult, DocumentUpload};

use crate::error::ApiError;
use crate::AppState;

/// Minimal upload form, served at `/` for manual use.
pub async fn index() -> Html<&'static str> {
    Html(include_str!("../assets/index.html"))
}

/// `POST /extract`: accept one or more PDF uploads under the `file` field
/// and run them through the extraction pipeline as a single batch.
pub async fn extract(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<BatchResult>, ApiError> {
    let mut documents: Vec<DocumentUpload> = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| ApiError::BadRequest(format!("unreadable multipart body: {}", err)))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let name = field.file_name().unwrap_or_default().to_string();
        if name.is_empty() {
            return Err(ApiError::BadRequest(
                "uploaded file has an empty filename".to_string(),
            ));
        }

        let bytes = field
            .bytes()
            .await
            .map_err(|err| ApiError::BadRequest(format!("failed to read upload {}: {}", name, err)))?;

        documents.push(DocumentUpload {
            name,
            bytes: bytes.to_vec(),
        });
    }

    if documents.is_empty() {
        return Err(ApiError::BadRequest("no file uploaded".to_string()));
    }

    info!(documents = documents.len(), "starting extraction batch");

    let cancel = CancellationToken::new();
    let result = run_batch(
        documents,
        state.rasterizer.clone(),
        &state.backends,
        &state.schema,
        &cancel,
    )
    .await;

    Ok(Json(result))
}
