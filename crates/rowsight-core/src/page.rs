//! Page processor: drives one page through the ordered backend chain.
//!
//! Backends are attempted strictly in order. The first `Success` wins, even
//! with zero rows - an empty-but-successful answer means "no table on this
//! page", not "try the next backend". Only a `Failure` advances the chain.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::backend::{BackendOutcome, TableBackend};
use crate::raster::PageImage;
use crate::schema::{Row, TableSchema};

/// Outcome of processing one page against the backend chain.
#[derive(Debug)]
pub struct PageResult {
    pub rows: Vec<Row>,
    /// Name of the backend that succeeded, if any.
    pub backend_used: Option<&'static str>,
    /// True when every configured backend failed for this page.
    pub failed: bool,
}

pub async fn process_page(
    image: &PageImage,
    backends: &[Arc<dyn TableBackend>],
    schema: &TableSchema,
) -> PageResult {
    for backend in backends {
        match backend.extract(image, schema).await {
            BackendOutcome::Success(rows) => {
                debug!(
                    doc = %image.document_name,
                    page = image.page_index,
                    backend = backend.name(),
                    rows = rows.len(),
                    "page extracted"
                );
                return PageResult {
                    rows,
                    backend_used: Some(backend.name()),
                    failed: false,
                };
            }
            BackendOutcome::Failure(reason) => {
                warn!(
                    doc = %image.document_name,
                    page = image.page_index,
                    backend = backend.name(),
                    %reason,
                    "backend failed for page"
                );
            }
        }
    }

    // All backends exhausted: the page contributes nothing, which is a
    // reportable outcome rather than an error.
    PageResult {
        rows: Vec::new(),
        backend_used: None,
        failed: true,
    }
}
