//! Batch orchestrator: drives a multi-document upload end to end.
//!
//! Documents are processed sequentially in submission order. Each document
//! is rasterized and its pages run through the backend chain; rows are
//! concatenated in submission-then-page order. A document that cannot be
//! rasterized (or whose processing task dies) is recorded with the failure
//! sentinel and the batch moves on - one document can never abort the rest.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::backend::TableBackend;
use crate::page::process_page;
use crate::raster::Rasterizer;
use crate::schema::{Row, TableSchema};

/// Wire encoding of the failed-document progress sentinel.
pub const PROGRESS_FAILED_SENTINEL: i32 = -1;

/// One uploaded document, owned by a single batch run.
#[derive(Debug, Clone)]
pub struct DocumentUpload {
    pub name: String,
    pub bytes: Vec<u8>,
}

/// Per-document completion status.
///
/// Encodes on the wire as the completion percentage, or `-1` for a document
/// that failed before its pages could be processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "i32", try_from = "i32")]
pub enum Progress {
    /// Percentage of the batch complete once this document finished, 0..=100.
    Complete(u8),
    Failed,
}

impl From<Progress> for i32 {
    fn from(progress: Progress) -> Self {
        match progress {
            Progress::Complete(percent) => i32::from(percent),
            Progress::Failed => PROGRESS_FAILED_SENTINEL,
        }
    }
}

impl TryFrom<i32> for Progress {
    type Error = String;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            PROGRESS_FAILED_SENTINEL => Ok(Progress::Failed),
            0..=100 => Ok(Progress::Complete(value as u8)),
            other => Err(format!("progress out of range: {}", other)),
        }
    }
}

/// Per-document status marker, one per submitted document in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEntry {
    pub file: String,
    pub progress: Progress,
}

/// The sole output of a batch run: all rows plus the per-document report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResult {
    #[serde(rename = "table_data")]
    pub rows: Vec<Row>,
    #[serde(rename = "file_progress")]
    pub progress: Vec<ProgressEntry>,
}

/// Process every document in submission order and aggregate the results.
///
/// The cancellation token is checked between documents; documents skipped
/// by a cancellation are reported with the failure sentinel so the
/// one-entry-per-document invariant always holds.
pub async fn run_batch(
    documents: Vec<DocumentUpload>,
    rasterizer: Arc<dyn Rasterizer>,
    backends: &[Arc<dyn TableBackend>],
    schema: &TableSchema,
    cancel: &CancellationToken,
) -> BatchResult {
    let total = documents.len();
    let mut row_groups: Vec<Vec<Row>> = Vec::with_capacity(total);
    let mut progress: Vec<ProgressEntry> = Vec::with_capacity(total);

    for (index, document) in documents.into_iter().enumerate() {
        let name = document.name;

        if cancel.is_cancelled() {
            warn!(doc = %name, "batch cancelled; skipping remaining document");
            progress.push(ProgressEntry {
                file: name,
                progress: Progress::Failed,
            });
            continue;
        }

        let rendered = {
            let rasterizer = Arc::clone(&rasterizer);
            let name = name.clone();
            let bytes = document.bytes;
            tokio::task::spawn_blocking(move || rasterizer.render(&name, &bytes)).await
        };

        let pages = match rendered {
            Ok(Ok(pages)) => pages,
            Ok(Err(err)) => {
                warn!(doc = %name, error = %err, "rasterization failed; document skipped");
                progress.push(ProgressEntry {
                    file: name,
                    progress: Progress::Failed,
                });
                continue;
            }
            Err(join_err) => {
                error!(doc = %name, error = %join_err, "rasterization task died; document skipped");
                progress.push(ProgressEntry {
                    file: name,
                    progress: Progress::Failed,
                });
                continue;
            }
        };

        let mut document_rows: Vec<Row> = Vec::new();
        let mut failed_pages = 0usize;
        let page_count = pages.len();

        for page in &pages {
            let result = process_page(page, backends, schema).await;
            if result.failed {
                failed_pages += 1;
            }
            document_rows.extend(result.rows);
        }

        let percent = (100 * (index + 1) / total) as u8;
        info!(
            doc = %name,
            pages = page_count,
            failed_pages,
            rows = document_rows.len(),
            percent,
            "document processed"
        );

        row_groups.push(document_rows);
        progress.push(ProgressEntry {
            file: name,
            progress: Progress::Complete(percent),
        });
    }

    assemble_batch(row_groups, progress)
}

/// Pure aggregation step: flatten per-document row groups preserving
/// submission order. No deduplication, no re-validation.
pub fn assemble_batch(row_groups: Vec<Vec<Row>>, progress: Vec<ProgressEntry>) -> BatchResult {
    BatchResult {
        rows: row_groups.into_iter().flatten().collect(),
        progress,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::FailureReason;
    use crate::testutil::{row, ScriptedBackend, StubRasterizer};

    fn schema() -> TableSchema {
        TableSchema::new(["Customer Name"]).unwrap()
    }

    fn document(name: &str) -> DocumentUpload {
        DocumentUpload {
            name: name.to_string(),
            bytes: b"%PDF-stub".to_vec(),
        }
    }

    fn corrupt_document(name: &str) -> DocumentUpload {
        DocumentUpload {
            name: name.to_string(),
            bytes: b"corrupt".to_vec(),
        }
    }

    fn backends(rows: Vec<Row>) -> Vec<Arc<dyn TableBackend>> {
        vec![Arc::new(ScriptedBackend::success("primary", rows))]
    }

    #[tokio::test]
    async fn progress_has_one_entry_per_document_in_order() {
        let documents = vec![document("a.pdf"), corrupt_document("b.pdf"), document("c.pdf")];
        let rasterizer = Arc::new(StubRasterizer {
            pages_per_document: 1,
        });

        let result = run_batch(
            documents,
            rasterizer,
            &backends(vec![]),
            &schema(),
            &CancellationToken::new(),
        )
        .await;

        let files: Vec<&str> = result.progress.iter().map(|e| e.file.as_str()).collect();
        assert_eq!(files, ["a.pdf", "b.pdf", "c.pdf"]);
        assert_eq!(result.progress[0].progress, Progress::Complete(33));
        assert_eq!(result.progress[1].progress, Progress::Failed);
        assert_eq!(result.progress[2].progress, Progress::Complete(100));
    }

    #[tokio::test]
    async fn failed_rasterization_contributes_no_rows_and_spares_the_rest() {
        let documents = vec![corrupt_document("bad.pdf"), document("good.pdf")];
        let rasterizer = Arc::new(StubRasterizer {
            pages_per_document: 1,
        });

        let result = run_batch(
            documents,
            rasterizer,
            &backends(vec![row("Customer Name", "Acme")]),
            &schema(),
            &CancellationToken::new(),
        )
        .await;

        assert_eq!(result.rows.len(), 1);
        assert_eq!(result.progress[0].progress, Progress::Failed);
        assert_eq!(result.progress[1].progress, Progress::Complete(100));
    }

    #[tokio::test]
    async fn all_backends_failing_still_completes_the_document() {
        let failing: Vec<Arc<dyn TableBackend>> = vec![
            Arc::new(ScriptedBackend::failure(
                "primary",
                FailureReason::Timeout,
            )),
            Arc::new(ScriptedBackend::failure(
                "fallback",
                FailureReason::BadStatus(502),
            )),
        ];
        let rasterizer = Arc::new(StubRasterizer {
            pages_per_document: 2,
        });

        let result = run_batch(
            vec![document("a.pdf")],
            rasterizer,
            &failing,
            &schema(),
            &CancellationToken::new(),
        )
        .await;

        assert!(result.rows.is_empty());
        assert_eq!(result.progress[0].progress, Progress::Complete(100));
    }

    #[tokio::test]
    async fn rows_keep_submission_then_page_order() {
        // Two pages per document; the scripted backend returns one row per
        // page, so row count tracks document order deterministically.
        let rasterizer = Arc::new(StubRasterizer {
            pages_per_document: 2,
        });
        let chain = backends(vec![row("Customer Name", "r")]);

        let result = run_batch(
            vec![document("a.pdf"), document("b.pdf")],
            rasterizer,
            &chain,
            &schema(),
            &CancellationToken::new(),
        )
        .await;

        assert_eq!(result.rows.len(), 4);
        assert_eq!(result.progress[0].progress, Progress::Complete(50));
        assert_eq!(result.progress[1].progress, Progress::Complete(100));
    }

    #[tokio::test]
    async fn cancellation_marks_remaining_documents_failed() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let rasterizer = Arc::new(StubRasterizer {
            pages_per_document: 1,
        });

        let result = run_batch(
            vec![document("a.pdf"), document("b.pdf")],
            rasterizer,
            &backends(vec![]),
            &schema(),
            &cancel,
        )
        .await;

        assert_eq!(result.progress.len(), 2);
        assert!(result
            .progress
            .iter()
            .all(|e| e.progress == Progress::Failed));
    }

    #[test]
    fn progress_wire_encoding_round_trips() {
        assert_eq!(i32::from(Progress::Complete(100)), 100);
        assert_eq!(i32::from(Progress::Failed), PROGRESS_FAILED_SENTINEL);
        assert_eq!(Progress::try_from(-1), Ok(Progress::Failed));
        assert_eq!(Progress::try_from(33), Ok(Progress::Complete(33)));
        assert!(Progress::try_from(250).is_err());

        let entry = ProgressEntry {
            file: "a.pdf".to_string(),
            progress: Progress::Failed,
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json, serde_json::json!({"file": "a.pdf", "progress": -1}));
    }

    #[test]
    fn assemble_preserves_group_order() {
        let groups = vec![
            vec![row("Customer Name", "a1"), row("Customer Name", "a2")],
            vec![],
            vec![row("Customer Name", "c1")],
        ];
        let result = assemble_batch(groups, vec![]);
        let values: Vec<_> = result
            .rows
            .iter()
            .map(|r| r.get("Customer Name").cloned().flatten().unwrap())
            .collect();
        assert_eq!(values, ["a1", "a2", "c1"]);
    }
}
