//! Shared test doubles for the orchestration core.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::backend::{BackendOutcome, FailureReason, TableBackend};
use crate::raster::{PageImage, RasterError, Rasterizer, MAX_PAGES_PER_DOCUMENT};
use crate::schema::{Row, TableSchema};

pub(crate) fn page_image(document_name: &str, page_index: usize) -> PageImage {
    PageImage {
        document_name: document_name.to_string(),
        page_index,
        width: 8,
        height: 8,
        png_data: vec![0u8; 16],
    }
}

pub(crate) fn row(column: &str, value: &str) -> Row {
    let mut row = Row::new();
    row.insert(column.to_string(), Some(value.to_string()));
    row
}

/// Backend that always answers with one scripted outcome and counts calls.
pub(crate) struct ScriptedBackend {
    name: &'static str,
    outcome: BackendOutcome,
    calls: AtomicUsize,
}

impl ScriptedBackend {
    pub(crate) fn success(name: &'static str, rows: Vec<Row>) -> Self {
        Self {
            name,
            outcome: BackendOutcome::Success(rows),
            calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn failure(name: &'static str, reason: FailureReason) -> Self {
        Self {
            name,
            outcome: BackendOutcome::Failure(reason),
            calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TableBackend for ScriptedBackend {
    async fn extract(&self, _image: &PageImage, _schema: &TableSchema) -> BackendOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.outcome.clone()
    }

    fn name(&self) -> &'static str {
        self.name
    }
}

/// One-shot HTTP stub bound to an ephemeral local port.
///
/// Accepts a single connection and answers with the given raw response
/// bytes; with `None` it reads the request and then holds the connection
/// open so the client's timeout fires.
pub(crate) async fn spawn_http_stub(response: Option<&'static str>) -> std::net::SocketAddr {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let Ok((mut stream, _)) = listener.accept().await else {
            return;
        };
        let mut buf = vec![0u8; 65536];
        let _ = stream.read(&mut buf).await;

        match response {
            Some(response) => {
                let _ = stream.write_all(response.as_bytes()).await;
                // drain until the client is done so it can read the response
                loop {
                    match stream.read(&mut buf).await {
                        Ok(0) | Err(_) => break,
                        Ok(_) => {}
                    }
                }
            }
            None => {
                tokio::time::sleep(std::time::Duration::from_secs(60)).await;
            }
        }
    });

    addr
}

/// Rasterizer that emits a fixed number of blank pages per document, and
/// fails for documents whose bytes are the literal `corrupt`.
pub(crate) struct StubRasterizer {
    pub(crate) pages_per_document: usize,
}

impl Rasterizer for StubRasterizer {
    fn render(&self, document_name: &str, bytes: &[u8]) -> Result<Vec<PageImage>, RasterError> {
        if bytes == b"corrupt" {
            return Err(RasterError::TooManyPages {
                count: MAX_PAGES_PER_DOCUMENT + 1,
                limit: MAX_PAGES_PER_DOCUMENT,
            });
        }
        Ok((0..self.pages_per_document)
            .map(|index| page_image(document_name, index))
            .collect())
    }
}
