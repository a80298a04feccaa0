//! Core library for Rowsight: turns batches of scanned PDF documents into
//! structured table rows by rasterizing pages and querying remote
//! vision-extraction backends with ordered fallback.
//!
//! The pipeline is: [`DocumentUpload`] batch -> [`Rasterizer`] -> per-page
//! [`TableBackend`] chain -> [`BatchResult`] with one [`ProgressEntry`] per
//! submitted document. Individual document failures never abort a batch.

pub mod backend;
pub mod batch;
pub mod config;
pub mod page;
pub mod raster;
pub mod schema;

#[cfg(test)]
pub(crate) mod testutil;

pub use backend::{BackendOutcome, FailureReason, TableBackend, UnconfiguredBackend};
pub use batch::{
    assemble_batch, run_batch, BatchResult, DocumentUpload, Progress, ProgressEntry,
    PROGRESS_FAILED_SENTINEL,
};
pub use config::{ConfigError, ExtractorConfig};
pub use page::{process_page, PageResult};
pub use raster::{PageImage, PdfiumRasterizer, RasterError, Rasterizer};
pub use schema::{Row, RowDecodeError, SchemaError, TableSchema, TABLE_KEY};
