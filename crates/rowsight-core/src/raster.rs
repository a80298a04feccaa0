//! Page rasterization: turning document bytes into per-page PNG images.
//!
//! The orchestrator only depends on the [`Rasterizer`] trait; the
//! Pdfium-backed implementation lives here so tests (and deployments
//! without the native library) can substitute their own.

use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder};
use pdfium_render::prelude::{PdfRenderConfig, Pdfium, PdfiumError};
use thiserror::Error;

/// Hard cap on pages per document; exceeding it fails the document.
pub const MAX_PAGES_PER_DOCUMENT: usize = 512;

/// A rasterized page, ready to hand to an extraction backend.
#[derive(Debug, Clone)]
pub struct PageImage {
    pub document_name: String,
    /// 0-based page index within the source document.
    pub page_index: usize,
    pub width: u32,
    pub height: u32,
    pub png_data: Vec<u8>,
}

/// Errors emitted while rasterizing a document.
#[derive(Debug, Error)]
pub enum RasterError {
    #[error("failed to load the Pdfium runtime: {0}")]
    Library(#[from] PdfiumError),

    #[error("unreadable document: {0}")]
    Document(#[source] PdfiumError),

    #[error("failed to render page {page_index}: {source}")]
    PageRender {
        page_index: usize,
        #[source]
        source: PdfiumError,
    },

    #[error("failed to encode page {page_index} as PNG: {source}")]
    Encode {
        page_index: usize,
        #[source]
        source: image::ImageError,
    },

    #[error("document has {count} pages, more than the {limit} page limit")]
    TooManyPages { count: usize, limit: usize },
}

/// Renders document bytes into a finite sequence of page images.
///
/// Implementations must emit pages in document order with 0-based indices.
pub trait Rasterizer: Send + Sync {
    fn render(&self, document_name: &str, bytes: &[u8]) -> Result<Vec<PageImage>, RasterError>;
}

/// Pdfium-backed rasterizer rendering each page at a fixed target width.
pub struct PdfiumRasterizer {
    target_width: u32,
}

impl PdfiumRasterizer {
    pub fn new(target_width: u32) -> Self {
        Self {
            target_width: target_width.max(1),
        }
    }
}

impl Rasterizer for PdfiumRasterizer {
    fn render(&self, document_name: &str, bytes: &[u8]) -> Result<Vec<PageImage>, RasterError> {
        let pdfium = load_pdfium()?;
        let document = pdfium
            .load_pdf_from_byte_slice(bytes, None)
            .map_err(RasterError::Document)?;

        let page_count = document.pages().len() as usize;
        if page_count > MAX_PAGES_PER_DOCUMENT {
            return Err(RasterError::TooManyPages {
                count: page_count,
                limit: MAX_PAGES_PER_DOCUMENT,
            });
        }

        let mut images = Vec::with_capacity(page_count);

        for (page_index, page) in document.pages().iter().enumerate() {
            let render_config = PdfRenderConfig::new().set_target_width(self.target_width as i32);

            let bitmap = page
                .render_with_config(&render_config)
                .map_err(|source| RasterError::PageRender { page_index, source })?;

            let width = bitmap.width() as u32;
            let height = bitmap.height() as u32;
            let rgba = bitmap.as_rgba_bytes();

            let mut png_data = Vec::new();
            let encoder = PngEncoder::new(&mut png_data);
            encoder
                .write_image(&rgba, width, height, ExtendedColorType::Rgba8)
                .map_err(|source| RasterError::Encode { page_index, source })?;

            images.push(PageImage {
                document_name: document_name.to_string(),
                page_index,
                width,
                height,
                png_data,
            });
        }

        Ok(images)
    }
}

fn load_pdfium() -> Result<Pdfium, PdfiumError> {
    Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
        .or_else(|_| Pdfium::bind_to_system_library())
        .map(Pdfium::new)
}
