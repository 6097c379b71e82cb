//! Rasterized page data and the rendering-collaborator seam.

pub mod hayro;

use std::sync::Arc;

use thiserror::Error;

/// One rendered page at the session's fixed scale.
#[derive(Debug, Clone)]
pub struct RasterPage {
    /// 1-based page number within its source document.
    pub page_index: u32,
    pub width: u32,
    pub height: u32,
    /// RGBA bytes, `width * height * 4`, row-major, top-to-bottom.
    pub pixels: Vec<u8>,
}

/// Errors from the rendering collaborator.
#[derive(Debug, Error)]
pub enum RenderError {
    /// The bytes are not a valid paginated document (corrupt, unsupported,
    /// or encrypted without a password).
    #[error("cannot parse document: {0}")]
    Parse(String),

    /// A page outside `1..=page_count` was requested. Not reachable through
    /// valid session usage.
    #[error("page {page} is out of range (document has {count} pages)")]
    PageOutOfRange { page: u32, count: u32 },

    #[error("scale must be a positive finite value")]
    InvalidScale,
}

/// An opened (parsed) document, ready to render pages.
pub trait PageSource {
    fn page_count(&self) -> u32;

    /// Render one page (1-based) at `scale`. Deterministic: the same page
    /// and scale always yield the same pixel buffer.
    fn render_page(&self, page: u32, scale: f32) -> Result<RasterPage, RenderError>;
}

/// The document-rendering capability the engine depends on but does not
/// implement. Parsing is hoisted into `open` so the page count and the page
/// renders share a single parse of the byte source.
pub trait PageRenderer {
    fn open(&self, bytes: Arc<Vec<u8>>) -> Result<Box<dyn PageSource>, RenderError>;
}

/// The ordered raster sequence for one loaded document.
#[derive(Debug)]
pub struct DocumentRaster {
    /// Original file name, for reporting only.
    pub name: String,
    /// Original byte length, for reporting only.
    pub byte_len: usize,
    pub page_count: u32,
    /// Always holds `page_count` entries in increasing `page_index` order;
    /// never reordered after loading completes.
    pub pages: Vec<RasterPage>,
}

impl DocumentRaster {
    /// Look up a page by its 1-based index.
    pub fn page(&self, page_index: u32) -> Option<&RasterPage> {
        self.pages.get(page_index.checked_sub(1)? as usize)
    }
}
