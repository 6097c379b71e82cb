//! hayro-backed implementation of the rendering seam.

use std::sync::Arc;

use hayro::hayro_interpret::InterpreterSettings;
use hayro::hayro_syntax::Pdf;
use hayro::vello_cpu::color::palette::css::WHITE;
use hayro::{RenderSettings, render};

use super::{PageRenderer, PageSource, RasterPage, RenderError};

/// Renders PDF pages with the pure-Rust hayro rasterizer.
pub struct HayroRenderer;

impl PageRenderer for HayroRenderer {
    fn open(&self, bytes: Arc<Vec<u8>>) -> Result<Box<dyn PageSource>, RenderError> {
        if !bytes.as_slice().starts_with(b"%PDF-") {
            return Err(RenderError::Parse("missing %PDF- header".into()));
        }
        let pdf = Pdf::new(bytes)
            .map_err(|_| RenderError::Parse("not a well-formed PDF".into()))?;
        Ok(Box::new(HayroDocument { pdf }))
    }
}

struct HayroDocument {
    pdf: Pdf,
}

impl PageSource for HayroDocument {
    fn page_count(&self) -> u32 {
        self.pdf.pages().len() as u32
    }

    fn render_page(&self, page: u32, scale: f32) -> Result<RasterPage, RenderError> {
        if !scale.is_finite() || scale <= 0.0 {
            return Err(RenderError::InvalidScale);
        }
        let count = self.page_count();
        let page_ref = page
            .checked_sub(1)
            .and_then(|i| self.pdf.pages().get(i as usize))
            .ok_or(RenderError::PageOutOfRange { page, count })?;

        let render_settings = RenderSettings {
            x_scale: scale,
            y_scale: scale,
            bg_color: WHITE,
            ..Default::default()
        };
        let pixmap = render(page_ref, &InterpreterSettings::default(), &render_settings);

        Ok(RasterPage {
            page_index: page,
            width: pixmap.width() as u32,
            height: pixmap.height() as u32,
            pixels: pixmap.data_as_u8_slice().to_vec(),
        })
    }
}
