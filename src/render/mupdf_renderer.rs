//! MuPDF-backed document renderer

use image::RgbaImage;
use log::{debug, trace};
use mupdf::{Colorspace, Device, Document, Matrix, Page, Pixmap};

use super::adapter::{DocumentRenderer, LoadError, RenderError, ViewportDescriptor};
use super::surface::{Surface, SurfaceSize};
use crate::viewport::Transform;

const PDF_MIME: &str = "application/pdf";

/// Renders PDF pages with MuPDF. Holds no state of its own; documents and
/// pages live on the render worker.
#[derive(Debug, Default)]
pub struct MupdfRenderer;

impl MupdfRenderer {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

pub struct MupdfPage {
    page: Page,
    /// Page width and height in points
    size: (f32, f32),
}

impl DocumentRenderer for MupdfRenderer {
    type Document = Document;
    type Page = MupdfPage;

    fn load(&mut self, bytes: &[u8]) -> Result<Document, LoadError> {
        if bytes.is_empty() {
            return Err(LoadError::malformed("no document bytes"));
        }
        let document =
            Document::from_bytes(bytes, PDF_MIME).map_err(|e| LoadError::malformed(e.to_string()))?;
        debug!("Parsed document, {} bytes", bytes.len());
        Ok(document)
    }

    fn page_count(&self, document: &Document) -> usize {
        document
            .page_count()
            .ok()
            .and_then(|count| usize::try_from(count).ok())
            .unwrap_or(0)
    }

    fn page(&mut self, document: &Document, number: usize) -> Result<MupdfPage, LoadError> {
        let missing = |detail: String| LoadError::MissingPage {
            page: number,
            detail,
        };
        let count = self.page_count(document);
        if number >= count {
            return Err(missing(format!("document has {count} pages")));
        }
        let index = i32::try_from(number).map_err(|e| missing(e.to_string()))?;
        let page = document
            .load_page(index)
            .map_err(|e| missing(e.to_string()))?;
        let bounds = page.bounds().map_err(|e| missing(e.to_string()))?;
        let size = (bounds.x1 - bounds.x0, bounds.y1 - bounds.y0);
        Ok(MupdfPage { page, size })
    }

    fn compute_viewport(
        &self,
        page: &MupdfPage,
        surface: SurfaceSize,
        transform: &Transform,
    ) -> Result<ViewportDescriptor, RenderError> {
        ViewportDescriptor::fit_width(page.size, surface, transform)
    }

    fn render(
        &mut self,
        page: &MupdfPage,
        viewport: &ViewportDescriptor,
        target: &mut Surface,
    ) -> Result<(), RenderError> {
        let Some(region) = viewport.visible_region(target.size()) else {
            trace!("Page is off-surface at {:?}", viewport);
            return Ok(());
        };

        // Page origin lands at the offset, shifted into the region's pixmap
        let matrix = Matrix::new(
            viewport.scale,
            0.0,
            0.0,
            viewport.scale,
            viewport.offset_x - region.x as f32,
            viewport.offset_y - region.y as f32,
        );
        let width = i32::try_from(region.width).map_err(RenderError::engine)?;
        let height = i32::try_from(region.height).map_err(RenderError::engine)?;
        let mut pixmap = Pixmap::new_with_w_h(&Colorspace::device_rgb(), width, height, false)
            .map_err(RenderError::engine)?;
        pixmap.clear_with(0xff).map_err(RenderError::engine)?;
        {
            let device = Device::from_pixmap(&pixmap).map_err(RenderError::engine)?;
            page.page.run(&device, &matrix).map_err(RenderError::engine)?;
        }

        let layer = pixmap_to_rgba(&pixmap)?;
        trace!(
            "Rasterized {}x{} at ({}, {}), scale {:.3}",
            region.width,
            region.height,
            region.x,
            region.y,
            viewport.scale
        );
        target.draw_image(&layer, i64::from(region.x), i64::from(region.y));
        Ok(())
    }
}

/// Expand an RGB or RGBA pixmap into an opaque RGBA image.
fn pixmap_to_rgba(pixmap: &Pixmap) -> Result<RgbaImage, RenderError> {
    let n = pixmap.n() as usize;
    if n < 3 {
        return Err(RenderError::engine(format!(
            "unexpected pixmap with {n} components"
        )));
    }

    let width = pixmap.width() as usize;
    let height = pixmap.height() as usize;
    let stride = pixmap.stride() as usize;
    let samples = pixmap.samples();
    let row_bytes = width * n;
    if samples.len() < stride.saturating_mul(height) || row_bytes > stride {
        return Err(RenderError::engine(format!(
            "pixmap holds {} bytes, expected {height} rows of {stride}",
            samples.len()
        )));
    }

    let mut rgba = Vec::with_capacity(width * height * 4);
    for y in 0..height {
        let row_start = y * stride;
        for pixel in samples[row_start..row_start + row_bytes].chunks_exact(n) {
            rgba.extend_from_slice(&[pixel[0], pixel[1], pixel[2], 255]);
        }
    }
    RgbaImage::from_raw(pixmap.width(), pixmap.height(), rgba)
        .ok_or_else(|| RenderError::engine("pixmap size does not match its samples"))
}
