//! Document renderer capability surface
//!
//! The viewer never parses document formats. It asks a [`DocumentRenderer`]
//! to load bytes, pick a page, describe the page at a transform and rasterize
//! it into a surface.

use crate::viewport::Transform;

use super::surface::{Surface, SurfaceSize};

/// Errors loading a document
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LoadError {
    #[error("failed to fetch {source_id}: {detail}")]
    Fetch { source_id: String, detail: String },

    #[error("document could not be read: {detail}")]
    Malformed { detail: String },

    #[error("page {page} is not available: {detail}")]
    MissingPage { page: usize, detail: String },

    #[error("render worker is not running")]
    WorkerGone,
}

impl LoadError {
    pub fn malformed(detail: impl Into<String>) -> Self {
        Self::Malformed {
            detail: detail.into(),
        }
    }

    pub fn fetch(source_id: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::Fetch {
            source_id: source_id.into(),
            detail: detail.into(),
        }
    }
}

/// Errors rasterizing a page
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RenderError {
    #[error("no document loaded")]
    NoDocument,

    #[error("target surface is empty")]
    EmptySurface,

    #[error("render engine: {detail}")]
    Engine { detail: String },

    #[error("render worker is not running")]
    WorkerGone,
}

impl RenderError {
    pub fn engine(detail: impl std::fmt::Display) -> Self {
        Self::Engine {
            detail: detail.to_string(),
        }
    }
}

/// Where and how large a page lands on the surface.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewportDescriptor {
    /// Page units to pixels
    pub scale: f32,
    pub offset_x: f32,
    pub offset_y: f32,
    /// Page size in pixels at `scale`
    pub width: f32,
    pub height: f32,
}

/// Pixel rectangle of a surface, origin top-left
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PixelRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl ViewportDescriptor {
    /// Fit the page width to the surface width, then apply the user
    /// transform.
    pub fn fit_width(
        page_size: (f32, f32),
        surface: SurfaceSize,
        transform: &Transform,
    ) -> Result<Self, RenderError> {
        if surface.is_empty() {
            return Err(RenderError::EmptySurface);
        }
        let (page_width, page_height) = page_size;
        if !(page_width > 0.0 && page_height > 0.0) {
            return Err(RenderError::engine(format!(
                "page has no area ({page_width}x{page_height})"
            )));
        }

        let fit = surface.width as f32 / page_width;
        let scale = fit * transform.scale as f32;

        Ok(Self {
            scale,
            offset_x: transform.offset_x as f32,
            offset_y: transform.offset_y as f32,
            width: page_width * scale,
            height: page_height * scale,
        })
    }

    /// Part of `surface` covered by the page, or `None` when the page lies
    /// entirely off-surface. Never larger than the surface, whatever the
    /// scale.
    #[must_use]
    pub fn visible_region(&self, surface: SurfaceSize) -> Option<PixelRegion> {
        let clamp = |value: f32, limit: u32| f64::from(value).clamp(0.0, f64::from(limit));
        let x0 = clamp(self.offset_x.floor(), surface.width);
        let y0 = clamp(self.offset_y.floor(), surface.height);
        let x1 = clamp((self.offset_x + self.width).ceil(), surface.width);
        let y1 = clamp((self.offset_y + self.height).ceil(), surface.height);
        if x1 <= x0 || y1 <= y0 {
            return None;
        }
        Some(PixelRegion {
            x: x0 as u32,
            y: y0 as u32,
            width: (x1 - x0) as u32,
            height: (y1 - y0) as u32,
        })
    }
}

/// Loads documents and rasterizes pages.
///
/// Documents and pages never leave the thread that created them, so they
/// need not be `Send`; the renderer itself is moved onto the render worker.
pub trait DocumentRenderer {
    type Document;
    type Page;

    /// Parse document bytes
    fn load(&mut self, bytes: &[u8]) -> Result<Self::Document, LoadError>;

    fn page_count(&self, document: &Self::Document) -> usize;

    /// Open a page (0-indexed)
    fn page(&mut self, document: &Self::Document, number: usize) -> Result<Self::Page, LoadError>;

    fn compute_viewport(
        &self,
        page: &Self::Page,
        surface: SurfaceSize,
        transform: &Transform,
    ) -> Result<ViewportDescriptor, RenderError>;

    /// Rasterize `page` into `target`. The target arrives cleared.
    fn render(
        &mut self,
        page: &Self::Page,
        viewport: &ViewportDescriptor,
        target: &mut Surface,
    ) -> Result<(), RenderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fit_width_uses_surface_width() {
        let viewport = ViewportDescriptor::fit_width(
            (200.0, 300.0),
            SurfaceSize::new(400, 100),
            &Transform::identity(),
        )
        .unwrap();
        assert_eq!(viewport.scale, 2.0);
        assert_eq!(viewport.width, 400.0);
        assert_eq!(viewport.height, 600.0);
    }

    #[test]
    fn fit_width_applies_user_transform() {
        let transform = Transform {
            scale: 1.5,
            offset_x: -20.0,
            offset_y: 35.0,
        };
        let viewport =
            ViewportDescriptor::fit_width((100.0, 100.0), SurfaceSize::new(100, 100), &transform)
                .unwrap();
        assert_eq!(viewport.scale, 1.5);
        assert_eq!((viewport.offset_x, viewport.offset_y), (-20.0, 35.0));
    }

    #[test]
    fn deep_zoom_follows_transform_scale() {
        let page = (612.0, 792.0);
        let surface = SurfaceSize::new(800, 600);
        let fit = 800.0 / 612.0;
        for zoom in [1.0, 4.0, 8.0, 16.0, 64.0] {
            let transform = Transform {
                scale: zoom,
                offset_x: -5000.0,
                offset_y: -3000.0,
            };
            let viewport = ViewportDescriptor::fit_width(page, surface, &transform).unwrap();
            let expected = fit * zoom as f32;
            assert!(
                (viewport.scale - expected).abs() <= expected * 1e-6,
                "zoom {zoom}: {} != {expected}",
                viewport.scale
            );
        }
    }

    #[test]
    fn visible_region_is_bounded_by_surface() {
        let surface = SurfaceSize::new(800, 600);
        let transform = Transform {
            scale: 64.0,
            offset_x: -20_000.0,
            offset_y: -30_000.0,
        };
        let viewport =
            ViewportDescriptor::fit_width((612.0, 792.0), surface, &transform).unwrap();
        assert_eq!(
            viewport.visible_region(surface),
            Some(PixelRegion {
                x: 0,
                y: 0,
                width: 800,
                height: 600,
            })
        );
    }

    #[test]
    fn visible_region_clips_partial_page() {
        let viewport = ViewportDescriptor {
            scale: 1.0,
            offset_x: 30.5,
            offset_y: -10.0,
            width: 100.0,
            height: 50.0,
        };
        assert_eq!(
            viewport.visible_region(SurfaceSize::new(80, 60)),
            Some(PixelRegion {
                x: 30,
                y: 0,
                width: 50,
                height: 40,
            })
        );
    }

    #[test]
    fn page_off_surface_has_no_region() {
        let viewport = ViewportDescriptor {
            scale: 1.0,
            offset_x: 500.0,
            offset_y: 0.0,
            width: 100.0,
            height: 100.0,
        };
        assert_eq!(viewport.visible_region(SurfaceSize::new(80, 60)), None);

        let above = ViewportDescriptor {
            offset_x: 0.0,
            offset_y: -100.0,
            ..viewport
        };
        assert_eq!(above.visible_region(SurfaceSize::new(80, 60)), None);
    }

    #[test]
    fn fit_width_rejects_empty_surface() {
        let result = ViewportDescriptor::fit_width(
            (100.0, 100.0),
            SurfaceSize::new(0, 10),
            &Transform::identity(),
        );
        assert_eq!(result, Err(RenderError::EmptySurface));
    }
}
