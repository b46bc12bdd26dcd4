//! Drawing surfaces

use image::{Rgba, RgbaImage};

/// Surface dimensions in pixels
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct SurfaceSize {
    pub width: u32,
    pub height: u32,
}

impl SurfaceSize {
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// An RGBA drawing surface. Cleared pixels are fully transparent.
#[derive(Clone)]
pub struct Surface {
    image: RgbaImage,
}

impl Surface {
    #[must_use]
    pub fn new(size: SurfaceSize) -> Self {
        Self {
            image: RgbaImage::new(size.width, size.height),
        }
    }

    #[must_use]
    pub fn size(&self) -> SurfaceSize {
        let (width, height) = self.image.dimensions();
        SurfaceSize { width, height }
    }

    /// Resize to `size`. The content is discarded when the size changes.
    pub fn resize(&mut self, size: SurfaceSize) {
        if self.size() != size {
            self.image = RgbaImage::new(size.width, size.height);
        }
    }

    pub fn clear(&mut self) {
        self.image.fill(0);
    }

    /// Fill the whole surface with one color.
    pub fn fill(&mut self, color: [u8; 4]) {
        for pixel in self.image.pixels_mut() {
            *pixel = Rgba(color);
        }
    }

    #[must_use]
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        (x < self.image.width() && y < self.image.height()).then(|| self.image.get_pixel(x, y).0)
    }

    /// Draw `layer` with its top-left corner at `(x, y)`, clipping to the
    /// surface bounds.
    pub fn draw_image(&mut self, layer: &RgbaImage, x: i64, y: i64) {
        image::imageops::overlay(&mut self.image, layer, x, y);
    }

    /// Make this surface an exact copy of `other`, resizing if needed.
    pub fn copy_from(&mut self, other: &Surface) {
        if self.size() != other.size() {
            self.image = RgbaImage::new(other.image.width(), other.image.height());
        }
        self.image.copy_from_slice(other.image.as_raw());
    }

    #[must_use]
    pub fn as_image(&self) -> &RgbaImage {
        &self.image
    }
}

impl std::fmt::Debug for Surface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Surface")
            .field("size", &self.size())
            .finish_non_exhaustive()
    }
}
