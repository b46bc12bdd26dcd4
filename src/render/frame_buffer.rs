//! Double-buffered drawing surfaces
//!
//! The front surface is what the user sees; it is only written by
//! [`FrameBuffer::swap`]. The back surface is the render target and is lent
//! out for the duration of a render, so there is no back surface to swap
//! from (or render into a second time) until the render has finished.

use log::debug;

use super::surface::{Surface, SurfaceSize};

pub struct FrameBuffer {
    front: Surface,
    back: Option<Surface>,
    /// Number of completed swaps
    generation: u64,
}

impl FrameBuffer {
    #[must_use]
    pub fn new(size: SurfaceSize) -> Self {
        Self {
            front: Surface::new(size),
            back: Some(Surface::new(size)),
            generation: 0,
        }
    }

    #[must_use]
    pub fn front(&self) -> &Surface {
        &self.front
    }

    /// Back surface, unless it is lent out to a render.
    #[must_use]
    pub fn back(&self) -> Option<&Surface> {
        self.back.as_ref()
    }

    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    #[must_use]
    pub fn is_back_lent(&self) -> bool {
        self.back.is_none()
    }

    pub fn clear_back(&mut self) {
        if let Some(back) = self.back.as_mut() {
            back.clear();
        }
    }

    /// Resize the back surface. The front follows on the next swap.
    pub fn resize_back(&mut self, size: SurfaceSize) {
        if let Some(back) = self.back.as_mut() {
            if back.size() != size {
                debug!(
                    "resizing back surface {:?} -> {:?}",
                    back.size(),
                    size
                );
                back.resize(size);
            }
        }
    }

    /// Hand the back surface to a render, if it is not already out.
    pub fn lend_back(&mut self) -> Option<Surface> {
        self.back.take()
    }

    /// Take back a surface after its render has finished or failed.
    pub fn return_back(&mut self, surface: Surface) {
        debug_assert!(self.back.is_none(), "back surface returned twice");
        self.back = Some(surface);
    }

    /// Clear the front surface and copy the back surface onto it.
    ///
    /// Returns false, leaving the front untouched, while the back surface is
    /// lent out.
    pub fn swap(&mut self) -> bool {
        let Some(back) = self.back.as_ref() else {
            return false;
        };
        self.front.clear();
        self.front.copy_from(back);
        self.generation += 1;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: [u8; 4] = [255, 0, 0, 255];

    #[test]
    fn swap_copies_back_to_front() {
        let mut buffer = FrameBuffer::new(SurfaceSize::new(2, 2));
        let mut back = buffer.lend_back().unwrap();
        back.fill(RED);
        buffer.return_back(back);

        assert_eq!(buffer.front().pixel(0, 0), Some([0, 0, 0, 0]));
        assert!(buffer.swap());
        assert_eq!(buffer.front().pixel(1, 1), Some(RED));
        assert_eq!(buffer.generation(), 1);
    }

    #[test]
    fn cannot_swap_or_lend_while_back_is_out() {
        let mut buffer = FrameBuffer::new(SurfaceSize::new(2, 2));
        let back = buffer.lend_back().unwrap();
        assert!(buffer.is_back_lent());
        assert!(buffer.lend_back().is_none());
        assert!(!buffer.swap());
        assert_eq!(buffer.generation(), 0);
        buffer.return_back(back);
        assert!(!buffer.is_back_lent());
    }

    #[test]
    fn front_follows_back_size_on_swap() {
        let mut buffer = FrameBuffer::new(SurfaceSize::new(2, 2));
        buffer.resize_back(SurfaceSize::new(6, 4));
        assert_eq!(buffer.front().size(), SurfaceSize::new(2, 2));
        buffer.swap();
        assert_eq!(buffer.front().size(), SurfaceSize::new(6, 4));
    }

    #[test]
    fn clear_back_leaves_front_alone() {
        let mut buffer = FrameBuffer::new(SurfaceSize::new(1, 1));
        let mut back = buffer.lend_back().unwrap();
        back.fill(RED);
        buffer.return_back(back);
        buffer.swap();
        buffer.clear_back();

        assert_eq!(buffer.back().and_then(|b| b.pixel(0, 0)), Some([0, 0, 0, 0]));
        assert_eq!(buffer.front().pixel(0, 0), Some(RED));
    }
}
