//! # Frame Buffer
//!
//! A contiguous `width * height` block of ARGB pixels. Allocated once at
//! construction and never reallocated; the render thread is the only writer,
//! everyone else reads by reference between frame boundaries.

use crate::error::{DisplayError, DisplayResult};
use crate::OPAQUE_BLACK;

/// Fixed-size ARGB pixel buffer for one screen.
#[derive(Clone, Debug)]
pub struct FrameBuffer {
    /// Screen width in pixels.
    width: u32,
    /// Screen height in pixels.
    height: u32,
    /// Pixel storage, row-major, `0xAARRGGBB`.
    pixels: Vec<u32>,
}

impl FrameBuffer {
    /// Creates a buffer of `width * height` opaque black pixels.
    ///
    /// # Errors
    ///
    /// Returns [`DisplayError::InvalidDimensions`] if either dimension is
    /// zero.
    pub fn new(width: u32, height: u32) -> DisplayResult<Self> {
        if width == 0 || height == 0 {
            return Err(DisplayError::InvalidDimensions { width, height });
        }

        Ok(Self {
            width,
            height,
            pixels: vec![OPAQUE_BLACK; width as usize * height as usize],
        })
    }

    /// Screen width in pixels.
    #[inline]
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Screen height in pixels.
    #[inline]
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// All pixels, row-major.
    #[inline]
    #[must_use]
    pub fn pixels(&self) -> &[u32] {
        &self.pixels
    }

    /// One scanline as a read-only slice.
    ///
    /// # Panics
    ///
    /// Panics if `line >= height`.
    #[must_use]
    pub fn row(&self, line: u32) -> &[u32] {
        assert!(line < self.height, "scanline {line} out of range");
        let start = line as usize * self.width as usize;
        &self.pixels[start..start + self.width as usize]
    }

    /// One scanline as a mutable slice.
    ///
    /// Compositors must confine their writes to the row handed to them.
    ///
    /// # Panics
    ///
    /// Panics if `line >= height`.
    #[must_use]
    pub fn row_mut(&mut self, line: u32) -> &mut [u32] {
        assert!(line < self.height, "scanline {line} out of range");
        let start = line as usize * self.width as usize;
        let width = self.width as usize;
        &mut self.pixels[start..start + width]
    }

    /// Clears one scanline to opaque black.
    ///
    /// # Panics
    ///
    /// Panics if `line >= height`.
    pub fn clear_row(&mut self, line: u32) {
        self.row_mut(line).fill(OPAQUE_BLACK);
    }

    /// Fills the whole buffer with one color.
    pub fn fill(&mut self, argb: u32) {
        self.pixels.fill(argb);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_zero_dimensions() {
        assert!(matches!(
            FrameBuffer::new(0, 160),
            Err(DisplayError::InvalidDimensions {
                width: 0,
                height: 160
            })
        ));
        assert!(matches!(
            FrameBuffer::new(240, 0),
            Err(DisplayError::InvalidDimensions {
                width: 240,
                height: 0
            })
        ));
    }

    #[test]
    fn test_starts_opaque_black() {
        let fb = FrameBuffer::new(4, 3).unwrap();
        assert_eq!(fb.pixels().len(), 12);
        assert!(fb.pixels().iter().all(|&p| p == OPAQUE_BLACK));
    }

    #[test]
    fn test_clear_row_touches_only_that_row() {
        let mut fb = FrameBuffer::new(4, 3).unwrap();
        fb.fill(0xFFFF_FFFF);
        fb.clear_row(1);

        assert!(fb.row(0).iter().all(|&p| p == 0xFFFF_FFFF));
        assert!(fb.row(1).iter().all(|&p| p == OPAQUE_BLACK));
        assert!(fb.row(2).iter().all(|&p| p == 0xFFFF_FFFF));
    }

    #[test]
    fn test_row_mut_writes_land_in_storage() {
        let mut fb = FrameBuffer::new(2, 2).unwrap();
        fb.row_mut(1)[0] = 0xFF12_3456;
        assert_eq!(fb.pixels()[2], 0xFF12_3456);
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn test_row_out_of_range_panics() {
        let fb = FrameBuffer::new(2, 2).unwrap();
        let _ = fb.row(2);
    }
}
