//! Owned RGB565 framebuffer.
//!
//! Pixels are stored as native `u16` values, row-major, with a stride equal to the
//! current panel width. The buffer is sized once for the native panel area. An
//! orientation change only swaps width and height (see [`Framebuffer::reshape`]).
//!
//! [`Framebuffer`] implements embedded-graphics `DrawTarget`, so applications draw
//! into it and then request an update of the touched rectangle.

use alloc::vec::Vec;

use embedded_graphics::pixelcolor::Rgb565;
use embedded_graphics::pixelcolor::raw::RawU16;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::Rectangle;

use crate::blit::Extent;
use crate::geometry::BYTES_PER_PIXEL;

/// A pixel allocation could not be satisfied.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct AllocError {
    /// Requested size in bytes.
    pub bytes: usize,
}

/// Allocate `count` zeroed pixels, reporting failure instead of aborting.
///
/// Requests above `limit` bytes fail without touching the allocator.
pub(crate) fn alloc_pixels(
    count: usize,
    limit: Option<usize>,
) -> Result<Vec<u16>, AllocError> {
    let bytes = count.saturating_mul(BYTES_PER_PIXEL);
    if limit.is_some_and(|limit| bytes > limit) {
        return Err(AllocError { bytes });
    }
    let mut pixels = Vec::new();
    pixels.try_reserve_exact(count).map_err(|_| AllocError { bytes })?;
    pixels.resize(count, 0);
    Ok(pixels)
}

/// Raw RGB565 value of an embedded-graphics color.
#[inline]
pub fn raw565(color: Rgb565) -> u16 {
    let raw: RawU16 = color.into();
    raw.into_inner()
}

/// Driver-owned pixel buffer.
pub struct Framebuffer {
    pixels: Vec<u16>,
    width: u16,
    height: u16,
}

impl Framebuffer {
    /// Allocate a zeroed `width` x `height` buffer.
    pub fn new(
        width: u16,
        height: u16,
    ) -> Result<Self, AllocError> {
        Self::with_limit(width, height, None)
    }

    /// Like [`Framebuffer::new`], refusing buffers larger than `limit` bytes.
    pub fn with_limit(
        width: u16,
        height: u16,
        limit: Option<usize>,
    ) -> Result<Self, AllocError> {
        let pixels = alloc_pixels(width as usize * height as usize, limit)?;
        Ok(Self { pixels, width, height })
    }

    #[inline]
    pub const fn width(&self) -> u16 { self.width }

    #[inline]
    pub const fn height(&self) -> u16 { self.height }

    /// Extent for blitting, stride included.
    #[inline]
    pub const fn extent(&self) -> Extent { Extent::new(self.width as i32, self.height as i32) }

    /// All pixels, row-major.
    #[inline]
    pub fn pixels(&self) -> &[u16] { &self.pixels }

    /// All pixels, row-major, mutable.
    #[inline]
    pub fn pixels_mut(&mut self) -> &mut [u16] { &mut self.pixels }

    /// Pixel at (x, y), or `None` outside the buffer.
    pub fn get(
        &self,
        x: u16,
        y: u16,
    ) -> Option<u16> {
        if x < self.width && y < self.height { self.pixels.get(self.index(x, y)).copied() } else { None }
    }

    /// Store one raw pixel. Out-of-range coordinates are ignored.
    pub fn set(
        &mut self,
        x: u16,
        y: u16,
        raw: u16,
    ) {
        if x < self.width && y < self.height {
            let idx = self.index(x, y);
            self.pixels[idx] = raw;
        }
    }

    /// Set every pixel to `raw`.
    pub fn fill(
        &mut self,
        raw: u16,
    ) {
        self.pixels.fill(raw);
    }

    /// Reinterpret the buffer with new dimensions of the same area.
    ///
    /// The area must match; a different one is a caller bug and leaves the
    /// buffer untouched in release builds.
    pub(crate) fn reshape(
        &mut self,
        width: u16,
        height: u16,
    ) {
        let same_area = width as usize * height as usize == self.pixels.len();
        debug_assert!(same_area, "reshape to {width}x{height} changes the area");
        if same_area {
            self.width = width;
            self.height = height;
        }
    }

    /// Store a pixel at a signed drawing coordinate, ignoring anything outside.
    fn put(
        &mut self,
        point: Point,
        raw: u16,
    ) {
        if let (Ok(x), Ok(y)) = (u16::try_from(point.x), u16::try_from(point.y)) {
            self.set(x, y, raw);
        }
    }

    #[inline]
    fn index(
        &self,
        x: u16,
        y: u16,
    ) -> usize {
        y as usize * self.width as usize + x as usize
    }
}

impl OriginDimensions for Framebuffer {
    fn size(&self) -> Size { Size::new(u32::from(self.width), u32::from(self.height)) }
}

impl DrawTarget for Framebuffer {
    type Color = Rgb565;
    type Error = core::convert::Infallible;

    fn draw_iter<I>(
        &mut self,
        pixels: I,
    ) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels {
            self.put(point, raw565(color));
        }
        Ok(())
    }

    fn fill_contiguous<I>(
        &mut self,
        area: &Rectangle,
        colors: I,
    ) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Self::Color>,
    {
        let drawable_area = area.intersection(&self.bounding_box());
        if drawable_area.size == Size::zero() {
            return Ok(());
        }

        // Colors cover the full requested area, clipped pixels are skipped
        let mut colors = colors.into_iter();
        for y in area.rows() {
            for x in area.columns() {
                let Some(color) = colors.next() else {
                    return Ok(());
                };
                self.put(Point::new(x, y), raw565(color));
            }
        }
        Ok(())
    }

    fn fill_solid(
        &mut self,
        area: &Rectangle,
        color: Self::Color,
    ) -> Result<(), Self::Error> {
        let drawable_area = area.intersection(&self.bounding_box());
        if drawable_area.size == Size::zero() {
            return Ok(());
        }

        let raw = raw565(color);
        let stride = self.width as usize;
        let x_start = drawable_area.top_left.x as usize;
        let width = drawable_area.size.width as usize;
        for y in drawable_area.rows() {
            let row_start = y as usize * stride + x_start;
            self.pixels[row_start..row_start + width].fill(raw);
        }
        Ok(())
    }

    fn clear(
        &mut self,
        color: Self::Color,
    ) -> Result<(), Self::Error> {
        self.fill(raw565(color));
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
