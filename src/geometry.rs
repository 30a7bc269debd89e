//! Panel geometry, address windows and update rectangles.

use crate::command::Orientation;

/// Bits per pixel on the wire and in the framebuffer.
pub const BITS_PER_PIXEL: u8 = 16;

/// Bytes per pixel.
pub const BYTES_PER_PIXEL: usize = BITS_PER_PIXEL as usize / 8;

/// Framebuffer pixel layout.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum PixelFormat {
    /// 5-6-5 bit RGB packed into a `u16`.
    #[default]
    Rgb565,
}

/// Live panel description, as reported by the get-info control.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct PanelGeometry {
    /// Effective width for the current orientation.
    pub width: u16,
    /// Effective height for the current orientation.
    pub height: u16,
    /// Always 16.
    pub bits_per_pixel: u8,
    /// Always RGB565.
    pub pixel_format: PixelFormat,
}

impl PanelGeometry {
    /// Geometry of a panel with the given native size seen through `orientation`.
    pub const fn new(
        native_width: u16,
        native_height: u16,
        orientation: Orientation,
    ) -> Self {
        let (width, height) = orientation.dimensions(native_width, native_height);
        Self {
            width,
            height,
            bits_per_pixel: BITS_PER_PIXEL,
            pixel_format: PixelFormat::Rgb565,
        }
    }

    /// Pixel count. Bounds every transfer.
    #[inline]
    pub const fn pixel_count(&self) -> usize { self.width as usize * self.height as usize }

    /// Byte count of one full frame.
    #[inline]
    pub const fn frame_bytes(&self) -> usize { self.pixel_count() * BYTES_PER_PIXEL }

    /// Window covering the whole panel.
    pub const fn full_window(&self) -> AddressWindow {
        AddressWindow {
            x1: 0,
            y1: 0,
            x2: self.width.saturating_sub(1),
            y2: self.height.saturating_sub(1),
        }
    }

    /// Whether `window` lies inside the panel.
    pub const fn contains(
        &self,
        window: &AddressWindow,
    ) -> bool {
        window.x1 <= window.x2 && window.y1 <= window.y2 && window.x2 < self.width && window.y2 < self.height
    }
}

/// Inclusive panel-coordinate window for the next pixel stream.
///
/// The controller writes the stream row-major from (x1, y1), wrapping at x2.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct AddressWindow {
    pub x1: u16,
    pub y1: u16,
    pub x2: u16,
    pub y2: u16,
}

impl AddressWindow {
    /// Columns per row.
    #[inline]
    pub const fn columns(&self) -> usize { (self.x2 - self.x1) as usize + 1 }

    /// Row count.
    #[inline]
    pub const fn rows(&self) -> usize { (self.y2 - self.y1) as usize + 1 }

    /// Pixels needed to fill the window.
    #[inline]
    pub const fn pixel_count(&self) -> usize { self.columns() * self.rows() }

    /// Panel coordinate of stream pixel `k`.
    pub const fn position_of(
        &self,
        k: usize,
    ) -> (u16, u16) {
        let row_len = self.columns();
        (self.x1 + (k % row_len) as u16, self.y1 + (k / row_len) as u16)
    }

    /// CASET payload: big-endian x1, x2.
    pub const fn column_payload(&self) -> [u8; 4] { span_payload(self.x1, self.x2) }

    /// PASET payload: big-endian y1, y2.
    pub const fn page_payload(&self) -> [u8; 4] { span_payload(self.y1, self.y2) }
}

const fn span_payload(
    start: u16,
    end: u16,
) -> [u8; 4] {
    let [s_hi, s_lo] = start.to_be_bytes();
    let [e_hi, e_lo] = end.to_be_bytes();
    [s_hi, s_lo, e_hi, e_lo]
}

/// Update request in caller coordinates.
///
/// Origins may be negative and the extent may reach past the panel; a
/// non-positive width or height is an empty request.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub const fn new(
        x: i32,
        y: i32,
        width: i32,
        height: i32,
    ) -> Self {
        Self { x, y, width, height }
    }

    /// No pixels requested.
    #[inline]
    pub const fn is_empty(&self) -> bool { self.width <= 0 || self.height <= 0 }
}

// =============================================================================
// Tests
// =============================================================================
