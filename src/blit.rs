//! Clipped, overlap-safe rectangular copy between 2-D pixel buffers.
//!
//! A copy is described by a [`BlitRequest`]: a `width` x `height` block read at
//! `src` and written at `dest`. [`clip`] trims the block against both buffers.
//! Every unit trimmed from one side trims the same unit from the other, so each
//! copied element keeps its source/destination pairing. The clip is pure and is
//! shared by both copy entry points:
//!
//! - [`blit`] copies between two distinct buffers.
//! - [`blit_within`] copies inside one buffer. The iteration direction is chosen
//!   from the relative position of the two regions, so overlapping moves behave
//!   like `memmove`.
//!
//! Each buffer is row-major with a stride equal to its own column count.

use embedded_graphics::prelude::Point;

// =============================================================================
// Types
// =============================================================================

/// Columns (the stride) and rows of a pixel buffer.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Extent {
    pub cols: i32,
    pub rows: i32,
}

impl Extent {
    pub const fn new(
        cols: i32,
        rows: i32,
    ) -> Self {
        Self { cols, rows }
    }

    /// Elements a buffer of this extent holds.
    pub const fn len(&self) -> usize {
        if self.cols <= 0 || self.rows <= 0 { 0 } else { self.cols as usize * self.rows as usize }
    }

    /// Zero columns or rows.
    pub const fn is_empty(&self) -> bool { self.len() == 0 }
}

/// A requested copy, before clipping.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct BlitRequest {
    /// Top-left of the block in the destination.
    pub dest: Point,
    /// Top-left of the block in the source.
    pub src: Point,
    pub width: i32,
    pub height: i32,
}

impl BlitRequest {
    pub const fn new(
        dest: Point,
        src: Point,
        width: i32,
        height: i32,
    ) -> Self {
        Self { dest, src, width, height }
    }
}

/// Inclusive range on one axis.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Span {
    pub lo: i32,
    pub hi: i32,
}

impl Span {
    /// Element count.
    #[inline]
    pub const fn len(&self) -> usize { (self.hi - self.lo) as usize + 1 }
}

/// Result of clipping: equal-sized source and destination rectangles, each
/// inside its own buffer.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct ClippedBlit {
    pub src_x: Span,
    pub src_y: Span,
    pub dest_x: Span,
    pub dest_y: Span,
}

impl ClippedBlit {
    /// Copied columns.
    #[inline]
    pub const fn cols(&self) -> usize { self.src_x.len() }

    /// Copied rows.
    #[inline]
    pub const fn rows(&self) -> usize { self.src_y.len() }

    /// Copied elements.
    #[inline]
    pub const fn len(&self) -> usize { self.cols() * self.rows() }

    fn src_offset(
        &self,
        stride: usize,
    ) -> usize {
        self.src_y.lo as usize * stride + self.src_x.lo as usize
    }

    fn dest_offset(
        &self,
        stride: usize,
    ) -> usize {
        self.dest_y.lo as usize * stride + self.dest_x.lo as usize
    }
}

/// Element visiting order of a copy.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Direction {
    /// Rows top to bottom, columns left to right.
    Ascending,
    /// Rows bottom to top, columns right to left.
    Descending,
}

impl Direction {
    /// Order that never reads an element after it was overwritten, given the
    /// offsets of the first destination and source elements in a shared buffer.
    #[inline]
    pub const fn for_offsets(
        dest: usize,
        src: usize,
    ) -> Self {
        if dest < src { Self::Ascending } else { Self::Descending }
    }
}

// =============================================================================
// Clipping
// =============================================================================

/// Clip one axis. Returns (source span, destination span).
fn clip_axis(
    src_start: i32,
    dest_start: i32,
    len: i32,
    src_len: i32,
    dest_len: i32,
) -> Option<(Span, Span)> {
    let (src_len, dest_len) = (i64::from(src_len), i64::from(dest_len));
    let mut s0 = i64::from(src_start);
    let mut d0 = i64::from(dest_start);
    let mut s1 = s0 + i64::from(len) - 1;
    let mut d1 = d0 + i64::from(len) - 1;

    // Source bounds, mirrored onto the destination
    if s0 < 0 {
        d0 -= s0;
        s0 = 0;
    }
    if s1 >= src_len {
        d1 -= s1 - src_len + 1;
        s1 = src_len - 1;
    }

    // Destination bounds, mirrored back onto the source
    if d0 < 0 {
        s0 -= d0;
        d0 = 0;
    }
    if d1 >= dest_len {
        s1 -= d1 - dest_len + 1;
        d1 = dest_len - 1;
    }

    if s0 > s1 || d0 > d1 {
        return None;
    }
    if s1 < 0 || s0 >= src_len || d1 < 0 || d0 >= dest_len {
        return None;
    }

    // Both spans now lie inside buffers whose extents are i32
    Some((
        Span { lo: s0 as i32, hi: s1 as i32 },
        Span { lo: d0 as i32, hi: d1 as i32 },
    ))
}

/// Clip `req` against a destination of extent `dest` and a source of extent `src`.
///
/// Returns `None` when nothing is left to copy: empty request, or a block that
/// falls entirely outside either buffer.
pub fn clip(
    dest: Extent,
    src: Extent,
    req: &BlitRequest,
) -> Option<ClippedBlit> {
    if req.width <= 0 || req.height <= 0 {
        return None;
    }
    let (src_x, dest_x) = clip_axis(req.src.x, req.dest.x, req.width, src.cols, dest.cols)?;
    let (src_y, dest_y) = clip_axis(req.src.y, req.dest.y, req.height, src.rows, dest.rows)?;
    Some(ClippedBlit { src_x, src_y, dest_x, dest_y })
}

// =============================================================================
// Copy
// =============================================================================

/// Copy a block from `src` into a distinct `dest`.
///
/// Returns the clipped copy that was performed, or `None` for a no-op. A buffer
/// shorter than its extent is treated as a no-op.
pub fn blit(
    dest: &mut [u16],
    dest_extent: Extent,
    src: &[u16],
    src_extent: Extent,
    req: &BlitRequest,
) -> Option<ClippedBlit> {
    if dest.len() < dest_extent.len() || src.len() < src_extent.len() {
        return None;
    }
    let clipped = clip(dest_extent, src_extent, req)?;
    let (cols, dest_stride, src_stride) = (clipped.cols(), dest_extent.cols as usize, src_extent.cols as usize);
    let mut d = clipped.dest_offset(dest_stride);
    let mut s = clipped.src_offset(src_stride);
    for _ in 0..clipped.rows() {
        dest[d..d + cols].copy_from_slice(&src[s..s + cols]);
        d += dest_stride;
        s += src_stride;
    }
    Some(clipped)
}

/// Copy a block within one buffer; source and destination may overlap.
///
/// The result equals copying the source block out to a temporary first.
pub fn blit_within(
    buf: &mut [u16],
    extent: Extent,
    req: &BlitRequest,
) -> Option<ClippedBlit> {
    if buf.len() < extent.len() {
        return None;
    }
    let clipped = clip(extent, extent, req)?;
    let (cols, rows, stride) = (clipped.cols(), clipped.rows(), extent.cols as usize);
    let src = clipped.src_offset(stride);
    let dest = clipped.dest_offset(stride);

    match Direction::for_offsets(dest, src) {
        Direction::Ascending => {
            for row in 0..rows {
                let (s, d) = (src + row * stride, dest + row * stride);
                for col in 0..cols {
                    buf[d + col] = buf[s + col];
                }
            }
        }
        Direction::Descending => {
            for row in (0..rows).rev() {
                let (s, d) = (src + row * stride, dest + row * stride);
                for col in (0..cols).rev() {
                    buf[d + col] = buf[s + col];
                }
            }
        }
    }
    Some(clipped)
}

// =============================================================================
// Tests
// =============================================================================
