//! Rectangle updates from the framebuffer to the panel.
//!
//! A request is clipped against the framebuffer first. What survives is one of:
//!
//! - **Full frame**: the clipped window is the whole panel. The framebuffer is
//!   streamed as-is at 32-bit width with no copy.
//! - **Partial**: the clipped block is gathered into a scratch buffer so it is
//!   contiguous, then streamed into a window of the same size.
//! - **Skipped**: empty request, or nothing left after clipping.
//!
//! The scratch buffer is allocated on the first partial update and kept for the
//! lifetime of the scheduler.

use alloc::vec::Vec;

use embedded_graphics::prelude::Point;
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;

use crate::blit::{self, BlitRequest, ClippedBlit, Extent};
use crate::bus::{DmaBus, TransferWidth};
use crate::controller::DisplayController;
use crate::error::Error;
use crate::framebuffer::{AllocError, Framebuffer, alloc_pixels};
use crate::geometry::{AddressWindow, Rect};

/// What an update request did.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum UpdateOutcome {
    /// Whole framebuffer streamed directly.
    FullFrame,
    /// Clipped block streamed through the scratch buffer.
    Partial {
        /// Panel window that was written.
        window: AddressWindow,
    },
    /// Nothing to send.
    Skipped,
}

/// Clip `rect` against a framebuffer of extent `fb`.
///
/// The destination frame is the request itself, so `dest_x`/`dest_y` of the
/// result say where the surviving block sits inside the requested rectangle.
pub fn clip_request(
    rect: &Rect,
    fb: Extent,
) -> Option<ClippedBlit> {
    let req = BlitRequest::new(Point::zero(), Point::new(rect.x, rect.y), rect.width, rect.height);
    blit::clip(Extent::new(rect.width, rect.height), fb, &req)
}

/// Panel window covered by a clipped request.
fn window_of(clipped: &ClippedBlit) -> AddressWindow {
    AddressWindow {
        x1: clipped.src_x.lo as u16,
        y1: clipped.src_y.lo as u16,
        x2: clipped.src_x.hi as u16,
        y2: clipped.src_y.hi as u16,
    }
}

/// Chooses between the direct and gather paths and owns the gather buffer.
pub struct UpdateScheduler {
    scratch: Option<Vec<u16>>,
    scratch_pixels: usize,
    alloc_limit: Option<usize>,
}

impl UpdateScheduler {
    /// Scheduler whose scratch buffer, once allocated, holds `scratch_pixels`.
    ///
    /// Allocation fails up front when the buffer would exceed `alloc_limit` bytes.
    pub const fn new(
        scratch_pixels: usize,
        alloc_limit: Option<usize>,
    ) -> Self {
        Self {
            scratch: None,
            scratch_pixels,
            alloc_limit,
        }
    }

    /// Whether the scratch buffer has been allocated.
    #[inline]
    pub const fn has_scratch(&self) -> bool { self.scratch.is_some() }

    /// Send the part of `fb` covered by `rect` to the panel.
    ///
    /// `fb` must have the controller's current geometry.
    pub fn request_update<B, DC, RST, D>(
        &mut self,
        rect: &Rect,
        fb: &Framebuffer,
        ctrl: &mut DisplayController<B, DC, RST, D>,
    ) -> Result<UpdateOutcome, Error<B::Error>>
    where
        B: DmaBus,
        DC: OutputPin,
        RST: OutputPin,
        D: DelayNs,
    {
        let geometry = ctrl.geometry();
        if fb.width() != geometry.width || fb.height() != geometry.height {
            return Err(Error::InvalidArgument);
        }
        if rect.is_empty() {
            return Ok(UpdateOutcome::Skipped);
        }
        let full = Rect::new(0, 0, i32::from(geometry.width), i32::from(geometry.height));
        if *rect == full {
            return self.stream_full(fb, ctrl);
        }

        let Some(clipped) = clip_request(rect, fb.extent()) else {
            return Ok(UpdateOutcome::Skipped);
        };
        let window = window_of(&clipped);
        if window == geometry.full_window() {
            return self.stream_full(fb, ctrl);
        }
        self.stream_partial(&window, fb, ctrl)
    }

    fn stream_full<B, DC, RST, D>(
        &mut self,
        fb: &Framebuffer,
        ctrl: &mut DisplayController<B, DC, RST, D>,
    ) -> Result<UpdateOutcome, Error<B::Error>>
    where
        B: DmaBus,
        DC: OutputPin,
        RST: OutputPin,
        D: DelayNs,
    {
        let window = ctrl.geometry().full_window();
        ctrl.set_area(&window)?;
        ctrl.write_pixels(fb.pixels(), TransferWidth::Bits32)?;
        Ok(UpdateOutcome::FullFrame)
    }

    /// Gather `window` out of `fb` and stream it.
    fn stream_partial<B, DC, RST, D>(
        &mut self,
        window: &AddressWindow,
        fb: &Framebuffer,
        ctrl: &mut DisplayController<B, DC, RST, D>,
    ) -> Result<UpdateOutcome, Error<B::Error>>
    where
        B: DmaBus,
        DC: OutputPin,
        RST: OutputPin,
        D: DelayNs,
    {
        let (cols, rows) = (window.columns(), window.rows());
        let count = window.pixel_count();
        let scratch = self.scratch()?;
        let block = scratch.get_mut(..count).ok_or(Error::InvalidArgument)?;

        let req = BlitRequest::new(
            Point::zero(),
            Point::new(i32::from(window.x1), i32::from(window.y1)),
            cols as i32,
            rows as i32,
        );
        if blit::blit(block, Extent::new(cols as i32, rows as i32), fb.pixels(), fb.extent(), &req).is_none() {
            return Ok(UpdateOutcome::Skipped);
        }

        ctrl.set_area(window)?;
        ctrl.write_pixels(block, TransferWidth::Bits32)?;
        Ok(UpdateOutcome::Partial { window: *window })
    }

    fn scratch(&mut self) -> Result<&mut Vec<u16>, AllocError> {
        let scratch = match self.scratch.take() {
            Some(scratch) => scratch,
            None => alloc_pixels(self.scratch_pixels, self.alloc_limit)?,
        };
        Ok(self.scratch.insert(scratch))
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use std::vec::Vec;

    use super::*;
    use crate::blit::Span;
    use crate::command::Orientation;
    use crate::config::PanelConfig;
    use crate::mock::{BusEvent, DcPin, MockDelay, MockPin, RecordingBus};

    type TestController = DisplayController<RecordingBus, DcPin, MockPin, MockDelay>;

    /// Portrait 240x320 controller with a numbered framebuffer.
    fn setup() -> (UpdateScheduler, Framebuffer, TestController, RecordingBus) {
        let config = PanelConfig {
            orientation: Orientation::XyRlud,
            ..PanelConfig::default()
        };
        let bus = RecordingBus::new();
        let ctrl = DisplayController::new(bus.clone(), bus.dc_pin(), None, MockDelay::new(), config);
        let mut fb = Framebuffer::new(240, 320).unwrap();
        for (i, px) in fb.pixels_mut().iter_mut().enumerate() {
            *px = i as u16;
        }
        (UpdateScheduler::new(config.pixel_count(), None), fb, ctrl, bus)
    }

    fn set_area_calls(bus: &RecordingBus) -> Vec<(u8, Vec<u8>)> {
        bus.commands().into_iter().filter(|(code, _)| *code == 0x2A || *code == 0x2B).collect()
    }

    #[test]
    fn test_full_frame_zeroes() {
        let (mut sched, mut fb, mut ctrl, bus) = setup();
        fb.fill(0);
        let outcome = sched.request_update(&Rect::new(0, 0, 240, 320), &fb, &mut ctrl).unwrap();
        assert_eq!(outcome, UpdateOutcome::FullFrame);
        assert_eq!(bus.pixel_byte_count(), 153_600);
        assert!(bus.pixels().iter().all(|&p| p == 0));
        assert!(!sched.has_scratch());
        assert_eq!(set_area_calls(&bus), [(0x2A, vec![0, 0, 0, 239]), (0x2B, vec![0, 0, 1, 0x3F])]);
    }

    #[test]
    fn test_full_frame_streams_at_32_bit() {
        let (mut sched, fb, mut ctrl, bus) = setup();
        sched.request_update(&Rect::new(0, 0, 240, 320), &fb, &mut ctrl).unwrap();
        let streams: Vec<BusEvent> =
            bus.events().into_iter().filter(|e| matches!(e, BusEvent::Pixels { .. })).collect();
        assert_eq!(streams.len(), 1);
        assert!(matches!(&streams[0], BusEvent::Pixels { bits: 32, pixels } if pixels.len() == 76_800));
    }

    #[test]
    fn test_partial_5x5() {
        let (mut sched, fb, mut ctrl, bus) = setup();
        let outcome = sched.request_update(&Rect::new(10, 10, 5, 5), &fb, &mut ctrl).unwrap();
        let window = AddressWindow { x1: 10, y1: 10, x2: 14, y2: 14 };
        assert_eq!(outcome, UpdateOutcome::Partial { window });
        assert_eq!(set_area_calls(&bus), [(0x2A, vec![0, 10, 0, 14]), (0x2B, vec![0, 10, 0, 14])]);
        assert_eq!(bus.pixel_byte_count(), 50);
        let fb = &fb;
        let expected: Vec<u16> =
            (10..15).flat_map(|y| (10..15).map(move |x| fb.get(x, y).unwrap_or_default())).collect();
        assert_eq!(bus.pixels(), expected);
        assert!(sched.has_scratch());
    }

    #[test]
    fn test_negative_origin_clips_to_seven_pixels() {
        let (mut sched, fb, mut ctrl, bus) = setup();
        let rect = Rect::new(-3, 0, 10, 1);
        let clipped = clip_request(&rect, fb.extent()).unwrap();
        assert_eq!(clipped.src_x, Span { lo: 0, hi: 6 });
        assert_eq!(clipped.dest_x, Span { lo: 3, hi: 9 });

        let outcome = sched.request_update(&rect, &fb, &mut ctrl).unwrap();
        assert_eq!(outcome, UpdateOutcome::Partial { window: AddressWindow { x1: 0, y1: 0, x2: 6, y2: 0 } });
        assert_eq!(bus.pixels(), [0, 1, 2, 3, 4, 5, 6]);
        assert_eq!(bus.pixel_byte_count(), 14);
    }

    #[test]
    fn test_empty_and_outside_skip() {
        let (mut sched, fb, mut ctrl, bus) = setup();
        for rect in [Rect::new(0, 0, 0, 5), Rect::new(0, 0, 5, -1), Rect::new(240, 0, 5, 5), Rect::new(-10, -10, 5, 5)] {
            assert_eq!(sched.request_update(&rect, &fb, &mut ctrl), Ok(UpdateOutcome::Skipped));
        }
        assert!(bus.events().is_empty());
        assert!(!sched.has_scratch());
    }

    #[test]
    fn test_oversized_request_takes_full_path() {
        let (mut sched, fb, mut ctrl, bus) = setup();
        let outcome = sched.request_update(&Rect::new(-5, -5, 300, 400), &fb, &mut ctrl).unwrap();
        assert_eq!(outcome, UpdateOutcome::FullFrame);
        assert_eq!(bus.pixels(), fb.pixels());
        assert!(!sched.has_scratch());
    }

    #[test]
    fn test_full_and_scratch_paths_byte_identical() {
        let (mut sched, fb, mut ctrl, bus) = setup();
        sched.request_update(&Rect::new(0, 0, 240, 320), &fb, &mut ctrl).unwrap();
        let direct = bus.data_bytes();
        bus.clear();

        let window = ctrl.geometry().full_window();
        let outcome = sched.stream_partial(&window, &fb, &mut ctrl).unwrap();
        assert_eq!(outcome, UpdateOutcome::Partial { window });
        assert_eq!(bus.data_bytes(), direct);
    }

    #[test]
    fn test_scratch_reused() {
        let (mut sched, fb, mut ctrl, _) = setup();
        sched.request_update(&Rect::new(1, 1, 2, 2), &fb, &mut ctrl).unwrap();
        let first = sched.scratch.as_ref().map(|s| s.as_ptr());
        sched.request_update(&Rect::new(3, 3, 4, 4), &fb, &mut ctrl).unwrap();
        assert_eq!(sched.scratch.as_ref().map(|s| s.as_ptr()), first);
    }

    #[test]
    fn test_scratch_allocation_failure_reported() {
        let (_, fb, mut ctrl, bus) = setup();
        let mut sched = UpdateScheduler::new(76_800, Some(64 * 1024));
        let err = sched.request_update(&Rect::new(10, 10, 5, 5), &fb, &mut ctrl);
        assert_eq!(err, Err(Error::OutOfMemory { bytes: 153_600 }));
        assert!(bus.events().is_empty());
        assert!(!sched.has_scratch());
    }

    #[test]
    fn test_mismatched_framebuffer_rejected() {
        let (mut sched, _, mut ctrl, bus) = setup();
        let fb = Framebuffer::new(320, 240).unwrap();
        let err = sched.request_update(&Rect::new(0, 0, 5, 5), &fb, &mut ctrl);
        assert_eq!(err, Err(Error::InvalidArgument));
        assert!(bus.events().is_empty());
    }

    #[test]
    fn test_window_maps_stream_row_major() {
        let (mut sched, fb, mut ctrl, bus) = setup();
        let rect = Rect::new(100, 200, 3, 4);
        let UpdateOutcome::Partial { window } = sched.request_update(&rect, &fb, &mut ctrl).unwrap() else {
            panic!("expected partial update");
        };
        for (k, px) in bus.pixels().into_iter().enumerate() {
            let (x, y) = window.position_of(k);
            assert_eq!(fb.get(x, y), Some(px));
        }
    }
}
