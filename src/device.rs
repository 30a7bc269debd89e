//! Graphic device surface: init, open/close/read/write and typed control requests.
//!
//! [`GraphicDevice`] is what a host framework dispatches through. [`Ili9341`]
//! implements it on top of the controller, framebuffer and update scheduler, and
//! keeps its own event log.

use embedded_graphics::pixelcolor::Rgb565;
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;

use crate::bus::DmaBus;
use crate::command::Orientation;
use crate::config::PanelConfig;
use crate::controller::DisplayController;
use crate::error::Error;
use crate::framebuffer::{Framebuffer, raw565};
use crate::geometry::{PanelGeometry, Rect};
use crate::log_buffer::LogBuffer;
use crate::update::{UpdateOutcome, UpdateScheduler};
use crate::{log_debug, log_error, log_info};

// =============================================================================
// Control Requests
// =============================================================================

/// Raw control codes used by host frameworks.
pub mod code {
    pub const RECT_UPDATE: i32 = 0;
    pub const POWER_ON: i32 = 1;
    pub const POWER_OFF: i32 = 2;
    pub const GET_INFO: i32 = 3;
    pub const SET_MODE: i32 = 4;
    pub const GET_EXT: i32 = 5;
}

/// Control request.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Control<'a> {
    /// Push a framebuffer rectangle to the panel. `None` is a missing argument.
    RectUpdate(Option<&'a Rect>),
    PowerOn,
    PowerOff,
    /// Report the live panel geometry.
    GetInfo,
    SetMode,
    GetExt,
    /// Code this device does not know.
    Unknown(i32),
}

impl<'a> Control<'a> {
    /// Decode a raw control code. `rect` is only read by rectangle updates.
    pub const fn from_raw(
        raw: i32,
        rect: Option<&'a Rect>,
    ) -> Self {
        match raw {
            code::RECT_UPDATE => Self::RectUpdate(rect),
            code::POWER_ON => Self::PowerOn,
            code::POWER_OFF => Self::PowerOff,
            code::GET_INFO => Self::GetInfo,
            code::SET_MODE => Self::SetMode,
            code::GET_EXT => Self::GetExt,
            other => Self::Unknown(other),
        }
    }
}

/// Successful control result.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Reply {
    /// Accepted with nothing to report.
    Done,
    /// A rectangle update ran.
    Updated(UpdateOutcome),
    /// Current geometry.
    Info(PanelGeometry),
}

/// Operations a host framework dispatches to a display device.
pub trait GraphicDevice {
    type Error;

    /// Bring the device up. Must succeed before any other operation is useful.
    fn init(&mut self) -> Result<(), Self::Error>;

    fn open(&mut self) -> Result<(), Self::Error> { Ok(()) }

    fn close(&mut self) -> Result<(), Self::Error> { Ok(()) }

    /// Byte reads are not part of this device; always returns 0.
    fn read(
        &mut self,
        _pos: usize,
        _buf: &mut [u8],
    ) -> Result<usize, Self::Error> {
        Ok(0)
    }

    /// Byte writes are not part of this device; always returns 0.
    fn write(
        &mut self,
        _pos: usize,
        _buf: &[u8],
    ) -> Result<usize, Self::Error> {
        Ok(0)
    }

    fn control(
        &mut self,
        request: Control<'_>,
    ) -> Result<Reply, Self::Error>;
}

// =============================================================================
// Driver
// =============================================================================

/// ILI9341 panel with an owned RGB565 framebuffer.
pub struct Ili9341<B, DC, RST, D> {
    controller: DisplayController<B, DC, RST, D>,
    framebuffer: Option<Framebuffer>,
    scheduler: UpdateScheduler,
    log: LogBuffer,
}

impl<B, DC, RST, D> Ili9341<B, DC, RST, D>
where
    B: DmaBus,
    DC: OutputPin,
    RST: OutputPin,
    D: DelayNs,
{
    /// Create the driver. Hardware is untouched until [`GraphicDevice::init`].
    pub fn new(
        bus: B,
        dc: DC,
        reset: Option<RST>,
        delay: D,
        config: PanelConfig,
    ) -> Self {
        Self {
            controller: DisplayController::new(bus, dc, reset, delay, config),
            framebuffer: None,
            scheduler: UpdateScheduler::new(config.pixel_count(), config.alloc_limit),
            log: LogBuffer::new(),
        }
    }

    #[inline]
    pub const fn geometry(&self) -> PanelGeometry { self.controller.geometry() }

    /// Recent driver events.
    #[inline]
    pub const fn logs(&self) -> &LogBuffer { &self.log }

    /// Whether bring-up has completed.
    #[inline]
    pub const fn is_ready(&self) -> bool { self.framebuffer.is_some() }

    pub fn framebuffer(&self) -> Option<&Framebuffer> { self.framebuffer.as_ref() }

    /// Framebuffer to draw into before requesting an update.
    pub fn framebuffer_mut(&mut self) -> Option<&mut Framebuffer> { self.framebuffer.as_mut() }

    /// Borrow the command layer.
    pub fn controller(&self) -> &DisplayController<B, DC, RST, D> { &self.controller }

    /// Push `rect` of the framebuffer to the panel.
    pub fn update(
        &mut self,
        rect: &Rect,
    ) -> Result<UpdateOutcome, Error<B::Error>> {
        let fb = self.framebuffer.as_ref().ok_or(Error::NotInitialized)?;
        match self.scheduler.request_update(rect, fb, &mut self.controller) {
            Ok(UpdateOutcome::Skipped) => {
                log_debug!(self.log, "Update {}x{} skipped", rect.width, rect.height);
                Ok(UpdateOutcome::Skipped)
            }
            Err(Error::OutOfMemory { bytes }) => {
                log_error!(self.log, "Scratch alloc failed ({} B)", bytes);
                Err(Error::OutOfMemory { bytes })
            }
            other => other,
        }
    }

    /// Fill the framebuffer and the panel with one color.
    pub fn clear(
        &mut self,
        color: Rgb565,
    ) -> Result<(), Error<B::Error>> {
        let fb = self.framebuffer.as_mut().ok_or(Error::NotInitialized)?;
        let raw = raw565(color);
        fb.fill(raw);
        self.controller.clear(raw)
    }

    /// Set one pixel in the framebuffer and on the panel.
    pub fn set_pixel(
        &mut self,
        x: u16,
        y: u16,
        color: Rgb565,
    ) -> Result<(), Error<B::Error>> {
        let fb = self.framebuffer.as_mut().ok_or(Error::NotInitialized)?;
        let raw = raw565(color);
        fb.set(x, y, raw);
        self.controller.set_pixel(x, y, raw)
    }

    /// Change orientation on a running panel.
    ///
    /// The framebuffer keeps its contents and takes the new width and height.
    pub fn set_orientation(
        &mut self,
        orientation: Orientation,
    ) -> Result<(), Error<B::Error>> {
        let fb = self.framebuffer.as_mut().ok_or(Error::NotInitialized)?;
        self.controller.set_direction(orientation)?;
        let geometry = self.controller.geometry();
        fb.reshape(geometry.width, geometry.height);
        log_debug!(self.log, "Orientation {} -> {}x{}", orientation.bits(), geometry.width, geometry.height);
        Ok(())
    }

    /// Release the hardware.
    pub fn release(self) -> (B, DC, Option<RST>, D) { self.controller.release() }
}

impl<B, DC, RST, D> GraphicDevice for Ili9341<B, DC, RST, D>
where
    B: DmaBus,
    DC: OutputPin,
    RST: OutputPin,
    D: DelayNs,
{
    type Error = Error<B::Error>;

    fn init(&mut self) -> Result<(), Self::Error> {
        self.framebuffer = None;
        log_info!(self.log, "Bring-up at {} Hz", self.controller.config().bus.clock_hz);
        self.controller.power_up()?;

        let geometry = self.controller.geometry();
        let limit = self.controller.config().alloc_limit;
        let mut fb = match Framebuffer::with_limit(geometry.width, geometry.height, limit) {
            Ok(fb) => fb,
            Err(err) => {
                log_error!(self.log, "Framebuffer alloc failed ({} B)", err.bytes);
                return Err(err.into());
            }
        };

        // The device only counts as ready once the panel is on and blank
        let black = raw565(Rgb565::new(0, 0, 0));
        fb.fill(black);
        if let Err(err) = self.controller.display_on().and_then(|()| self.controller.clear(black)) {
            log_error!(self.log, "Display on failed");
            return Err(err);
        }
        self.framebuffer = Some(fb);
        log_info!(self.log, "Panel ready {}x{}", geometry.width, geometry.height);
        Ok(())
    }

    fn control(
        &mut self,
        request: Control<'_>,
    ) -> Result<Reply, Self::Error> {
        match request {
            Control::RectUpdate(Some(rect)) => self.update(rect).map(Reply::Updated),
            Control::RectUpdate(None) => {
                log_error!(self.log, "Rect update without rectangle");
                Err(Error::InvalidArgument)
            }
            Control::GetInfo => Ok(Reply::Info(self.geometry())),
            Control::PowerOn | Control::PowerOff | Control::SetMode | Control::GetExt => Err(Error::NotSupported),
            Control::Unknown(raw) => {
                log_error!(self.log, "Unknown control {}", raw);
                Ok(Reply::Done)
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use std::vec::Vec;

    use embedded_graphics::prelude::*;
    use embedded_graphics::primitives::{PrimitiveStyle, Rectangle};

    use super::*;
    use crate::geometry::PixelFormat;
    use crate::log_buffer::LogLevel;
    use crate::mock::{BusEvent, DcPin, MockDelay, MockPin, RecordingBus};

    type TestDevice = Ili9341<RecordingBus, DcPin, MockPin, MockDelay>;

    fn device() -> (TestDevice, RecordingBus) {
        let bus = RecordingBus::new();
        let dev = Ili9341::new(bus.clone(), bus.dc_pin(), Some(MockPin::new()), MockDelay::new(), PanelConfig::default());
        (dev, bus)
    }

    fn ready_device() -> (TestDevice, RecordingBus) {
        let (mut dev, bus) = device();
        dev.init().unwrap();
        bus.clear();
        (dev, bus)
    }

    #[test]
    fn test_init_sequence() {
        let (mut dev, bus) = device();
        dev.init().unwrap();
        assert_eq!(bus.opcodes(), [0x01, 0x11, 0x3A, 0x36, 0x29, 0x2A, 0x2B, 0x2C]);
        assert!(bus.events().contains(&BusEvent::Fill { word: 0, count: 38_400 }));
        assert!(dev.is_ready());
        let fb = dev.framebuffer().unwrap();
        assert_eq!((fb.width(), fb.height()), (320, 240));
        assert_eq!(dev.logs().last().map(|e| e.message.as_str()), Some("Panel ready 320x240"));
    }

    #[test]
    fn test_failed_display_on_leaves_device_down() {
        // Count the peripheral calls bring-up makes before DISPON
        let reference_bus = RecordingBus::new();
        let mut ctrl = DisplayController::new(
            reference_bus.clone(),
            reference_bus.dc_pin(),
            Some(MockPin::new()),
            MockDelay::new(),
            PanelConfig::default(),
        );
        ctrl.power_up().unwrap();

        let (mut dev, mut bus) = device();
        bus.fail_after(reference_bus.calls());
        assert!(matches!(dev.init(), Err(Error::Bus(_))));
        assert!(!bus.opcodes().contains(&0x29));
        assert!(!dev.is_ready());
        assert!(dev.framebuffer().is_none());
        assert_eq!(dev.update(&Rect::new(0, 0, 4, 4)), Err(Error::NotInitialized));
        assert_eq!(dev.logs().last().map(|e| e.level), Some(LogLevel::Error));
    }

    #[test]
    fn test_failed_clear_leaves_device_down() {
        let (mut dev, bus) = device();
        dev.init().unwrap();
        let fill_at = bus
            .events()
            .iter()
            .filter(|e| !matches!(e, BusEvent::Dc(_)))
            .position(|e| matches!(e, BusEvent::Fill { .. }))
            .unwrap();

        let (mut dev, mut bus) = device();
        bus.fail_after(fill_at);
        assert!(matches!(dev.init(), Err(Error::Bus(_))));
        assert!(bus.opcodes().contains(&0x29));
        assert!(!bus.events().iter().any(|e| matches!(e, BusEvent::Fill { .. })));
        assert!(!dev.is_ready());
        assert_eq!(dev.clear(Rgb565::BLACK), Err(Error::NotInitialized));
    }

    #[test]
    fn test_framebuffer_alloc_failure_aborts_init() {
        let config = PanelConfig {
            alloc_limit: Some(64 * 1024),
            ..PanelConfig::default()
        };
        let bus = RecordingBus::new();
        let mut dev: TestDevice = Ili9341::new(bus.clone(), bus.dc_pin(), Some(MockPin::new()), MockDelay::new(), config);
        assert_eq!(dev.init(), Err(Error::OutOfMemory { bytes: 153_600 }));
        assert_eq!(bus.opcodes(), [0x01, 0x11, 0x3A, 0x36]);
        assert!(!dev.is_ready());
        let last = dev.logs().last().unwrap();
        assert_eq!(last.level, LogLevel::Error);
        assert_eq!(last.message.as_str(), "Framebuffer alloc failed (153600 B)");
    }

    #[test]
    fn test_requests_before_init() {
        let (mut dev, bus) = device();
        let rect = Rect::new(0, 0, 4, 4);
        assert_eq!(dev.control(Control::RectUpdate(Some(&rect))), Err(Error::NotInitialized));
        assert_eq!(dev.clear(Rgb565::BLACK), Err(Error::NotInitialized));
        assert!(bus.events().is_empty());
    }

    #[test]
    fn test_null_rect_is_invalid_and_silent_on_bus() {
        let (mut dev, bus) = ready_device();
        assert_eq!(dev.control(Control::RectUpdate(None)), Err(Error::InvalidArgument));
        assert!(bus.events().is_empty());
        assert_eq!(dev.logs().last().map(|e| e.level), Some(LogLevel::Error));
    }

    #[test]
    fn test_get_info_live_geometry() {
        let (mut dev, _) = ready_device();
        let Ok(Reply::Info(info)) = dev.control(Control::GetInfo) else {
            panic!("expected info reply");
        };
        assert_eq!((info.width, info.height), (320, 240));
        assert_eq!(info.bits_per_pixel, 16);
        assert_eq!(info.pixel_format, PixelFormat::Rgb565);

        dev.set_orientation(Orientation::XyRlud).unwrap();
        let Ok(Reply::Info(info)) = dev.control(Control::GetInfo) else {
            panic!("expected info reply");
        };
        assert_eq!((info.width, info.height), (240, 320));
    }

    #[test]
    fn test_unsupported_controls() {
        let (mut dev, bus) = ready_device();
        for request in [Control::PowerOn, Control::PowerOff, Control::SetMode, Control::GetExt] {
            assert_eq!(dev.control(request), Err(Error::NotSupported));
        }
        assert!(bus.events().is_empty());
    }

    #[test]
    fn test_unknown_control_logged() {
        let (mut dev, bus) = ready_device();
        assert_eq!(dev.control(Control::from_raw(42, None)), Ok(Reply::Done));
        assert!(bus.events().is_empty());
        let last = dev.logs().last().unwrap();
        assert_eq!(last.level, LogLevel::Error);
        assert_eq!(last.message.as_str(), "Unknown control 42");
    }

    #[test]
    fn test_from_raw() {
        let rect = Rect::new(1, 2, 3, 4);
        assert_eq!(Control::from_raw(0, Some(&rect)), Control::RectUpdate(Some(&rect)));
        assert_eq!(Control::from_raw(0, None), Control::RectUpdate(None));
        assert_eq!(Control::from_raw(1, None), Control::PowerOn);
        assert_eq!(Control::from_raw(2, None), Control::PowerOff);
        assert_eq!(Control::from_raw(3, None), Control::GetInfo);
        assert_eq!(Control::from_raw(4, None), Control::SetMode);
        assert_eq!(Control::from_raw(5, None), Control::GetExt);
        assert_eq!(Control::from_raw(-1, None), Control::Unknown(-1));
    }

    #[test]
    fn test_draw_then_update() {
        let (mut dev, bus) = ready_device();
        if let Some(fb) = dev.framebuffer_mut() {
            Rectangle::new(Point::new(10, 10), Size::new(5, 5))
                .into_styled(PrimitiveStyle::with_fill(Rgb565::RED))
                .draw(fb)
                .unwrap();
        }
        let rect = Rect::new(10, 10, 5, 5);
        let reply = dev.control(Control::RectUpdate(Some(&rect))).unwrap();
        assert!(matches!(reply, Reply::Updated(UpdateOutcome::Partial { .. })));
        assert_eq!(bus.pixels(), vec![0xF800; 25]);
    }

    #[test]
    fn test_clear_keeps_framebuffer_consistent() {
        let (mut dev, bus) = ready_device();
        dev.clear(Rgb565::WHITE).unwrap();
        assert!(dev.framebuffer().unwrap().pixels().iter().all(|&p| p == 0xFFFF));
        bus.clear();
        dev.update(&Rect::new(0, 0, 2, 1)).unwrap();
        assert_eq!(bus.pixels(), [0xFFFF, 0xFFFF]);
    }

    #[test]
    fn test_set_pixel_writes_both() {
        let (mut dev, bus) = ready_device();
        dev.set_pixel(3, 4, Rgb565::BLUE).unwrap();
        assert_eq!(dev.framebuffer().unwrap().get(3, 4), Some(0x001F));
        assert_eq!(bus.pixels(), [0x001F]);
    }

    #[test]
    fn test_set_orientation_reshapes() {
        let (mut dev, bus) = ready_device();
        dev.set_orientation(Orientation::XyLrdu).unwrap();
        let fb = dev.framebuffer().unwrap();
        assert_eq!((fb.width(), fb.height()), (240, 320));
        assert_eq!(bus.commands(), [(0x36, vec![0xC8])]);
        let full = Rect::new(0, 0, 240, 320);
        assert_eq!(dev.update(&full), Ok(UpdateOutcome::FullFrame));
    }

    #[test]
    fn test_skipped_update_logged() {
        let (mut dev, bus) = ready_device();
        assert_eq!(dev.update(&Rect::new(400, 0, 4, 4)), Ok(UpdateOutcome::Skipped));
        assert!(bus.events().is_empty());
        assert_eq!(dev.logs().last().map(|e| e.level), Some(LogLevel::Debug));
    }

    #[test]
    fn test_bus_failure_propagates() {
        let (mut dev, mut bus) = ready_device();
        bus.fail_next();
        let rect = Rect::new(0, 0, 4, 4);
        assert!(matches!(dev.update(&rect), Err(Error::Bus(_))));
    }

    #[test]
    fn test_default_surface_ops() {
        let (mut dev, bus) = ready_device();
        let mut buf = [0u8; 4];
        assert_eq!(dev.open(), Ok(()));
        assert_eq!(dev.read(0, &mut buf), Ok(0));
        assert_eq!(dev.write(0, &buf), Ok(0));
        assert_eq!(dev.close(), Ok(()));
        let events: Vec<BusEvent> = bus.events();
        assert!(events.is_empty());
    }
}
