//! ILI9341 command sequencing: bring-up, orientation, address windows, fills.
//!
//! # Bring-up order
//!
//! | Step | Command | Settle |
//! |------|---------|--------|
//! | Hardware reset | RST low, then high | 1 ms |
//! | Software reset | `0x01` | 100 ms |
//! | Sleep out | `0x11` | 100 ms |
//! | Pixel format | `0x3A` + `0x55` | |
//! | Orientation | `0x36` + MADCTL | |
//! | Display on | `0x29` | |
//!
//! The framebuffer is allocated between orientation and display-on by the device
//! layer, then the panel is cleared.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{ErrorType, OutputPin};

use crate::bus::{BusTransport, DmaBus, TransferWidth};
use crate::command::{Command, Orientation};
use crate::config::{COLMOD_RGB565, PanelConfig, RESET_PULSE_MS, SWRESET_SETTLE_MS, WAKE_SETTLE_MS};
use crate::error::Error;
use crate::geometry::{AddressWindow, PanelGeometry};

/// Stand-in for boards whose reset line is tied to the MCU reset.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoResetPin;

impl ErrorType for NoResetPin {
    type Error = core::convert::Infallible;
}

impl OutputPin for NoResetPin {
    fn set_low(&mut self) -> Result<(), Self::Error> { Ok(()) }

    fn set_high(&mut self) -> Result<(), Self::Error> { Ok(()) }
}

/// Pack one RGB565 color twice into a 32-bit fill word.
#[inline]
pub const fn fill_word(color: u16) -> u32 { ((color as u32) << 16) | color as u32 }

/// Command layer for one panel.
pub struct DisplayController<B, DC, RST, D> {
    transport: BusTransport<B, DC>,
    reset: Option<RST>,
    delay: D,
    config: PanelConfig,
    orientation: Orientation,
    geometry: PanelGeometry,
}

impl<B, DC, RST, D> DisplayController<B, DC, RST, D>
where
    B: DmaBus,
    DC: OutputPin,
    RST: OutputPin,
    D: DelayNs,
{
    /// Take ownership of the bus, control lines and delay. Nothing is sent yet.
    pub fn new(
        bus: B,
        dc: DC,
        reset: Option<RST>,
        delay: D,
        config: PanelConfig,
    ) -> Self {
        Self {
            transport: BusTransport::new(bus, dc),
            reset,
            delay,
            orientation: config.orientation,
            geometry: PanelGeometry::new(config.native_width, config.native_height, config.orientation),
            config,
        }
    }

    #[inline]
    pub const fn geometry(&self) -> PanelGeometry { self.geometry }

    #[inline]
    pub const fn orientation(&self) -> Orientation { self.orientation }

    #[inline]
    pub const fn config(&self) -> &PanelConfig { &self.config }

    /// Borrow the bus peripheral.
    pub fn bus(&self) -> &B { self.transport.bus() }

    // =========================================================================
    // Bring-up
    // =========================================================================

    /// Bus and line setup: DC high, reset released, peripheral at 8-bit framing.
    pub fn hw_init(&mut self) -> Result<(), Error<B::Error>> {
        self.transport.init(&self.config.bus)?;
        if let Some(reset) = self.reset.as_mut() {
            reset.set_high().map_err(Error::pin)?;
        }
        Ok(())
    }

    /// Pulse the reset line if the board has one.
    pub fn hard_reset(&mut self) -> Result<(), Error<B::Error>> {
        if let Some(reset) = self.reset.as_mut() {
            reset.set_low().map_err(Error::pin)?;
            self.delay.delay_ms(RESET_PULSE_MS);
            reset.set_high().map_err(Error::pin)?;
        }
        Ok(())
    }

    /// SWRESET, then wait for the controller to reload its defaults.
    pub fn software_reset(&mut self) -> Result<(), Error<B::Error>> {
        self.command(Command::SoftwareReset, &[])?;
        self.delay.delay_ms(SWRESET_SETTLE_MS);
        Ok(())
    }

    /// Leave sleep mode and wait for the panel driver to start.
    pub fn wake(&mut self) -> Result<(), Error<B::Error>> {
        self.command(Command::SleepOff, &[])?;
        self.delay.delay_ms(WAKE_SETTLE_MS);
        Ok(())
    }

    /// RGB565 on both interfaces.
    pub fn set_pixel_format(&mut self) -> Result<(), Error<B::Error>> {
        self.command(Command::PixelFormatSet, &[COLMOD_RGB565])
    }

    /// Write MADCTL for `orientation` and update the geometry.
    pub fn set_direction(
        &mut self,
        orientation: Orientation,
    ) -> Result<(), Error<B::Error>> {
        self.command(Command::MemoryAccessControl, &[orientation.madctl(self.config.bgr_order)])?;
        self.orientation = orientation;
        self.geometry = PanelGeometry::new(self.config.native_width, self.config.native_height, orientation);
        Ok(())
    }

    pub fn display_on(&mut self) -> Result<(), Error<B::Error>> { self.command(Command::DisplayOn, &[]) }

    /// Reset, wake and configure. Everything before framebuffer allocation.
    pub fn power_up(&mut self) -> Result<(), Error<B::Error>> {
        self.hw_init()?;
        self.hard_reset()?;
        self.software_reset()?;
        self.wake()?;
        self.set_pixel_format()?;
        self.set_direction(self.config.orientation)
    }

    // =========================================================================
    // Drawing
    // =========================================================================

    /// Program the address window and arm memory write.
    ///
    /// The next pixel stream fills `window` row-major.
    pub fn set_area(
        &mut self,
        window: &AddressWindow,
    ) -> Result<(), Error<B::Error>> {
        if !self.geometry.contains(window) {
            return Err(Error::InvalidArgument);
        }
        self.command(Command::HorizontalAddressSet, &window.column_payload())?;
        self.command(Command::VerticalAddressSet, &window.page_payload())?;
        self.command(Command::MemoryWrite, &[])
    }

    /// Stream pixels into the window armed by [`Self::set_area`].
    pub fn write_pixels(
        &mut self,
        pixels: &[u16],
        width: TransferWidth,
    ) -> Result<(), Error<B::Error>> {
        self.transport.send_pixels(pixels, width)
    }

    /// Fill the whole panel with one color without a source buffer.
    pub fn clear(
        &mut self,
        color: u16,
    ) -> Result<(), Error<B::Error>> {
        let pixels = self.geometry.pixel_count();
        let window = self.geometry.full_window();
        self.set_area(&window)?;
        self.transport.fill_data(fill_word(color), pixels / 2)?;
        if pixels % 2 == 1 {
            self.transport.send_pixels(&[color], TransferWidth::Bits16)?;
        }
        Ok(())
    }

    /// Write one pixel straight to the panel.
    pub fn set_pixel(
        &mut self,
        x: u16,
        y: u16,
        color: u16,
    ) -> Result<(), Error<B::Error>> {
        self.set_area(&AddressWindow { x1: x, y1: y, x2: x, y2: y })?;
        self.transport.send_pixels(&[color], TransferWidth::Bits16)
    }

    /// Send a command byte followed by its parameters, if any.
    pub fn command(
        &mut self,
        command: Command,
        params: &[u8],
    ) -> Result<(), Error<B::Error>> {
        self.transport.send_command(command.opcode())?;
        if !params.is_empty() {
            self.transport.send_data(params)?;
        }
        Ok(())
    }

    /// Release the hardware.
    pub fn release(self) -> (B, DC, Option<RST>, D) {
        let (bus, dc) = self.transport.release();
        (bus, dc, self.reset, self.delay)
    }
}

// =============================================================================
// Tests
// =============================================================================
