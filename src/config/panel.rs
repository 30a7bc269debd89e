//! Panel and bus configuration.
//!
//! Constants describe the ILI9341 itself and are fixed. Everything that varies per
//! board (bus channel, DMA channel, chip select, default orientation, colour order)
//! lives in [`PanelConfig`], passed to the driver at construction.

use crate::command::Orientation;

// =============================================================================
// Panel Constants
// =============================================================================

/// Native panel width in pixels (column count with no axis swap).
pub const NATIVE_WIDTH: u16 = 240;

/// Native panel height in pixels (page count with no axis swap).
pub const NATIVE_HEIGHT: u16 = 320;

/// COLMOD payload: 16 bpp on both the RGB interface (high nibble) and the MCU
/// interface (low nibble).
pub const COLMOD_RGB565: u8 = 0x55;

/// MADCTL colour-order bit (BGR when set).
pub const BGR_ORDER_BIT: u8 = 0x08;

// =============================================================================
// Bus Timing
// =============================================================================

/// SPI clock used for every transfer.
pub const BUS_CLOCK_HZ: u32 = 25_000_000;

/// How long the reset line is held low.
pub const RESET_PULSE_MS: u32 = 1;

/// Settle time after SWRESET before the controller accepts commands.
pub const SWRESET_SETTLE_MS: u32 = 100;

/// Settle time after SLPOUT for the panel driver to wake.
pub const WAKE_SETTLE_MS: u32 = 100;

// =============================================================================
// Per-instance Configuration
// =============================================================================

/// Bus-side settings handed to the peripheral once during hardware init.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct BusConfig {
    /// SPI controller index.
    pub spi_channel: u8,
    /// DMA channel used for every transfer.
    pub dma_channel: u8,
    /// Chip-select line asserted by the peripheral during transfers.
    pub chip_select: u8,
    /// SPI clock in Hz.
    pub clock_hz: u32,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            spi_channel: 0,
            dma_channel: 0,
            chip_select: 0,
            clock_hz: BUS_CLOCK_HZ,
        }
    }
}

/// Board configuration for one driver instance.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct PanelConfig {
    /// Panel width with no axis swap.
    pub native_width: u16,
    /// Panel height with no axis swap.
    pub native_height: u16,
    /// Orientation applied during bring-up.
    pub orientation: Orientation,
    /// Set the MADCTL BGR bit on every orientation write.
    ///
    /// Boards without a hardware inversion line need this.
    pub bgr_order: bool,
    /// Bus-side settings.
    pub bus: BusConfig,
    /// Largest single pixel buffer the driver may allocate, in bytes. `None` leaves
    /// the decision to the allocator.
    pub alloc_limit: Option<usize>,
}

impl PanelConfig {
    /// Framebuffer size in pixels. Independent of orientation.
    pub const fn pixel_count(&self) -> usize { self.native_width as usize * self.native_height as usize }
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            native_width: NATIVE_WIDTH,
            native_height: NATIVE_HEIGHT,
            orientation: Orientation::YxRlud,
            bgr_order: true,
            bus: BusConfig::default(),
            alloc_limit: None,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
