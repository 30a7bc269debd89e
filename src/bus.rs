//! Command/data framing over a width-switchable SPI bus with DMA.
//!
//! The physical peripheral is abstracted by [`DmaBus`]: it can be reconfigured to
//! a frame width and transfers a run of frames, blocking until the DMA transfer
//! completes. [`BusTransport`] sits on top and owns the data/command line. Every
//! call selects the line level, reframes the bus for the declared width, then
//! transfers.
//!
//! # Frame widths
//!
//! | Width | Framing field | Used for |
//! |-------|---------------|----------|
//! | 8-bit | instruction length 8 | commands, parameters |
//! | 16-bit | instruction length 16 | single pixels, odd tails |
//! | 32-bit | address length 32 | pixel streams, fills |
//!
//! The instruction-length and address-length fields are alternatives of the same
//! configuration register and never set together, which [`FramePhase`] encodes.

use embedded_hal::digital::OutputPin;
use embedded_hal::spi::{MODE_0, Mode};

use crate::config::BusConfig;
use crate::error::Error;

/// Pixels per chunk when a pixel run is sent as 8-bit frames.
const BYTE_CHUNK_PIXELS: usize = 32;

// =============================================================================
// Framing
// =============================================================================

/// Width of each element on the bus.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum TransferWidth {
    Bits8,
    Bits16,
    Bits32,
}

impl TransferWidth {
    /// Frame size in bits.
    #[inline]
    pub const fn bits(self) -> u8 {
        match self {
            Self::Bits8 => 8,
            Self::Bits16 => 16,
            Self::Bits32 => 32,
        }
    }

    /// Bus configuration for this width.
    pub const fn framing(self) -> Framing {
        let phase = match self {
            Self::Bits8 | Self::Bits16 => FramePhase::Instruction(self.bits()),
            Self::Bits32 => FramePhase::Address(self.bits()),
        };
        Framing {
            mode: MODE_0,
            frame_bits: self.bits(),
            phase,
            wait_cycles: 0,
        }
    }
}

/// Which framing field carries the frame length.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum FramePhase {
    /// Instruction-length field, in bits.
    Instruction(u8),
    /// Address-length field, in bits.
    Address(u8),
}

/// Per-transfer bus configuration.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Framing {
    /// Clock polarity and phase.
    pub mode: Mode,
    /// Bits per frame.
    pub frame_bits: u8,
    /// Length field in use.
    pub phase: FramePhase,
    /// Dummy cycles between phases.
    pub wait_cycles: u8,
}

// =============================================================================
// Peripheral Capability
// =============================================================================

/// Serial peripheral with DMA-driven, blocking transfers.
///
/// Chip select is asserted by the peripheral for the duration of each transfer.
/// All transfer methods return only after the DMA transfer has completed.
pub trait DmaBus {
    /// Peripheral error.
    type Error;

    /// One-time setup: clock rate, channel selection.
    fn init(
        &mut self,
        config: &BusConfig,
    ) -> Result<(), Self::Error>;

    /// Reframe subsequent transfers.
    fn configure(
        &mut self,
        framing: Framing,
    ) -> Result<(), Self::Error>;

    /// Send bytes, one per 8-bit frame.
    fn write_bytes(
        &mut self,
        data: &[u8],
    ) -> Result<(), Self::Error>;

    /// Send RGB565 pixels at the current frame width.
    ///
    /// With 16-bit frames each frame is one pixel. With 32-bit frames each frame
    /// packs two pixels, the first in the high half, so pixels reach the panel in
    /// slice order. The slice length is even for 32-bit frames.
    fn write_pixels(
        &mut self,
        pixels: &[u16],
    ) -> Result<(), Self::Error>;

    /// Send the same 32-bit frame `count` times without a source buffer.
    fn fill(
        &mut self,
        word: u32,
        count: usize,
    ) -> Result<(), Self::Error>;
}

// =============================================================================
// Transport
// =============================================================================

/// Frames commands and data for the panel controller.
pub struct BusTransport<B, DC> {
    bus: B,
    dc: DC,
}

impl<B, DC> BusTransport<B, DC>
where
    B: DmaBus,
    DC: OutputPin,
{
    /// Wrap a peripheral and its data/command line.
    pub fn new(
        bus: B,
        dc: DC,
    ) -> Self {
        Self { bus, dc }
    }

    /// Initialise the peripheral at 8-bit framing and park the DC line high.
    pub fn init(
        &mut self,
        config: &BusConfig,
    ) -> Result<(), Error<B::Error>> {
        self.dc.set_high().map_err(Error::pin)?;
        self.bus.init(config).map_err(Error::Bus)?;
        self.bus.configure(TransferWidth::Bits8.framing()).map_err(Error::Bus)
    }

    /// Send a command byte (DC low).
    pub fn send_command(
        &mut self,
        code: u8,
    ) -> Result<(), Error<B::Error>> {
        self.dc.set_low().map_err(Error::pin)?;
        self.reframe(TransferWidth::Bits8)?;
        self.bus.write_bytes(&[code]).map_err(Error::Bus)
    }

    /// Send parameter bytes (DC high, 8-bit frames).
    pub fn send_data(
        &mut self,
        data: &[u8],
    ) -> Result<(), Error<B::Error>> {
        self.dc.set_high().map_err(Error::pin)?;
        self.reframe(TransferWidth::Bits8)?;
        self.bus.write_bytes(data).map_err(Error::Bus)
    }

    /// Send a pixel run (DC high) at the given width.
    ///
    /// At 32-bit width an odd trailing pixel goes out as one 16-bit frame, so the
    /// byte count is always `pixels.len() * 2`. At 8-bit width each pixel is sent
    /// high byte first.
    pub fn send_pixels(
        &mut self,
        pixels: &[u16],
        width: TransferWidth,
    ) -> Result<(), Error<B::Error>> {
        self.dc.set_high().map_err(Error::pin)?;
        match width {
            TransferWidth::Bits8 => {
                self.reframe(width)?;
                let mut chunk = [0u8; BYTE_CHUNK_PIXELS * 2];
                for run in pixels.chunks(BYTE_CHUNK_PIXELS) {
                    for (dst, px) in chunk.chunks_exact_mut(2).zip(run) {
                        dst.copy_from_slice(&px.to_be_bytes());
                    }
                    self.bus.write_bytes(&chunk[..run.len() * 2]).map_err(Error::Bus)?;
                }
                Ok(())
            }
            TransferWidth::Bits16 => {
                self.reframe(width)?;
                self.bus.write_pixels(pixels).map_err(Error::Bus)
            }
            TransferWidth::Bits32 => {
                let paired = pixels.len() & !1;
                if paired > 0 {
                    self.reframe(width)?;
                    self.bus.write_pixels(&pixels[..paired]).map_err(Error::Bus)?;
                }
                if paired < pixels.len() {
                    self.reframe(TransferWidth::Bits16)?;
                    self.bus.write_pixels(&pixels[paired..]).map_err(Error::Bus)?;
                }
                Ok(())
            }
        }
    }

    /// Broadcast one 32-bit word `count` times (DC high).
    pub fn fill_data(
        &mut self,
        word: u32,
        count: usize,
    ) -> Result<(), Error<B::Error>> {
        self.dc.set_high().map_err(Error::pin)?;
        self.reframe(TransferWidth::Bits32)?;
        self.bus.fill(word, count).map_err(Error::Bus)
    }

    /// Borrow the peripheral.
    pub fn bus(&self) -> &B { &self.bus }

    /// Release the peripheral and DC line.
    pub fn release(self) -> (B, DC) { (self.bus, self.dc) }

    fn reframe(
        &mut self,
        width: TransferWidth,
    ) -> Result<(), Error<B::Error>> {
        self.bus.configure(width.framing()).map_err(Error::Bus)
    }
}

// =============================================================================
// Tests
// =============================================================================
