//! RP2350 bus for an ILI9341 breakout on SPI0.
//!
//! Pin mapping:
//! - DC: GPIO16
//! - CS: GPIO17 (driven around every transfer)
//! - CLK: GPIO18 (SPI0 CLK)
//! - MOSI: GPIO19 (SPI0 TX)
//! - Backlight: GPIO20
//! - Reset: GPIO21
//!
//! The RP2350 SPI block shifts at most 16 bits per frame, so wider framing is
//! realised as a byte stream with the same on-wire order: each RGB565 pixel high
//! byte first, which is what the panel expects in 16 bpp mode.

use embassy_futures::block_on;
use embassy_rp::gpio::Output;
use embassy_rp::peripherals::SPI0;
use embassy_rp::spi::{Async, Config as SpiConfig, Error as SpiError, Spi};
use ili9341_fb::config::{BUS_CLOCK_HZ, BusConfig};
use ili9341_fb::{DmaBus, Framing};

/// Pixels converted per DMA transfer.
const CHUNK_PIXELS: usize = 256;

/// SPI configuration for the ILI9341.
pub fn display_spi_config() -> SpiConfig {
    let mut config = SpiConfig::default();
    config.frequency = BUS_CLOCK_HZ;
    config
}

/// SPI0 with DMA, blocking on each transfer.
pub struct RpDmaBus<'d> {
    spi: Spi<'d, SPI0, Async>,
    cs: Output<'d>,
    framing: Option<Framing>,
    chunk: [u8; CHUNK_PIXELS * 2],
}

impl<'d> RpDmaBus<'d> {
    pub fn new(
        spi: Spi<'d, SPI0, Async>,
        cs: Output<'d>,
    ) -> Self {
        Self {
            spi,
            cs,
            framing: None,
            chunk: [0; CHUNK_PIXELS * 2],
        }
    }

    /// One DMA transfer with CS held low, waiting for completion.
    fn transfer(
        spi: &mut Spi<'d, SPI0, Async>,
        cs: &mut Output<'d>,
        data: &[u8],
    ) -> Result<(), SpiError> {
        cs.set_low();
        let result = block_on(spi.write(data));
        cs.set_high();
        result
    }
}

impl DmaBus for RpDmaBus<'_> {
    type Error = SpiError;

    fn init(
        &mut self,
        config: &BusConfig,
    ) -> Result<(), SpiError> {
        self.spi.set_frequency(config.clock_hz);
        self.cs.set_high();
        defmt::info!("SPI{} at {} Hz, DMA{}", config.spi_channel, config.clock_hz, config.dma_channel);
        Ok(())
    }

    fn configure(
        &mut self,
        framing: Framing,
    ) -> Result<(), SpiError> {
        self.framing = Some(framing);
        Ok(())
    }

    fn write_bytes(
        &mut self,
        data: &[u8],
    ) -> Result<(), SpiError> {
        Self::transfer(&mut self.spi, &mut self.cs, data)
    }

    fn write_pixels(
        &mut self,
        pixels: &[u16],
    ) -> Result<(), SpiError> {
        // 32-bit frames carry whole pixel pairs
        defmt::debug_assert!(self.framing.is_none_or(|f| f.frame_bits != 32 || pixels.len() % 2 == 0));
        for run in pixels.chunks(CHUNK_PIXELS) {
            for (dst, px) in self.chunk.chunks_exact_mut(2).zip(run) {
                dst.copy_from_slice(&px.to_be_bytes());
            }
            Self::transfer(&mut self.spi, &mut self.cs, &self.chunk[..run.len() * 2])?;
        }
        Ok(())
    }

    fn fill(
        &mut self,
        word: u32,
        count: usize,
    ) -> Result<(), SpiError> {
        let bytes = word.to_be_bytes();
        for dst in self.chunk.chunks_exact_mut(4) {
            dst.copy_from_slice(&bytes);
        }
        let words_per_chunk = self.chunk.len() / 4;
        let mut remaining = count;
        while remaining > 0 {
            let n = remaining.min(words_per_chunk);
            Self::transfer(&mut self.spi, &mut self.cs, &self.chunk[..n * 4])?;
            remaining -= n;
        }
        Ok(())
    }
}
