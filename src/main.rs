//! ILI9341 demo firmware for Raspberry Pi Pico 2 (RP2350)
//!
//! Brings the panel up, then bounces a square around the screen. Each frame only
//! the rectangle covering the old and new square positions is pushed, so the
//! partial-update path does the work. Every few hundred frames the whole frame
//! is redrawn and pushed through the full-frame path.

#![no_std]
#![no_main]
// Crate-level lints (match lib.rs for consistency)
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::cast_sign_loss)]

extern crate alloc;

mod board;
mod memory;

use defmt::{error, info};
use embassy_executor::Spawner;
use embassy_rp::gpio::{Level, Output};
use embassy_rp::spi::Spi;
use embassy_time::{Delay, Timer};
use embedded_graphics::pixelcolor::Rgb565;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::{PrimitiveStyle, Rectangle};
use ili9341_fb::{Control, GraphicDevice, Ili9341, PanelConfig, Rect, Reply, UpdateOutcome};
use linked_list_allocator::LockedHeap;
use {defmt_rtt as _, panic_probe as _};

use crate::board::{RpDmaBus, display_spi_config};
use crate::memory::MemoryStats;

// =============================================================================
// Heap
// =============================================================================

/// Framebuffer plus scratch buffer (2 x 150 KiB) with headroom.
const HEAP_SIZE: usize = 320 * 1024;

#[global_allocator]
static ALLOCATOR: LockedHeap = LockedHeap::empty();

static mut HEAP: [u8; HEAP_SIZE] = [0; HEAP_SIZE];

fn init_heap() {
    // SAFETY: called once before the first allocation; HEAP is not touched elsewhere
    unsafe {
        ALLOCATOR.lock().init(core::ptr::addr_of_mut!(HEAP).cast::<u8>(), HEAP_SIZE);
    }
}

// =============================================================================
// Demo
// =============================================================================

const SQUARE: i32 = 24;
const FULL_REDRAW_FRAMES: u32 = 600;

#[embassy_executor::main]
async fn main(_spawner: Spawner) {
    info!("ILI9341 demo starting...");
    init_heap();

    let p = embassy_rp::init(Default::default());

    // CS=17, DC=16, CLK=18, MOSI=19, Backlight=20, RST=21
    let cs = Output::new(p.PIN_17, Level::High);
    let dc = Output::new(p.PIN_16, Level::High);
    let rst = Output::new(p.PIN_21, Level::High);
    let mut _backlight = Output::new(p.PIN_20, Level::High);

    // TX-only SPI with DMA, the panel is never read
    let spi = Spi::new_txonly(p.SPI0, p.PIN_18, p.PIN_19, p.DMA_CH0, display_spi_config());

    let mut display = Ili9341::new(RpDmaBus::new(spi, cs), dc, Some(rst), Delay, PanelConfig::default());
    if let Err(err) = display.init() {
        error!("Display init failed: {}", defmt::Debug2Format(&err));
        loop {
            Timer::after_secs(1).await;
        }
    }

    let (width, height) = match display.control(Control::GetInfo) {
        Ok(Reply::Info(info)) => (i32::from(info.width), i32::from(info.height)),
        _ => {
            let geometry = display.geometry();
            (i32::from(geometry.width), i32::from(geometry.height))
        }
    };
    info!("Panel {}x{}", width, height);
    for entry in display.logs().iter() {
        info!("{}", defmt::Display2Format(entry));
    }
    MemoryStats::collect(&ALLOCATOR).log();

    let background = Rgb565::new(0, 8, 12);
    let mut pos = Point::new(0, 0);
    let mut vel = Point::new(3, 2);
    let mut frame: u32 = 0;

    loop {
        let next = pos + vel;
        if next.x < 0 || next.x + SQUARE > width {
            vel.x = -vel.x;
        }
        if next.y < 0 || next.y + SQUARE > height {
            vel.y = -vel.y;
        }
        let old = pos;
        pos += vel;

        let Some(fb) = display.framebuffer_mut() else {
            break;
        };
        let full_redraw = frame % FULL_REDRAW_FRAMES == 0;
        if full_redraw {
            fb.clear(background).ok();
        } else {
            Rectangle::new(old, Size::new(SQUARE as u32, SQUARE as u32))
                .into_styled(PrimitiveStyle::with_fill(background))
                .draw(&mut *fb)
                .ok();
        }
        Rectangle::new(pos, Size::new(SQUARE as u32, SQUARE as u32))
            .into_styled(PrimitiveStyle::with_fill(Rgb565::new(31, 40, 0)))
            .draw(fb)
            .ok();

        let rect = if full_redraw {
            Rect::new(0, 0, width, height)
        } else {
            let x = old.x.min(pos.x);
            let y = old.y.min(pos.y);
            Rect::new(x, y, (old.x - pos.x).abs() + SQUARE, (old.y - pos.y).abs() + SQUARE)
        };
        match display.control(Control::RectUpdate(Some(&rect))) {
            Ok(Reply::Updated(UpdateOutcome::FullFrame)) => {
                info!("Full frame {}", frame);
                // Scratch exists once the first partial update ran
                MemoryStats::collect(&ALLOCATOR).log();
            }
            Ok(_) => {}
            Err(err) => error!("Update failed: {}", defmt::Debug2Format(&err)),
        }

        frame = frame.wrapping_add(1);
        Timer::after_millis(16).await;
    }

    error!("Framebuffer missing after init");
    loop {
        Timer::after_secs(1).await;
    }
}
