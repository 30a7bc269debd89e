//! ILI9341 TFT driver with an owned RGB565 framebuffer.
//!
//! This library holds the whole driver and can be tested on the host machine.
//! The binary (`main.rs`) adds the RP2350 bus implementation and a demo.
//!
//! # Layers
//!
//! - [`bus`]: command/data framing over a width-switchable DMA bus
//! - [`controller`]: command sequencing, bring-up, address windows
//! - [`framebuffer`] and [`geometry`]: pixels and panel dimensions
//! - [`blit`]: clipped, overlap-safe rectangular copies
//! - [`update`]: full-frame and partial updates
//! - [`device`]: the host-facing device with typed control requests
//!
//! # Testing
//!
//! Run tests on host with:
//! ```bash
//! cargo test --lib --target x86_64-unknown-linux-gnu
//! ```
//!
//! Tests run with `std` enabled (via `cfg_attr`), allowing use of the standard
//! test framework while the driver itself runs as `no_std`.

// Use no_std only when NOT testing (tests need std for the test harness)
#![cfg_attr(not(test), no_std)]
// Crate-level lints
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::cast_sign_loss)]

extern crate alloc;

// Configuration and diagnostics
pub mod config;
pub mod error;
pub mod log_buffer;

// Wire level
pub mod bus;
pub mod command;

// Pixels
pub mod blit;
pub mod framebuffer;
pub mod geometry;

// Driver
pub mod controller;
pub mod device;
pub mod update;

#[cfg(test)]
mod mock;

pub use bus::{DmaBus, FramePhase, Framing, TransferWidth};
pub use command::{Command, Orientation};
pub use config::{BusConfig, PanelConfig};
pub use controller::{DisplayController, NoResetPin};
pub use device::{Control, GraphicDevice, Ili9341, Reply};
pub use error::Error;
pub use framebuffer::Framebuffer;
pub use geometry::{AddressWindow, PanelGeometry, PixelFormat, Rect};
pub use update::{UpdateOutcome, UpdateScheduler};
