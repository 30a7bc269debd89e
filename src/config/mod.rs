//! Driver configuration.
//!
//! - `panel`: Panel dimensions, bus timing and the per-instance [`PanelConfig`]

pub mod panel;

// Re-export panel constants at config level for convenience
pub use panel::{
    BGR_ORDER_BIT,
    BUS_CLOCK_HZ,
    BusConfig,
    COLMOD_RGB565,
    NATIVE_HEIGHT,
    NATIVE_WIDTH,
    PanelConfig,
    RESET_PULSE_MS,
    SWRESET_SETTLE_MS,
    WAKE_SETTLE_MS,
};
