//! ILI9341 command set and MADCTL orientation encoding.
//!
//! Only a handful of opcodes are issued by the driver (reset, wake, pixel format,
//! orientation, address window, memory write, display on). The rest of the table is
//! kept so board code can send vendor tuning sequences through the same type.

use crate::config::BGR_ORDER_BIT;

/// ILI9341 command opcodes.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[repr(u8)]
pub enum Command {
    Nop = 0x00,
    SoftwareReset = 0x01,
    ReadId = 0x04,
    ReadStatus = 0x09,
    ReadPowerMode = 0x0A,
    ReadMadctl = 0x0B,
    ReadPixelFormat = 0x0C,
    SleepOn = 0x10,
    SleepOff = 0x11,
    PartialDisplayOn = 0x12,
    NormalDisplayOn = 0x13,
    InversionOff = 0x20,
    InversionOn = 0x21,
    GammaSet = 0x26,
    DisplayOff = 0x28,
    DisplayOn = 0x29,
    /// Column address set (CASET).
    HorizontalAddressSet = 0x2A,
    /// Page address set (PASET).
    VerticalAddressSet = 0x2B,
    MemoryWrite = 0x2C,
    MemoryRead = 0x2E,
    PartialArea = 0x30,
    VerticalScrollDefine = 0x33,
    TearingEffectOff = 0x34,
    TearingEffectOn = 0x35,
    /// MADCTL: row/column exchange, direction flips, colour order.
    MemoryAccessControl = 0x36,
    VerticalScrollStart = 0x37,
    IdleModeOff = 0x38,
    IdleModeOn = 0x39,
    /// COLMOD.
    PixelFormatSet = 0x3A,
    WriteMemoryContinue = 0x3C,
    WriteBrightness = 0x51,
    WriteCtrlDisplay = 0x53,
    FrameControlNormal = 0xB1,
    DisplayFunctionControl = 0xB6,
    PowerControl1 = 0xC0,
    PowerControl2 = 0xC1,
    VcomControl1 = 0xC5,
    VcomControl2 = 0xC7,
    PositiveGammaCorrection = 0xE0,
    NegativeGammaCorrection = 0xE1,
    InterfaceControl = 0xF6,
}

impl Command {
    /// Wire opcode.
    #[inline]
    pub const fn opcode(self) -> u8 { self as u8 }
}

// =============================================================================
// Orientation
// =============================================================================

/// MADCTL bit for row/column exchange.
const AXIS_SWAP_BIT: u8 = 0x20;

/// Bits of MADCTL that encode the orientation.
const DIRECTION_MASK: u8 = 0xE0;

/// Panel scan direction.
///
/// The name reads as axis order (`Xy` native, `Yx` swapped), then horizontal
/// direction (`Rl`/`Lr`), then vertical direction (`Ud`/`Du`). Discriminants are
/// the MADCTL direction bits.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
#[repr(u8)]
pub enum Orientation {
    #[default]
    XyRlud = 0x00,
    YxRlud = 0x20,
    XyLrud = 0x40,
    YxLrud = 0x60,
    XyRldu = 0x80,
    YxRldu = 0xA0,
    XyLrdu = 0xC0,
    YxLrdu = 0xE0,
}

impl Orientation {
    /// All eight orientations.
    pub const ALL: [Self; 8] = [
        Self::XyRlud,
        Self::YxRlud,
        Self::XyLrud,
        Self::YxLrud,
        Self::XyRldu,
        Self::YxRldu,
        Self::XyLrdu,
        Self::YxLrdu,
    ];

    /// Decode the direction bits of a MADCTL value. Lower bits are ignored.
    pub const fn from_bits(bits: u8) -> Self {
        match bits & DIRECTION_MASK {
            0x00 => Self::XyRlud,
            0x20 => Self::YxRlud,
            0x40 => Self::XyLrud,
            0x60 => Self::YxLrud,
            0x80 => Self::XyRldu,
            0xA0 => Self::YxRldu,
            0xC0 => Self::XyLrdu,
            _ => Self::YxLrdu,
        }
    }

    /// Direction bits only.
    #[inline]
    pub const fn bits(self) -> u8 { self as u8 }

    /// Whether rows and columns are exchanged.
    #[inline]
    pub const fn swaps_axes(self) -> bool { self.bits() & AXIS_SWAP_BIT != 0 }

    /// Same flips, opposite axis order.
    #[inline]
    pub const fn with_swapped_axes(self) -> Self { Self::from_bits(self.bits() ^ AXIS_SWAP_BIT) }

    /// Full MADCTL payload.
    #[inline]
    pub const fn madctl(
        self,
        bgr: bool,
    ) -> u8 {
        if bgr { self.bits() | BGR_ORDER_BIT } else { self.bits() }
    }

    /// Effective (width, height) for a panel with the given native size.
    pub const fn dimensions(
        self,
        native_width: u16,
        native_height: u16,
    ) -> (u16, u16) {
        if self.swaps_axes() { (native_height, native_width) } else { (native_width, native_height) }
    }
}

// =============================================================================
// Tests
// =============================================================================
