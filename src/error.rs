//! Driver error type.

use core::fmt;

use embedded_hal::digital::ErrorKind as PinErrorKind;

use crate::framebuffer::AllocError;

/// Errors reported by the driver.
///
/// `B` is the error type of the bus peripheral.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Error<B> {
    /// The bus peripheral failed a transfer or reconfiguration.
    Bus(B),
    /// Driving the data/command or reset line failed.
    Pin(PinErrorKind),
    /// A framebuffer-sized allocation could not be satisfied.
    OutOfMemory {
        /// Requested size in bytes.
        bytes: usize,
    },
    /// The operation needs a completed bring-up.
    NotInitialized,
    /// Missing or malformed argument.
    InvalidArgument,
    /// The device does not implement this operation.
    NotSupported,
}

impl<B> Error<B> {
    /// Wrap a pin error, keeping only its kind.
    pub(crate) fn pin<E: embedded_hal::digital::Error>(err: E) -> Self { Self::Pin(err.kind()) }
}

impl<B> From<AllocError> for Error<B> {
    fn from(err: AllocError) -> Self { Self::OutOfMemory { bytes: err.bytes } }
}

impl<B: fmt::Debug> fmt::Display for Error<B> {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            Self::Bus(err) => write!(f, "bus transfer failed: {err:?}"),
            Self::Pin(kind) => write!(f, "control line failed: {kind:?}"),
            Self::OutOfMemory { bytes } => write!(f, "cannot allocate {bytes} bytes"),
            Self::NotInitialized => f.write_str("device not initialized"),
            Self::InvalidArgument => f.write_str("invalid argument"),
            Self::NotSupported => f.write_str("operation not supported"),
        }
    }
}
