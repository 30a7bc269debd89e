//! Driver event log with levels and sequence stamps.
//!
//! Each device instance owns a small circular buffer of recent events (bring-up
//! steps, rejected control requests, skipped updates). On the ARM target every
//! entry is also forwarded to `defmt`.
//!
//! # Usage
//!
//! ```ignore
//! use crate::log_buffer::LogBuffer;
//!
//! let mut log = LogBuffer::new();
//! log_info!(log, "Panel {}x{}", 320, 240);
//! log_error!(log, "Unknown control {}", code);
//! ```

use heapless::String;

/// Maximum number of log entries to keep.
pub const LOG_ENTRIES: usize = 16;

/// Maximum characters per log message.
pub const LOG_MSG_LEN: usize = 48;

/// Log severity level.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug, Default)]
#[repr(u8)]
pub enum LogLevel {
    /// Verbose debugging
    Trace = 0,
    /// Debug information
    Debug = 1,
    /// Normal operation
    #[default]
    Info = 2,
    /// Warnings
    Warn = 3,
    /// Errors
    Error = 4,
}

impl LogLevel {
    /// Get the single-character prefix for this level.
    pub const fn prefix(self) -> char {
        match self {
            Self::Trace => 'T',
            Self::Debug => 'D',
            Self::Info => 'I',
            Self::Warn => 'W',
            Self::Error => 'E',
        }
    }
}

/// A single log entry with level, message, and sequence number.
#[derive(Clone, Debug)]
pub struct LogEntry {
    /// Log severity level.
    pub level: LogLevel,
    /// Log message (truncated to LOG_MSG_LEN).
    pub message: String<LOG_MSG_LEN>,
    /// Position of this entry in the device's event stream.
    pub seq: u32,
}

impl LogEntry {
    /// Create a new log entry, truncating the message if needed.
    pub fn new(
        level: LogLevel,
        message: &str,
        seq: u32,
    ) -> Self {
        let mut msg: String<LOG_MSG_LEN> = String::new();
        for c in message.chars() {
            if msg.push(c).is_err() {
                break;
            }
        }
        Self {
            level,
            message: msg,
            seq,
        }
    }
}

impl core::fmt::Display for LogEntry {
    fn fmt(
        &self,
        f: &mut core::fmt::Formatter<'_>,
    ) -> core::fmt::Result {
        write!(f, "[{} #{}] {}", self.level.prefix(), self.seq, self.message)
    }
}

/// Circular buffer of log entries.
pub struct LogBuffer {
    entries: [Option<LogEntry>; LOG_ENTRIES],
    head: usize, // Next write position
    count: usize,
    next_seq: u32,
}

impl LogBuffer {
    /// Create a new empty log buffer.
    pub const fn new() -> Self {
        Self {
            entries: [const { None }; LOG_ENTRIES],
            head: 0,
            count: 0,
            next_seq: 0,
        }
    }

    /// Append a message. Oldest entry is dropped if buffer is full.
    pub fn push(
        &mut self,
        level: LogLevel,
        message: &str,
    ) {
        let entry = LogEntry::new(level, message, self.next_seq);
        self.next_seq = self.next_seq.wrapping_add(1);
        self.entries[self.head] = Some(entry);
        self.head = (self.head + 1) % LOG_ENTRIES;
        if self.count < LOG_ENTRIES {
            self.count += 1;
        }
    }

    /// Get the number of entries in the buffer.
    #[inline]
    pub const fn len(&self) -> usize { self.count }

    /// Check if buffer is empty.
    #[inline]
    pub const fn is_empty(&self) -> bool { self.count == 0 }

    /// Most recent entry.
    pub fn last(&self) -> Option<&LogEntry> {
        if self.count == 0 {
            return None;
        }
        self.entries[(self.head + LOG_ENTRIES - 1) % LOG_ENTRIES].as_ref()
    }

    /// Iterate over entries from oldest to newest.
    pub fn iter(&self) -> LogBufferIter<'_> {
        let start = if self.count < LOG_ENTRIES { 0 } else { self.head };
        LogBufferIter {
            buffer: self,
            pos: start,
            remaining: self.count,
        }
    }
}

impl Default for LogBuffer {
    fn default() -> Self { Self::new() }
}

/// Iterator over log buffer entries (oldest to newest).
pub struct LogBufferIter<'a> {
    buffer: &'a LogBuffer,
    pos: usize,
    remaining: usize,
}

impl<'a> Iterator for LogBufferIter<'a> {
    type Item = &'a LogEntry;

    fn next(&mut self) -> Option<Self::Item> {
        while self.remaining > 0 {
            let entry = self.buffer.entries[self.pos].as_ref();
            self.pos = (self.pos + 1) % LOG_ENTRIES;
            self.remaining -= 1;
            if entry.is_some() {
                return entry;
            }
        }
        None
    }
}

// =============================================================================
// Logging Macros
// =============================================================================

/// Format into a log buffer and forward to `defmt` on target.
#[doc(hidden)]
#[macro_export]
macro_rules! __log_to {
    ($level:ident, $defmt:ident, $log:expr, $fmt:literal $(, $arg:expr)*) => {{
        use core::fmt::Write;
        let mut buf: heapless::String<{ $crate::log_buffer::LOG_MSG_LEN }> = heapless::String::new();
        let _ = write!(buf, $fmt $(, $arg)*);
        $log.push($crate::log_buffer::LogLevel::$level, buf.as_str());
        #[cfg(target_arch = "arm")]
        defmt::$defmt!($fmt $(, $arg)*);
    }};
}

/// Log a message at Info level.
#[macro_export]
macro_rules! log_info {
    ($log:expr, $($arg:tt)*) => { $crate::__log_to!(Info, info, $log, $($arg)*) };
}

/// Log a message at Warn level.
#[macro_export]
macro_rules! log_warn {
    ($log:expr, $($arg:tt)*) => { $crate::__log_to!(Warn, warn, $log, $($arg)*) };
}

/// Log a message at Error level.
#[macro_export]
macro_rules! log_error {
    ($log:expr, $($arg:tt)*) => { $crate::__log_to!(Error, error, $log, $($arg)*) };
}

/// Log a message at Debug level.
#[macro_export]
macro_rules! log_debug {
    ($log:expr, $($arg:tt)*) => { $crate::__log_to!(Debug, debug, $log, $($arg)*) };
}

// =============================================================================
// Tests
// =============================================================================
