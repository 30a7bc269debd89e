//! Recording test doubles for the bus peripheral, control lines and delay.
//!
//! Each double shares its log through `Rc<RefCell<..>>`, so a test keeps a clone
//! after moving the double into the driver.

use std::cell::RefCell;
use std::rc::Rc;
use std::vec::Vec;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{ErrorType, OutputPin};

use crate::bus::{DmaBus, Framing};
use crate::config::BusConfig;

/// Error raised by [`RecordingBus`] when armed with `fail_next` or `fail_after`.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct BusFault;

/// One peripheral call.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum BusEvent {
    Dc(bool),
    Init(BusConfig),
    Configure(Framing),
    Bytes(Vec<u8>),
    Pixels { bits: u8, pixels: Vec<u16> },
    Fill { word: u32, count: usize },
}

#[derive(Default)]
struct BusState {
    events: Vec<BusEvent>,
    frame_bits: u8,
    calls: usize,
    fail_in: Option<usize>,
}

/// Peripheral that records every call instead of driving hardware.
#[derive(Clone, Default)]
pub struct RecordingBus {
    state: Rc<RefCell<BusState>>,
}

impl RecordingBus {
    pub fn new() -> Self { Self::default() }

    /// Make the next call fail with [`BusFault`].
    pub fn fail_next(&mut self) { self.fail_after(0); }

    /// Let `calls` peripheral calls through, then fail the one after.
    pub fn fail_after(
        &mut self,
        calls: usize,
    ) {
        self.state.borrow_mut().fail_in = Some(calls);
    }

    /// Peripheral calls made so far, failed ones included. DC changes are not counted.
    pub fn calls(&self) -> usize { self.state.borrow().calls }

    pub fn events(&self) -> Vec<BusEvent> { self.state.borrow().events.clone() }

    pub fn clear(&self) { self.state.borrow_mut().events.clear(); }

    /// Every byte put on the wire, command frames included. Pixels are high byte first.
    pub fn data_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for event in self.state.borrow().events.iter() {
            match event {
                BusEvent::Bytes(bytes) => out.extend_from_slice(bytes),
                BusEvent::Pixels { pixels, .. } => {
                    for px in pixels {
                        out.extend_from_slice(&px.to_be_bytes());
                    }
                }
                _ => {}
            }
        }
        out
    }

    /// Pixels sent through `write_pixels`, in order.
    pub fn pixels(&self) -> Vec<u16> {
        self.state
            .borrow()
            .events
            .iter()
            .filter_map(|event| match event {
                BusEvent::Pixels { pixels, .. } => Some(pixels.clone()),
                _ => None,
            })
            .flatten()
            .collect()
    }

    /// Bytes carried by pixel transfers only.
    pub fn pixel_byte_count(&self) -> usize { self.pixels().len() * 2 }

    /// (command, parameters) pairs, split on the DC line recorded by [`DcPin`].
    pub fn commands(&self) -> Vec<(u8, Vec<u8>)> {
        let mut out: Vec<(u8, Vec<u8>)> = Vec::new();
        let mut command_phase = false;
        for event in self.state.borrow().events.iter() {
            match event {
                BusEvent::Dc(high) => command_phase = !high,
                BusEvent::Bytes(bytes) if command_phase => {
                    out.extend(bytes.iter().map(|&code| (code, Vec::new())));
                }
                BusEvent::Bytes(bytes) => {
                    if let Some(last) = out.last_mut() {
                        last.1.extend_from_slice(bytes);
                    }
                }
                _ => {}
            }
        }
        out
    }

    /// Opcodes only, in order.
    pub fn opcodes(&self) -> Vec<u8> { self.commands().into_iter().map(|(code, _)| code).collect() }

    /// Data/command pin that records its level into this bus's event log.
    pub fn dc_pin(&self) -> DcPin {
        DcPin {
            state: Rc::clone(&self.state),
        }
    }

    fn record(
        &mut self,
        event: BusEvent,
    ) -> Result<(), BusFault> {
        let mut state = self.state.borrow_mut();
        state.calls += 1;
        match state.fail_in {
            Some(0) => {
                state.fail_in = None;
                return Err(BusFault);
            }
            Some(n) => state.fail_in = Some(n - 1),
            None => {}
        }
        state.events.push(event);
        Ok(())
    }
}

impl DmaBus for RecordingBus {
    type Error = BusFault;

    fn init(
        &mut self,
        config: &BusConfig,
    ) -> Result<(), BusFault> {
        self.record(BusEvent::Init(*config))
    }

    fn configure(
        &mut self,
        framing: Framing,
    ) -> Result<(), BusFault> {
        self.state.borrow_mut().frame_bits = framing.frame_bits;
        self.record(BusEvent::Configure(framing))
    }

    fn write_bytes(
        &mut self,
        data: &[u8],
    ) -> Result<(), BusFault> {
        self.record(BusEvent::Bytes(data.to_vec()))
    }

    fn write_pixels(
        &mut self,
        pixels: &[u16],
    ) -> Result<(), BusFault> {
        let bits = self.state.borrow().frame_bits;
        self.record(BusEvent::Pixels { bits, pixels: pixels.to_vec() })
    }

    fn fill(
        &mut self,
        word: u32,
        count: usize,
    ) -> Result<(), BusFault> {
        self.record(BusEvent::Fill { word, count })
    }
}

/// Data/command line sharing the event log of a [`RecordingBus`].
pub struct DcPin {
    state: Rc<RefCell<BusState>>,
}

impl ErrorType for DcPin {
    type Error = core::convert::Infallible;
}

impl OutputPin for DcPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.state.borrow_mut().events.push(BusEvent::Dc(false));
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.state.borrow_mut().events.push(BusEvent::Dc(true));
        Ok(())
    }
}

/// Output pin that records every level it is driven to (`true` = high).
#[derive(Clone, Default)]
pub struct MockPin {
    levels: Rc<RefCell<Vec<bool>>>,
}

impl MockPin {
    pub fn new() -> Self { Self::default() }

    pub fn levels(&self) -> Vec<bool> { self.levels.borrow().clone() }
}

impl ErrorType for MockPin {
    type Error = core::convert::Infallible;
}

impl OutputPin for MockPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.levels.borrow_mut().push(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.levels.borrow_mut().push(true);
        Ok(())
    }
}

/// Delay that records requested waits in milliseconds and returns at once.
#[derive(Clone, Default)]
pub struct MockDelay {
    waits_ms: Rc<RefCell<Vec<u32>>>,
}

impl MockDelay {
    pub fn new() -> Self { Self::default() }

    pub fn waits_ms(&self) -> Vec<u32> { self.waits_ms.borrow().clone() }
}

impl DelayNs for MockDelay {
    fn delay_ns(
        &mut self,
        ns: u32,
    ) {
        self.waits_ms.borrow_mut().push(ns / 1_000_000);
    }

    fn delay_ms(
        &mut self,
        ms: u32,
    ) {
        self.waits_ms.borrow_mut().push(ms);
    }
}
