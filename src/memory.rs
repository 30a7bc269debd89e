//! RAM usage report for the demo firmware.
//!
//! The framebuffer and the update scratch live on the heap, so heap use is
//! what matters here. Stack use is read from MSP, which starts at the top of
//! RAM and grows down.

use cortex_m::register::msp;
use linked_list_allocator::LockedHeap;

/// RP2350 striped SRAM.
const RAM_START: u32 = 0x2000_0000;
const RAM_SIZE: u32 = 512 * 1024;
const RAM_END: u32 = RAM_START + RAM_SIZE;

/// Snapshot of stack and heap usage, in bytes.
#[derive(Clone, Copy)]
pub struct MemoryStats {
    pub stack_used: u32,
    pub heap_used: usize,
    pub heap_free: usize,
}

impl MemoryStats {
    pub fn collect(heap: &LockedHeap) -> Self {
        let stack_used = RAM_END.saturating_sub(msp::read());
        let heap = heap.lock();
        Self {
            stack_used,
            heap_used: heap.used(),
            heap_free: heap.free(),
        }
    }

    pub fn log(&self) {
        defmt::info!(
            "RAM: stack {} B, heap {} B used / {} B free",
            self.stack_used,
            self.heap_used,
            self.heap_free
        );
    }
}
