use core::cell::Cell;
use core::sync::atomic::{AtomicBool, Ordering};

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;

use crate::frame::CompletedFrame;

/// Counters kept alongside the slot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStats {
    /// Frames handed over by the receive side
    pub published: u32,
    /// Frames that were replaced before anybody took them
    pub overwritten: u32,
}

struct Slot {
    frame: Cell<CompletedFrame>,
    stats: Cell<StoreStats>,
}

/// Single-slot, latest-wins handoff between the byte receiver and the
/// dispatcher.
///
/// This is not a queue. A publish always replaces whatever is in the slot,
/// so a burst of frames collapses to the newest one.
pub struct FrameStore {
    slot: Mutex<CriticalSectionRawMutex, Slot>,
    // Only written while `slot` is locked, read without it
    available: AtomicBool,
}

impl FrameStore {
    pub const fn new() -> FrameStore {
        FrameStore {
            slot: Mutex::new(Slot {
                frame: Cell::new(CompletedFrame::empty()),
                stats: Cell::new(StoreStats {
                    published: 0,
                    overwritten: 0,
                }),
            }),
            available: AtomicBool::new(false),
        }
    }

    /// Producer side. Overwrites an unconsumed frame.
    pub fn publish(&self, frame: CompletedFrame) {
        self.slot.lock(|slot| {
            let mut stats = slot.stats.get();
            stats.published = stats.published.wrapping_add(1);
            if self.available.load(Ordering::Relaxed) {
                stats.overwritten = stats.overwritten.wrapping_add(1);
            }
            slot.stats.set(stats);
            slot.frame.set(frame);
            self.available.store(true, Ordering::Release);
        })
    }

    /// Consumer side. Clears the flag only when a frame is actually returned.
    pub fn take_if_available(&self) -> Option<CompletedFrame> {
        if !self.is_available() {
            return None;
        }
        self.slot.lock(|slot| {
            if !self.available.load(Ordering::Acquire) {
                return None;
            }
            self.available.store(false, Ordering::Release);
            Some(slot.frame.get())
        })
    }

    /// Peek at the flag without consuming. Relay loops poll this.
    pub fn is_available(&self) -> bool {
        self.available.load(Ordering::Acquire)
    }

    pub fn stats(&self) -> StoreStats {
        self.slot.lock(|slot| slot.stats.get())
    }
}

impl Default for FrameStore {
    fn default() -> Self {
        Self::new()
    }
}
