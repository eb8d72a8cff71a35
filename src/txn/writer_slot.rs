//! The advisory single-writer slot: a latch-and-spin gate reduced to one
//! `AtomicBool`, since only writer/writer exclusion is needed here — no
//! reader count or latch phase to track.

use std::sync::atomic::{AtomicBool, Ordering};

pub struct WriterSlot(AtomicBool);

impl WriterSlot {
    pub fn new() -> WriterSlot {
        WriterSlot(AtomicBool::new(false))
    }

    /// Attempt to acquire the slot, returning a guard that releases it on
    /// drop. `None` if another write transaction already holds it.
    pub fn try_acquire(&self) -> Option<WriterGuard<'_>> {
        match self.0.compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed) {
            Ok(_) => Some(WriterGuard { slot: self }),
            Err(_) => None,
        }
    }
}

pub struct WriterGuard<'a> {
    slot: &'a WriterSlot,
}

impl<'a> Drop for WriterGuard<'a> {
    fn drop(&mut self) {
        self.slot.0.store(false, Ordering::Release);
    }
}
