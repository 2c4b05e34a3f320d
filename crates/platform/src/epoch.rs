//! Epoch: the monotonic counter used in place of a wall clock.
//!
//! The counter is advanced by a periodic tick and sampled by fault capture.
//! It carries no unit guarantee beyond "increases over time".

use core::sync::atomic::{AtomicU32, Ordering};

/// Pluggable accessor for the current epoch.
pub trait EpochSource {
    /// Current epoch value.
    fn epoch(&self) -> u32;
}

/// Retained epoch counter.
///
/// Only the periodic tick writes it (single writer), so the increment is a
/// plain load followed by a store. That keeps it usable on Cortex-M0+,
/// which has no atomic read-modify-write instructions. Readers, including
/// the fault handlers, always observe a whole word.
#[derive(Debug, Default)]
#[repr(transparent)]
pub struct EpochCounter(AtomicU32);

impl EpochCounter {
    /// A counter at epoch zero.
    pub const fn new() -> Self {
        Self(AtomicU32::new(0))
    }

    /// Advance the counter by one tick (wrapping).
    ///
    /// Must only be called from the single tick context.
    pub fn tick(&self) {
        let next = self.0.load(Ordering::Relaxed).wrapping_add(1);
        self.0.store(next, Ordering::Relaxed);
    }

    /// Restart counting from zero.
    pub fn reset(&self) {
        self.0.store(0, Ordering::Relaxed);
    }

    /// Current value.
    pub fn get(&self) -> u32 {
        self.0.load(Ordering::Relaxed)
    }
}

impl EpochSource for EpochCounter {
    fn epoch(&self) -> u32 {
        self.get()
    }
}

impl<F: Fn() -> u32> EpochSource for F {
    fn epoch(&self) -> u32 {
        self()
    }
}
