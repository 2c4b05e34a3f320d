//! Property-based tests for memory windows, code regions and reset status.
//! Verifies invariants hold for ALL addresses, not just fixed examples.

#![allow(clippy::arithmetic_side_effects)]

use platform::{CodeRegion, MemoryWindow, ResetStatus, SliceWindow, SWRESET_STAT, WORD_SIZE};

const BASE: u32 = 0x07FC_8000;

/// Register model counting clears.
struct Register {
    bits: u16,
    clears: usize,
}

impl ResetStatus for Register {
    fn read(&mut self) -> u16 {
        self.bits
    }

    fn clear(&mut self) {
        self.bits = 0;
        self.clears += 1;
    }
}

proptest::proptest! {
    /// SliceWindow::read_word never panics for any address.
    #[test]
    fn read_word_never_panics(addr in 0u32..=u32::MAX, len in 0usize..64) {
        let words = vec![0xA5A5_A5A5_u32; len];
        let window = SliceWindow::new(BASE, &words);
        let _ = window.read_word(addr);
    }

    /// A read succeeds exactly when the word is aligned and inside the window.
    #[test]
    fn read_word_matches_contains_word(offset in 0u32..512, len in 0usize..64) {
        let words: Vec<u32> = (0..len as u32).collect();
        let window = SliceWindow::new(BASE, &words);
        let addr = BASE + offset;
        let aligned = offset % WORD_SIZE == 0;
        assert_eq!(
            window.read_word(addr).is_some(),
            aligned && window.contains_word(addr),
            "addr {addr:#x} len {len}"
        );
        if let Some(value) = window.read_word(addr) {
            assert_eq!(value, offset / WORD_SIZE);
        }
    }

    /// Addresses below the base are never readable.
    #[test]
    fn read_below_base_is_none(below in 1u32..=BASE) {
        let words = [1_u32; 8];
        let window = SliceWindow::new(BASE, &words);
        assert_eq!(window.read_word(BASE - below), None);
    }

    /// CodeRegion bounds are both exclusive.
    #[test]
    fn code_region_bounds_are_exclusive(start in 0u32..0x8000_0000, span in 0u32..0x1000, at in 0u32..0x1000) {
        let region = CodeRegion::new(start, start + span);
        let addr = start + at;
        assert_eq!(region.contains(addr), at > 0 && at < span);
    }

    /// take() reports the bits it read and clears unless only SWRESET is set.
    #[test]
    fn reset_status_take_clears_all_but_lone_swreset(bits in 0u16..=u16::MAX) {
        let mut status = Register { bits, clears: 0 };
        assert_eq!(status.take(), bits);
        let expected_clears = usize::from(bits & !SWRESET_STAT != 0);
        assert_eq!(status.clears, expected_clears);
    }
}
