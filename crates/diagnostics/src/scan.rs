//! Heuristic call-trace scan.
//!
//! Cortex-M0+ code built without frame pointers leaves no chain to follow,
//! so the scan walks the stack word by word above the exception frame and
//! keeps every word that looks like a Thumb return address (odd, inside a
//! code region). The result is approximate: a stale return address or a
//! data word that happens to look like code is reported as well. Nothing
//! here tries to make it exact.

use platform::{MemoryWindow, WORD_SIZE};

use crate::config::{MemoryMap, CALL_DEPTH};

/// Return addresses found by [`scan_call_trace`], innermost first.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CallTrace {
    entries: [u32; CALL_DEPTH],
    len: usize,
}

impl CallTrace {
    /// Entries found, with the Thumb bit already stripped.
    pub fn as_slice(&self) -> &[u32] {
        self.entries.get(..self.len).unwrap_or(&[])
    }

    /// Number of entries found.
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if nothing plausible was found.
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn push(&mut self, value: u32) {
        if let Some(slot) = self.entries.get_mut(self.len) {
            *slot = value;
            self.len = self.len.saturating_add(1);
        }
    }

    fn is_full(&self) -> bool {
        self.len >= CALL_DEPTH
    }
}

/// Scan `start..end` for return addresses.
///
/// `start` is normally the first word above the exception frame and `end`
/// the initial stack pointer from the boot vector. Words outside `window`
/// end the scan early; it never reads past `end`. At most [`CALL_DEPTH`]
/// entries are kept, each stored as `value - 1`.
pub fn scan_call_trace<W: MemoryWindow + ?Sized>(
    window: &W,
    map: &MemoryMap,
    start: u32,
    end: u32,
) -> CallTrace {
    let mut trace = CallTrace::default();
    let mut addr = start;

    while addr < end && !trace.is_full() {
        let Some(value) = window.read_word(addr) else {
            break;
        };
        if map.is_return_address(value) {
            trace.push(value.wrapping_sub(1));
        }
        match addr.checked_add(WORD_SIZE) {
            Some(next) => addr = next,
            None => break,
        }
    }

    trace
}
