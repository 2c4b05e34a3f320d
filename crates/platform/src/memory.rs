//! Read-only raw memory windows.
//!
//! Fault capture has to walk the live stack after a fault, with no heap, no
//! safe stack and no debug symbols. Instead of doing pointer arithmetic
//! directly, the capture code reads through a [`MemoryWindow`]: a base
//! address plus a length. Every read is bounds- and alignment-checked, and
//! the same algorithm runs unchanged over a synthetic buffer in host tests.
//!
//! Addresses are 32-bit target addresses on every build. On the host they
//! are only labels; [`SliceWindow`] maps them onto a `&[u32]`.

/// Width of one stack slot / pointer on the target, in bytes.
pub const WORD_SIZE: u32 = 4;

/// A bounded, read-only view of target memory.
pub trait MemoryWindow {
    /// First address covered by the window.
    fn base(&self) -> u32;

    /// Number of bytes covered by the window.
    fn len_bytes(&self) -> u32;

    /// One past the last address covered by the window (saturating).
    fn end(&self) -> u32 {
        self.base().saturating_add(self.len_bytes())
    }

    /// Returns `true` if a full word starting at `addr` lies inside the window.
    fn contains_word(&self, addr: u32) -> bool {
        addr >= self.base()
            && addr
                .checked_add(WORD_SIZE)
                .is_some_and(|last| last <= self.end())
    }

    /// Read the aligned word at `addr`.
    ///
    /// Returns `None` when `addr` is not word-aligned or the word is not
    /// fully inside the window.
    fn read_word(&self, addr: u32) -> Option<u32>;
}

// ─────────────────────────────────────────────────────────────────────────────
// Code regions
// ─────────────────────────────────────────────────────────────────────────────

/// An address range that holds executable code.
///
/// Both bounds are exclusive, so `contains(start)` and `contains(end)` are
/// `false`. This matches how the return-address heuristic was calibrated
/// against the DA14531 memory map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CodeRegion {
    /// Exclusive lower bound.
    pub start: u32,
    /// Exclusive upper bound.
    pub end: u32,
}

impl CodeRegion {
    /// Create a region with exclusive bounds.
    pub const fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    /// Returns `true` if `addr` lies strictly between the bounds.
    pub const fn contains(&self, addr: u32) -> bool {
        addr > self.start && addr < self.end
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Slice-backed window (host tests, emulator)
// ─────────────────────────────────────────────────────────────────────────────

/// A window backed by a word slice, labelled with a target base address.
///
/// `words[0]` is the word at `base`, `words[1]` the word at `base + 4`, and
/// so on.
#[derive(Debug, Clone, Copy)]
pub struct SliceWindow<'a> {
    base: u32,
    words: &'a [u32],
}

impl<'a> SliceWindow<'a> {
    /// Create a window whose first word sits at target address `base`.
    pub const fn new(base: u32, words: &'a [u32]) -> Self {
        Self { base, words }
    }

    /// The backing words.
    pub fn words(&self) -> &'a [u32] {
        self.words
    }
}

impl MemoryWindow for SliceWindow<'_> {
    fn base(&self) -> u32 {
        self.base
    }

    fn len_bytes(&self) -> u32 {
        u32::try_from(self.words.len())
            .unwrap_or(u32::MAX)
            .saturating_mul(WORD_SIZE)
    }

    fn read_word(&self, addr: u32) -> Option<u32> {
        let offset = addr.checked_sub(self.base)?;
        if offset % WORD_SIZE != 0 {
            return None;
        }
        let index = usize::try_from(offset / WORD_SIZE).ok()?;
        self.words.get(index).copied()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Raw window (target)
// ─────────────────────────────────────────────────────────────────────────────

/// A window over real memory, read with volatile loads.
///
/// Used by the fault handlers to walk SysRAM. Only meaningful on a 32-bit
/// target where the window's addresses are the CPU's own addresses.
#[derive(Debug, Clone, Copy)]
pub struct RawWindow {
    base: u32,
    len: u32,
}

impl RawWindow {
    /// Create a window over `len` bytes of memory starting at `base`.
    ///
    /// # Safety
    ///
    /// Every word-aligned address in `base..base + len` must be readable for
    /// the whole lifetime of the window: mapped, not read-sensitive (no FIFO
    /// or clear-on-read registers), and not concurrently written by DMA.
    pub const unsafe fn new(base: u32, len: u32) -> Self {
        Self { base, len }
    }
}

impl MemoryWindow for RawWindow {
    fn base(&self) -> u32 {
        self.base
    }

    fn len_bytes(&self) -> u32 {
        self.len
    }

    fn read_word(&self, addr: u32) -> Option<u32> {
        if addr % WORD_SIZE != 0 || !self.contains_word(addr) {
            return None;
        }
        let ptr = addr as usize as *const u32;
        // SAFETY: `addr` is aligned and inside the window, which the caller
        // of `RawWindow::new` guaranteed to be readable memory.
        Some(unsafe { core::ptr::read_volatile(ptr) })
    }
}
