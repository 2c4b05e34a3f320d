//! Hardware exception frame and fault handler identity.

use core::fmt;
use core::mem::size_of;

use platform::{MemoryWindow, WORD_SIZE};

/// Registers the Cortex-M core pushes on exception entry, in push order.
///
/// The layout is fixed by the architecture; the struct is copied from the
/// stack word for word, never parsed field by field.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(C)]
pub struct StackFrame {
    /// Argument register r0.
    pub r0: u32,
    /// Argument register r1.
    pub r1: u32,
    /// Argument register r2.
    pub r2: u32,
    /// Argument register r3.
    pub r3: u32,
    /// Scratch register r12.
    pub r12: u32,
    /// Link register at the time of the fault.
    pub lr: u32,
    /// Address of the faulting instruction.
    pub return_address: u32,
    /// Program status register.
    pub xpsr: u32,
}

/// Words in a [`StackFrame`].
pub const FRAME_WORDS: usize = 8;

/// Size of a [`StackFrame`] in bytes.
pub const FRAME_SIZE: u32 = 32;

const _: () = assert!(size_of::<StackFrame>() == FRAME_SIZE as usize);
const _: () = assert!(FRAME_WORDS * WORD_SIZE as usize == FRAME_SIZE as usize);

impl StackFrame {
    /// Build a frame from its words in push order.
    pub const fn from_words(words: [u32; FRAME_WORDS]) -> Self {
        let [r0, r1, r2, r3, r12, lr, return_address, xpsr] = words;
        Self {
            r0,
            r1,
            r2,
            r3,
            r12,
            lr,
            return_address,
            xpsr,
        }
    }

    /// The frame's words in push order.
    pub const fn to_words(&self) -> [u32; FRAME_WORDS] {
        [
            self.r0,
            self.r1,
            self.r2,
            self.r3,
            self.r12,
            self.lr,
            self.return_address,
            self.xpsr,
        ]
    }

    /// Copy the frame pushed at `addr`.
    ///
    /// Returns `None` if any word of the frame lies outside `window`.
    pub fn read_from<W: MemoryWindow + ?Sized>(window: &W, addr: u32) -> Option<Self> {
        let mut words = [0_u32; FRAME_WORDS];
        let mut cursor = addr;
        for word in &mut words {
            *word = window.read_word(cursor)?;
            cursor = cursor.checked_add(WORD_SIZE)?;
        }
        Some(Self::from_words(words))
    }
}

impl fmt::Display for StackFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "  r0:   0x{:08X}", self.r0)?;
        writeln!(f, "  r1:   0x{:08X}", self.r1)?;
        writeln!(f, "  r2:   0x{:08X}", self.r2)?;
        writeln!(f, "  r3:   0x{:08X}", self.r3)?;
        writeln!(f, "  r12:  0x{:08X}", self.r12)?;
        writeln!(f, "  lr:   0x{:08X}", self.lr)?;
        writeln!(f, "  pc:   0x{:08X}", self.return_address)?;
        writeln!(f, "  xpsr: 0x{:08X}", self.xpsr)
    }
}

/// Which exception entry point recorded a fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum FaultHandlerKind {
    /// HardFault exception.
    HardFault = 0,
    /// Non-maskable interrupt (watchdog expiry on the DA14531).
    NonMaskableFault = 1,
    /// Reset requested by the platform SDK's own error path.
    PlatformReset = 2,
}

impl FaultHandlerKind {
    /// Short upper-case tag used in crash reports.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::HardFault => "LF_HARDFAULT",
            Self::NonMaskableFault => "LF_NMI",
            Self::PlatformReset => "LF_PLATFORM_RESET",
        }
    }
}

impl TryFrom<u8> for FaultHandlerKind {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::HardFault),
            1 => Ok(Self::NonMaskableFault),
            2 => Ok(Self::PlatformReset),
            other => Err(other),
        }
    }
}

impl fmt::Display for FaultHandlerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
