//! Fault capture.
//!
//! The exception entry points in the firmware crate hand the address of
//! the hardware-pushed frame to [`handle_fault`], which decides what to do
//! and records the fault. Everything here is allocation free and never
//! panics; the entry points run with the system in an unknown state.
//!
//! [`handle_fault`] returns a [`FaultDisposition`] instead of diverging so
//! the whole path can be exercised on the host. On the target the caller
//! acts on it and never returns: it either halts for the debugger or spins
//! until the requested reset lands.

use platform::{EpochSource, MemoryWindow, ResetMode, SystemControl};

use crate::config::MemoryMap;
use crate::frame::{FaultHandlerKind, StackFrame, FRAME_SIZE};
use crate::scan::scan_call_trace;
use crate::store::{CrashStore, FaultRecord};

/// Why a fault was not recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SkipReason {
    /// Every slot of the store is in use. The fault still resets the
    /// device; it is just not remembered.
    CapacityExhausted,
}

/// Result of trying to record one fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CaptureOutcome {
    /// The fault was written to `slot`.
    Recorded {
        /// Index of the record in the store.
        slot: usize,
        /// Number of return addresses found by the scan (may be zero).
        call_trace_len: usize,
    },
    /// The fault was not written.
    Skipped(SkipReason),
}

/// What the exception entry point must do after [`handle_fault`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FaultDisposition {
    /// Development build: nothing was recorded. Break into the debugger if
    /// one is attached, otherwise spin so one can attach.
    Halt {
        /// Debugger state probed after preparing the debug port.
        debugger_attached: bool,
    },
    /// The outcome of the capture; a reset has been requested.
    Reset(CaptureOutcome),
}

/// Fault handling configuration, fixed at build time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CaptureConfig {
    /// Code regions and boot vector locations used by the scan.
    pub map: MemoryMap,
    /// Halt for a debugger instead of capturing.
    pub development_debug: bool,
    /// Remap handling of the forced reset.
    pub reset_mode: ResetMode,
}

impl CaptureConfig {
    /// Production configuration for the DA14531.
    pub const DA14531: Self = Self {
        map: MemoryMap::DA14531,
        development_debug: false,
        reset_mode: ResetMode::RestoreDefaultRemap,
    };
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self::DA14531
    }
}

/// Fill a freshly claimed record from the frame at `frame_addr`.
///
/// The frame is copied verbatim (zeroed if it cannot be read). The scan
/// runs from the word just above the frame up to the initial stack
/// pointer stored in the boot vector; if that word cannot be read the
/// window's end bounds the scan instead.
pub fn populate_record<W: MemoryWindow + ?Sized>(
    record: &mut FaultRecord,
    window: &W,
    map: &MemoryMap,
    remapped: bool,
    frame_addr: u32,
    epoch: u32,
) {
    let frame = StackFrame::read_from(window, frame_addr).unwrap_or_default();
    let end_of_stack = window
        .read_word(map.boot_vector_addr(remapped))
        .unwrap_or_else(|| window.end());
    let start = frame_addr.saturating_add(FRAME_SIZE);
    let trace = scan_call_trace(window, map, start, end_of_stack);
    record.fill(epoch, frame, trace.as_slice());
}

/// Record one fault in `store`.
pub fn capture_fault<W, E>(
    store: &mut CrashStore,
    kind: FaultHandlerKind,
    window: &W,
    map: &MemoryMap,
    remapped: bool,
    frame_addr: u32,
    epoch: &E,
) -> CaptureOutcome
where
    W: MemoryWindow + ?Sized,
    E: EpochSource + ?Sized,
{
    let slot = match store.begin_record(kind) {
        Ok(slot) => slot,
        Err(reason) => return CaptureOutcome::Skipped(reason),
    };
    let Some(record) = store.record_mut(slot) else {
        return CaptureOutcome::Skipped(SkipReason::CapacityExhausted);
    };
    populate_record(record, window, map, remapped, frame_addr, epoch.epoch());
    CaptureOutcome::Recorded {
        slot,
        call_trace_len: record.call_trace_len(),
    }
}

/// Shared body of the HardFault and NMI entry points.
///
/// In a development build the debug port is prepared and nothing is
/// recorded. Otherwise the fault is captured and a reset is requested,
/// whether or not the store had room.
pub fn handle_fault<W, S, E>(
    config: &CaptureConfig,
    kind: FaultHandlerKind,
    frame_addr: u32,
    store: &mut CrashStore,
    window: &W,
    system: &mut S,
    epoch: &E,
) -> FaultDisposition
where
    W: MemoryWindow + ?Sized,
    S: SystemControl + ?Sized,
    E: EpochSource + ?Sized,
{
    if config.development_debug {
        system.prepare_for_debugger();
        return FaultDisposition::Halt {
            debugger_attached: system.debugger_attached(),
        };
    }

    let remapped = system.boot_vector_remapped();
    let outcome = capture_fault(store, kind, window, &config.map, remapped, frame_addr, epoch);
    system.request_reset(config.reset_mode);
    FaultDisposition::Reset(outcome)
}

#[cfg(test)]
#[allow(clippy::indexing_slicing, clippy::arithmetic_side_effects)]
mod tests {
    use super::*;
    use crate::config::{CALL_DEPTH, MAX_RECORDS};
    use platform::mocks::{FixedEpoch, MockSystem};
    use platform::SliceWindow;

    const RAM_BASE: u32 = 0x07FC_0000;
    const WORDS: usize = 0x100;
    const FRAME_WORD: usize = 0x40;

    /// SysRAM image: boot vector holding the initial SP, a frame at
    /// `FRAME_WORD` and a few return addresses above it.
    fn ram() -> [u32; WORDS] {
        let mut ram = [0_u32; WORDS];
        ram[0] = RAM_BASE + (WORDS as u32) * 4;
        let frame = [1, 2, 3, 4, 12, 0x07FC_1235, 0x07FC_1300, 0x6100_0000];
        ram[FRAME_WORD..FRAME_WORD + 8].copy_from_slice(&frame);
        ram[FRAME_WORD + 8] = 0x07FC_2001;
        ram[FRAME_WORD + 9] = 0xCAFE_0000;
        ram[FRAME_WORD + 11] = 0x07F0_5555;
        ram[FRAME_WORD + 14] = 0x07FC_3003;
        ram
    }

    fn frame_addr() -> u32 {
        RAM_BASE + (FRAME_WORD as u32) * 4
    }

    #[test]
    fn test_records_frame_trace_and_epoch() {
        let ram = ram();
        let window = SliceWindow::new(RAM_BASE, &ram);
        let mut store = CrashStore::new();

        let outcome = capture_fault(
            &mut store,
            FaultHandlerKind::HardFault,
            &window,
            &MemoryMap::DA14531,
            false,
            frame_addr(),
            &FixedEpoch(42),
        );

        assert_eq!(outcome, CaptureOutcome::Recorded { slot: 0, call_trace_len: 3 });
        let record = &store.records()[0];
        assert_eq!(record.epoch(), 42);
        assert_eq!(record.handler(), Some(FaultHandlerKind::HardFault));
        assert_eq!(record.frame().return_address, 0x07FC_1300);
        assert_eq!(record.call_trace(), &[0x07FC_2000, 0x07F0_5554, 0x07FC_3002]);
    }

    #[test]
    fn test_frame_words_are_not_scanned() {
        let ram = ram();
        let window = SliceWindow::new(RAM_BASE, &ram);
        let mut store = CrashStore::new();
        capture_fault(
            &mut store,
            FaultHandlerKind::HardFault,
            &window,
            &MemoryMap::DA14531,
            false,
            frame_addr(),
            &FixedEpoch(0),
        );
        assert!(
            !store.records()[0].call_trace().contains(&0x07FC_1234),
            "the stacked LR lives in the frame, not above it"
        );
    }

    #[test]
    fn test_remapped_boot_vector_bounds_scan() {
        let mut ram = ram();
        // Remapped vector table at 0x07FC_7000 lies outside this window, so
        // the word cannot be read and the window end bounds the scan.
        ram[0] = frame_addr() + 36;
        let window = SliceWindow::new(RAM_BASE, &ram);
        let mut store = CrashStore::new();

        let outcome = capture_fault(
            &mut store,
            FaultHandlerKind::NonMaskableFault,
            &window,
            &MemoryMap::DA14531,
            true,
            frame_addr(),
            &FixedEpoch(0),
        );
        assert_eq!(outcome, CaptureOutcome::Recorded { slot: 0, call_trace_len: 3 });

        let outcome = capture_fault(
            &mut store,
            FaultHandlerKind::NonMaskableFault,
            &window,
            &MemoryMap::DA14531,
            false,
            frame_addr(),
            &FixedEpoch(0),
        );
        assert_eq!(
            outcome,
            CaptureOutcome::Recorded { slot: 1, call_trace_len: 1 },
            "default boot vector stops the scan one word above the frame"
        );
    }

    #[test]
    fn test_full_store_skips_but_still_resets() {
        let ram = ram();
        let window = SliceWindow::new(RAM_BASE, &ram);
        let mut store = CrashStore::new();
        let mut system = MockSystem::new();
        let config = CaptureConfig::DA14531;

        for _ in 0..MAX_RECORDS {
            handle_fault(&config, FaultHandlerKind::HardFault, frame_addr(), &mut store, &window, &mut system, &FixedEpoch(1));
        }
        let before = store;
        let disposition = handle_fault(
            &config,
            FaultHandlerKind::HardFault,
            frame_addr(),
            &mut store,
            &window,
            &mut system,
            &FixedEpoch(2),
        );

        assert_eq!(
            disposition,
            FaultDisposition::Reset(CaptureOutcome::Skipped(SkipReason::CapacityExhausted))
        );
        assert_eq!(store, before);
        assert_eq!(system.resets.len(), MAX_RECORDS + 1, "every fault resets");
    }

    #[test]
    fn test_development_debug_halts_without_recording() {
        let ram = ram();
        let window = SliceWindow::new(RAM_BASE, &ram);
        let mut store = CrashStore::new();
        let mut system = MockSystem { debugger: true, ..MockSystem::new() };
        let config = CaptureConfig { development_debug: true, ..CaptureConfig::DA14531 };

        let disposition = handle_fault(
            &config,
            FaultHandlerKind::HardFault,
            frame_addr(),
            &mut store,
            &window,
            &mut system,
            &FixedEpoch(0),
        );

        assert_eq!(disposition, FaultDisposition::Halt { debugger_attached: true });
        assert_eq!(store.reset_count(), 0);
        assert_eq!(system.debugger_prepared, 1);
        assert!(system.resets.is_empty());
    }

    #[test]
    fn test_reset_mode_follows_config() {
        let ram = ram();
        let window = SliceWindow::new(RAM_BASE, &ram);
        let mut store = CrashStore::new();
        let mut system = MockSystem::new();
        let config = CaptureConfig { reset_mode: ResetMode::KeepRemap, ..CaptureConfig::DA14531 };

        handle_fault(&config, FaultHandlerKind::HardFault, frame_addr(), &mut store, &window, &mut system, &FixedEpoch(0));
        assert_eq!(system.resets.as_slice(), &[ResetMode::KeepRemap]);
    }

    #[test]
    fn test_unreadable_frame_is_zeroed() {
        let ram = ram();
        let window = SliceWindow::new(RAM_BASE, &ram);
        let mut store = CrashStore::new();
        let outcome = capture_fault(
            &mut store,
            FaultHandlerKind::HardFault,
            &window,
            &MemoryMap::DA14531,
            false,
            0x2000_0000,
            &FixedEpoch(0),
        );
        assert_eq!(outcome, CaptureOutcome::Recorded { slot: 0, call_trace_len: 0 });
        assert_eq!(*store.records()[0].frame(), StackFrame::default());
        assert!(store.records()[0].call_trace().len() <= CALL_DEPTH);
    }
}
