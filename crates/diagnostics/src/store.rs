//! Retained crash store.
//!
//! [`RetainedArea`] is the one structure that survives a warm reset: the
//! sentinel, the epoch counter and the [`CrashStore`]. It lives in an
//! uninitialised (NOLOAD) RAM section on the target, so after a power-on
//! reset its bytes are arbitrary. Every field is therefore a plain integer;
//! enums are stored as their `u8` codes and converted on read.
//!
//! Writers and readers never overlap. Fault capture writes the store from
//! exception context and always resets immediately afterwards; the export
//! service reads and clears it from the main loop.

use core::mem::size_of;

use platform::EpochCounter;

use crate::capture::SkipReason;
use crate::config::{CALL_DEPTH, MAX_RECORDS, RETAINED_UNINIT_SIZE, SENTINEL, SNAPSHOT_TAG};
use crate::frame::{FaultHandlerKind, StackFrame};
use crate::reset::ResetReason;

/// One captured fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(C)]
pub struct FaultRecord {
    valid: u8,
    handler: u8,
    call_trace_len: u8,
    _reserved: u8,
    epoch: u32,
    frame: StackFrame,
    call_trace: [u32; CALL_DEPTH],
}

impl FaultRecord {
    /// An empty, invalid slot.
    pub const EMPTY: Self = Self {
        valid: 0,
        handler: 0,
        call_trace_len: 0,
        _reserved: 0,
        epoch: 0,
        frame: StackFrame::from_words([0; 8]),
        call_trace: [0; CALL_DEPTH],
    };

    /// Returns `true` if the slot holds a captured fault.
    pub const fn is_valid(&self) -> bool {
        self.valid != 0
    }

    /// Raw `valid` byte.
    pub const fn valid_byte(&self) -> u8 {
        self.valid
    }

    /// Entry point that captured the fault, if the stored code is known.
    pub fn handler(&self) -> Option<FaultHandlerKind> {
        FaultHandlerKind::try_from(self.handler).ok()
    }

    /// Raw handler code.
    pub const fn handler_code(&self) -> u8 {
        self.handler
    }

    /// Epoch at capture time.
    pub const fn epoch(&self) -> u32 {
        self.epoch
    }

    /// Exception frame pushed by the hardware.
    pub const fn frame(&self) -> &StackFrame {
        &self.frame
    }

    /// Number of call-trace entries found, clamped to [`CALL_DEPTH`].
    pub fn call_trace_len(&self) -> usize {
        usize::from(self.call_trace_len).min(CALL_DEPTH)
    }

    /// The call-trace entries found, innermost first.
    pub fn call_trace(&self) -> &[u32] {
        self.call_trace
            .get(..self.call_trace_len())
            .unwrap_or(&[])
    }

    /// All [`CALL_DEPTH`] trace slots, including unused zeroed ones.
    pub const fn call_trace_slots(&self) -> &[u32; CALL_DEPTH] {
        &self.call_trace
    }

    pub(crate) fn open(&mut self, kind: FaultHandlerKind) {
        *self = Self::EMPTY;
        self.valid = 1;
        self.handler = kind as u8;
    }

    pub(crate) fn fill(&mut self, epoch: u32, frame: StackFrame, trace: &[u32]) {
        self.epoch = epoch;
        self.frame = frame;
        let mut len = 0_u8;
        for (slot, value) in self.call_trace.iter_mut().zip(trace) {
            *slot = *value;
            len = len.saturating_add(1);
        }
        self.call_trace_len = len;
    }
}

/// Persistent crash store: last reset reason plus the fault records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(C)]
pub struct CrashStore {
    last_reset_reason: u8,
    reset_count: u8,
    _reserved: [u8; 2],
    records: [FaultRecord; MAX_RECORDS],
}

impl CrashStore {
    /// An all-zero store.
    pub const fn new() -> Self {
        Self {
            last_reset_reason: 0,
            reset_count: 0,
            _reserved: [0; 2],
            records: [FaultRecord::EMPTY; MAX_RECORDS],
        }
    }

    /// Reason of the most recent reset, as recorded at boot.
    ///
    /// Unknown codes read back as [`ResetReason::Unknown`].
    pub fn last_reset_reason(&self) -> ResetReason {
        ResetReason::try_from(self.last_reset_reason).unwrap_or(ResetReason::Unknown)
    }

    /// Number of valid records, clamped to [`MAX_RECORDS`].
    pub fn reset_count(&self) -> u8 {
        self.reset_count.min(CAPACITY)
    }

    /// Returns `true` once every slot is used.
    pub fn is_full(&self) -> bool {
        usize::from(self.reset_count()) >= MAX_RECORDS
    }

    /// The valid prefix of the records array.
    pub fn records(&self) -> &[FaultRecord] {
        self.records
            .get(..usize::from(self.reset_count()))
            .unwrap_or(&[])
    }

    /// Zero the whole store.
    ///
    /// Only call this after every record of interest has been exported;
    /// there is no partial clear.
    pub fn clear(&mut self) {
        *self = Self::new();
    }

    /// Claim the next free slot for a fault caught by `kind`.
    ///
    /// On success the slot is marked valid, `reset_count` is advanced and
    /// the slot's index is returned. When all slots are used the store is
    /// left untouched.
    pub fn begin_record(&mut self, kind: FaultHandlerKind) -> Result<usize, SkipReason> {
        let index = usize::from(self.reset_count());
        let record = self
            .records
            .get_mut(index)
            .ok_or(SkipReason::CapacityExhausted)?;
        record.open(kind);
        self.reset_count = self.reset_count().saturating_add(1);
        Ok(index)
    }

    /// Mutable access to an already claimed slot.
    pub(crate) fn record_mut(&mut self, index: usize) -> Option<&mut FaultRecord> {
        self.records.get_mut(index)
    }

    /// Read-only view of the store for exporters.
    pub fn snapshot(&self) -> Snapshot<'_> {
        Snapshot {
            tag: SNAPSHOT_TAG,
            length: size_of::<Self>(),
            store: self,
        }
    }

    fn set_last_reset_reason(&mut self, reason: ResetReason) {
        self.last_reset_reason = reason as u8;
    }
}

impl Default for CrashStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Borrowed snapshot handed to exporters.
///
/// The borrow ends with the current boot; the store is reused in place.
#[derive(Debug, Clone, Copy)]
pub struct Snapshot<'a> {
    /// Always [`SNAPSHOT_TAG`].
    pub tag: u16,
    /// In-memory size of the store in bytes.
    pub length: usize,
    /// The store itself.
    pub store: &'a CrashStore,
}

/// Everything that survives a warm reset.
#[derive(Debug)]
#[repr(C)]
pub struct RetainedArea {
    sentinel: u32,
    epoch: EpochCounter,
    store: CrashStore,
}

const _: () = assert!(size_of::<RetainedArea>() <= RETAINED_UNINIT_SIZE);
const _: () = assert!(MAX_RECORDS <= u8::MAX as usize);

#[allow(clippy::cast_possible_truncation)]
const CAPACITY: u8 = MAX_RECORDS as u8;

impl RetainedArea {
    /// A zeroed, uninitialised area; the next [`init`](Self::init) is cold.
    pub const fn new() -> Self {
        Self {
            sentinel: 0,
            epoch: EpochCounter::new(),
            store: CrashStore::new(),
        }
    }

    /// Bring the area up for this boot.
    ///
    /// The store is zeroed when `reason` is a power-on reset or the
    /// sentinel does not match. The reason is always recorded and the
    /// sentinel always rewritten. Returns `true` when the area was cold;
    /// the caller must then restart the epoch.
    ///
    /// Call exactly once per boot, before any other access.
    pub fn init(&mut self, reason: ResetReason) -> bool {
        let cold = reason == ResetReason::PowerOnReset || self.sentinel != SENTINEL;
        if cold {
            self.store.clear();
        }
        self.store.set_last_reset_reason(reason);
        self.sentinel = SENTINEL;
        cold
    }

    /// Returns `true` if the sentinel matches.
    pub const fn is_initialised(&self) -> bool {
        self.sentinel == SENTINEL
    }

    /// The retained epoch counter.
    pub const fn epoch(&self) -> &EpochCounter {
        &self.epoch
    }

    /// The crash store.
    pub const fn store(&self) -> &CrashStore {
        &self.store
    }

    /// The crash store, mutably.
    pub fn store_mut(&mut self) -> &mut CrashStore {
        &mut self.store
    }

    /// Store and epoch counter together, as fault capture needs them.
    pub fn split_mut(&mut self) -> (&mut CrashStore, &EpochCounter) {
        (&mut self.store, &self.epoch)
    }

    /// Field pointers of the area at `area`, without borrowing the whole
    /// area.
    ///
    /// The firmware hands the epoch counter to the tick interrupt and the
    /// store to the main loop for the rest of the boot; the two borrows
    /// must not overlap.
    ///
    /// # Safety
    ///
    /// `area` must be non-null, aligned, and point to memory the size of a
    /// `RetainedArea`.
    #[allow(unsafe_code)]
    pub unsafe fn parts(area: *mut Self) -> (*mut CrashStore, *const EpochCounter) {
        // SAFETY: the caller guarantees `area` is in bounds; no reference
        // to the area is created.
        unsafe {
            (
                core::ptr::addr_of_mut!((*area).store),
                core::ptr::addr_of!((*area).epoch),
            )
        }
    }

    /// Fill the area with junk, as a power cycle leaves uninitialised RAM.
    ///
    /// Used by the emulator and by tests to model a cold boot.
    pub fn scramble(&mut self, sentinel: u32, fill: u8) {
        self.sentinel = sentinel;
        self.store.last_reset_reason = fill;
        self.store.reset_count = fill;
        for record in &mut self.store.records {
            record.valid = fill;
            record.handler = fill;
            record.call_trace_len = fill;
            record.epoch = u32::from_ne_bytes([fill; 4]);
        }
    }
}

impl Default for RetainedArea {
    fn default() -> Self {
        Self::new()
    }
}
