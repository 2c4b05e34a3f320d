//! Placement of the retained area.
//!
//! The [`RetainedArea`] lives in `.retained`, a NOLOAD section that
//! `memory.x` pins to the `RETAINED` region at the top of SysRAM. Neither
//! the booter nor the startup code writes it, so its content survives a
//! warm reset, and is whatever the RAM holds after a power cycle. Every
//! field of the area is a plain integer, so any bit pattern is a valid
//! value; [`RetainedArea::init`] sorts out which case this boot is.
//!
//! Three contexts touch the area during a boot:
//!
//! | Context | Part | Access |
//! |---|---|---|
//! | boot, before interrupts | whole area | [`area`] |
//! | SysTick | epoch counter | [`epoch`] |
//! | main loop / fault handlers | crash store | [`store`] |
//!
//! The fault handlers preempt the main loop and never return to it, so the
//! two never write the store concurrently.

use core::mem::MaybeUninit;
use core::ptr::addr_of_mut;

use diagnostics::{CrashStore, RetainedArea};
use platform::EpochCounter;

#[cfg_attr(target_os = "none", link_section = ".retained")]
static mut RETAINED: MaybeUninit<RetainedArea> = MaybeUninit::uninit();

/// Address of the retained area.
pub fn area_ptr() -> *mut RetainedArea {
    addr_of_mut!(RETAINED).cast()
}

/// The whole retained area, for the boot sequence.
///
/// # Safety
///
/// Call once per boot, before the epoch tick or any fault handler can run,
/// and drop the reference before calling [`store`].
pub unsafe fn area() -> &'static mut RetainedArea {
    // SAFETY: the static is always allocated and every bit pattern is a
    // valid `RetainedArea`; exclusivity is the caller's contract.
    unsafe { &mut *area_ptr() }
}

/// The retained epoch counter.
///
/// The counter is only accessed atomically, so this shared reference may
/// coexist with [`store`].
pub fn epoch() -> &'static EpochCounter {
    // SAFETY: `parts` only computes a field address inside the static.
    let (_, epoch) = unsafe { RetainedArea::parts(area_ptr()) };
    // SAFETY: the field is in bounds of a `'static` allocation and only
    // ever accessed through `&EpochCounter` once the boot sequence is done.
    unsafe { &*epoch }
}

/// The retained crash store.
///
/// # Safety
///
/// The caller must be the only live user of the store: the main loop
/// after the boot sequence, or a fault handler that never returns.
pub unsafe fn store() -> &'static mut CrashStore {
    // SAFETY: `parts` only computes a field address inside the static.
    let (store, _) = unsafe { RetainedArea::parts(area_ptr()) };
    // SAFETY: in bounds of a `'static` allocation; exclusivity is the
    // caller's contract.
    unsafe { &mut *store }
}
