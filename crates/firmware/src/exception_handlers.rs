//! Cortex-M0+ fault entry points.
//!
//! - **HardFault**: illegal instruction, bus error, unaligned access, a
//!   branch to an even address, and anything else the M0+ escalates.
//! - **NMI**: raised by the DA14531 watchdog when it expires; this is how
//!   a hung main loop gets recorded.
//!
//! Both locate the frame the core pushed on exception entry and hand it to
//! [`diagnostics::handle_fault`], which records it in the retained store
//! and requests a software reset. With `development-debug` nothing is
//! recorded; the handler freezes the watchdog and waits for a debugger.
//!
//! Nothing here allocates, locks or logs. The handlers never return to the
//! interrupted code.
//!
//! # Hardware-only entry points
//!
//! The vector-table entries need the ARM target and cortex-m-rt, so they
//! are gated behind `#[cfg(feature = "hardware")]`. The configuration and
//! the SysRAM window bounds compile everywhere so host tests can check
//! them.

use diagnostics::{CaptureConfig, MemoryMap};
use platform::ResetMode;

/// First address of SysRAM.
pub const SYSRAM_BASE: u32 = 0x07FC_0000;

/// Size of SysRAM1 + SysRAM2 + SysRAM3.
pub const SYSRAM_LEN: u32 = 48 * 1024;

/// Fault handling configuration selected by the build features.
pub const CAPTURE_CONFIG: CaptureConfig = CaptureConfig {
    map: MemoryMap::DA14531,
    development_debug: cfg!(feature = "development-debug"),
    reset_mode: if cfg!(feature = "remap-addr0-test") {
        ResetMode::KeepRemap
    } else {
        ResetMode::RestoreDefaultRemap
    },
};

#[cfg(feature = "hardware")]
mod hardware {
    use diagnostics::{handle_fault, FaultDisposition, FaultHandlerKind};
    use platform::RawWindow;

    use super::{CAPTURE_CONFIG, SYSRAM_BASE, SYSRAM_LEN};
    use crate::regs::Da14531System;
    use crate::retained;

    /// Shared body of both entry points.
    fn on_fault(kind: FaultHandlerKind, frame_addr: u32) -> ! {
        // SAFETY: running on the DA14531.
        let mut system = unsafe { Da14531System::new() };
        // SAFETY: SysRAM is plain RAM, fully mapped, with no read side
        // effects.
        let window = unsafe { RawWindow::new(SYSRAM_BASE, SYSRAM_LEN) };
        // SAFETY: this handler preempted the main loop and never returns
        // to it, so it is the only user of the store from here on.
        let store = unsafe { retained::store() };

        let disposition = handle_fault(
            &CAPTURE_CONFIG,
            kind,
            frame_addr,
            store,
            &window,
            &mut system,
            retained::epoch(),
        );

        match disposition {
            FaultDisposition::Halt {
                debugger_attached: true,
            } => loop {
                cortex_m::asm::bkpt();
            },
            // Either waiting for a debugger to attach, or for the reset
            // that was just requested.
            FaultDisposition::Halt { .. } | FaultDisposition::Reset(_) => loop {
                cortex_m::asm::nop();
            },
        }
    }

    /// HardFault exception handler.
    ///
    /// cortex-m-rt's trampoline has already picked MSP or PSP and passes
    /// the stacked frame.
    ///
    /// # Safety
    ///
    /// Called by the core only. Must never return.
    #[cortex_m_rt::exception]
    #[allow(unsafe_code)]
    unsafe fn HardFault(ef: &cortex_m_rt::ExceptionFrame) -> ! {
        on_fault(FaultHandlerKind::HardFault, ef as *const _ as u32)
    }

    // NMI has no cortex-m-rt trampoline that passes the frame, so the
    // vector entry is a strong `NonMaskableInt` symbol overriding the
    // runtime's weak default. Bit 2 of EXC_RETURN (in LR) selects the
    // stack the frame was pushed to.
    core::arch::global_asm!(
        ".section .text.NonMaskableInt, \"ax\"",
        ".global NonMaskableInt",
        ".type NonMaskableInt, %function",
        ".thumb_func",
        "NonMaskableInt:",
        "    movs r0, #4",
        "    mov r1, lr",
        "    tst r0, r1",
        "    bne 1f",
        "    mrs r0, MSP",
        "    b 2f",
        "1:",
        "    mrs r0, PSP",
        "2:",
        "    ldr r1, ={entry}",
        "    bx r1",
        "    .ltorg",
        entry = sym nmi_entry,
    );

    /// NMI body, entered from the assembly preamble with the frame address
    /// in r0.
    extern "C" fn nmi_entry(frame: *const u32) -> ! {
        on_fault(FaultHandlerKind::NonMaskableFault, frame as u32)
    }
}
