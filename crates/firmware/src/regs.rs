//! DA14531 system registers used by the crash diagnostics.
//!
//! The register arithmetic is kept in pure functions so it can be tested
//! on the host. [`Da14531System`] and [`Da14531ResetStatus`] apply it to
//! the real registers with volatile 16-bit accesses.
//!
//! | Register | Address | Fields used |
//! |---|---|---|
//! | `SYS_CTRL_REG` | `0x5000_0012` | `REMAP_ADR0` [1:0], `DEBUGGER_ENABLE` [8:7], `SW_RESET` [15] |
//! | `SYS_STAT_REG` | `0x5000_0014` | `DBG_IS_UP` [1] |
//! | `RESET_STAT_REG` | `0x5000_00BC` | POR [0], HW [1], SW [2], WDOG [3] |
//! | `SET_FREEZE_REG` | `0x5000_3300` | `FRZ_WDOG` [3] |

use platform::{ResetMode, ResetStatus, SystemControl};

/// System control register.
pub const SYS_CTRL_REG: u32 = 0x5000_0012;
/// System status register.
pub const SYS_STAT_REG: u32 = 0x5000_0014;
/// Reset cause register.
pub const RESET_STAT_REG: u32 = 0x5000_00BC;
/// Freeze control (write 1 to freeze).
pub const SET_FREEZE_REG: u32 = 0x5000_3300;

/// `SYS_CTRL_REG.REMAP_ADR0`: what is mapped at address 0.
pub const REMAP_ADR0: u16 = 0x0003;
/// `SYS_CTRL_REG.DEBUGGER_ENABLE`: SWD pin selection, 0 disables.
pub const DEBUGGER_ENABLE: u16 = 0x0180;
/// `SYS_CTRL_REG.SW_RESET`: writing 1 resets the system.
pub const SW_RESET: u16 = 0x8000;
/// `SYS_STAT_REG.DBG_IS_UP`: a debugger is attached.
pub const DBG_IS_UP: u16 = 0x0002;
/// `SET_FREEZE_REG.FRZ_WDOG`.
pub const FRZ_WDOG: u16 = 0x0008;

/// `DEBUGGER_ENABLE` value selecting the default SWD pins (P0_2 / P0_10).
const DEBUGGER_DEFAULT_PINS: u16 = 0x0080;

/// Returns `true` when `SYS_CTRL_REG` maps SysRAM3 at address 0, which
/// moves the boot vector to the SysRAM3 copy.
pub const fn sysram3_remapped(sys_ctrl: u16) -> bool {
    sys_ctrl & REMAP_ADR0 & 1 != 0
}

/// `SYS_CTRL_REG` value that triggers a software reset.
///
/// [`ResetMode::RestoreDefaultRemap`] clears `REMAP_ADR0` so the booter
/// runs from ROM again.
pub const fn reset_request(sys_ctrl: u16, mode: ResetMode) -> u16 {
    match mode {
        ResetMode::RestoreDefaultRemap => (sys_ctrl & !REMAP_ADR0) | SW_RESET,
        ResetMode::KeepRemap => sys_ctrl | SW_RESET,
    }
}

/// `SYS_CTRL_REG` value with the debug port enabled on the default pins.
pub const fn with_debugger_enabled(sys_ctrl: u16) -> u16 {
    (sys_ctrl & !DEBUGGER_ENABLE) | DEBUGGER_DEFAULT_PINS
}

/// Returns `true` when `SYS_STAT_REG` reports an attached debugger.
pub const fn debugger_is_up(sys_stat: u16) -> bool {
    sys_stat & DBG_IS_UP == DBG_IS_UP
}

#[inline(always)]
fn read16(addr: u32) -> u16 {
    // SAFETY: only called with the register addresses above, which are
    // always mapped and side-effect free to read on the DA14531.
    unsafe { core::ptr::read_volatile(addr as usize as *const u16) }
}

#[inline(always)]
fn write16(addr: u32, value: u16) {
    // SAFETY: only called with the register addresses above.
    unsafe { core::ptr::write_volatile(addr as usize as *mut u16, value) }
}

/// The DA14531 system controller.
#[derive(Debug)]
pub struct Da14531System {
    _private: (),
}

impl Da14531System {
    /// Take the system controller.
    ///
    /// # Safety
    ///
    /// Must only be called on the DA14531, where the register block is
    /// mapped.
    pub const unsafe fn new() -> Self {
        Self { _private: () }
    }
}

impl SystemControl for Da14531System {
    fn boot_vector_remapped(&self) -> bool {
        sysram3_remapped(read16(SYS_CTRL_REG))
    }

    fn debugger_attached(&self) -> bool {
        debugger_is_up(read16(SYS_STAT_REG))
    }

    fn prepare_for_debugger(&mut self) {
        write16(SYS_CTRL_REG, with_debugger_enabled(read16(SYS_CTRL_REG)));
        write16(SET_FREEZE_REG, FRZ_WDOG);
    }

    fn request_reset(&mut self, mode: ResetMode) {
        write16(SYS_CTRL_REG, reset_request(read16(SYS_CTRL_REG), mode));
    }
}

/// The DA14531 `RESET_STAT_REG`.
#[derive(Debug)]
pub struct Da14531ResetStatus {
    _private: (),
}

impl Da14531ResetStatus {
    /// Take the reset status register.
    ///
    /// # Safety
    ///
    /// Must only be called on the DA14531.
    pub const unsafe fn new() -> Self {
        Self { _private: () }
    }
}

impl ResetStatus for Da14531ResetStatus {
    fn read(&mut self) -> u16 {
        read16(RESET_STAT_REG)
    }

    fn clear(&mut self) {
        write16(RESET_STAT_REG, 0);
    }
}
