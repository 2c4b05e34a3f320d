//! Boot-time glue for the crash diagnostics.
//!
//! Boot order (MUST be respected):
//!   1. Read (and re-arm) the reset-cause register
//!   2. Classify the reset and bring the retained area up
//!   3. Restart the epoch if the area was cold
//!   4. Log the crash report left by the previous boot
//!   5. Start the epoch tick
//!   6. Hand the store to the export endpoint
//!
//! Steps 1-3 run before interrupts are enabled: the fault handlers and the
//! tick both touch the retained area.

use diagnostics::{classify, ResetReason, RetainedArea};
use platform::ResetStatus;

/// Ordered list of boot steps, for documentation and tests.
pub const BOOT_SEQUENCE_STEPS: &[&str] = &[
    "1. RESET_STAT_REG: read once, clear unless only SWRESET is set",
    "2. Retained area: classify reset, cold-init on POR or bad sentinel",
    "3. Epoch: restart from zero after a cold init",
    "4. Report: log the previous crash records",
    "5. SysTick: start the epoch tick",
    "6. Export endpoint: attach the crash store",
];

/// Epoch tick period in milliseconds.
pub const EPOCH_TICK_MS: u32 = 1000;

/// DA14531 core clock after boot (XTAL16M, no divider).
pub const CORE_CLOCK_HZ: u32 = 16_000_000;

/// Largest value the SysTick reload register accepts (24 bits).
pub const SYSTICK_MAX_RELOAD: u32 = 0x00FF_FFFF;

/// SysTick reload value for one tick every `tick_ms` at `core_hz`.
///
/// Returns `None` when the period is zero or does not fit the 24-bit
/// counter. At 16 MHz the longest period is about 1048 ms.
pub fn systick_reload(core_hz: u32, tick_ms: u32) -> Option<u32> {
    let cycles = u64::from(core_hz)
        .checked_mul(u64::from(tick_ms))?
        .checked_div(1000)?;
    let reload = cycles.checked_sub(1)?;
    u32::try_from(reload).ok().filter(|r| *r <= SYSTICK_MAX_RELOAD)
}

/// Bring the retained area up for this boot.
///
/// Reads the reset cause through `status`, initialises `area` and zeroes
/// its epoch counter when the store was cold. Returns the classified
/// reason.
pub fn reset_indication<R: ResetStatus + ?Sized>(
    status: &mut R,
    area: &mut RetainedArea,
) -> ResetReason {
    let reason = classify(status.take());
    if area.init(reason) {
        area.epoch().reset();
    }
    reason
}
