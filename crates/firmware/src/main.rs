//! Crash-info firmware - Main Entry Point
//!
//! Hardware-only entry point for the DA14531. The vendor BLE stack drives
//! the export service through `firmware::ffi`; this loop only brings the
//! diagnostics up, runs the epoch tick and polls for stalled transfers.

#![no_std]
#![no_main]

use cortex_m::peripheral::syst::SystClkSource;
use cortex_m_rt::{entry, exception};
use defmt_rtt as _;
// Panic handler
use panic_probe as _;

use firmware::boot::{reset_indication, systick_reload, CORE_CLOCK_HZ, EPOCH_TICK_MS};
use firmware::{ffi, retained, Da14531ResetStatus};

#[entry]
fn main() -> ! {
    defmt::info!("crash-info firmware v{=str}", env!("CARGO_PKG_VERSION"));

    // Steps 1-3: reset cause, retained area, epoch.
    // See: firmware::boot::BOOT_SEQUENCE_STEPS for the full ordered sequence.
    // SAFETY: running on the DA14531.
    let mut reset_status = unsafe { Da14531ResetStatus::new() };
    // SAFETY: first and only whole-area access; SysTick is not running yet
    // and the reference is dead before `retained::store` is called.
    let area = unsafe { retained::area() };
    let reason = reset_indication(&mut reset_status, area);
    defmt::info!("reset reason: {}", reason);

    // Step 4: report what the previous boot left behind.
    diagnostics::report::log_store(area.store());

    // Step 5: epoch tick.
    let Some(mut core) = cortex_m::Peripherals::take() else {
        defmt::error!("core peripherals already taken");
        loop {
            cortex_m::asm::wfi();
        }
    };
    match systick_reload(CORE_CLOCK_HZ, EPOCH_TICK_MS) {
        Some(reload) => {
            core.SYST.set_clock_source(SystClkSource::Core);
            core.SYST.set_reload(reload);
            core.SYST.clear_current();
            core.SYST.enable_interrupt();
            core.SYST.enable_counter();
            defmt::info!("epoch tick: {=u32} ms", EPOCH_TICK_MS);
        }
        None => defmt::warn!("epoch tick period does not fit SysTick, epoch frozen"),
    }

    // Step 6: the main loop owns the store from here on.
    // SAFETY: `area` is no longer used; fault handlers never return here.
    ffi::attach_store(unsafe { retained::store() });

    loop {
        ffi::poll();
        cortex_m::asm::wfi();
    }
}

#[exception]
fn SysTick() {
    retained::epoch().tick();
}
