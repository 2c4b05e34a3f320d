//! Boot sequence integration tests
//!
//! Exercises the boot-time glue from the firmware crate's perspective:
//! reset classification against the retained area, the epoch tick setup
//! and the register arithmetic the fault handlers rely on. Everything here
//! is pure or mock-backed, so it runs on the host.
//!
//! Run with: cargo test -p firmware --test integration_boot

#![allow(clippy::unwrap_used, clippy::indexing_slicing, clippy::arithmetic_side_effects)]

use diagnostics::{FaultHandlerKind, ResetReason, RetainedArea};
use firmware::boot::{BOOT_SEQUENCE_STEPS, SYSTICK_MAX_RELOAD};
use firmware::regs::{reset_request, sysram3_remapped, with_debugger_enabled, SW_RESET};
use firmware::{reset_indication, systick_reload, CAPTURE_CONFIG, CORE_CLOCK_HZ, EPOCH_TICK_MS};
use platform::mocks::MockResetStatus;
use platform::{ResetMode, POWER_ON_STAT, SWRESET_STAT};

const HWRESET_STAT: u16 = 1 << 1;
const WDOGRESET_STAT: u16 = 1 << 3;

fn boot(area: &mut RetainedArea, bits: u16) -> (ResetReason, MockResetStatus) {
    let mut status = MockResetStatus::new(bits);
    let reason = reset_indication(&mut status, area);
    (reason, status)
}

// ─── Boot order ──────────────────────────────────────────────────────────────

#[test]
fn test_boot_sequence_has_six_steps() {
    assert_eq!(BOOT_SEQUENCE_STEPS.len(), 6);
    assert!(BOOT_SEQUENCE_STEPS[0].contains("RESET_STAT_REG"));
    assert!(BOOT_SEQUENCE_STEPS[4].contains("SysTick"));
    assert!(
        BOOT_SEQUENCE_STEPS[5].contains("Export"),
        "the store is handed to the export endpoint last"
    );
}

// ─── Reset indication ────────────────────────────────────────────────────────

#[test]
fn test_power_on_initialises_empty_store() {
    let mut area = RetainedArea::new();
    area.scramble(0, 0xA5);

    let (reason, status) = boot(&mut area, POWER_ON_STAT);
    assert_eq!(reason, ResetReason::PowerOnReset);
    assert!(area.is_initialised());
    assert_eq!(area.store().reset_count(), 0);
    assert_eq!(area.epoch().get(), 0);
    assert_eq!(status.clear_count(), 1, "POR bits are cleared");
}

#[test]
fn test_software_reset_keeps_records_and_status() {
    let mut area = RetainedArea::new();
    boot(&mut area, POWER_ON_STAT);
    area.store_mut().begin_record(FaultHandlerKind::HardFault).unwrap();
    area.epoch().tick();

    let (reason, status) = boot(&mut area, SWRESET_STAT);
    assert_eq!(reason, ResetReason::SoftwareReset);
    assert_eq!(area.store().reset_count(), 1);
    assert_eq!(area.store().last_reset_reason(), ResetReason::SoftwareReset);
    assert_eq!(area.epoch().get(), 1);
    assert_eq!(status.clear_count(), 0, "a lone SWRESET bit is left set");
}

#[test]
fn test_watchdog_reset_is_warm() {
    let mut area = RetainedArea::new();
    boot(&mut area, POWER_ON_STAT);
    area.store_mut().begin_record(FaultHandlerKind::NonMaskableFault).unwrap();

    let (reason, _) = boot(&mut area, WDOGRESET_STAT);
    assert_eq!(reason, ResetReason::WatchdogReset);
    assert_eq!(area.store().reset_count(), 1);
}

#[test]
fn test_hardware_reset_is_warm() {
    let mut area = RetainedArea::new();
    boot(&mut area, POWER_ON_STAT);
    area.store_mut().begin_record(FaultHandlerKind::HardFault).unwrap();

    let (reason, _) = boot(&mut area, HWRESET_STAT);
    assert_eq!(reason, ResetReason::HardwareReset);
    assert_eq!(area.store().reset_count(), 1);
}

#[test]
fn test_warm_reset_over_garbage_is_cold() {
    let mut area = RetainedArea::new();
    area.scramble(0xFFFF_FFFF, 0x5A);

    let (reason, _) = boot(&mut area, SWRESET_STAT);
    assert_eq!(reason, ResetReason::SoftwareReset);
    assert!(area.is_initialised());
    assert_eq!(area.store().reset_count(), 0, "bad sentinel discards the store");
    assert_eq!(area.epoch().get(), 0);
}

// ─── Epoch tick ──────────────────────────────────────────────────────────────

#[test]
fn test_epoch_tick_fits_systick() {
    let reload = systick_reload(CORE_CLOCK_HZ, EPOCH_TICK_MS).unwrap();
    assert!(reload <= SYSTICK_MAX_RELOAD);
    assert_eq!(reload + 1, CORE_CLOCK_HZ / 1000 * EPOCH_TICK_MS);
}

#[test]
fn test_systick_rejects_slower_clock_overflow() {
    assert_eq!(systick_reload(u32::MAX, u32::MAX), None);
    assert_eq!(systick_reload(0, EPOCH_TICK_MS), None);
}

// ─── Fault-path registers ────────────────────────────────────────────────────

#[test]
fn test_default_reset_request_boots_from_rom() {
    let remapped = 0x0081;
    assert!(sysram3_remapped(remapped));

    let request = reset_request(remapped, CAPTURE_CONFIG.reset_mode);
    assert_eq!(request & SW_RESET, SW_RESET);
    if CAPTURE_CONFIG.reset_mode == ResetMode::RestoreDefaultRemap {
        assert!(!sysram3_remapped(request));
    }
}

#[test]
fn test_debugger_pins_survive_reset_request() {
    let ctrl = with_debugger_enabled(0x0001);
    let request = reset_request(ctrl, ResetMode::RestoreDefaultRemap);
    assert_eq!(request, 0x8080);
}
