//! System control: memory remap state, debugger probe and forced reset.

/// How a forced reset treats the address-0 remap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ResetMode {
    /// Clear the remap field so the next boot fetches its vector table from
    /// the default location.
    RestoreDefaultRemap,
    /// Keep the current remap across the reset (remap test builds only).
    KeepRemap,
}

/// System controller operations used from exception context.
///
/// Implementations must not allocate, lock, or log: these methods are
/// called from the HardFault and NMI handlers.
pub trait SystemControl {
    /// Returns `true` when the secondary SysRAM bank is mapped at address 0,
    /// which moves the boot vector table.
    fn boot_vector_remapped(&self) -> bool;

    /// Returns `true` when a debugger is connected to the SWD port.
    fn debugger_attached(&self) -> bool;

    /// Re-enable the debug port and freeze the watchdog so a debugger can
    /// attach to a halted core.
    fn prepare_for_debugger(&mut self);

    /// Request a system reset.
    ///
    /// On hardware the reset takes effect within a few cycles and this call
    /// effectively never returns; the caller spins afterwards. Retained
    /// memory is not touched by this reset path.
    fn request_reset(&mut self, mode: ResetMode);
}
