//! Reset-cause register abstraction.
//!
//! The reset-status register is a small bitmask latched by the power
//! management unit. Bit 0 is power-on reset; the meaning of the remaining
//! bits is platform defined. It is read exactly once per boot.

/// Power-on-reset flag in the DA14531 `RESET_STAT_REG`.
pub const POWER_ON_STAT: u16 = 1 << 0;

/// Software-reset flag in the DA14531 `RESET_STAT_REG`.
///
/// The booter issues a software reset when it starts the application after
/// a wake-up from hibernation, so a register holding only this flag is a
/// hibernation wake rather than a fresh reset.
pub const SWRESET_STAT: u16 = 1 << 2;

/// Access to the reset-cause register.
pub trait ResetStatus {
    /// Read the raw reset-cause bitmask.
    fn read(&mut self) -> u16;

    /// Clear every latched reset-cause flag.
    fn clear(&mut self);

    /// Read the register once and re-arm it for the next reset.
    ///
    /// The register is cleared unless the only flag set is
    /// [`SWRESET_STAT`]; a hibernation wake must leave the flags alone.
    fn take(&mut self) -> u16 {
        let bits = self.read();
        if bits & !SWRESET_STAT != 0 {
            self.clear();
        }
        bits
    }
}
