//! Reset classification.
//!
//! Bit `n` of the reset-status register corresponds to the reason with
//! discriminant `n`. When several bits are latched the lowest one wins;
//! this is a fixed priority order, not "most specific cause".

use core::fmt;

/// Why the device last came out of reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum ResetReason {
    /// Power-on reset (bit 0). Retained memory content is lost.
    PowerOnReset = 0,
    /// Hardware reset pin (bit 1).
    HardwareReset = 1,
    /// Software reset (bit 2), including the resets forced by fault capture.
    SoftwareReset = 2,
    /// Watchdog expiry (bit 3).
    WatchdogReset = 3,
    /// No known cause bit was set.
    Unknown = 4,
}

impl ResetReason {
    /// Reasons with a cause bit, in priority order.
    pub const PRIORITY: [Self; 4] = [
        Self::PowerOnReset,
        Self::HardwareReset,
        Self::SoftwareReset,
        Self::WatchdogReset,
    ];

    /// Cause bit in the reset-status register, if the reason has one.
    pub const fn mask(self) -> Option<u16> {
        match self {
            Self::Unknown => None,
            other => 1_u16.checked_shl(other as u32),
        }
    }

    /// Short upper-case tag used in crash reports.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PowerOnReset => "RESET_POR",
            Self::HardwareReset => "RESET_HW",
            Self::SoftwareReset => "RESET_SW",
            Self::WatchdogReset => "RESET_WDOG",
            Self::Unknown => "RESET_UNKNOWN",
        }
    }
}

impl TryFrom<u8> for ResetReason {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::PowerOnReset),
            1 => Ok(Self::HardwareReset),
            2 => Ok(Self::SoftwareReset),
            3 => Ok(Self::WatchdogReset),
            4 => Ok(Self::Unknown),
            other => Err(other),
        }
    }
}

impl fmt::Display for ResetReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify a reset-status bitmask.
///
/// Returns the reason of the lowest set cause bit, or
/// [`ResetReason::Unknown`] when none of the cause bits is set.
pub fn classify(bits: u16) -> ResetReason {
    ResetReason::PRIORITY
        .into_iter()
        .find(|reason| reason.mask().is_some_and(|mask| bits & mask != 0))
        .unwrap_or(ResetReason::Unknown)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_single_bits() {
        assert_eq!(classify(0b0001), ResetReason::PowerOnReset);
        assert_eq!(classify(0b0010), ResetReason::HardwareReset);
        assert_eq!(classify(0b0100), ResetReason::SoftwareReset);
        assert_eq!(classify(0b1000), ResetReason::WatchdogReset);
    }

    #[test]
    fn test_lowest_bit_wins() {
        assert_eq!(
            classify(0b1100),
            ResetReason::SoftwareReset,
            "software beats watchdog by position, not by specificity"
        );
        assert_eq!(classify(0b1111), ResetReason::PowerOnReset);
    }

    #[test]
    fn test_empty_mask_is_unknown() {
        assert_eq!(classify(0), ResetReason::Unknown);
    }

    #[test]
    fn test_unrelated_bits_ignored() {
        assert_eq!(classify(0xFFF0), ResetReason::Unknown);
        assert_eq!(classify(0xFFF8), ResetReason::WatchdogReset);
    }

    #[test]
    fn test_try_from_u8() {
        assert_eq!(ResetReason::try_from(3).unwrap(), ResetReason::WatchdogReset);
        assert_eq!(ResetReason::try_from(9), Err(9));
    }

    #[test]
    fn test_unknown_has_no_mask() {
        assert_eq!(ResetReason::Unknown.mask(), None);
        assert_eq!(ResetReason::WatchdogReset.mask(), Some(0b1000));
    }
}
