//! Client characteristic configuration of the response endpoint.

use crate::att::AttError;
use crate::config::CCC_LEN;

/// Whether the peer asked for notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum NotifyState {
    /// CCC value `0x0000`.
    #[default]
    Off,
    /// CCC value `0x0001`.
    Notify,
}

impl NotifyState {
    /// Parse a CCC write.
    ///
    /// Exactly two bytes, little-endian, value 0 or 1. Indications (2) are
    /// not supported and are rejected like any other value.
    pub fn parse(data: &[u8]) -> Result<Self, AttError> {
        let bytes: [u8; CCC_LEN] = data.try_into().map_err(|_| AttError::WriteNotPermitted)?;
        match u16::from_le_bytes(bytes) {
            0 => Ok(Self::Off),
            1 => Ok(Self::Notify),
            _ => Err(AttError::WriteNotPermitted),
        }
    }

    /// Returns `true` for [`NotifyState::Notify`].
    pub const fn is_enabled(self) -> bool {
        matches!(self, Self::Notify)
    }
}
