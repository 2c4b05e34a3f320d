//! Commands accepted on the command endpoint.

use core::fmt;

use crate::att::AttError;

/// A crash-info service command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Command {
    /// Export the store header and every valid record, then clear the store.
    GetAllResetData = 0x01,
    /// Report the number of recorded faults.
    GetNumResets = 0x02,
}

impl Command {
    /// Parse a command write: exactly one byte holding a known code.
    pub fn parse(data: &[u8]) -> Result<Self, AttError> {
        match data {
            [code] => Self::try_from(*code),
            _ => Err(AttError::WriteNotPermitted),
        }
    }

    /// The command code as echoed in the response header.
    pub const fn echo(self) -> u16 {
        self as u16
    }
}

impl TryFrom<u8> for Command {
    type Error = AttError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0x01 => Ok(Self::GetAllResetData),
            0x02 => Ok(Self::GetNumResets),
            _ => Err(AttError::WriteNotPermitted),
        }
    }
}

impl TryFrom<u16> for Command {
    type Error = AttError;

    fn try_from(echo: u16) -> Result<Self, Self::Error> {
        u8::try_from(echo)
            .map_err(|_| AttError::WriteNotPermitted)
            .and_then(Self::try_from)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GetAllResetData => f.write_str("GetAllResetData"),
            Self::GetNumResets => f.write_str("GetNumResets"),
        }
    }
}
