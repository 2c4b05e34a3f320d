//! ATT status codes returned on the write-acceptance path.

use thiserror_no_std::Error;

/// Status code for an accepted write.
pub const ATT_ERR_NO_ERROR: u8 = 0x00;

/// Reasons a write to the crash-info service is rejected.
///
/// Each precondition has its own code so the peer can tell them apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AttError {
    /// Malformed payload, unknown command or unknown endpoint.
    #[error("write not permitted")]
    WriteNotPermitted,
    /// A command was written while notifications are not enabled.
    #[error("client characteristic configuration improperly configured")]
    CccdImproperlyConfigured,
    /// A command was written while another is still being answered.
    #[error("procedure already in progress")]
    ProcedureAlreadyInProgress,
}

impl AttError {
    /// Code the BLE stack sends back in the write response.
    pub const fn code(self) -> u8 {
        match self {
            Self::WriteNotPermitted => 0x03,
            Self::CccdImproperlyConfigured => 0xFD,
            Self::ProcedureAlreadyInProgress => 0xFE,
        }
    }
}

/// Collapse a write result to the status byte for the BLE stack.
pub fn status_code(result: Result<(), AttError>) -> u8 {
    match result {
        Ok(()) => ATT_ERR_NO_ERROR,
        Err(err) => err.code(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_distinct() {
        let codes = [
            AttError::WriteNotPermitted.code(),
            AttError::CccdImproperlyConfigured.code(),
            AttError::ProcedureAlreadyInProgress.code(),
        ];
        assert_eq!(codes, [0x03, 0xFD, 0xFE]);
    }

    #[test]
    fn test_status_code() {
        assert_eq!(status_code(Ok(())), 0);
        assert_eq!(status_code(Err(AttError::CccdImproperlyConfigured)), 0xFD);
    }
}
