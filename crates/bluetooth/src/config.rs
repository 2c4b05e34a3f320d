//! Crash-info service configuration.

use diagnostics::wire::MAX_STORE_SIZE;

/// ATT notification header: opcode (1 byte) + attribute handle (2 bytes).
pub const ATT_OVERHEAD: u16 = 3;

/// ATT MTU before any exchange.
pub const DEFAULT_MTU: u16 = 23;

/// Response header: command echo (u16 LE) + payload length (u16 LE).
pub const RESPONSE_HEADER_SIZE: usize = 4;

/// Largest response the service can build.
pub const MAX_RESPONSE_LEN: usize = RESPONSE_HEADER_SIZE + MAX_STORE_SIZE;

/// Length of a valid subscription (CCC) write.
pub const CCC_LEN: usize = 2;

/// 128-bit UUID of the crash-info service, little-endian as sent on air.
///
/// Big-endian form: `5A2E0001-6D2B-4C5C-9E4A-5B1F3CD1A8E0`.
pub const CRASH_INFO_SERVICE_UUID: [u8; 16] = [
    0xE0, 0xA8, 0xD1, 0x3C, 0x1F, 0x5B, 0x4A, 0x9E, 0x5C, 0x4C, 0x2B, 0x6D, 0x01, 0x00, 0x2E, 0x5A,
];

/// Device name placed in the scan response.
pub const DEVICE_NAME: &str = "CRASH-INFO";

/// Export behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ExportConfig {
    /// Abandon a transfer that has made no progress for this many epochs.
    ///
    /// `None` keeps a stalled transfer until the peer disconnects.
    pub stall_timeout_epochs: Option<u32>,
}

impl ExportConfig {
    /// Configuration with a stall timeout.
    pub const fn with_stall_timeout(epochs: u32) -> Self {
        Self {
            stall_timeout_epochs: Some(epochs),
        }
    }
}
