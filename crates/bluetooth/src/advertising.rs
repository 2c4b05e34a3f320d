//! Advertising payloads.
//!
//! The advertising data carries the crash-info service UUID with the
//! current record count as service data, so a collector can tell from a
//! scan alone whether a device has something to report. The scan response
//! carries the device name.

use heapless::Vec;
use thiserror_no_std::Error;

use crate::config::CRASH_INFO_SERVICE_UUID;

/// Legacy advertising / scan-response payload limit.
pub const MAX_ADV_LEN: usize = 31;

/// Flags AD structure the stack prepends to advertising data.
pub const FLAGS_LEN: usize = 3;

/// AD type: service data, 128-bit UUID.
pub const AD_TYPE_SERVICE_DATA_128: u8 = 0x21;

/// AD type: complete local name.
pub const AD_TYPE_COMPLETE_NAME: u8 = 0x09;

/// Length byte and AD type in front of every AD structure.
const AD_HEADER_LEN: usize = 2;

/// Size of the service-data structure built by [`service_data`].
pub const SERVICE_DATA_LEN: usize = AD_HEADER_LEN + CRASH_INFO_SERVICE_UUID.len() + 1;

const _: () = assert!(SERVICE_DATA_LEN + FLAGS_LEN <= MAX_ADV_LEN);

/// One legacy advertising payload.
pub type AdvPayload = Vec<u8, MAX_ADV_LEN>;

/// Advertising payload construction failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AdvError {
    /// The AD structure does not fit a legacy payload.
    #[error("AD structure of {0} bytes exceeds the advertising payload")]
    TooLong(usize),
}

/// Advertising data: `[len, 0x21, UUID128 (LE), num_resets]`.
pub fn service_data(num_resets: u8) -> Result<AdvPayload, AdvError> {
    ad_structure(
        AD_TYPE_SERVICE_DATA_128,
        &[&CRASH_INFO_SERVICE_UUID, &[num_resets]],
    )
}

/// Scan response: `[len, 0x09, name...]`, with the name cut to fit.
pub fn scan_response(name: &str) -> Result<AdvPayload, AdvError> {
    let room = MAX_ADV_LEN.saturating_sub(AD_HEADER_LEN);
    let bytes = name.as_bytes();
    let name = bytes.get(..room.min(bytes.len())).unwrap_or(&[]);
    ad_structure(AD_TYPE_COMPLETE_NAME, &[name])
}

/// One AD structure: length byte, `ad_type`, then `parts` concatenated.
fn ad_structure(ad_type: u8, parts: &[&[u8]]) -> Result<AdvPayload, AdvError> {
    let body_len = parts
        .iter()
        .fold(1_usize, |len, part| len.saturating_add(part.len()));
    let total = body_len.saturating_add(1);
    let len_byte = u8::try_from(body_len).map_err(|_| AdvError::TooLong(total))?;

    let mut out = AdvPayload::new();
    let too_long = |_| AdvError::TooLong(total);
    out.extend_from_slice(&[len_byte, ad_type]).map_err(too_long)?;
    for part in parts {
        out.extend_from_slice(part).map_err(too_long)?;
    }
    Ok(out)
}
