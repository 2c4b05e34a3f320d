//! C entry points for the vendor BLE stack.
//!
//! The DA14531 BLE stack and its GATT database are linked in as a C
//! library. Its crash-info profile glue calls these functions from the
//! stack's event loop and drains outgoing notifications with
//! [`crash_info_next_notification`]. Endpoints are numbered as in
//! [`endpoint_from_id`].

#![allow(unsafe_code)]

use core::cell::RefCell;

use bluetooth::{AttError, ExportConfig, ExportEvent};
use diagnostics::CrashStore;
use embassy_sync::blocking_mutex::Mutex;
use platform::{Endpoint, NotifyStatus};

use crate::export::{with_endpoint, ExportEndpoint, NotifyQueue, SharedEndpoint};
use crate::retained;

/// Endpoint id of the command characteristic.
pub const ENDPOINT_COMMAND: u8 = 0;
/// Endpoint id of the response characteristic.
pub const ENDPOINT_RESPONSE: u8 = 1;
/// Endpoint id of the response characteristic's CCC descriptor.
pub const ENDPOINT_SUBSCRIPTION: u8 = 2;

/// Stack status meaning "notification sent".
const GAP_ERR_NO_ERROR: u8 = 0;

/// Transfers idle for this many epochs are dropped.
///
/// [`ExportConfig::default`] never times out a transfer; this firmware
/// opts in so a peer that stops confirming cannot hold the service busy
/// until it disconnects.
const STALL_TIMEOUT_EPOCHS: u32 = 30;

static NOTIFY_QUEUE: NotifyQueue = NotifyQueue::new();

static ENDPOINT: SharedEndpoint<'static> = Mutex::new(RefCell::new(ExportEndpoint::new(
    ExportConfig::with_stall_timeout(STALL_TIMEOUT_EPOCHS),
    &NOTIFY_QUEUE,
)));

/// Map a C endpoint id to an [`Endpoint`].
pub const fn endpoint_from_id(id: u8) -> Option<Endpoint> {
    match id {
        ENDPOINT_COMMAND => Some(Endpoint::Command),
        ENDPOINT_RESPONSE => Some(Endpoint::Response),
        ENDPOINT_SUBSCRIPTION => Some(Endpoint::Subscription),
        _ => None,
    }
}

const fn endpoint_id(endpoint: Endpoint) -> u8 {
    match endpoint {
        Endpoint::Command => ENDPOINT_COMMAND,
        Endpoint::Response => ENDPOINT_RESPONSE,
        Endpoint::Subscription => ENDPOINT_SUBSCRIPTION,
    }
}

/// Hand the retained store to the endpoint (boot step 6).
pub fn attach_store(store: &'static mut CrashStore) {
    if with_endpoint(&ENDPOINT, |endpoint| endpoint.attach(store)).is_err() {
        defmt::error!("crash-info: endpoint busy, store not attached");
    }
}

/// Main-loop housekeeping.
pub fn poll() {
    let now = retained::epoch().get();
    if let Ok(Some(ExportEvent::Abandoned)) = with_endpoint(&ENDPOINT, |endpoint| endpoint.poll(now)) {
        defmt::warn!("crash-info: stalled transfer dropped");
    }
}

/// # Safety
///
/// `data` must be null or point to `len` readable bytes.
unsafe fn bytes<'a>(data: *const u8, len: u16) -> &'a [u8] {
    if data.is_null() {
        return &[];
    }
    // SAFETY: non-null, and the caller guarantees `len` readable bytes.
    unsafe { core::slice::from_raw_parts(data, usize::from(len)) }
}

/// A peer connected on `conn_index`.
#[no_mangle]
pub extern "C" fn crash_info_on_connect(conn_index: u8) {
    let _ = with_endpoint(&ENDPOINT, |endpoint| endpoint.on_connected(conn_index));
}

/// The MTU exchange finished.
#[no_mangle]
pub extern "C" fn crash_info_on_mtu_changed(mtu: u16) {
    let _ = with_endpoint(&ENDPOINT, |endpoint| endpoint.on_mtu_changed(mtu));
}

/// Check a write; returns the ATT status to reply with.
///
/// # Safety
///
/// `data` must be null or point to `len` readable bytes.
#[no_mangle]
pub unsafe extern "C" fn crash_info_validate_write(endpoint: u8, data: *const u8, len: u16) -> u8 {
    let Some(endpoint) = endpoint_from_id(endpoint) else {
        return AttError::WriteNotPermitted.code();
    };
    // SAFETY: forwarded from this function's contract.
    let data = unsafe { bytes(data, len) };
    with_endpoint(&ENDPOINT, |ep| ep.validate_write(endpoint, data))
        .unwrap_or(AttError::ProcedureAlreadyInProgress.code())
}

/// Apply a write; returns the ATT status to reply with.
///
/// # Safety
///
/// `data` must be null or point to `len` readable bytes.
#[no_mangle]
pub unsafe extern "C" fn crash_info_on_write(endpoint: u8, data: *const u8, len: u16) -> u8 {
    let Some(endpoint) = endpoint_from_id(endpoint) else {
        return AttError::WriteNotPermitted.code();
    };
    // SAFETY: forwarded from this function's contract.
    let data = unsafe { bytes(data, len) };
    let now = retained::epoch().get();
    with_endpoint(&ENDPOINT, |ep| ep.on_write(endpoint, data, now))
        .unwrap_or(AttError::ProcedureAlreadyInProgress.code())
}

/// The stack finished sending the last notification with `status`.
#[no_mangle]
pub extern "C" fn crash_info_on_notify_complete(status: u8) {
    let status = if status == GAP_ERR_NO_ERROR {
        NotifyStatus::Sent
    } else {
        NotifyStatus::Failed(status)
    };
    let now = retained::epoch().get();
    match with_endpoint(&ENDPOINT, |endpoint| endpoint.on_notify_complete(status, now)) {
        Ok(Ok(ExportEvent::Completed(command))) => {
            defmt::info!("crash-info: {} delivered", command);
        }
        Ok(Ok(ExportEvent::Abandoned)) => defmt::warn!("crash-info: transfer abandoned"),
        Ok(Ok(_)) => {}
        Ok(Err(err)) => defmt::warn!("crash-info: {}", err),
        Err(err) => defmt::warn!("crash-info: {}", err),
    }
}

/// The peer disconnected.
#[no_mangle]
pub extern "C" fn crash_info_on_disconnect() {
    if let Err(_err) = with_endpoint(&ENDPOINT, ExportEndpoint::on_disconnected) {
        #[cfg(feature = "defmt")]
        defmt::error!("crash-info: disconnect not applied: {}", _err);
    }
}

/// Pop the next queued notification into `buf`.
///
/// Returns the payload length, or 0 when nothing is queued. Null output
/// pointers leave the queue untouched. A payload longer than `cap`
/// abandons its transfer (see [`ExportEndpoint::next_notification`]).
///
/// # Safety
///
/// `conn_index` and `endpoint` must be valid for writes; `buf` must be
/// valid for `cap` bytes of writes.
#[no_mangle]
pub unsafe extern "C" fn crash_info_next_notification(
    conn_index: *mut u8,
    endpoint: *mut u8,
    buf: *mut u8,
    cap: u16,
) -> u16 {
    if buf.is_null() || conn_index.is_null() || endpoint.is_null() {
        return 0;
    }
    let now = retained::epoch().get();
    let Ok(Some(notification)) = with_endpoint(&ENDPOINT, |ep| {
        ep.next_notification(usize::from(cap), now)
    }) else {
        return 0;
    };
    let len = notification.data.len();
    let Ok(len16) = u16::try_from(len) else {
        return 0;
    };
    // SAFETY: the caller guarantees the output pointers are writable and
    // `buf` holds `cap >= len` bytes.
    unsafe {
        core::ptr::copy_nonoverlapping(notification.data.as_ptr(), buf, len);
        *conn_index = notification.conn_index;
        *endpoint = endpoint_id(notification.endpoint);
    }
    len16
}

/// Write the advertising data into `buf`; returns its length.
///
/// # Safety
///
/// `buf` must be valid for `cap` bytes of writes.
#[no_mangle]
pub unsafe extern "C" fn crash_info_adv_data(buf: *mut u8, cap: u8) -> u8 {
    let Ok(Ok(adv)) = with_endpoint(&ENDPOINT, |endpoint| endpoint.advertising_data()) else {
        return 0;
    };
    // SAFETY: forwarded from this function's contract.
    unsafe { copy_out(&adv, buf, cap) }
}

/// Write the scan response into `buf`; returns its length.
///
/// # Safety
///
/// `buf` must be valid for `cap` bytes of writes.
#[no_mangle]
pub unsafe extern "C" fn crash_info_scan_response(buf: *mut u8, cap: u8) -> u8 {
    let Ok(Ok(rsp)) = with_endpoint(&ENDPOINT, |endpoint| endpoint.scan_response()) else {
        return 0;
    };
    // SAFETY: forwarded from this function's contract.
    unsafe { copy_out(&rsp, buf, cap) }
}

/// # Safety
///
/// `buf` must be valid for `cap` bytes of writes.
unsafe fn copy_out(src: &[u8], buf: *mut u8, cap: u8) -> u8 {
    let Ok(len) = u8::try_from(src.len()) else {
        return 0;
    };
    if len > cap || buf.is_null() {
        return 0;
    }
    // SAFETY: `buf` holds `cap >= len` bytes.
    unsafe { core::ptr::copy_nonoverlapping(src.as_ptr(), buf, src.len()) };
    len
}
