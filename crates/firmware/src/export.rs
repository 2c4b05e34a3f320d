//! Export endpoint: the glue between the BLE stack and [`ExportService`].
//!
//! The BLE stack runs its own event loop. It reports connections, MTU
//! exchanges, GATT writes, notification confirmations and disconnects to
//! an [`ExportEndpoint`], and drains outgoing notifications from a
//! [`NotifyQueue`]. The endpoint owns the link state, the service and the
//! crash store for the rest of the boot.
//!
//! ```text
//! BLE stack ── events ──▶ ExportEndpoint ──▶ ExportService
//!     ▲                        │
//!     └──── NotifyQueue ◀──────┘ (QueueTransport)
//! ```

use core::cell::RefCell;

use bluetooth::att::status_code;
use bluetooth::config::{ATT_OVERHEAD, DEVICE_NAME};
use bluetooth::advertising::{self, AdvError, AdvPayload};
use bluetooth::{AttError, ExportConfig, ExportEvent, ExportService, LinkState};
use diagnostics::CrashStore;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::channel::Channel;
use heapless::Vec;
use platform::{Endpoint, NotifyStatus, NotifyTransport, TransportError};
use thiserror_no_std::Error;

/// Largest ATT MTU the stack negotiates.
pub const MAX_MTU: u16 = 247;

/// Largest notification payload at [`MAX_MTU`].
pub const MAX_NOTIFY_LEN: usize = (MAX_MTU - ATT_OVERHEAD) as usize;

/// Notifications the stack may hold before it confirms one.
pub const NOTIFY_QUEUE_DEPTH: usize = 4;

/// Status reported to the service for a notification the stack could not take.
pub const UNDELIVERABLE: u8 = 0xFF;

/// One outgoing notification.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Notification {
    /// Connection the notification is for.
    pub conn_index: u8,
    /// Endpoint it is sent on.
    pub endpoint: Endpoint,
    /// Payload.
    pub data: Vec<u8, MAX_NOTIFY_LEN>,
}

/// Outgoing notifications, drained by the BLE stack.
pub type NotifyQueue = Channel<CriticalSectionRawMutex, Notification, NOTIFY_QUEUE_DEPTH>;

/// Endpoint shared between the BLE stack callbacks and the main loop.
pub type SharedEndpoint<'a> = Mutex<CriticalSectionRawMutex, RefCell<ExportEndpoint<'a>>>;

/// Errors of the endpoint itself (not of the protocol).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EndpointError {
    /// No crash store attached yet (boot not finished).
    #[error("crash store not attached")]
    Detached,
    /// The endpoint is already in use higher up the call stack.
    #[error("endpoint busy")]
    Reentered,
}

/// [`NotifyTransport`] that queues notifications for the BLE stack.
pub struct QueueTransport<'a> {
    link: LinkState,
    queue: &'a NotifyQueue,
}

impl<'a> QueueTransport<'a> {
    /// A transport for the connection described by `link`.
    pub fn new(link: LinkState, queue: &'a NotifyQueue) -> Self {
        Self { link, queue }
    }
}

impl NotifyTransport for QueueTransport<'_> {
    fn mtu(&self) -> u16 {
        self.link.mtu()
    }

    fn notify(&mut self, endpoint: Endpoint, data: &[u8]) -> Result<(), TransportError> {
        let conn_index = self.link.conn_index().ok_or(TransportError::NotConnected)?;
        let data = Vec::from_slice(data).map_err(|_| TransportError::TooLong(data.len()))?;
        self.queue
            .try_send(Notification {
                conn_index,
                endpoint,
                data,
            })
            .map_err(|_| TransportError::QueueFull)
    }
}

/// BLE-facing side of the crash-info service.
pub struct ExportEndpoint<'a> {
    link: LinkState,
    service: ExportService,
    queue: &'a NotifyQueue,
    store: Option<&'a mut CrashStore>,
}

impl<'a> ExportEndpoint<'a> {
    /// A detached endpoint; call [`attach`](Self::attach) once the boot
    /// sequence has brought the store up.
    pub const fn new(config: ExportConfig, queue: &'a NotifyQueue) -> Self {
        Self {
            link: LinkState::new(),
            service: ExportService::new(config),
            queue,
            store: None,
        }
    }

    /// Hand the crash store to the endpoint.
    pub fn attach(&mut self, store: &'a mut CrashStore) {
        self.store = Some(store);
    }

    /// The attached store, if any.
    pub fn store(&self) -> Option<&CrashStore> {
        self.store.as_deref()
    }

    /// Current link state.
    pub fn link(&self) -> LinkState {
        self.link
    }

    /// The service state machine.
    pub fn service(&self) -> &ExportService {
        &self.service
    }

    /// Advertising data carrying the current record count.
    pub fn advertising_data(&self) -> Result<AdvPayload, AdvError> {
        let count = self.store().map_or(0, CrashStore::reset_count);
        advertising::service_data(count)
    }

    /// Scan response carrying the device name.
    pub fn scan_response(&self) -> Result<AdvPayload, AdvError> {
        advertising::scan_response(DEVICE_NAME)
    }

    /// A peer connected.
    pub fn on_connected(&mut self, conn_index: u8) {
        self.link.on_connected(conn_index);
        #[cfg(feature = "defmt")]
        defmt::info!("crash-info: peer connected ({=u8})", conn_index);
    }

    /// The MTU exchange finished.
    pub fn on_mtu_changed(&mut self, mtu: u16) {
        self.link.on_mtu_changed(mtu.min(MAX_MTU));
    }

    /// Check a write without applying it.
    ///
    /// Returns the ATT status the stack replies with.
    pub fn validate_write(&self, endpoint: Endpoint, data: &[u8]) -> u8 {
        status_code(self.service.validate_write(endpoint, data).map(|_| ()))
    }

    /// Apply a write. Returns the ATT status the stack replies with.
    pub fn on_write(&mut self, endpoint: Endpoint, data: &[u8], now: u32) -> u8 {
        let Some(store) = self.store.as_deref() else {
            return AttError::WriteNotPermitted.code();
        };
        let mut transport = QueueTransport::new(self.link, self.queue);
        status_code(self.service.on_write(endpoint, data, store, &mut transport, now))
    }

    /// The stack confirmed (or gave up on) the last notification.
    pub fn on_notify_complete(
        &mut self,
        status: NotifyStatus,
        now: u32,
    ) -> Result<ExportEvent, EndpointError> {
        let store = self.store.as_deref_mut().ok_or(EndpointError::Detached)?;
        let mut transport = QueueTransport::new(self.link, self.queue);
        Ok(self
            .service
            .on_notify_complete(status, store, &mut transport, now))
    }

    /// The peer disconnected. Queued notifications for it are dropped.
    pub fn on_disconnected(&mut self) {
        let _interrupted = self.service.on_disconnect();
        self.link.on_disconnected();
        while self.queue.try_receive().is_ok() {}
        #[cfg(feature = "defmt")]
        defmt::info!("crash-info: peer disconnected (transfer interrupted: {})", _interrupted);
    }

    /// Pop the next notification for a stack buffer of `cap` bytes.
    ///
    /// A notification longer than `cap` cannot be sent; the transfer it
    /// belongs to is abandoned and the rest of the queue dropped, so the
    /// service does not wait for a confirmation that never comes.
    pub fn next_notification(&mut self, cap: usize, now: u32) -> Option<Notification> {
        let notification = self.queue.try_receive().ok()?;
        if notification.data.len() <= cap {
            return Some(notification);
        }
        #[cfg(feature = "defmt")]
        defmt::warn!(
            "crash-info: {=usize}-byte notification exceeds stack buffer ({=usize})",
            notification.data.len(),
            cap
        );
        let _ = self.on_notify_complete(NotifyStatus::Failed(UNDELIVERABLE), now);
        while self.queue.try_receive().is_ok() {}
        None
    }

    /// Periodic housekeeping; applies the stall timeout.
    pub fn poll(&mut self, now: u32) -> Option<ExportEvent> {
        self.service.poll(now)
    }
}

/// Run `f` on the shared endpoint inside a critical section.
pub fn with_endpoint<'a, R>(
    shared: &SharedEndpoint<'a>,
    f: impl FnOnce(&mut ExportEndpoint<'a>) -> R,
) -> Result<R, EndpointError> {
    shared.lock(|cell| {
        let mut endpoint = cell.try_borrow_mut().map_err(|_| EndpointError::Reentered)?;
        Ok(f(&mut endpoint))
    })
}
