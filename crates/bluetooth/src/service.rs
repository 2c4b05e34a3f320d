//! Export service state machine.
//!
//! ```text
//!            command write (CCC on, idle)
//!   Idle ───────────────────────────────────► Busy(session)
//!    ▲   first chunk sent                        │
//!    │                                           │ confirmation: next chunk
//!    │◄──── last confirmation (store cleared     │ CCC off: park, send nothing
//!    │      after GetAllResetData)               │
//!    │◄──── disconnect / send failure / stall ───┘ (store untouched)
//! ```
//!
//! The session owns the response buffer. Every path back to `Idle` drops
//! the session, which releases the buffer; nothing has to remember to free
//! it. The store is only cleared after the last chunk of a
//! `GetAllResetData` response is confirmed, so an interrupted export never
//! loses records.
//!
//! All handlers run to completion on the BLE event loop, one at a time.

use diagnostics::CrashStore;
use platform::{Endpoint, NotifyStatus, NotifyTransport, TransportError};

use crate::att::AttError;
use crate::ccc::NotifyState;
use crate::command::Command;
use crate::config::ExportConfig;
use crate::response::{chunk_budget, Response};

/// A validated write, ready to apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WriteRequest {
    /// A command on the command endpoint.
    Command(Command),
    /// A CCC write on the subscription endpoint.
    Subscription(NotifyState),
}

/// What a confirmation or poll did to the transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ExportEvent {
    /// No transfer in progress; nothing to do.
    Idle,
    /// Another chunk was queued.
    Continued {
        /// Response bytes sent so far.
        sent: usize,
        /// Total response length.
        total: usize,
    },
    /// Notifications were turned off; the transfer is parked until the
    /// peer disconnects.
    Parked,
    /// Every byte was confirmed and the session closed.
    Completed(Command),
    /// The transfer was dropped without clearing the store.
    Abandoned,
}

/// One command being answered.
///
/// Dropping the session releases its response buffer.
#[derive(Debug)]
pub struct ExportSession {
    response: Response,
    mtu: u16,
    sent: usize,
    last_progress: u32,
}

impl ExportSession {
    fn new(response: Response, mtu: u16, now: u32) -> Self {
        Self {
            response,
            mtu,
            sent: 0,
            last_progress: now,
        }
    }

    /// The command being answered.
    pub const fn command(&self) -> Command {
        self.response.command()
    }

    /// MTU captured when the command was accepted.
    pub const fn mtu(&self) -> u16 {
        self.mtu
    }

    /// Response bytes queued so far.
    pub const fn bytes_sent(&self) -> usize {
        self.sent
    }

    /// Header plus payload length.
    pub fn total_len(&self) -> usize {
        self.response.total_len()
    }

    fn is_done(&self) -> bool {
        self.sent >= self.response.total_len()
    }

    fn send_next<T: NotifyTransport + ?Sized>(
        &mut self,
        transport: &mut T,
        now: u32,
    ) -> Result<(), TransportError> {
        let chunk = self.response.chunk(self.sent, chunk_budget(self.mtu));
        transport.notify(Endpoint::Response, chunk)?;
        self.sent = self.sent.saturating_add(chunk.len());
        self.last_progress = now;
        Ok(())
    }
}

/// The crash-info GATT service.
#[derive(Debug, Default)]
pub struct ExportService {
    config: ExportConfig,
    ccc: NotifyState,
    session: Option<ExportSession>,
}

impl ExportService {
    /// An idle service with notifications off.
    pub const fn new(config: ExportConfig) -> Self {
        Self {
            config,
            ccc: NotifyState::Off,
            session: None,
        }
    }

    /// Current subscription state.
    pub const fn notify_state(&self) -> NotifyState {
        self.ccc
    }

    /// Returns `true` while a command is being answered.
    pub const fn is_busy(&self) -> bool {
        self.session.is_some()
    }

    /// The transfer in progress, if any.
    pub const fn session(&self) -> Option<&ExportSession> {
        self.session.as_ref()
    }

    /// Check a write without applying it.
    ///
    /// Command writes check, in order: notifications enabled, no command
    /// in flight, well-formed command. Each failure has its own status.
    pub fn validate_write(&self, endpoint: Endpoint, data: &[u8]) -> Result<WriteRequest, AttError> {
        match endpoint {
            Endpoint::Command => {
                if !self.ccc.is_enabled() {
                    return Err(AttError::CccdImproperlyConfigured);
                }
                if self.session.is_some() {
                    return Err(AttError::ProcedureAlreadyInProgress);
                }
                Command::parse(data).map(WriteRequest::Command)
            }
            Endpoint::Subscription => NotifyState::parse(data).map(WriteRequest::Subscription),
            Endpoint::Response => Err(AttError::WriteNotPermitted),
        }
    }

    /// Validate and apply a write.
    ///
    /// An accepted command builds its response from `store` and queues the
    /// first chunk before returning. If that first send fails the command
    /// is refused with [`AttError::WriteNotPermitted`] and the service
    /// stays idle.
    pub fn on_write<T: NotifyTransport + ?Sized>(
        &mut self,
        endpoint: Endpoint,
        data: &[u8],
        store: &CrashStore,
        transport: &mut T,
        now: u32,
    ) -> Result<(), AttError> {
        match self.validate_write(endpoint, data)? {
            WriteRequest::Subscription(state) => {
                self.ccc = state;
                #[cfg(feature = "defmt")]
                defmt::debug!("crash-info: notifications {}", state);
                Ok(())
            }
            WriteRequest::Command(command) => self.start(command, store, transport, now),
        }
    }

    fn start<T: NotifyTransport + ?Sized>(
        &mut self,
        command: Command,
        store: &CrashStore,
        transport: &mut T,
        now: u32,
    ) -> Result<(), AttError> {
        let response = Response::build(command, store).map_err(|_| AttError::WriteNotPermitted)?;
        let mut session = ExportSession::new(response, transport.mtu(), now);
        session
            .send_next(transport, now)
            .map_err(|_| AttError::WriteNotPermitted)?;

        #[cfg(feature = "defmt")]
        defmt::info!(
            "crash-info: {} accepted, {} bytes at mtu {}",
            command,
            session.total_len(),
            session.mtu()
        );

        self.session = Some(session);
        Ok(())
    }

    /// Handle the confirmation of the last queued notification.
    ///
    /// Sends the next chunk, parks the transfer when notifications were
    /// turned off, or closes the session when every byte went out. Closing
    /// a `GetAllResetData` session clears `store`. A failed notification
    /// abandons the transfer and leaves the store alone.
    pub fn on_notify_complete<T: NotifyTransport + ?Sized>(
        &mut self,
        status: NotifyStatus,
        store: &mut CrashStore,
        transport: &mut T,
        now: u32,
    ) -> ExportEvent {
        let Some(session) = self.session.as_mut() else {
            return ExportEvent::Idle;
        };

        if let NotifyStatus::Failed(_code) = status {
            #[cfg(feature = "defmt")]
            defmt::warn!("crash-info: notification failed ({=u8}), transfer dropped", _code);
            self.session = None;
            return ExportEvent::Abandoned;
        }

        if session.is_done() {
            let command = session.command();
            self.session = None;
            if command == Command::GetAllResetData {
                store.clear();
            }
            #[cfg(feature = "defmt")]
            defmt::info!("crash-info: {} complete", command);
            return ExportEvent::Completed(command);
        }

        if !self.ccc.is_enabled() {
            return ExportEvent::Parked;
        }

        match session.send_next(transport, now) {
            Ok(()) => ExportEvent::Continued {
                sent: session.bytes_sent(),
                total: session.total_len(),
            },
            Err(_err) => {
                #[cfg(feature = "defmt")]
                defmt::warn!("crash-info: send failed ({}), transfer dropped", _err);
                self.session = None;
                ExportEvent::Abandoned
            }
        }
    }

    /// The peer went away: drop any transfer and turn notifications off.
    ///
    /// Returns `true` if a transfer was in progress. The store is never
    /// touched here.
    pub fn on_disconnect(&mut self) -> bool {
        self.ccc = NotifyState::Off;
        self.session.take().is_some()
    }

    /// Apply the stall timeout, if one is configured.
    ///
    /// Returns [`ExportEvent::Abandoned`] when a transfer made no progress
    /// for `stall_timeout_epochs`.
    pub fn poll(&mut self, now: u32) -> Option<ExportEvent> {
        let timeout = self.config.stall_timeout_epochs?;
        let session = self.session.as_ref()?;
        if now.wrapping_sub(session.last_progress) < timeout {
            return None;
        }
        #[cfg(feature = "defmt")]
        defmt::warn!("crash-info: transfer stalled, dropped");
        self.session = None;
        Some(ExportEvent::Abandoned)
    }
}
