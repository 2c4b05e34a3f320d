//! Notification transport abstraction
//!
//! The export protocol talks to a connected peer through whatever wireless
//! stack hosts it. From that stack it needs four things: the negotiated
//! payload size, a way to queue a notification to an endpoint, inbound
//! writes on its endpoints, and a disconnect event. The first two are this
//! trait; the inbound events are delivered by the host calling into the
//! protocol's handlers.

use thiserror_no_std::Error;

/// Logical endpoints of the crash-info service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Endpoint {
    /// Command input (peer writes one command byte).
    Command,
    /// Response output (device notifies response chunks).
    Response,
    /// Subscription configuration of [`Endpoint::Response`].
    Subscription,
}

/// Outcome of a queued notification, reported asynchronously.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum NotifyStatus {
    /// The notification left the device.
    Sent,
    /// The stack gave up on the notification; carries its status code.
    Failed(u8),
}

/// Synchronous failure to queue a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransportError {
    /// No peer is connected.
    #[error("no peer connected")]
    NotConnected,
    /// The stack's outgoing queue or message pool is exhausted.
    #[error("notification queue full")]
    QueueFull,
    /// The payload exceeds what one notification can carry.
    #[error("payload of {0} bytes exceeds the notification size")]
    TooLong(usize),
}

/// Outgoing side of the notification channel.
pub trait NotifyTransport {
    /// Negotiated ATT MTU for the current connection.
    fn mtu(&self) -> u16;

    /// Queue `data` as one notification on `endpoint`.
    ///
    /// Completion is reported later through the host's confirmation event
    /// with a [`NotifyStatus`].
    fn notify(&mut self, endpoint: Endpoint, data: &[u8]) -> Result<(), TransportError>;
}
