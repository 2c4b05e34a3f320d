//! BLE link state tracker.

use crate::config::DEFAULT_MTU;

/// Tracks the connected peer's connection index and negotiated MTU.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LinkState {
    conn_index: Option<u8>,
    mtu: u16,
}

impl LinkState {
    /// Create a new, disconnected state.
    pub const fn new() -> Self {
        LinkState {
            conn_index: None,
            mtu: DEFAULT_MTU,
        }
    }

    /// Record a new connection. The MTU starts at the ATT default.
    pub fn on_connected(&mut self, conn_index: u8) {
        self.conn_index = Some(conn_index);
        self.mtu = DEFAULT_MTU;
    }

    /// Record the outcome of an MTU exchange.
    ///
    /// Values below the ATT default are ignored.
    pub fn on_mtu_changed(&mut self, mtu: u16) {
        if self.conn_index.is_some() {
            self.mtu = mtu.max(DEFAULT_MTU);
        }
    }

    /// Record that the peer has disconnected.
    pub fn on_disconnected(&mut self) {
        *self = Self::new();
    }

    /// Returns `true` if a peer is currently connected.
    #[must_use]
    pub fn connected(&self) -> bool {
        self.conn_index.is_some()
    }

    /// Connection index of the peer, or `None` when disconnected.
    #[must_use]
    pub fn conn_index(&self) -> Option<u8> {
        self.conn_index
    }

    /// Negotiated ATT MTU (the default when nothing was exchanged).
    #[must_use]
    pub fn mtu(&self) -> u16 {
        self.mtu
    }
}

impl Default for LinkState {
    fn default() -> Self {
        Self::new()
    }
}
