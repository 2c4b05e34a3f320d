//! Mock implementations for testing
//!
//! This module provides mock implementations of all platform traits
//! for use in unit and integration tests.

#![cfg(any(test, feature = "std"))]

use crate::*;

/// Maximum notifications a [`MockTransport`] records.
pub const MOCK_NOTIFY_CAPACITY: usize = 64;

/// Maximum bytes per recorded notification.
pub const MOCK_NOTIFY_MAX_LEN: usize = 247;

/// Mock notification transport
///
/// Records every notification and can be told to fail the next sends.
pub struct MockTransport {
    mtu: u16,
    connected: bool,
    fail_next: usize,
    sent: heapless::Vec<(Endpoint, heapless::Vec<u8, MOCK_NOTIFY_MAX_LEN>), MOCK_NOTIFY_CAPACITY>,
}

impl MockTransport {
    /// Create a connected transport with the given MTU.
    pub fn new(mtu: u16) -> Self {
        Self {
            mtu,
            connected: true,
            fail_next: 0,
            sent: heapless::Vec::new(),
        }
    }

    /// Change the negotiated MTU.
    pub fn set_mtu(&mut self, mtu: u16) {
        self.mtu = mtu;
    }

    /// Simulate a connection drop: further sends fail with `NotConnected`.
    pub fn set_connected(&mut self, connected: bool) {
        self.connected = connected;
    }

    /// Make the next `count` sends fail with `QueueFull`.
    pub fn fail_next(&mut self, count: usize) {
        self.fail_next = count;
    }

    /// Number of notifications recorded so far.
    pub fn sent_count(&self) -> usize {
        self.sent.len()
    }

    /// Payload of the `index`-th notification.
    pub fn sent(&self, index: usize) -> Option<&[u8]> {
        self.sent.get(index).map(|(_, data)| data.as_slice())
    }

    /// Endpoint of the `index`-th notification.
    pub fn sent_endpoint(&self, index: usize) -> Option<Endpoint> {
        self.sent.get(index).map(|(endpoint, _)| *endpoint)
    }

    /// Every recorded payload, in send order.
    pub fn payloads(&self) -> impl Iterator<Item = &[u8]> {
        self.sent.iter().map(|(_, data)| data.as_slice())
    }

    /// Forget everything recorded so far.
    pub fn clear(&mut self) {
        self.sent.clear();
    }
}

impl NotifyTransport for MockTransport {
    fn mtu(&self) -> u16 {
        self.mtu
    }

    fn notify(&mut self, endpoint: Endpoint, data: &[u8]) -> Result<(), TransportError> {
        if !self.connected {
            return Err(TransportError::NotConnected);
        }
        if self.fail_next > 0 {
            self.fail_next = self.fail_next.saturating_sub(1);
            return Err(TransportError::QueueFull);
        }
        let payload = heapless::Vec::from_slice(data)
            .map_err(|_| TransportError::TooLong(data.len()))?;
        self.sent
            .push((endpoint, payload))
            .map_err(|_| TransportError::QueueFull)
    }
}

/// Mock reset-status register
pub struct MockResetStatus {
    bits: u16,
    clears: usize,
}

impl MockResetStatus {
    /// A register latched with `bits`.
    pub fn new(bits: u16) -> Self {
        Self { bits, clears: 0 }
    }

    /// How many times the register was cleared.
    pub fn clear_count(&self) -> usize {
        self.clears
    }
}

impl ResetStatus for MockResetStatus {
    fn read(&mut self) -> u16 {
        self.bits
    }

    fn clear(&mut self) {
        self.bits = 0;
        self.clears = self.clears.saturating_add(1);
    }
}

/// Mock system controller
///
/// Records debugger preparation and reset requests instead of acting on them.
#[derive(Debug, Default)]
pub struct MockSystem {
    /// Value reported by `boot_vector_remapped`.
    pub remapped: bool,
    /// Value reported by `debugger_attached`.
    pub debugger: bool,
    /// Number of `prepare_for_debugger` calls.
    pub debugger_prepared: usize,
    /// Every reset requested, in order.
    pub resets: heapless::Vec<ResetMode, 8>,
}

impl MockSystem {
    /// A system with the default remap and no debugger.
    pub fn new() -> Self {
        Self::default()
    }
}

impl SystemControl for MockSystem {
    fn boot_vector_remapped(&self) -> bool {
        self.remapped
    }

    fn debugger_attached(&self) -> bool {
        self.debugger
    }

    fn prepare_for_debugger(&mut self) {
        self.debugger_prepared = self.debugger_prepared.saturating_add(1);
    }

    fn request_reset(&mut self, mode: ResetMode) {
        let _ = self.resets.push(mode);
    }
}

/// Epoch source frozen at a fixed value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedEpoch(pub u32);

impl EpochSource for FixedEpoch {
    fn epoch(&self) -> u32 {
        self.0
    }
}
