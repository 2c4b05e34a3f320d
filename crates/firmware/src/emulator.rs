//! Desktop emulator.
//!
//! Runs the whole crash-info cycle on the host: a simulated DA14531 with a
//! SysRAM image, a retained area that survives warm resets but not power
//! cycles, injected faults going through the real capture path, and a
//! simulated collector fetching the store over a simulated BLE link.
//!
//! The device and the collector run as two futures joined on a tokio
//! runtime and talk only through channels, the way the BLE stack and a
//! phone would.

use bluetooth::config::DEFAULT_MTU;
use bluetooth::{AssembleError, Command, ExportConfig, ExportEvent, ResponseAssembler};
use diagnostics::frame::FRAME_WORDS;
use diagnostics::{
    decode_store, handle_fault, DecodeError, DecodedStore, FaultDisposition, FaultHandlerKind,
    ResetReason, RetainedArea, StackFrame,
};
use platform::mocks::{MockResetStatus, MockSystem};
use platform::{Endpoint, NotifyStatus, SliceWindow, POWER_ON_STAT, SWRESET_STAT, WORD_SIZE};
use thiserror_no_std::Error;
use tokio::sync::mpsc;

use crate::boot::reset_indication;
use crate::exception_handlers::{CAPTURE_CONFIG, SYSRAM_BASE, SYSRAM_LEN};
use crate::export::{ExportEndpoint, NotifyQueue};

/// Initial stack pointer written to the boot vector (top of RAM).
pub const INITIAL_SP: u32 = 0x07FC_BE00;

/// Byte pattern a power cycle leaves in the retained area.
const POWER_ON_JUNK: u8 = 0xA5;

/// Depth of the simulated air channels.
const AIR_QUEUE_DEPTH: usize = 16;

/// Status the stack reports for a notification lost with the link.
const LINK_LOST: u8 = 0x08;

/// Emulator failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EmulatorError {
    /// The device refused a write with this ATT status.
    #[error("write refused with ATT status {0:#04x}")]
    Refused(u8),
    /// The notifications did not reassemble.
    #[error("reassembly failed: {0}")]
    Assemble(#[from] AssembleError),
    /// The reassembled payload did not decode.
    #[error("decode failed: {0}")]
    Decode(#[from] DecodeError),
    /// The link closed before the response was complete.
    #[error("link closed after {0} bytes")]
    LinkClosed(usize),
}

/// Where a fault happens: the frame the core pushes, and the stack words
/// above it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FaultSite {
    /// Frame pushed on exception entry.
    pub frame: StackFrame,
    /// Words of the interrupted stack just above the frame, lowest first.
    pub stack: Vec<u32>,
}

impl FaultSite {
    /// A fault `depth` calls deep, with junk between the return addresses.
    pub fn nested(depth: u32) -> Self {
        let mut stack = Vec::new();
        for level in 0..depth {
            let offset = level.saturating_mul(0x40);
            // A saved register, then the return address of this level;
            // odd levels return into ROM.
            stack.push(0x2000_0000_u32.wrapping_add(level));
            if level % 2 == 0 {
                stack.push(0x07FC_2001_u32.wrapping_add(offset));
            } else {
                stack.push(0x07F0_1001_u32.wrapping_add(offset));
            }
        }
        Self {
            frame: StackFrame {
                r0: 0xDEAD_BEEF,
                r1: depth,
                lr: 0x07FC_1F01,
                return_address: 0x07FC_1E40,
                xpsr: 0x6100_0000,
                ..StackFrame::default()
            },
            stack,
        }
    }

    /// Build the SysRAM image of this fault. Returns the image and the
    /// address of the frame.
    fn ram_image(&self) -> (Vec<u32>, u32) {
        let words = usize::try_from(SYSRAM_LEN / WORD_SIZE).unwrap_or(0);
        let mut ram = vec![0_u32; words];
        if let Some(vector) = ram.first_mut() {
            *vector = INITIAL_SP;
        }

        let used = FRAME_WORDS.saturating_add(self.stack.len());
        let top = word_index(INITIAL_SP);
        let frame_index = top.saturating_sub(used);
        let frame = self.frame.to_words();
        for (slot, word) in ram
            .iter_mut()
            .skip(frame_index)
            .zip(frame.iter().chain(self.stack.iter()))
        {
            *slot = *word;
        }

        let frame_addr = u32::try_from(frame_index)
            .unwrap_or(0)
            .saturating_mul(WORD_SIZE)
            .saturating_add(SYSRAM_BASE);
        (ram, frame_addr)
    }
}

fn word_index(addr: u32) -> usize {
    usize::try_from(addr.saturating_sub(SYSRAM_BASE) / WORD_SIZE).unwrap_or(0)
}

/// Outcome of one collector session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fetch {
    /// Notifications received.
    pub chunks: usize,
    /// Response bytes received, header included.
    pub received: usize,
    /// Reassembled payload, when the response completed.
    pub payload: Option<Vec<u8>>,
    /// Last export event the device reported.
    pub last_event: Option<ExportEvent>,
}

impl Fetch {
    /// Decode a `GetAllResetData` payload.
    pub fn decode(&self) -> Result<Option<DecodedStore>, EmulatorError> {
        let payload = self
            .payload
            .as_deref()
            .ok_or(EmulatorError::LinkClosed(self.received))?;
        Ok(decode_store(payload)?)
    }
}

/// Collector → device.
#[derive(Debug)]
enum PeerAction {
    Write(Endpoint, Vec<u8>),
    /// Link-layer acknowledgement of the last notification.
    Ack,
    Disconnect,
}

/// Device → collector.
#[derive(Debug)]
enum AirEvent {
    WriteStatus(u8),
    Notification(Vec<u8>),
}

/// A simulated DA14531 running the crash-info firmware.
pub struct EmulatedDevice {
    area: Box<RetainedArea>,
    system: MockSystem,
    reset_bits: u16,
    boots: u32,
    config: ExportConfig,
}

impl EmulatedDevice {
    /// A device fresh out of a power-on reset.
    pub fn power_on() -> Self {
        let mut device = Self {
            area: Box::new(RetainedArea::new()),
            system: MockSystem::new(),
            reset_bits: POWER_ON_STAT,
            boots: 0,
            config: ExportConfig::default(),
        };
        device.power_cycle();
        device
    }

    /// Use `config` for the export service.
    pub fn with_export_config(mut self, config: ExportConfig) -> Self {
        self.config = config;
        self
    }

    /// Remove and restore power: retained RAM is lost.
    pub fn power_cycle(&mut self) -> ResetReason {
        self.area.scramble(0, POWER_ON_JUNK);
        self.reset_bits = POWER_ON_STAT;
        self.boot()
    }

    /// Run the boot sequence for the pending reset cause.
    pub fn boot(&mut self) -> ResetReason {
        let mut status = MockResetStatus::new(self.reset_bits);
        let reason = reset_indication(&mut status, &mut self.area);
        self.boots = self.boots.saturating_add(1);
        tracing::info!(
            boot = self.boots,
            reason = reason.as_str(),
            records = self.area.store().reset_count(),
            epoch = self.area.epoch().get(),
            "device booted"
        );
        reason
    }

    /// Advance the epoch by `ticks`.
    pub fn run_for(&mut self, ticks: u32) {
        for _ in 0..ticks {
            self.area.epoch().tick();
        }
    }

    /// Take a fault at `site`, run the fault handler and, if it asked for
    /// one, the reset and the next boot.
    pub fn fault(&mut self, kind: FaultHandlerKind, site: &FaultSite) -> FaultDisposition {
        let (ram, frame_addr) = site.ram_image();
        let window = SliceWindow::new(SYSRAM_BASE, &ram);
        let (store, epoch) = self.area.split_mut();
        let disposition = handle_fault(
            &CAPTURE_CONFIG,
            kind,
            frame_addr,
            store,
            &window,
            &mut self.system,
            epoch,
        );
        tracing::warn!(handler = kind.as_str(), frame = frame_addr, ?disposition, "fault");

        if let FaultDisposition::Reset(_) = disposition {
            self.reset_bits = SWRESET_STAT;
            self.boot();
        }
        disposition
    }

    /// The retained area.
    pub fn area(&self) -> &RetainedArea {
        &self.area
    }

    /// Resets the fault handlers requested so far.
    pub fn reset_requests(&self) -> usize {
        self.system.resets.len()
    }

    /// Connect a collector with `mtu`, send `command`, and collect the
    /// response. With `disconnect_after`, the collector drops the link
    /// after that many notifications.
    pub async fn fetch(
        &mut self,
        command: Command,
        mtu: u16,
        disconnect_after: Option<usize>,
    ) -> Result<Fetch, EmulatorError> {
        let now = self.area.epoch().get();
        let queue = NotifyQueue::new();
        let mut endpoint = ExportEndpoint::new(self.config, &queue);
        endpoint.attach(self.area.store_mut());

        let (to_device, from_peer) = mpsc::channel(AIR_QUEUE_DEPTH);
        let (to_peer, from_device) = mpsc::channel(AIR_QUEUE_DEPTH);

        let device = run_device(&mut endpoint, &queue, now, mtu, from_peer, to_peer);
        let collector = run_collector(command, disconnect_after, to_device, from_device);
        let (last_event, fetch) = tokio::join!(device, collector);
        let mut fetch = fetch?;
        fetch.last_event = last_event;
        Ok(fetch)
    }
}

/// Device side: apply peer actions and forward queued notifications.
/// A notification is confirmed when the collector acknowledges it.
async fn run_device(
    endpoint: &mut ExportEndpoint<'_>,
    queue: &NotifyQueue,
    now: u32,
    mtu: u16,
    mut from_peer: mpsc::Receiver<PeerAction>,
    to_peer: mpsc::Sender<AirEvent>,
) -> Option<ExportEvent> {
    endpoint.on_connected(0);
    endpoint.on_mtu_changed(mtu.max(DEFAULT_MTU));
    let mut last_event = None;

    while let Some(action) = from_peer.recv().await {
        let status = match action {
            PeerAction::Write(target, data) => {
                let status = endpoint.on_write(target, &data, now);
                if to_peer.send(AirEvent::WriteStatus(status)).await.is_err() {
                    break;
                }
                None
            }
            PeerAction::Ack => Some(NotifyStatus::Sent),
            PeerAction::Disconnect => {
                endpoint.on_disconnected();
                tracing::info!("collector disconnected");
                break;
            }
        };

        if let Some(status) = status {
            match endpoint.on_notify_complete(status, now) {
                Ok(event) => {
                    tracing::debug!(?event, "notification confirmed");
                    last_event = Some(event);
                }
                Err(err) => tracing::error!(%err, "endpoint"),
            }
        }

        while let Ok(notification) = queue.try_receive() {
            let air = AirEvent::Notification(notification.data.to_vec());
            if to_peer.send(air).await.is_err() {
                last_event = endpoint
                    .on_notify_complete(NotifyStatus::Failed(LINK_LOST), now)
                    .ok();
            }
        }
    }
    last_event
}

/// Collector side: subscribe, send the command, reassemble.
async fn run_collector(
    command: Command,
    disconnect_after: Option<usize>,
    to_device: mpsc::Sender<PeerAction>,
    mut from_device: mpsc::Receiver<AirEvent>,
) -> Result<Fetch, EmulatorError> {
    let mut fetch = Fetch {
        chunks: 0,
        received: 0,
        payload: None,
        last_event: None,
    };

    for (target, data) in [
        (Endpoint::Subscription, vec![0x01, 0x00]),
        (Endpoint::Command, vec![command as u8]),
    ] {
        send(&to_device, PeerAction::Write(target, data), 0).await?;
        match from_device.recv().await {
            Some(AirEvent::WriteStatus(0)) => {}
            Some(AirEvent::WriteStatus(status)) => {
                send(&to_device, PeerAction::Disconnect, 0).await?;
                return Err(EmulatorError::Refused(status));
            }
            _ => return Err(EmulatorError::LinkClosed(0)),
        }
    }

    let mut assembler = ResponseAssembler::new();
    loop {
        let Some(AirEvent::Notification(chunk)) = from_device.recv().await else {
            return Err(EmulatorError::LinkClosed(assembler.received()));
        };
        fetch.chunks = fetch.chunks.saturating_add(1);
        let complete = assembler.push(&chunk)?;
        fetch.received = assembler.received();
        tracing::debug!(len = chunk.len(), received = fetch.received, "chunk");

        if complete {
            fetch.payload = assembler.payload().map(<[u8]>::to_vec);
            send(&to_device, PeerAction::Ack, fetch.received).await?;
            break;
        }
        if disconnect_after == Some(fetch.chunks) {
            break;
        }
        send(&to_device, PeerAction::Ack, fetch.received).await?;
    }

    send(&to_device, PeerAction::Disconnect, fetch.received).await?;
    Ok(fetch)
}

async fn send(
    to_device: &mpsc::Sender<PeerAction>,
    action: PeerAction,
    received: usize,
) -> Result<(), EmulatorError> {
    to_device
        .send(action)
        .await
        .map_err(|_| EmulatorError::LinkClosed(received))
}

/// Render a decoded store the way `xtask decode` prints it.
pub fn render(store: Option<&DecodedStore>) -> String {
    match store {
        Some(store) => store.to_string(),
        None => String::from("no crash records"),
    }
}

/// Install a `tracing` subscriber honouring `RUST_LOG` (default `info`).
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn test_power_on_is_cold() {
        let device = EmulatedDevice::power_on();
        assert!(device.area().is_initialised());
        assert_eq!(device.area().store().reset_count(), 0);
        assert_eq!(device.area().store().last_reset_reason(), ResetReason::PowerOnReset);
    }

    #[test]
    fn test_fault_site_image() {
        let site = FaultSite::nested(2);
        let (ram, frame_addr) = site.ram_image();
        assert_eq!(ram[0], INITIAL_SP);
        let index = word_index(frame_addr);
        assert_eq!(ram[index], 0xDEAD_BEEF);
        assert_eq!(index + FRAME_WORDS + site.stack.len(), word_index(INITIAL_SP));
    }

    #[test]
    fn test_fault_reboots_with_software_reset() {
        let mut device = EmulatedDevice::power_on();
        device.run_for(5);
        device.fault(FaultHandlerKind::HardFault, &FaultSite::nested(3));
        assert_eq!(device.reset_requests(), 1);
        let store = device.area().store();
        assert_eq!(store.reset_count(), 1);
        assert_eq!(store.last_reset_reason(), ResetReason::SoftwareReset);
        assert_eq!(store.records()[0].epoch(), 5);
        assert_eq!(store.records()[0].call_trace_len(), 3);
    }
}
