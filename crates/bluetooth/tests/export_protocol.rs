//! End-to-end export protocol tests.
//!
//! Drives `ExportService` the way the BLE stack would: CCC write, command
//! write, one confirmation per notification, disconnects. The peer side is
//! `ResponseAssembler` + `decode_store`.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing, clippy::arithmetic_side_effects)]

use bluetooth::{AttError, Command, ExportConfig, ExportEvent, ExportService, ResponseAssembler};
use diagnostics::wire::{decode_store, RECORD_SIZE};
use diagnostics::{capture_fault, CrashStore, FaultHandlerKind, MemoryMap, ResetReason, RetainedArea};
use platform::mocks::{FixedEpoch, MockTransport};
use platform::{Endpoint, NotifyStatus, SliceWindow};
use proptest::prelude::*;

const RAM_BASE: u32 = 0x07FC_0000;
const CCC_ON: [u8; 2] = [0x01, 0x00];

/// Boot vector, then a frame at word 1, then three return addresses.
fn stack() -> [u32; 16] {
    [
        RAM_BASE + 16 * 4,
        0x11,
        0x22,
        0x33,
        0x44,
        0xCC,
        0x07FC_0501,
        0x07FC_0600,
        0x6100_0000,
        0x07FC_2001,
        0x0000_0010,
        0x07F0_0101,
        0x07FC_2201,
        0,
        0,
        0,
    ]
}

fn store_with(count: usize, epoch: u32) -> CrashStore {
    let mut area = RetainedArea::new();
    area.init(ResetReason::WatchdogReset);
    let stack = stack();
    let window = SliceWindow::new(RAM_BASE, &stack);
    for _ in 0..count {
        capture_fault(
            area.store_mut(),
            FaultHandlerKind::HardFault,
            &window,
            &MemoryMap::DA14531,
            false,
            RAM_BASE + 4,
            &FixedEpoch(epoch),
        );
    }
    *area.store()
}

fn subscribe(service: &mut ExportService, store: &CrashStore, transport: &mut MockTransport) {
    service
        .on_write(Endpoint::Subscription, &CCC_ON, store, transport, 0)
        .expect("CCC write accepted");
}

/// Run a command to completion, confirming every notification.
fn run(
    service: &mut ExportService,
    command: Command,
    store: &mut CrashStore,
    transport: &mut MockTransport,
) -> ExportEvent {
    service
        .on_write(Endpoint::Command, &[command as u8], store, transport, 0)
        .expect("command accepted");
    loop {
        match service.on_notify_complete(NotifyStatus::Sent, store, transport, 0) {
            ExportEvent::Continued { .. } => continue,
            other => return other,
        }
    }
}

fn reassemble(transport: &MockTransport) -> ResponseAssembler {
    let mut assembler = ResponseAssembler::new();
    let mut complete = false;
    for chunk in transport.payloads() {
        complete = assembler.push(chunk).expect("chunk accepted");
    }
    assert!(complete, "response incomplete after {} bytes", assembler.received());
    assembler
}

#[test]
fn test_single_hardfault_over_20_byte_chunks() {
    let mut store = store_with(1, 1234);
    let mut service = ExportService::new(ExportConfig::default());
    let mut transport = MockTransport::new(23);
    subscribe(&mut service, &store, &mut transport);

    let event = run(&mut service, Command::GetAllResetData, &mut store, &mut transport);
    assert_eq!(event, ExportEvent::Completed(Command::GetAllResetData));

    assert!(transport.sent_count() >= 2);
    assert!(transport.payloads().all(|chunk| chunk.len() <= 20));

    let assembler = reassemble(&transport);
    assert_eq!(assembler.command(), Some(Command::GetAllResetData));
    let payload = assembler.payload().unwrap();
    assert_eq!(payload.len(), 2 + RECORD_SIZE);

    let decoded = decode_store(payload).unwrap().expect("records present");
    assert_eq!(decoded.last_reset_reason, ResetReason::WatchdogReset);
    assert_eq!(decoded.records.len(), 1);
    let record = &decoded.records[0];
    assert!(record.valid);
    assert_eq!(record.epoch, 1234);
    assert_eq!(record.handler, FaultHandlerKind::HardFault);
    assert_eq!(record.frame.r0, 0x11);
    assert_eq!(record.frame.return_address, 0x07FC_0600);
    assert_eq!(record.call_trace_len, 3);
    assert_eq!(record.call_trace, [0x07FC_2000, 0x07F0_0100, 0x07FC_2200, 0, 0, 0]);

    assert_eq!(store.reset_count(), 0, "complete export clears the store");
}

#[test]
fn test_empty_store_reports_nothing() {
    let mut store = CrashStore::new();
    let mut service = ExportService::new(ExportConfig::default());
    let mut transport = MockTransport::new(23);
    subscribe(&mut service, &store, &mut transport);

    run(&mut service, Command::GetAllResetData, &mut store, &mut transport);
    assert_eq!(transport.sent(0), Some(&[0x01_u8, 0x00, 0x00, 0x00][..]));
    assert_eq!(transport.sent_count(), 1);
}

#[test]
fn test_disconnect_mid_export_keeps_store() {
    let mut store = store_with(3, 7);
    let before = store;
    let mut service = ExportService::new(ExportConfig::default());
    let mut transport = MockTransport::new(23);
    subscribe(&mut service, &store, &mut transport);

    service
        .on_write(Endpoint::Command, &[0x01], &store, &mut transport, 0)
        .unwrap();
    for _ in 0..3 {
        service.on_notify_complete(NotifyStatus::Sent, &mut store, &mut transport, 0);
    }
    let first_total = service.session().unwrap().total_len();
    assert!(service.on_disconnect());
    assert_eq!(store, before, "interrupted export must not clear");

    transport.clear();
    subscribe(&mut service, &store, &mut transport);
    run(&mut service, Command::GetAllResetData, &mut store, &mut transport);
    let assembler = reassemble(&transport);
    assert_eq!(assembler.received(), first_total);
}

#[test]
fn test_get_num_resets_is_idempotent() {
    let mut store = store_with(2, 0);
    let before = store;
    let mut service = ExportService::new(ExportConfig::default());
    let mut transport = MockTransport::new(23);
    subscribe(&mut service, &store, &mut transport);

    for _ in 0..3 {
        transport.clear();
        let event = run(&mut service, Command::GetNumResets, &mut store, &mut transport);
        assert_eq!(event, ExportEvent::Completed(Command::GetNumResets));
        let assembler = reassemble(&transport);
        assert_eq!(assembler.payload(), Some(&[2_u8][..]));
    }
    assert_eq!(store, before);
}

#[test]
fn test_precondition_errors_are_distinct() {
    let store = store_with(1, 0);
    let mut service = ExportService::new(ExportConfig::default());
    let mut transport = MockTransport::new(23);

    assert_eq!(
        service.on_write(Endpoint::Command, &[0x01], &store, &mut transport, 0),
        Err(AttError::CccdImproperlyConfigured)
    );
    subscribe(&mut service, &store, &mut transport);
    assert_eq!(
        service.on_write(Endpoint::Command, &[0x03], &store, &mut transport, 0),
        Err(AttError::WriteNotPermitted)
    );
    service
        .on_write(Endpoint::Command, &[0x01], &store, &mut transport, 0)
        .unwrap();
    assert_eq!(
        service.on_write(Endpoint::Command, &[0x02], &store, &mut transport, 0),
        Err(AttError::ProcedureAlreadyInProgress)
    );
    assert_eq!(
        service.on_write(Endpoint::Subscription, &[0x02, 0x00], &store, &mut transport, 0),
        Err(AttError::WriteNotPermitted)
    );
}

#[test]
fn test_ccc_revoked_mid_transfer() {
    let mut store = store_with(2, 0);
    let mut service = ExportService::new(ExportConfig::default());
    let mut transport = MockTransport::new(23);
    subscribe(&mut service, &store, &mut transport);

    service
        .on_write(Endpoint::Command, &[0x01], &store, &mut transport, 0)
        .unwrap();
    service.on_notify_complete(NotifyStatus::Sent, &mut store, &mut transport, 0);
    service
        .on_write(Endpoint::Subscription, &[0x00, 0x00], &store, &mut transport, 0)
        .unwrap();
    let sent = transport.sent_count();

    for _ in 0..5 {
        assert_eq!(
            service.on_notify_complete(NotifyStatus::Sent, &mut store, &mut transport, 0),
            ExportEvent::Parked
        );
    }
    assert_eq!(transport.sent_count(), sent);
    assert_eq!(store.reset_count(), 2);

    subscribe(&mut service, &store, &mut transport);
    assert_eq!(
        service.on_write(Endpoint::Command, &[0x01], &store, &mut transport, 0),
        Err(AttError::ProcedureAlreadyInProgress),
        "the parked transfer still holds the service"
    );
}

#[test]
fn test_transport_loss_mid_transfer_abandons() {
    let mut store = store_with(1, 0);
    let mut service = ExportService::new(ExportConfig::default());
    let mut transport = MockTransport::new(23);
    subscribe(&mut service, &store, &mut transport);

    service
        .on_write(Endpoint::Command, &[0x01], &store, &mut transport, 0)
        .unwrap();
    transport.set_connected(false);
    assert_eq!(
        service.on_notify_complete(NotifyStatus::Sent, &mut store, &mut transport, 0),
        ExportEvent::Abandoned
    );
    assert_eq!(store.reset_count(), 1);
}

proptest::proptest! {
    /// A full export sends exactly 4 + 2 + k × 63 bytes in chunks that
    /// respect the MTU, and leaves the store empty.
    #[test]
    fn export_is_complete_for_any_count_and_mtu(k in 1usize..=4, mtu in 23u16..=247) {
        let mut store = store_with(k, 99);
        let mut service = ExportService::new(ExportConfig::default());
        let mut transport = MockTransport::new(mtu);
        subscribe(&mut service, &store, &mut transport);

        let event = run(&mut service, Command::GetAllResetData, &mut store, &mut transport);
        prop_assert_eq!(event, ExportEvent::Completed(Command::GetAllResetData));

        let total: usize = transport.payloads().map(<[u8]>::len).sum();
        prop_assert_eq!(total, 4 + 2 + k * RECORD_SIZE);
        let budget = usize::from(mtu - 3);
        prop_assert!(transport.payloads().all(|chunk| chunk.len() <= budget));
        prop_assert_eq!(transport.sent_count(), total.div_ceil(budget));
        prop_assert_eq!(store.reset_count(), 0);

        let assembler = reassemble(&transport);
        let decoded = decode_store(assembler.payload().unwrap()).unwrap().unwrap();
        prop_assert_eq!(decoded.records.len(), k);
    }

    /// Disconnecting after any number of chunks leaves the store intact.
    #[test]
    fn disconnect_never_loses_records(k in 1usize..=4, confirmed in 0usize..20) {
        let mut store = store_with(k, 5);
        let before = store;
        let mut service = ExportService::new(ExportConfig::default());
        let mut transport = MockTransport::new(23);
        subscribe(&mut service, &store, &mut transport);

        service.on_write(Endpoint::Command, &[0x01], &store, &mut transport, 0).unwrap();
        let total = service.session().unwrap().total_len();
        let chunks = total.div_ceil(20);
        for _ in 0..confirmed.min(chunks - 1) {
            service.on_notify_complete(NotifyStatus::Sent, &mut store, &mut transport, 0);
        }
        service.on_disconnect();
        prop_assert_eq!(store, before);
    }
}
