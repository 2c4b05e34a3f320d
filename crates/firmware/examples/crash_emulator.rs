//! Crash-info emulator
//!
//! Boots a simulated DA14531, crashes it a few times, then fetches and
//! prints the crash store the way a collector app would.
//! Run with: cargo run --example crash_emulator --features emulator
//! Set RUST_LOG=debug to see every notification.

use bluetooth::Command;
use diagnostics::FaultHandlerKind;
use firmware::emulator::{init_tracing, render, EmulatedDevice, FaultSite};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let mut device = EmulatedDevice::power_on();

    device.run_for(12);
    device.fault(FaultHandlerKind::HardFault, &FaultSite::nested(3));
    device.run_for(40);
    device.fault(FaultHandlerKind::NonMaskableFault, &FaultSite::nested(6));

    let count = device
        .fetch(Command::GetNumResets, 23, None)
        .await
        .map_err(|err| err.to_string())?;
    tracing::info!(payload = ?count.payload, "GetNumResets");

    let fetch = device
        .fetch(Command::GetAllResetData, 23, None)
        .await
        .map_err(|err| err.to_string())?;
    tracing::info!(chunks = fetch.chunks, bytes = fetch.received, "GetAllResetData");
    let store = fetch.decode().map_err(|err| err.to_string())?;
    tracing::info!("crash report:\n{}", render(store.as_ref()));

    tracing::info!(
        records = device.area().store().reset_count(),
        "store after a complete export"
    );
    Ok(())
}
