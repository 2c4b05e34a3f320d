//! Human-readable crash report.
//!
//! Rendered at boot over defmt so a developer with RTT attached sees the
//! previous crash, and by `xtask decode` from a captured export.

use core::fmt;

use crate::store::CrashStore;
use crate::wire::{DecodedRecord, DecodedStore};

impl fmt::Display for DecodedRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "  valid:   {}", u8::from(self.valid))?;
        writeln!(f, "  epoch:   {}", self.epoch)?;
        writeln!(f, "  handler: {}", self.handler)?;
        write!(f, "{}", self.frame)?;
        writeln!(f, "  call trace ({} entries):", self.call_trace_len)?;
        for (depth, addr) in self.trace().iter().enumerate() {
            writeln!(f, "    #{depth}: 0x{addr:08X}")?;
        }
        Ok(())
    }
}

impl fmt::Display for DecodedStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "last reset reason: {}", self.last_reset_reason)?;
        writeln!(f, "recorded faults:   {}", self.records.len())?;
        for (index, record) in self.records.iter().enumerate() {
            writeln!(f, "fault {index}:")?;
            write!(f, "{record}")?;
        }
        Ok(())
    }
}

/// Log the store at boot.
#[cfg(feature = "defmt")]
pub fn log_store(store: &CrashStore) {
    defmt::info!(
        "crash store: last reset {}, {} fault(s) recorded",
        store.last_reset_reason(),
        store.reset_count()
    );
    for (index, record) in store.records().iter().enumerate() {
        defmt::warn!(
            "fault {}: {} at epoch {}, pc={=u32:#010x} lr={=u32:#010x} xpsr={=u32:#010x}",
            index,
            record.handler(),
            record.epoch(),
            record.frame().return_address,
            record.frame().lr,
            record.frame().xpsr
        );
        for addr in record.call_trace() {
            defmt::warn!("  trace {=u32:#010x}", addr);
        }
    }
}

/// Log the store at boot (no-op without `defmt`).
#[cfg(not(feature = "defmt"))]
pub fn log_store(store: &CrashStore) {
    let _ = store;
}
