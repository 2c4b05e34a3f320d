//! Crash-info firmware for the DA14531
//!
//! Composition root: wires the crash diagnostics and the BLE export
//! service to the DA14531 hardware.
//!
//! # Architecture
//!
//! ```text
//! Application Layer (main.rs, exception_handlers)
//!         ↓
//! Glue (boot, export, retained, regs)
//!         ↓
//! Feature Layers (diagnostics, bluetooth)
//!         ↓
//! Platform HAL (platform traits)
//! ```
//!
//! # Features
//!
//! - `hardware` - Build for the DA14531 (cortex-m-rt, defmt-rtt, panic-probe)
//! - `emulator` - Build for desktop testing (tokio, tracing)
//! - `development-debug` - Fault handlers halt for a debugger instead of recording
//! - `remap-addr0-test` - Keep the address-0 remap across the post-fault reset
//! - `std` - Enable standard library (for emulator and testing)
//!
//! # Examples
//!
//! ## Hardware Target
//!
//! ```bash
//! cargo build --release --target thumbv6m-none-eabi --features hardware
//! ```
//!
//! ## Emulator Target
//!
//! ```bash
//! cargo run --example crash_emulator --features emulator
//! ```

#![cfg_attr(all(not(test), not(feature = "std")), no_std)]
// Upgrade relevant warns to deny; keep pedantic as warn (too noisy for firmware)
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(unsafe_op_in_unsafe_fn)]
// unsafe fn body is not implicitly unsafe block
// Logging discipline (allow println in tests via clippy.toml)
#![warn(clippy::print_stdout)] // prefer tracing/defmt over println! in lib code
#![warn(clippy::dbg_macro)] // dbg! should not be left in committed code
// Intentional allows for this codebase:
#![allow(clippy::module_name_repetitions)] // common in Rust crates; not a real issue
#![allow(clippy::missing_errors_doc)] // most errors are self-explanatory
// Pedantic lints too noisy for firmware application code:
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::doc_markdown)]

pub mod boot;
pub mod exception_handlers;
pub mod export;
pub mod regs;
pub mod retained;

#[cfg(feature = "emulator")]
pub mod emulator;

#[cfg(feature = "hardware")]
pub mod ffi;

// Re-export key types
pub use boot::{reset_indication, systick_reload, CORE_CLOCK_HZ, EPOCH_TICK_MS};
pub use exception_handlers::CAPTURE_CONFIG;
pub use export::{
    with_endpoint, EndpointError, ExportEndpoint, Notification, NotifyQueue, QueueTransport,
    SharedEndpoint,
};
pub use regs::{Da14531ResetStatus, Da14531System};
