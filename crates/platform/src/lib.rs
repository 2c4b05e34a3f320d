//! Hardware Abstraction Layer (HAL) for the crash-info firmware
//!
//! This crate provides trait-based abstractions for every piece of hardware
//! the crash diagnostics touch, so that the capture, persistence and export
//! logic can be exercised on the host with synthetic memory and mock
//! peripherals.
//!
//! # Architecture Layers
//!
//! ```text
//! Application Layer (firmware crate)
//!         ↓
//! Feature Layers (diagnostics, bluetooth)
//!         ↓
//! Platform HAL (this crate - trait abstractions)
//!         ↓
//! Hardware Layer (DA14531 registers via cortex-m)
//! ```
//!
//! # Abstractions
//!
//! - [`MemoryWindow`] - bounded, read-only view of raw memory
//! - [`ResetStatus`] - the reset-cause register, read once per boot
//! - [`SystemControl`] - debugger probe, remap state and forced reset
//! - [`NotifyTransport`] - notification channel towards a connected peer
//! - [`EpochSource`] - monotonic counter used instead of wall-clock time
//!
//! # Features
//!
//! - `std`: Enable the [`mocks`] module outside of unit tests
//! - `defmt`: Enable defmt logging derives
//!
//! # Example
//!
//! ```
//! use platform::{MemoryWindow, SliceWindow};
//!
//! let words = [0xDEAD_BEEF_u32, 0x0000_0001];
//! let window = SliceWindow::new(0x2000_0000, &words);
//! assert_eq!(window.read_word(0x2000_0004), Some(1));
//! ```

// ── Lint policy ─────────────────────────────────────────────────────────────
#![deny(clippy::unwrap_used)] // no .unwrap() in production code
#![deny(clippy::expect_used)] // no .expect() in production code
#![deny(clippy::panic)] // no panic!() in production code
#![deny(clippy::unreachable)] // no unreachable!() that isn't documented
#![deny(unused_must_use)]
// all Results must be handled
// ────────────────────────────────────────────────────────────────────────────
#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(unsafe_op_in_unsafe_fn)] // unsafe fn body is not implicitly unsafe block
#![warn(clippy::print_stdout)] // prefer tracing/defmt over println! in lib code
// Pedantic lints suppressed for this hardware HAL crate:
#![allow(clippy::doc_markdown)] // hex addresses and register names in doc comments
#![allow(clippy::must_use_candidate)] // hardware accessors — callers decide
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

pub mod epoch;
pub mod memory;
pub mod mocks;
pub mod reset_status;
pub mod system;
pub mod transport;

pub use epoch::{EpochCounter, EpochSource};
pub use memory::{CodeRegion, MemoryWindow, RawWindow, SliceWindow, WORD_SIZE};
pub use reset_status::{ResetStatus, POWER_ON_STAT, SWRESET_STAT};
pub use system::{ResetMode, SystemControl};
pub use transport::{Endpoint, NotifyStatus, NotifyTransport, TransportError};
