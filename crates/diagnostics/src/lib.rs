//! Crash diagnostics core — reset classification, retained crash store,
//! fault capture and the byte layout used to export the store.
//!
//! # Lifecycle
//!
//! ```text
//! boot ──► classify(reset bits) ──► RetainedArea::init(reason)
//!                                        │ cold → store zeroed, epoch restarts
//!                                        ▼
//!                          ... running, epoch ticking ...
//!                                        │ HardFault / NMI
//!                                        ▼
//!             capture::handle_fault ──► record frame + call trace ──► reset
//!                                        │
//! next boot ──► export (bluetooth crate) reads wire::encode_store,
//!               clears the store after a complete transfer
//! ```
//!
//! Everything in this crate is `no_std`, allocation free and safe to call
//! from exception context, except [`report`], which is only used at boot.

#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(unsafe_op_in_unsafe_fn)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::doc_markdown)] // register names and hex addresses

pub mod capture;
pub mod config;
pub mod frame;
pub mod report;
pub mod reset;
pub mod scan;
pub mod store;
pub mod wire;

pub use capture::{
    capture_fault, handle_fault, CaptureConfig, CaptureOutcome, FaultDisposition, SkipReason,
};
pub use config::{MemoryMap, CALL_DEPTH, MAX_RECORDS, SENTINEL, SNAPSHOT_TAG};
pub use frame::{FaultHandlerKind, StackFrame};
pub use reset::{classify, ResetReason};
pub use scan::{scan_call_trace, CallTrace};
pub use store::{CrashStore, FaultRecord, RetainedArea, Snapshot};
pub use wire::{decode_store, encode_store, DecodeError, DecodedRecord, DecodedStore, EncodeError};
