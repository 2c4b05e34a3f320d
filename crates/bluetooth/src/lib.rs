//! Crash-info export over BLE — the GATT service that streams the retained
//! crash store to a connected peer.
//!
//! This crate is `no_std` by default; it only uses `core` + `heapless`.
//! The BLE stack itself lives outside it: the firmware forwards inbound
//! writes, notification confirmations and disconnects to [`ExportService`],
//! and the service sends notifications through [`platform::NotifyTransport`].
//!
//! # Service layout
//!
//! | Endpoint | Direction | Content |
//! |---|---|---|
//! | command | peer → device | one command byte ([`Command`]) |
//! | response | device → peer | notifications carrying a [`response`] |
//! | subscription | peer → device | CCC of the response endpoint, `0` or `1` |

#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]

pub mod advertising;
pub mod att;
pub mod ccc;
pub mod command;
pub mod config;
pub mod response;
pub mod service;
pub mod state;

pub use att::AttError;
pub use ccc::NotifyState;
pub use command::Command;
pub use config::ExportConfig;
pub use response::{AssembleError, Response, ResponseAssembler};
pub use service::{ExportEvent, ExportService, ExportSession, WriteRequest};
pub use state::LinkState;
