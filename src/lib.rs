//! Xbox Wireless Controller link for nRF52840 boards.
//!
//! The library holds everything that does not touch hardware and is
//! tested on the host:
//!
//! - [`gamepad`]: decoding of the 16-byte input report, the latest-state
//!   snapshot, text rendering and input dispatch.
//! - [`ble`]: the central state machine that finds the controller,
//!   connects and enables input report notifications.
//!
//! Usage: `cargo test --lib` and `cargo test --test integration`
//!
//! The embedded binary (`src/main.rs`, feature `embedded`) wires the
//! state machine to the SoftDevice and Embassy timers.

#![cfg_attr(not(test), no_std)]

#[macro_use]
mod fmt;

pub mod ble;
pub mod config;
pub mod error;
pub mod gamepad;

pub use ble::{Central, Events, LinkEvent, LinkLayer, Phase, Platform};
pub use config::CentralConfig;
pub use error::{AbortReason, DecodeError, LinkError};
pub use gamepad::{decode, query, render, ButtonId, ControllerState, DPad, REPORT_SIZE};
