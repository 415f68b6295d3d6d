//! Error types for xbox-central.
//!
//! We avoid `alloc` - all error variants carry only fixed-size data.
//! Each type derives `defmt::Format` when the `defmt` feature is enabled.

use core::fmt;

/// Failure to decode an input report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DecodeError {
    /// The payload was not exactly `REPORT_SIZE` bytes long.
    InvalidLength { len: usize },
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::InvalidLength { len } => write!(
                f,
                "invalid report length {} (expected {})",
                len,
                crate::gamepad::REPORT_SIZE
            ),
        }
    }
}

/// Subset of radio errors the link layer reports (keeps the enum `Copy`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkError {
    /// A request of the same kind is already in flight.
    Busy,
    /// The request needs a connection and there is none.
    NotConnected,
    /// The peer or the controller refused the request.
    Rejected,
    /// Raw status code from the radio stack.
    Raw(u32),
}

impl fmt::Display for LinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkError::Busy => f.write_str("radio busy"),
            LinkError::NotConnected => f.write_str("not connected"),
            LinkError::Rejected => f.write_str("request rejected"),
            LinkError::Raw(code) => write!(f, "radio error {:#x}", code),
        }
    }
}

/// Why a connection attempt fell back to idle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AbortReason {
    /// The local radio could not be initialised.
    InitFailed,
    /// Peer discovery / bonding setup was refused.
    DiscoverySetupFailed,
    /// The scan could not be started.
    ScanFailed,
    /// GATT discovery failed on the peer.
    ServiceDiscoveryFailed,
    /// Battery level, input report or its CCCD is absent.
    MissingCharacteristic,
    /// Enabling input report notifications failed.
    CccdWriteFailed,
    /// The establish-link timer expired.
    Timeout,
    /// The link dropped.
    Disconnected,
}

impl fmt::Display for AbortReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            AbortReason::InitFailed => "radio init failed",
            AbortReason::DiscoverySetupFailed => "discovery setup failed",
            AbortReason::ScanFailed => "scan failed",
            AbortReason::ServiceDiscoveryFailed => "service discovery failed",
            AbortReason::MissingCharacteristic => "required characteristic missing",
            AbortReason::CccdWriteFailed => "CCCD write failed",
            AbortReason::Timeout => "establish link timeout",
            AbortReason::Disconnected => "disconnected",
        };
        f.write_str(text)
    }
}
