//! Connection state owned by the central state machine.

use heapless::String;

/// Radio connection handle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ConnHandle(pub u16);

/// GATT attribute handle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AttHandle(pub u16);

/// BLE device address as seen in advertising reports.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PeerAddress {
    /// Address type (0 = public, 1 = random static, ...).
    pub kind: u8,
    /// Address bytes, little-endian as on air.
    pub bytes: [u8; 6],
}

/// Connection parameters (interval in 1.25 ms units, timeout in 10 ms units).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ConnParams {
    pub interval_min: u16,
    pub interval_max: u16,
    pub latency: u16,
    pub supervision_timeout: u16,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Phy {
    Le1M,
    Le2M,
    Coded,
}

/// Phase of link establishment.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Phase {
    Idle,
    Discovering,
    Scanning,
    ServiceDiscovery,
    ParamUpdate,
    PhyUpdate,
    ReadOrWrite,
    WriteCccd,
    Established,
}

/// Handles resolved during service discovery.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct GattHandles {
    pub battery_level: Option<AttHandle>,
    pub input_report: Option<AttHandle>,
    pub input_report_cccd: Option<AttHandle>,
}

impl GattHandles {
    /// All three handles the link needs are present.
    pub fn is_complete(&self) -> bool {
        self.battery_level.is_some()
            && self.input_report.is_some()
            && self.input_report_cccd.is_some()
    }
}

/// Peripheral chosen from the scan.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Peer {
    pub address: PeerAddress,
    pub name: String<32>,
    pub rssi: i8,
}

/// Everything one connection attempt accumulates.
///
/// `ConnectionContext::new()` is the idle state; falling back to idle
/// replaces the whole context so nothing leaks into the next attempt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConnectionContext {
    pub phase: Phase,
    pub peer: Option<Peer>,
    pub conn: Option<ConnHandle>,
    /// Negotiated parameters, or the requested ones when negotiation failed.
    pub params: Option<ConnParams>,
    pub phy: Option<Phy>,
    pub handles: GattHandles,
    pub battery_level: Option<u8>,
    /// Battery reads issued in the ReadOrWrite phase.
    pub read_attempts: u16,
    /// The establish-link timer is armed.
    pub timeout_pending: bool,
}

impl ConnectionContext {
    pub const fn new() -> Self {
        Self {
            phase: Phase::Idle,
            peer: None,
            conn: None,
            params: None,
            phy: None,
            handles: GattHandles {
                battery_level: None,
                input_report: None,
                input_report_cccd: None,
            },
            battery_level: None,
            read_attempts: 0,
            timeout_pending: false,
        }
    }

    /// True when the context holds nothing from a previous attempt.
    pub fn is_clear(&self) -> bool {
        *self == Self::new()
    }
}

impl Default for ConnectionContext {
    fn default() -> Self {
        Self::new()
    }
}
