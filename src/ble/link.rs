//! Seams between the central state machine and the outside world.
//!
//! [`LinkLayer`] is the radio: every method only *starts* an operation
//! and returns at once.  Operations that wait on the peer complete later
//! as a [`LinkEvent`] fed to `Central::on_link_event`.  [`Platform`]
//! supplies delayed event posting and the status LED.

use super::context::{AttHandle, ConnHandle, ConnParams, GattHandles, PeerAddress, Phy};
use super::events::Events;
use crate::error::LinkError;

/// Active scan request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ScanParams {
    /// Service UUID the peer must advertise.
    pub service_uuid: u16,
    /// Length of the scan window (ms).
    pub window_ms: u32,
    /// Request scan responses (needed for the local name).
    pub active: bool,
}

pub trait LinkLayer {
    /// Bring up the local radio.  Synchronous.
    fn init_device(&mut self) -> Result<(), LinkError>;

    /// Prepare peer discovery (bond records, scan filters).  Synchronous.
    fn prepare_discovery(&mut self) -> Result<(), LinkError>;

    /// Completes with `AdvertisingReport`s and finally `ScanComplete`.
    fn start_scan(&mut self, params: &ScanParams) -> Result<(), LinkError>;

    fn stop_scan(&mut self);

    /// Completes with `Connected` or `ConnectFailed`.
    fn connect(&mut self, peer: &PeerAddress, params: &ConnParams) -> Result<(), LinkError>;

    fn cancel_connect(&mut self);

    /// Completes with `Disconnected`.
    fn disconnect(&mut self, conn: ConnHandle);

    /// Completes with `ServicesDiscovered` or `ServiceDiscoveryFailed`.
    fn discover_services(&mut self, conn: ConnHandle) -> Result<(), LinkError>;

    /// Completes with `ConnParamsUpdated`.
    fn update_conn_params(&mut self, conn: ConnHandle, params: &ConnParams)
        -> Result<(), LinkError>;

    /// Completes with `PhyUpdated`.
    fn update_phy(&mut self, conn: ConnHandle, phy: Phy) -> Result<(), LinkError>;

    /// Completes with `ReadResponse` or `ReadFailed`.
    fn read(&mut self, conn: ConnHandle, handle: AttHandle) -> Result<(), LinkError>;

    /// Completes with `CccdWritten`.
    fn write_cccd(&mut self, conn: ConnHandle, handle: AttHandle, value: u16)
        -> Result<(), LinkError>;

    /// Completes with `Rssi`.
    fn read_rssi(&mut self, conn: ConnHandle) -> Result<(), LinkError>;
}

pub trait Platform {
    /// Post `events` after `delay_ms`.  Re-arming replaces the old deadline.
    fn start_timer(&mut self, events: Events, delay_ms: u32);

    /// Cancel any armed timer for `events`.
    fn stop_timer(&mut self, events: Events);

    fn set_led(&mut self, on: bool);
}

/// Completions and unsolicited events from the radio.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LinkEvent<'a> {
    AdvertisingReport {
        address: PeerAddress,
        rssi: i8,
        data: &'a [u8],
    },
    ScanComplete,
    Connected {
        conn: ConnHandle,
        address: PeerAddress,
    },
    ConnectFailed(LinkError),
    ServicesDiscovered {
        conn: ConnHandle,
        handles: GattHandles,
    },
    ServiceDiscoveryFailed {
        conn: ConnHandle,
        error: LinkError,
    },
    ConnParamsUpdated {
        conn: ConnHandle,
        result: Result<ConnParams, LinkError>,
    },
    PhyUpdated {
        conn: ConnHandle,
        result: Result<Phy, LinkError>,
    },
    ReadResponse {
        conn: ConnHandle,
        handle: AttHandle,
        value: &'a [u8],
    },
    ReadFailed {
        conn: ConnHandle,
        handle: AttHandle,
        error: LinkError,
    },
    CccdWritten {
        conn: ConnHandle,
        result: Result<(), LinkError>,
    },
    Notification {
        conn: ConnHandle,
        handle: AttHandle,
        data: &'a [u8],
    },
    Rssi {
        conn: ConnHandle,
        rssi: i8,
    },
    Disconnected {
        conn: ConnHandle,
        reason: u8,
    },
}
