//! nRF52840 glue for the central state machine.
//!
//! [`SoftdeviceLink`] turns `LinkLayer` calls into [`RadioRequest`]s for
//! the radio task; the radio task answers with [`RadioEvent`]s that the
//! central task feeds back through `Central::on_link_event`.
//! [`BoardPlatform`] keeps one deadline per event bit and drives the LED.

pub mod radio;

use defmt::warn;
use embassy_nrf::gpio::Output;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_time::{Duration, Instant};
use heapless::Vec;

use xbox_central::ble::{
    AttHandle, ConnHandle, ConnParams, GattHandles, LinkEvent, LinkLayer, PeerAddress, Phy,
    Platform, ScanParams,
};
use xbox_central::{Events, LinkError};

/// Advertising data plus scan response.
pub const ADV_DATA_MAX: usize = 62;
/// Largest attribute value forwarded to the central.
pub const ATT_VALUE_MAX: usize = 32;

pub static RADIO_REQUESTS: Channel<CriticalSectionRawMutex, RadioRequest, 8> = Channel::new();
pub static RADIO_EVENTS: Channel<CriticalSectionRawMutex, RadioEvent, 16> = Channel::new();

/// Work for the radio task.
#[derive(Clone, Copy, defmt::Format)]
pub enum RadioRequest {
    Init,
    PrepareDiscovery,
    Scan(ScanParams),
    StopScan,
    Connect(PeerAddress, ConnParams),
    CancelConnect,
    Disconnect(ConnHandle),
    DiscoverServices(ConnHandle),
    UpdateConnParams(ConnHandle, ConnParams),
    UpdatePhy(ConnHandle, Phy),
    Read(ConnHandle, AttHandle),
    WriteCccd(ConnHandle, AttHandle, u16),
    ReadRssi(ConnHandle),
}

/// Owned form of [`LinkEvent`] that can cross a channel.
#[derive(Clone)]
pub enum RadioEvent {
    AdvertisingReport {
        address: PeerAddress,
        rssi: i8,
        data: Vec<u8, ADV_DATA_MAX>,
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
        value: Vec<u8, ATT_VALUE_MAX>,
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
        data: Vec<u8, ATT_VALUE_MAX>,
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

impl RadioEvent {
    pub fn as_link_event(&self) -> LinkEvent<'_> {
        match self {
            RadioEvent::AdvertisingReport {
                address,
                rssi,
                data,
            } => LinkEvent::AdvertisingReport {
                address: *address,
                rssi: *rssi,
                data,
            },
            RadioEvent::ScanComplete => LinkEvent::ScanComplete,
            RadioEvent::Connected { conn, address } => LinkEvent::Connected {
                conn: *conn,
                address: *address,
            },
            RadioEvent::ConnectFailed(e) => LinkEvent::ConnectFailed(*e),
            RadioEvent::ServicesDiscovered { conn, handles } => LinkEvent::ServicesDiscovered {
                conn: *conn,
                handles: *handles,
            },
            RadioEvent::ServiceDiscoveryFailed { conn, error } => {
                LinkEvent::ServiceDiscoveryFailed {
                    conn: *conn,
                    error: *error,
                }
            }
            RadioEvent::ConnParamsUpdated { conn, result } => LinkEvent::ConnParamsUpdated {
                conn: *conn,
                result: *result,
            },
            RadioEvent::PhyUpdated { conn, result } => LinkEvent::PhyUpdated {
                conn: *conn,
                result: *result,
            },
            RadioEvent::ReadResponse {
                conn,
                handle,
                value,
            } => LinkEvent::ReadResponse {
                conn: *conn,
                handle: *handle,
                value,
            },
            RadioEvent::ReadFailed {
                conn,
                handle,
                error,
            } => LinkEvent::ReadFailed {
                conn: *conn,
                handle: *handle,
                error: *error,
            },
            RadioEvent::CccdWritten { conn, result } => LinkEvent::CccdWritten {
                conn: *conn,
                result: *result,
            },
            RadioEvent::Notification { conn, handle, data } => LinkEvent::Notification {
                conn: *conn,
                handle: *handle,
                data,
            },
            RadioEvent::Rssi { conn, rssi } => LinkEvent::Rssi {
                conn: *conn,
                rssi: *rssi,
            },
            RadioEvent::Disconnected { conn, reason } => LinkEvent::Disconnected {
                conn: *conn,
                reason: *reason,
            },
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// LinkLayer over the radio task
// ═══════════════════════════════════════════════════════════════════════════

/// Non-blocking front end of the radio task.
///
/// The SoftDevice is enabled and the bond table allocated before any task
/// is spawned, so `init_device` and `prepare_discovery` only confirm that
/// the radio task is accepting requests.  They fail with `Busy` when its
/// queue is full.
pub struct SoftdeviceLink;

impl SoftdeviceLink {
    fn request(&self, req: RadioRequest) -> Result<(), LinkError> {
        RADIO_REQUESTS.try_send(req).map_err(|_| LinkError::Busy)
    }

    fn request_or_warn(&self, req: RadioRequest) {
        if self.request(req).is_err() {
            warn!("radio request queue full, dropped {}", req);
        }
    }
}

impl LinkLayer for SoftdeviceLink {
    fn init_device(&mut self) -> Result<(), LinkError> {
        self.request(RadioRequest::Init)
    }

    fn prepare_discovery(&mut self) -> Result<(), LinkError> {
        self.request(RadioRequest::PrepareDiscovery)
    }

    fn start_scan(&mut self, params: &ScanParams) -> Result<(), LinkError> {
        self.request(RadioRequest::Scan(*params))
    }

    fn stop_scan(&mut self) {
        self.request_or_warn(RadioRequest::StopScan);
    }

    fn connect(&mut self, peer: &PeerAddress, params: &ConnParams) -> Result<(), LinkError> {
        self.request(RadioRequest::Connect(*peer, *params))
    }

    fn cancel_connect(&mut self) {
        self.request_or_warn(RadioRequest::CancelConnect);
    }

    fn disconnect(&mut self, conn: ConnHandle) {
        self.request_or_warn(RadioRequest::Disconnect(conn));
    }

    fn discover_services(&mut self, conn: ConnHandle) -> Result<(), LinkError> {
        self.request(RadioRequest::DiscoverServices(conn))
    }

    fn update_conn_params(
        &mut self,
        conn: ConnHandle,
        params: &ConnParams,
    ) -> Result<(), LinkError> {
        self.request(RadioRequest::UpdateConnParams(conn, *params))
    }

    fn update_phy(&mut self, conn: ConnHandle, phy: Phy) -> Result<(), LinkError> {
        self.request(RadioRequest::UpdatePhy(conn, phy))
    }

    fn read(&mut self, conn: ConnHandle, handle: AttHandle) -> Result<(), LinkError> {
        self.request(RadioRequest::Read(conn, handle))
    }

    fn write_cccd(
        &mut self,
        conn: ConnHandle,
        handle: AttHandle,
        value: u16,
    ) -> Result<(), LinkError> {
        self.request(RadioRequest::WriteCccd(conn, handle, value))
    }

    fn read_rssi(&mut self, conn: ConnHandle) -> Result<(), LinkError> {
        self.request(RadioRequest::ReadRssi(conn))
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Timers and LED
// ═══════════════════════════════════════════════════════════════════════════

const EVENT_BITS: usize = Events::PRIORITY.len();

pub struct BoardPlatform {
    deadlines: [Option<Instant>; EVENT_BITS],
    /// Active-low status LED.
    led: Output<'static>,
}

impl BoardPlatform {
    pub fn new(led: Output<'static>) -> Self {
        Self {
            deadlines: [None; EVENT_BITS],
            led,
        }
    }

    /// Earliest armed deadline.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.deadlines.iter().flatten().min().copied()
    }

    /// Disarm and return every event due at `now`.
    pub fn take_expired(&mut self, now: Instant) -> Events {
        let mut due = Events::empty();
        for (slot, deadline) in self.deadlines.iter_mut().enumerate() {
            if deadline.is_some_and(|at| at <= now) {
                *deadline = None;
                due |= Events::from_bits_retain(1u16 << slot);
            }
        }
        due
    }

    fn slots(events: Events) -> impl Iterator<Item = usize> {
        events
            .iter()
            .map(|bit| bit.bits().trailing_zeros() as usize)
            .filter(|slot| *slot < EVENT_BITS)
    }
}

impl Platform for BoardPlatform {
    fn start_timer(&mut self, events: Events, delay_ms: u32) {
        let at = Instant::now() + Duration::from_millis(delay_ms as u64);
        for slot in Self::slots(events) {
            self.deadlines[slot] = Some(at);
        }
    }

    fn stop_timer(&mut self, events: Events) {
        for slot in Self::slots(events) {
            self.deadlines[slot] = None;
        }
    }

    fn set_led(&mut self, on: bool) {
        if on {
            self.led.set_low();
        } else {
            self.led.set_high();
        }
    }
}
