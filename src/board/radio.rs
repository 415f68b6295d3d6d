//! Radio task: runs the SoftDevice central role on behalf of the
//! state machine.
//!
//! Requests arrive one at a time on [`RADIO_REQUESTS`].  A scan or a
//! connect attempt runs until it finishes or the next request arrives;
//! a live connection is served by [`serve_link`] until it drops.
//! Every outcome is reported on [`RADIO_EVENTS`].

use core::cell::RefCell;

use defmt::{debug, info, warn};
use embassy_futures::select::{select, Either};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::{Receiver, Sender};
use embassy_time::{Duration, Timer};
use heapless::Vec;
use nrf_softdevice::ble::security::{IoCapabilities, SecurityHandler};
use nrf_softdevice::ble::{
    central, gatt_client, get_address, Address, AddressType, Connection, EncryptError,
    EncryptionInfo, IdentityKey, MasterId, PhySet, SecurityMode,
};
use nrf_softdevice::{raw, Softdevice};
use static_cell::StaticCell;

use xbox_central::ble::{adv_parser, AttHandle, ConnHandle, ConnParams, GattHandles, PeerAddress, Phy};
use xbox_central::LinkError;

use super::{RadioEvent, RadioRequest, ADV_DATA_MAX, ATT_VALUE_MAX, RADIO_EVENTS, RADIO_REQUESTS};

type Requests = Receiver<'static, CriticalSectionRawMutex, RadioRequest, 8>;
type Events = Sender<'static, CriticalSectionRawMutex, RadioEvent, 16>;

/// Bonds kept in RAM.
const MAX_BONDS: usize = 4;

/// The SoftDevice wrapper does not surface the HCI reason.
const REASON_UNKNOWN: u8 = 0;

/// Legacy advertising payload size.
const ADV_PAYLOAD_MAX: usize = 31;

#[nrf_softdevice::gatt_client(uuid = "180f")]
pub struct BatteryClient {
    #[characteristic(uuid = "2a19", read)]
    pub battery_level: u8,
}

#[nrf_softdevice::gatt_client(uuid = "1812")]
pub struct XboxHidClient {
    /// 16-byte input report: sticks, triggers, d-pad and buttons.
    #[characteristic(uuid = "2a4d", read, notify)]
    pub input_report: Vec<u8, ATT_VALUE_MAX>,
}

// ═══════════════════════════════════════════════════════════════════════════
// Bonding
// ═══════════════════════════════════════════════════════════════════════════

struct PeerBond {
    master_id: MasterId,
    key: EncryptionInfo,
    peer_id: IdentityKey,
}

/// The controller refuses HID access on an unencrypted link, so every
/// connection goes through pairing.  Bonds live until reset.
struct Bonder {
    peers: RefCell<Vec<PeerBond, MAX_BONDS>>,
}

impl Bonder {
    fn new() -> Self {
        Self {
            peers: RefCell::new(Vec::new()),
        }
    }

    fn len(&self) -> usize {
        self.peers.borrow().len()
    }
}

impl SecurityHandler for Bonder {
    fn io_capabilities(&self) -> IoCapabilities {
        IoCapabilities::None
    }

    fn can_bond(&self, _conn: &Connection) -> bool {
        true
    }

    fn on_bonded(
        &self,
        _conn: &Connection,
        master_id: MasterId,
        key: EncryptionInfo,
        peer_id: IdentityKey,
    ) {
        let mut peers = self.peers.borrow_mut();
        if let Some(existing) = peers.iter_mut().find(|p| p.master_id == master_id) {
            existing.key = key;
            existing.peer_id = peer_id;
            return;
        }
        if peers.is_full() {
            peers.remove(0);
        }
        let _ = peers.push(PeerBond {
            master_id,
            key,
            peer_id,
        });
        info!("bonded ({} on record)", peers.len());
    }

    fn get_key(&self, _conn: &Connection, master_id: MasterId) -> Option<EncryptionInfo> {
        self.peers
            .borrow()
            .iter()
            .find_map(|p| (p.master_id == master_id).then_some(p.key))
    }

    fn get_peripheral_key(&self, conn: &Connection) -> Option<(MasterId, EncryptionInfo)> {
        self.peers.borrow().iter().find_map(|p| {
            p.peer_id
                .is_match(conn.peer_address())
                .then_some((p.master_id, p.key))
        })
    }

    fn on_security_update(&self, _conn: &Connection, mode: SecurityMode) {
        info!("security mode updated: {}", mode);
    }
}

fn bonder() -> &'static Bonder {
    static BONDER: StaticCell<Bonder> = StaticCell::new();
    BONDER.init(Bonder::new())
}

// ═══════════════════════════════════════════════════════════════════════════
// Task
// ═══════════════════════════════════════════════════════════════════════════

#[embassy_executor::task]
pub async fn radio_task(sd: &'static Softdevice) -> ! {
    let requests = RADIO_REQUESTS.receiver();
    let events = RADIO_EVENTS.sender();
    let bonder = bonder();
    let mut next: Option<RadioRequest> = None;

    loop {
        let req = match next.take() {
            Some(req) => req,
            None => requests.receive().await,
        };

        match req {
            // Bring-up already happened in `main` and `bonder()`.
            RadioRequest::Init => {
                info!("radio up, local address {}", get_address(sd));
            }
            RadioRequest::PrepareDiscovery => {
                info!("discovery ready, {} bonded peer(s)", bonder.len());
            }
            RadioRequest::Scan(params) => {
                let scan = scan_window(sd, &params, &events);
                match select(requests.receive(), scan).await {
                    Either::First(RadioRequest::StopScan) => debug!("scan stopped"),
                    Either::First(other) => next = Some(other),
                    Either::Second(()) => events.send(RadioEvent::ScanComplete).await,
                }
            }
            RadioRequest::Connect(peer, params) => {
                let attempt = connect(sd, &peer, &params, bonder);
                match select(requests.receive(), attempt).await {
                    Either::First(RadioRequest::CancelConnect) => info!("connect cancelled"),
                    Either::First(other) => next = Some(other),
                    Either::Second(Ok(conn)) => {
                        let handle = ConnHandle(conn.handle().unwrap_or_default());
                        events
                            .send(RadioEvent::Connected {
                                conn: handle,
                                address: peer,
                            })
                            .await;
                        serve_link(conn, handle, &requests, &events).await;
                    }
                    Either::Second(Err(e)) => events.send(RadioEvent::ConnectFailed(e)).await,
                }
            }
            other => refuse(other, &events).await,
        }
    }
}

/// Scan until the window closes.  Reports that carry the wanted
/// service are forwarded; a scan response is merged with the preceding
/// advertisement from the same peer so the name and UUID list arrive
/// together.
async fn scan_window(sd: &Softdevice, params: &xbox_central::ble::ScanParams, events: &Events) {
    let config = central::ScanConfig {
        active: params.active,
        ..Default::default()
    };
    let mut last_adv: Option<(PeerAddress, Vec<u8, ADV_PAYLOAD_MAX>)> = None;

    let scan = central::scan(sd, &config, |report| {
        let data =
            unsafe { core::slice::from_raw_parts(report.data.p_data, report.data.len as usize) };
        let address = PeerAddress {
            kind: report.peer_addr.addr_type(),
            bytes: report.peer_addr.addr,
        };

        let mut merged: Vec<u8, ADV_DATA_MAX> = Vec::new();
        if report.type_.scan_response() != 0 {
            if let Some((adv_address, adv)) = &last_adv {
                if *adv_address == address {
                    let _ = merged.extend_from_slice(adv);
                }
            }
        } else {
            let mut adv = Vec::new();
            let _ = adv.extend_from_slice(&data[..data.len().min(ADV_PAYLOAD_MAX)]);
            last_adv = Some((address, adv));
        }
        if merged.extend_from_slice(data).is_err() {
            return None;
        }

        if adv_parser::advertises_service(&merged, params.service_uuid) {
            let report = RadioEvent::AdvertisingReport {
                address,
                rssi: report.rssi,
                data: merged,
            };
            if events.try_send(report).is_err() {
                debug!("event queue full, advertising report dropped");
            }
        }
        None::<()>
    });

    let window = Timer::after(Duration::from_millis(params.window_ms as u64));
    if let Either::First(Err(_)) = select(scan, window).await {
        warn!("scan ended with error");
    }
}

async fn connect(
    sd: &'static Softdevice,
    peer: &PeerAddress,
    params: &ConnParams,
    bonder: &'static Bonder,
) -> Result<Connection, LinkError> {
    let address = to_address(peer);
    let whitelist = [&address];
    let config = central::ConnectConfig {
        scan_config: central::ScanConfig {
            whitelist: Some(&whitelist),
            ..Default::default()
        },
        conn_params: raw_conn_params(params),
        ..Default::default()
    };

    let conn = central::connect_with_security(sd, &config, bonder)
        .await
        .map_err(|_| LinkError::Rejected)?;

    let secure = match conn.encrypt() {
        Ok(()) => wait_for_secure_link(&conn).await,
        Err(EncryptError::PeerKeysNotFound) => {
            conn.request_pairing().is_ok() && wait_for_secure_link(&conn).await
        }
        Err(_) => false,
    };
    if !secure {
        warn!("could not secure the link");
        let _ = conn.disconnect();
        return Err(LinkError::Rejected);
    }
    Ok(conn)
}

async fn wait_for_secure_link(conn: &Connection) -> bool {
    for _ in 0..25 {
        match conn.security_mode() {
            SecurityMode::NoAccess | SecurityMode::Open => {
                Timer::after(Duration::from_millis(200)).await
            }
            _ => return true,
        }
    }
    false
}

async fn wait_disconnected(conn: &Connection) {
    while conn.is_connected() {
        Timer::after(Duration::from_millis(100)).await;
    }
}

/// Serve requests for one connection until it drops.
async fn serve_link(mut conn: Connection, handle: ConnHandle, requests: &Requests, events: &Events) {
    let mut hid: Option<XboxHidClient> = None;
    let mut rssi_started = false;

    loop {
        let req = match &hid {
            Some(client) => {
                let input = AttHandle(client.input_report_value_handle);
                let notifications = gatt_client::run(&conn, client, |event| match event {
                    XboxHidClientEvent::InputReportNotification(data) => {
                        let report = RadioEvent::Notification {
                            conn: handle,
                            handle: input,
                            data,
                        };
                        if events.try_send(report).is_err() {
                            warn!("event queue full, input report dropped");
                        }
                    }
                });
                match select(requests.receive(), notifications).await {
                    Either::First(req) => req,
                    Either::Second(_) => break,
                }
            }
            None => match select(requests.receive(), wait_disconnected(&conn)).await {
                Either::First(req) => req,
                Either::Second(()) => break,
            },
        };

        match req {
            RadioRequest::Disconnect(c) if c == handle => {
                let _ = conn.disconnect();
            }
            RadioRequest::DiscoverServices(c) if c == handle => match discover(&conn).await {
                Ok((handles, client)) => {
                    hid = Some(client);
                    events
                        .send(RadioEvent::ServicesDiscovered {
                            conn: handle,
                            handles,
                        })
                        .await;
                }
                Err(error) => {
                    events
                        .send(RadioEvent::ServiceDiscoveryFailed {
                            conn: handle,
                            error,
                        })
                        .await;
                }
            },
            RadioRequest::UpdateConnParams(c, params) if c == handle => {
                let result = conn
                    .set_conn_params(raw_conn_params(&params))
                    .map(|()| params)
                    .map_err(|_| LinkError::Rejected);
                events
                    .send(RadioEvent::ConnParamsUpdated {
                        conn: handle,
                        result,
                    })
                    .await;
            }
            RadioRequest::UpdatePhy(c, phy) if c == handle => {
                let set = phy_set(phy);
                let result = conn
                    .phy_update(set, set)
                    .map(|()| phy)
                    .map_err(|_| LinkError::Rejected);
                events
                    .send(RadioEvent::PhyUpdated {
                        conn: handle,
                        result,
                    })
                    .await;
            }
            RadioRequest::Read(c, att) if c == handle => {
                let mut buf = [0u8; ATT_VALUE_MAX];
                let event = match gatt_client::read(&conn, att.0, &mut buf).await {
                    Ok(len) => RadioEvent::ReadResponse {
                        conn: handle,
                        handle: att,
                        value: Vec::from_slice(&buf[..len.min(ATT_VALUE_MAX)]).unwrap_or_default(),
                    },
                    Err(_) => RadioEvent::ReadFailed {
                        conn: handle,
                        handle: att,
                        error: LinkError::Rejected,
                    },
                };
                events.send(event).await;
            }
            RadioRequest::WriteCccd(c, att, value) if c == handle => {
                let result = gatt_client::write(&conn, att.0, &value.to_le_bytes())
                    .await
                    .map_err(|_| LinkError::Rejected);
                events
                    .send(RadioEvent::CccdWritten {
                        conn: handle,
                        result,
                    })
                    .await;
            }
            RadioRequest::ReadRssi(c) if c == handle => {
                if !rssi_started {
                    conn.start_rssi();
                    rssi_started = true;
                }
                if let Some(rssi) = conn.rssi() {
                    events.send(RadioEvent::Rssi { conn: handle, rssi }).await;
                }
            }
            other => refuse(other, events).await,
        }
    }

    info!("link {} closed", handle.0);
    events
        .send(RadioEvent::Disconnected {
            conn: handle,
            reason: REASON_UNKNOWN,
        })
        .await;
}

/// Resolve the input report and its CCCD (required) and the battery
/// level (optional here; the state machine decides).
async fn discover(conn: &Connection) -> Result<(GattHandles, XboxHidClient), LinkError> {
    let hid: XboxHidClient = gatt_client::discover(conn)
        .await
        .map_err(|_| LinkError::Rejected)?;

    let battery_level = match gatt_client::discover::<BatteryClient>(conn).await {
        Ok(client) => Some(AttHandle(client.battery_level_value_handle)),
        Err(_) => {
            warn!("battery service not found");
            None
        }
    };

    let handles = GattHandles {
        battery_level,
        input_report: non_zero(hid.input_report_value_handle),
        input_report_cccd: non_zero(hid.input_report_cccd_handle),
    };
    Ok((handles, hid))
}

/// Answer a request that has no link to run on.
async fn refuse(req: RadioRequest, events: &Events) {
    let error = LinkError::NotConnected;
    let event = match req {
        RadioRequest::DiscoverServices(conn) => RadioEvent::ServiceDiscoveryFailed { conn, error },
        RadioRequest::UpdateConnParams(conn, _) => RadioEvent::ConnParamsUpdated {
            conn,
            result: Err(error),
        },
        RadioRequest::UpdatePhy(conn, _) => RadioEvent::PhyUpdated {
            conn,
            result: Err(error),
        },
        RadioRequest::Read(conn, handle) => RadioEvent::ReadFailed {
            conn,
            handle,
            error,
        },
        RadioRequest::WriteCccd(conn, _, _) => RadioEvent::CccdWritten {
            conn,
            result: Err(error),
        },
        other => {
            debug!("{} ignored", other);
            return;
        }
    };
    events.send(event).await;
}

fn non_zero(handle: u16) -> Option<AttHandle> {
    (handle != 0).then_some(AttHandle(handle))
}

fn to_address(peer: &PeerAddress) -> Address {
    let kind = match peer.kind {
        0 => AddressType::Public,
        2 => AddressType::RandomPrivateResolvable,
        3 => AddressType::RandomPrivateNonResolvable,
        _ => AddressType::RandomStatic,
    };
    Address::new(kind, peer.bytes)
}

fn raw_conn_params(params: &ConnParams) -> raw::ble_gap_conn_params_t {
    raw::ble_gap_conn_params_t {
        min_conn_interval: params.interval_min,
        max_conn_interval: params.interval_max,
        slave_latency: params.latency,
        conn_sup_timeout: params.supervision_timeout,
    }
}

fn phy_set(phy: Phy) -> PhySet {
    match phy {
        Phy::Le1M => PhySet::M1,
        Phy::Le2M => PhySet::M2,
        Phy::Coded => PhySet::Coded,
    }
}
