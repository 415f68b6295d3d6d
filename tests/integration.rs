//! Integration tests for xbox-central host-testable logic.

use std::sync::atomic::{AtomicUsize, Ordering};

use xbox_central::ble::{
    AttHandle, ConnHandle, ConnParams, GattHandles, PeerAddress, Phy, ScanParams,
};
use xbox_central::{
    decode, query, render, AbortReason, ButtonId, Central, CentralConfig, DPad, DecodeError,
    Events, LinkError, LinkEvent, LinkLayer, Phase, Platform,
};

/// Radio that accepts every request and leaves completion to the test.
struct QuietLink;

impl LinkLayer for QuietLink {
    fn init_device(&mut self) -> Result<(), LinkError> {
        Ok(())
    }
    fn prepare_discovery(&mut self) -> Result<(), LinkError> {
        Ok(())
    }
    fn start_scan(&mut self, _params: &ScanParams) -> Result<(), LinkError> {
        Ok(())
    }
    fn stop_scan(&mut self) {}
    fn connect(&mut self, _peer: &PeerAddress, _params: &ConnParams) -> Result<(), LinkError> {
        Ok(())
    }
    fn cancel_connect(&mut self) {}
    fn disconnect(&mut self, _conn: ConnHandle) {}
    fn discover_services(&mut self, _conn: ConnHandle) -> Result<(), LinkError> {
        Ok(())
    }
    fn update_conn_params(
        &mut self,
        _conn: ConnHandle,
        _params: &ConnParams,
    ) -> Result<(), LinkError> {
        Ok(())
    }
    fn update_phy(&mut self, _conn: ConnHandle, _phy: Phy) -> Result<(), LinkError> {
        Ok(())
    }
    fn read(&mut self, _conn: ConnHandle, _handle: AttHandle) -> Result<(), LinkError> {
        Ok(())
    }
    fn write_cccd(
        &mut self,
        _conn: ConnHandle,
        _handle: AttHandle,
        _value: u16,
    ) -> Result<(), LinkError> {
        Ok(())
    }
    fn read_rssi(&mut self, _conn: ConnHandle) -> Result<(), LinkError> {
        Ok(())
    }
}

/// Timers that fire only when the test posts the event itself.
struct NoTimers;

impl Platform for NoTimers {
    fn start_timer(&mut self, _events: Events, _delay_ms: u32) {}
    fn stop_timer(&mut self, _events: Events) {}
    fn set_led(&mut self, _on: bool) {}
}

const REFERENCE_REPORT: [u8; 16] = [
    0x00, 0x80, 0x00, 0x80, 0x00, 0x80, 0x00, 0x80, 0x00, 0x00, 0x00, 0x00, 0x00, 0x01, 0x00,
    0x00,
];

const CONN: ConnHandle = ConnHandle(1);
const INPUT: AttHandle = AttHandle(0x20);
const PEER: PeerAddress = PeerAddress {
    kind: 0,
    bytes: [1, 2, 3, 4, 5, 6],
};

static FORWARDED: AtomicUsize = AtomicUsize::new(0);

fn on_report(_data: &[u8]) {
    FORWARDED.fetch_add(1, Ordering::SeqCst);
}

fn establish(central: &mut Central<QuietLink, NoTimers>) {
    let mut adv = vec![0x03, 0x03, 0x12, 0x18, 25, 0x09];
    adv.extend_from_slice(b"Xbox Wireless Controller");

    central.init();
    central.run_pending();
    central.on_link_event(LinkEvent::AdvertisingReport {
        address: PEER,
        rssi: -55,
        data: &adv,
    });
    central.on_link_event(LinkEvent::Connected {
        conn: CONN,
        address: PEER,
    });
    central.post(Events::START_SVC_DISCOVERY);
    central.run_pending();
    central.on_link_event(LinkEvent::ServicesDiscovered {
        conn: CONN,
        handles: GattHandles {
            battery_level: Some(AttHandle(0x10)),
            input_report: Some(INPUT),
            input_report_cccd: Some(AttHandle(0x21)),
        },
    });
    central.run_pending();
    central.on_link_event(LinkEvent::ConnParamsUpdated {
        conn: CONN,
        result: Err(LinkError::Rejected),
    });
    central.run_pending();
    central.on_link_event(LinkEvent::PhyUpdated {
        conn: CONN,
        result: Ok(Phy::Le2M),
    });
    central.run_pending();
    central.on_link_event(LinkEvent::ReadResponse {
        conn: CONN,
        handle: AttHandle(0x10),
        value: &[100],
    });
    central.run_pending();
    central.on_link_event(LinkEvent::CccdWritten {
        conn: CONN,
        result: Ok(()),
    });
    central.run_pending();
}

#[test]
fn reference_report_decodes() {
    let state = decode(&REFERENCE_REPORT).expect("valid report");
    assert_eq!(state.left_x, 32768);
    assert_eq!(state.right_y, 32768);
    assert_eq!(state.left_trigger, 0);
    assert_eq!(state.dpad, DPad::Neutral);
    assert!(query(&state, ButtonId::A));
    assert!(!query(&state, ButtonId::B));
    assert_eq!(state.pressed().collect::<Vec<_>>(), [ButtonId::A]);
}

#[test]
fn short_and_long_reports_are_rejected() {
    assert_eq!(
        decode(&REFERENCE_REPORT[..15]),
        Err(DecodeError::InvalidLength { len: 15 })
    );
    assert_eq!(decode(&[0u8; 17]), Err(DecodeError::InvalidLength { len: 17 }));
}

#[test]
fn rendered_report_names_dpad_and_buttons() {
    let state = decode(&REFERENCE_REPORT).expect("valid report");
    let text = render(&state);
    assert!(text.contains("D-Pad      : Neutral (0)"));
    assert!(text.contains("[ A ]"));
    assert!(text.contains("Share Button       : Released"));
}

#[test]
fn controller_link_streams_reports_to_callback() {
    let mut central = Central::new(QuietLink, NoTimers, CentralConfig::default());
    central.register_input_callback(on_report);
    establish(&mut central);

    assert_eq!(central.phase(), Phase::Established);
    assert_eq!(central.context().battery_level, Some(100));
    assert_eq!(
        central.context().params,
        Some(CentralConfig::default().conn_params)
    );

    central.on_link_event(LinkEvent::Notification {
        conn: CONN,
        handle: INPUT,
        data: &REFERENCE_REPORT,
    });
    central.on_link_event(LinkEvent::Notification {
        conn: CONN,
        handle: INPUT,
        data: &[0x00, 0x01],
    });

    let latest = central.snapshot().expect("snapshot after first report");
    assert_eq!(latest.dpad, DPad::Neutral);
    assert!(query(&latest, ButtonId::A));
    assert_eq!(FORWARDED.load(Ordering::SeqCst), 2);

    central.on_link_event(LinkEvent::Disconnected {
        conn: CONN,
        reason: 0x13,
    });
    assert_eq!(central.phase(), Phase::Idle);
    assert!(central.context().is_clear());
    assert_eq!(central.last_abort(), Some(AbortReason::Disconnected));
}

#[test]
fn establish_timeout_returns_to_idle() {
    let mut central = Central::new(QuietLink, NoTimers, CentralConfig::default());
    central.init();
    central.run_pending();
    assert_eq!(central.phase(), Phase::Scanning);

    central.post(Events::ESTABLISH_LINK_TIMEOUT | Events::START_SCAN);
    central.run_pending();
    assert_eq!(central.phase(), Phase::Idle);
    assert!(central.context().is_clear());
    assert_eq!(central.last_abort(), Some(AbortReason::Timeout));
}
