//! Link establishment state machine.
//!
//! A single [`Central`] owns the [`ConnectionContext`] and advances it
//! through the [`Phase`]s in order:
//!
//! ```text
//! Idle -> Discovering -> Scanning -> ServiceDiscovery -> ParamUpdate
//!      -> PhyUpdate -> ReadOrWrite -> WriteCccd -> Established
//! ```
//!
//! Work is requested by posting [`Events`] bits; each call to
//! [`Central::process_event`] handles the highest-priority bit and returns
//! the rest.  Radio operations that wait on the peer come back through
//! [`Central::on_link_event`], which posts the next phase's bit.
//!
//! Any failure that cannot be worked around, the establish-link timeout,
//! and a dropped link all land back in `Idle` with a fresh context.

use super::adv_parser;
use super::context::{ConnHandle, ConnParams, ConnectionContext, Peer, Phase, Phy};
use super::events::Events;
use super::link::{LinkEvent, LinkLayer, Platform, ScanParams};
use crate::config::{CentralConfig, CCCD_ENABLE_NOTIFICATIONS, HID_SERV_UUID};
use crate::error::{AbortReason, LinkError};
use crate::gamepad::{ControllerState, InputCallback, InputDispatcher};

/// What the status LED is showing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LedStatus {
    Off,
    Connecting,
    Connected,
    Error,
}

pub struct Central<L, P> {
    link: L,
    platform: P,
    config: CentralConfig,
    ctx: ConnectionContext,
    pending: Events,
    radio_ready: bool,
    rssi: Option<i8>,
    last_abort: Option<AbortReason>,
    led_on: bool,
    input: InputDispatcher,
}

impl<L: LinkLayer, P: Platform> Central<L, P> {
    pub fn new(link: L, platform: P, config: CentralConfig) -> Self {
        Self {
            link,
            platform,
            config,
            ctx: ConnectionContext::new(),
            pending: Events::empty(),
            radio_ready: false,
            rssi: None,
            last_abort: None,
            led_on: false,
            input: InputDispatcher::new(),
        }
    }

    /// Queue the first radio bring-up and start the status LED.
    pub fn init(&mut self) {
        self.post(Events::START_DEVICE | Events::START_LED_BLINK);
    }

    pub fn post(&mut self, events: Events) {
        self.pending |= events;
    }

    pub fn pending(&self) -> Events {
        self.pending
    }

    /// Handle the highest-priority bit in `events` and return the rest.
    pub fn process_event(&mut self, events: Events) -> Events {
        let Some(event) = events.next() else {
            return Events::empty();
        };

        if event == Events::ESTABLISH_LINK_TIMEOUT {
            self.on_establish_timeout();
        } else if event == Events::START_DEVICE {
            self.on_start_device();
        } else if event == Events::START_DISCOVERY {
            self.on_start_discovery();
        } else if event == Events::START_SCAN {
            self.on_start_scan();
        } else if event == Events::START_SVC_DISCOVERY {
            self.on_start_svc_discovery();
        } else if event == Events::START_PARAM_UPDATE {
            self.on_start_param_update();
        } else if event == Events::START_PHY_UPDATE {
            self.on_start_phy_update();
        } else if event == Events::START_READ_OR_WRITE {
            self.on_start_read_or_write();
        } else if event == Events::START_WRITE_CCCD {
            self.on_start_write_cccd();
        } else if event == Events::START_READ_RSSI {
            self.on_start_read_rssi();
        } else if event == Events::START_LED_BLINK {
            self.on_led_blink();
        }

        events.difference(event)
    }

    /// Drain everything posted so far, including what handlers post.
    pub fn run_pending(&mut self) {
        while !self.pending.is_empty() {
            let events = core::mem::replace(&mut self.pending, Events::empty());
            let rest = self.process_event(events);
            self.pending |= rest;
        }
    }

    pub fn on_link_event(&mut self, event: LinkEvent<'_>) {
        match event {
            LinkEvent::AdvertisingReport {
                address,
                rssi,
                data,
            } => {
                if self.ctx.phase != Phase::Scanning || self.ctx.peer.is_some() {
                    return;
                }
                if !self.is_candidate(data) {
                    return;
                }
                let name = adv_parser::device_name(data);
                info!("candidate {} (RSSI {})", name.as_str(), rssi);
                self.link.stop_scan();
                match self.link.connect(&address, &self.config.conn_params) {
                    Ok(()) => {
                        self.ctx.peer = Some(Peer {
                            address,
                            name,
                            rssi,
                        })
                    }
                    Err(e) => {
                        warn!("connect request refused: {}", e);
                        self.post(Events::START_SCAN);
                    }
                }
            }
            LinkEvent::ScanComplete => {
                if self.ctx.phase == Phase::Scanning && self.ctx.peer.is_none() {
                    debug!("scan window closed without a candidate");
                    self.post(Events::START_SCAN);
                }
            }
            LinkEvent::Connected { conn, address } => {
                let expected = self.ctx.phase == Phase::Scanning
                    && self.ctx.conn.is_none()
                    && self.ctx.peer.as_ref().map(|p| p.address) == Some(address);
                if !expected {
                    warn!("unexpected connection {}, dropping it", conn.0);
                    self.link.disconnect(conn);
                    return;
                }
                self.ctx.conn = Some(conn);
                self.enter(Phase::ServiceDiscovery);
                self.schedule(Events::START_SVC_DISCOVERY, self.config.svc_discovery_delay_ms);
            }
            LinkEvent::ConnectFailed(e) => {
                if self.ctx.phase == Phase::Scanning && self.ctx.peer.is_some() {
                    warn!("connect failed: {}", e);
                    self.ctx.peer = None;
                    self.post(Events::START_SCAN);
                }
            }
            LinkEvent::ServicesDiscovered { conn, handles } => {
                if !self.awaits(conn, Phase::ServiceDiscovery) {
                    return;
                }
                if !handles.is_complete() {
                    self.abort(AbortReason::MissingCharacteristic);
                    return;
                }
                self.ctx.handles = handles;
                self.enter(Phase::ParamUpdate);
                self.post(Events::START_PARAM_UPDATE);
            }
            LinkEvent::ServiceDiscoveryFailed { conn, error } => {
                if self.awaits(conn, Phase::ServiceDiscovery) {
                    warn!("service discovery failed: {}", error);
                    self.abort(AbortReason::ServiceDiscoveryFailed);
                }
            }
            LinkEvent::ConnParamsUpdated { conn, result } => {
                if self.awaits(conn, Phase::ParamUpdate) {
                    self.params_settled(result);
                }
            }
            LinkEvent::PhyUpdated { conn, result } => {
                if self.awaits(conn, Phase::PhyUpdate) {
                    self.phy_settled(result);
                }
            }
            LinkEvent::ReadResponse {
                conn,
                handle,
                value,
            } => {
                if self.awaits(conn, Phase::ReadOrWrite)
                    && self.ctx.handles.battery_level == Some(handle)
                {
                    self.ctx.battery_level = value.first().copied();
                    info!("battery level {}", self.ctx.battery_level);
                    self.enter(Phase::WriteCccd);
                    self.post(Events::START_WRITE_CCCD);
                }
            }
            LinkEvent::ReadFailed {
                conn,
                handle,
                error,
            } => {
                if self.awaits(conn, Phase::ReadOrWrite)
                    && self.ctx.handles.battery_level == Some(handle)
                {
                    self.read_failed(error);
                }
            }
            LinkEvent::CccdWritten { conn, result } => {
                if !self.awaits(conn, Phase::WriteCccd) {
                    return;
                }
                match result {
                    Ok(()) => self.established(),
                    Err(e) => {
                        warn!("enabling notifications failed: {}", e);
                        self.abort(AbortReason::CccdWriteFailed);
                    }
                }
            }
            LinkEvent::Notification { conn, handle, data } => {
                if self.awaits(conn, Phase::Established)
                    && self.ctx.handles.input_report == Some(handle)
                {
                    self.input.dispatch(data);
                }
            }
            LinkEvent::Rssi { conn, rssi } => {
                if self.ctx.conn == Some(conn) {
                    debug!("RSSI {}", rssi);
                    self.rssi = Some(rssi);
                }
            }
            LinkEvent::Disconnected { conn, reason } => {
                if self.ctx.conn == Some(conn) {
                    warn!("link {} lost (reason {=u8:#x})", conn.0, reason);
                    self.fall_back(AbortReason::Disconnected);
                }
            }
        }
    }

    /// Register the input report consumer, replacing any previous one.
    pub fn register_input_callback(&mut self, callback: InputCallback) {
        self.input.register(callback);
    }

    /// Latest decoded controller state.
    pub fn snapshot(&self) -> Option<ControllerState> {
        self.input.latest()
    }

    pub fn input(&self) -> &InputDispatcher {
        &self.input
    }

    pub fn context(&self) -> &ConnectionContext {
        &self.ctx
    }

    pub fn phase(&self) -> Phase {
        self.ctx.phase
    }

    pub fn config(&self) -> &CentralConfig {
        &self.config
    }

    /// Latest RSSI reading on the current link.
    pub fn rssi(&self) -> Option<i8> {
        self.rssi
    }

    /// Why the most recent attempt fell back to idle.  Cleared once a
    /// link is established.
    pub fn last_abort(&self) -> Option<AbortReason> {
        self.last_abort
    }

    pub fn led_status(&self) -> LedStatus {
        match self.ctx.phase {
            Phase::Established => LedStatus::Connected,
            Phase::Idle if self.last_abort.is_some() => LedStatus::Error,
            Phase::Idle => LedStatus::Off,
            _ => LedStatus::Connecting,
        }
    }

    pub fn link(&self) -> &L {
        &self.link
    }

    pub fn link_mut(&mut self) -> &mut L {
        &mut self.link
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    pub fn platform_mut(&mut self) -> &mut P {
        &mut self.platform
    }

    // Event handlers

    fn on_start_device(&mut self) {
        if self.ctx.phase != Phase::Idle {
            debug!("StartDevice ignored in {}", self.ctx.phase);
            return;
        }
        if !self.radio_ready {
            if let Err(e) = self.link.init_device() {
                error!("radio init failed: {}", e);
                self.fall_back(AbortReason::InitFailed);
                return;
            }
            self.radio_ready = true;
            info!("radio ready");
        }
        self.enter(Phase::Discovering);
        self.post(Events::START_DISCOVERY);
    }

    fn on_start_discovery(&mut self) {
        match self.ctx.phase {
            Phase::Discovering => {}
            Phase::Idle if self.radio_ready => self.enter(Phase::Discovering),
            phase => {
                debug!("StartDiscovery ignored in {}", phase);
                return;
            }
        }
        match self.link.prepare_discovery() {
            Ok(()) => {
                self.enter(Phase::Scanning);
                self.post(Events::START_SCAN);
            }
            Err(e) => {
                warn!("discovery setup failed: {}", e);
                self.abort(AbortReason::DiscoverySetupFailed);
            }
        }
    }

    fn on_start_scan(&mut self) {
        if self.ctx.phase != Phase::Scanning || self.ctx.peer.is_some() {
            debug!("StartScan ignored in {}", self.ctx.phase);
            return;
        }
        let params = ScanParams {
            service_uuid: HID_SERV_UUID,
            window_ms: self.config.scan_window_ms,
            active: true,
        };
        if let Err(e) = self.link.start_scan(&params) {
            warn!("scan refused: {}", e);
            self.abort(AbortReason::ScanFailed);
            return;
        }
        if !self.ctx.timeout_pending {
            self.platform
                .start_timer(Events::ESTABLISH_LINK_TIMEOUT, self.config.establish_timeout_ms);
            self.ctx.timeout_pending = true;
        }
    }

    fn on_start_svc_discovery(&mut self) {
        let Some(conn) = self.active_conn(Phase::ServiceDiscovery) else {
            return;
        };
        if let Err(e) = self.link.discover_services(conn) {
            warn!("service discovery refused: {}", e);
            self.abort(AbortReason::ServiceDiscoveryFailed);
        }
    }

    fn on_start_param_update(&mut self) {
        let Some(conn) = self.active_conn(Phase::ParamUpdate) else {
            return;
        };
        let params = self.config.conn_params;
        if let Err(e) = self.link.update_conn_params(conn, &params) {
            self.params_settled(Err(e));
        }
    }

    fn on_start_phy_update(&mut self) {
        let Some(conn) = self.active_conn(Phase::PhyUpdate) else {
            return;
        };
        if let Err(e) = self.link.update_phy(conn, self.config.phy) {
            self.phy_settled(Err(e));
        }
    }

    fn on_start_read_or_write(&mut self) {
        let Some(conn) = self.active_conn(Phase::ReadOrWrite) else {
            return;
        };
        let Some(handle) = self.ctx.handles.battery_level else {
            self.abort(AbortReason::MissingCharacteristic);
            return;
        };
        self.ctx.read_attempts += 1;
        if let Err(e) = self.link.read(conn, handle) {
            self.read_failed(e);
        }
    }

    fn on_start_write_cccd(&mut self) {
        let Some(conn) = self.active_conn(Phase::WriteCccd) else {
            return;
        };
        let Some(cccd) = self.ctx.handles.input_report_cccd else {
            self.abort(AbortReason::MissingCharacteristic);
            return;
        };
        if let Err(e) = self.link.write_cccd(conn, cccd, CCCD_ENABLE_NOTIFICATIONS) {
            warn!("CCCD write refused: {}", e);
            self.abort(AbortReason::CccdWriteFailed);
        }
    }

    fn on_start_read_rssi(&mut self) {
        let Some(conn) = self.active_conn(Phase::Established) else {
            return;
        };
        if let Err(e) = self.link.read_rssi(conn) {
            debug!("RSSI read refused: {}", e);
        }
        if self.config.rssi_poll_ms > 0 {
            self.platform
                .start_timer(Events::START_READ_RSSI, self.config.rssi_poll_ms);
        }
    }

    fn on_establish_timeout(&mut self) {
        if self.ctx.phase == Phase::Idle {
            debug!("stale establish-link timeout");
            return;
        }
        self.abort(AbortReason::Timeout);
    }

    fn on_led_blink(&mut self) {
        let (on, period) = match self.led_status() {
            LedStatus::Off => (false, self.config.led_slow_ms),
            LedStatus::Connecting => (!self.led_on, self.config.led_fast_ms),
            LedStatus::Connected => (true, self.config.led_slow_ms),
            LedStatus::Error => (!self.led_on, self.config.led_slow_ms),
        };
        self.led_on = on;
        self.platform.set_led(on);
        self.platform.start_timer(Events::START_LED_BLINK, period);
    }

    // Phase plumbing

    fn params_settled(&mut self, result: Result<ConnParams, LinkError>) {
        let params = match result {
            Ok(params) => params,
            Err(e) => {
                warn!("connection parameter update failed ({}), keeping defaults", e);
                self.config.conn_params
            }
        };
        self.ctx.params = Some(params);
        self.enter(Phase::PhyUpdate);
        self.post(Events::START_PHY_UPDATE);
    }

    fn phy_settled(&mut self, result: Result<Phy, LinkError>) {
        let phy = match result {
            Ok(phy) => phy,
            Err(e) => {
                warn!("PHY update failed ({}), staying on 1M", e);
                Phy::Le1M
            }
        };
        self.ctx.phy = Some(phy);
        self.enter(Phase::ReadOrWrite);
        self.post(Events::START_READ_OR_WRITE);
    }

    fn read_failed(&mut self, error: LinkError) {
        if self.ctx.read_attempts <= u16::from(self.config.read_retries) {
            debug!("battery read failed ({}), retrying", error);
            self.post(Events::START_READ_OR_WRITE);
            return;
        }
        warn!(
            "battery read failed {} times, continuing without it",
            self.ctx.read_attempts
        );
        self.enter(Phase::WriteCccd);
        self.post(Events::START_WRITE_CCCD);
    }

    fn established(&mut self) {
        self.platform.stop_timer(Events::ESTABLISH_LINK_TIMEOUT);
        self.ctx.timeout_pending = false;
        self.last_abort = None;
        self.enter(Phase::Established);
        if self.config.rssi_poll_ms > 0 {
            self.platform
                .start_timer(Events::START_READ_RSSI, self.config.rssi_poll_ms);
        }
    }

    fn enter(&mut self, phase: Phase) {
        info!("phase {} -> {}", self.ctx.phase, phase);
        self.ctx.phase = phase;
    }

    fn schedule(&mut self, events: Events, delay_ms: u32) {
        if delay_ms == 0 {
            self.post(events);
        } else {
            self.platform.start_timer(events, delay_ms);
        }
    }

    /// The current connection, if we are in `phase`.
    fn active_conn(&self, phase: Phase) -> Option<ConnHandle> {
        if self.ctx.phase != phase {
            debug!("event for {} ignored in {}", phase, self.ctx.phase);
            return None;
        }
        self.ctx.conn
    }

    /// A completion for `conn` is what `phase` is waiting for.
    fn awaits(&self, conn: ConnHandle, phase: Phase) -> bool {
        self.ctx.conn == Some(conn) && self.ctx.phase == phase
    }

    fn is_candidate(&self, data: &[u8]) -> bool {
        if !adv_parser::advertises_service(data, HID_SERV_UUID) {
            return false;
        }
        match self.config.target_name {
            Some(prefix) => adv_parser::local_name(data)
                .map_or(false, |name| name.as_str().starts_with(prefix)),
            None => true,
        }
    }

    /// Release whatever the attempt holds on the radio, then fall back.
    fn abort(&mut self, reason: AbortReason) {
        if let Some(conn) = self.ctx.conn {
            self.link.disconnect(conn);
        } else if self.ctx.phase == Phase::Scanning {
            if self.ctx.peer.is_some() {
                self.link.cancel_connect();
            } else {
                self.link.stop_scan();
            }
        }
        self.fall_back(reason);
    }

    fn fall_back(&mut self, reason: AbortReason) {
        warn!("back to idle from {}: {}", self.ctx.phase, reason);
        self.platform.stop_timer(Events::LINK_ATTEMPT);
        self.pending.remove(Events::LINK_ATTEMPT);
        self.ctx = ConnectionContext::new();
        self.rssi = None;
        self.last_abort = Some(reason);
        if self.config.restart_after_abort {
            self.platform
                .start_timer(Events::START_DEVICE, self.config.restart_delay_ms);
        }
    }
}
