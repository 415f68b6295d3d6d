//! Application-wide constants and compile-time configuration.
//!
//! GATT identifiers, timing parameters, and connection preferences
//! live here so they can be tuned in one place.  `CentralConfig`
//! carries the same values at runtime.

use crate::ble::context::{ConnParams, Phy};

// GATT identifiers

/// Generic Attribute service.
pub const GENERIC_ATTRIBUTE_SERV_UUID: u16 = 0x1801;

/// Battery service and its level characteristic.
pub const BATTERY_SERV_UUID: u16 = 0x180F;
pub const BATTERY_LEVEL_CHAR_UUID: u16 = 0x2A19;

/// HID service and the input report characteristic
/// (stick, button, trigger data).
pub const HID_SERV_UUID: u16 = 0x1812;
pub const INPUT_REPORT_CHAR_UUID: u16 = 0x2A4D;

/// Client Characteristic Configuration descriptor.
pub const CCCD_UUID: u16 = 0x2902;

/// CCCD value that enables notifications.
pub const CCCD_ENABLE_NOTIFICATIONS: u16 = 0x0001;

/// Advertised local name prefix of the target controller.
pub const TARGET_NAME_PREFIX: &str = "Xbox Wireless Controller";

// Link establishment timing

/// Whole-attempt budget from scan start to notifications enabled (ms).
pub const ESTABLISH_LINK_TIMEOUT_MS: u32 = 10_000;

/// Duration of one scan window (ms).
pub const SCAN_WINDOW_MS: u32 = 4_000;

/// Delay between link establishment and GATT discovery (ms).
pub const SVC_DISCOVERY_DELAY_MS: u32 = 1_000;

/// RSSI polling period once established (ms). 0 disables polling.
pub const RSSI_POLL_MS: u32 = 1_500;

/// Status LED half-periods (ms).
pub const LED_FAST_MS: u32 = 200;
pub const LED_SLOW_MS: u32 = 1_000;

/// Extra attempts for the one-shot battery read.
pub const READ_RETRIES: u8 = 3;

/// Delay before a new attempt after falling back to idle (ms).
pub const RESTART_DELAY_MS: u32 = 1_000;

// Connection parameters

/// BLE connection interval range (in 1.25 ms units).
/// 6 = 7.5 ms (lowest latency for HID).
pub const BLE_CONN_INTERVAL_MIN: u16 = 6;
pub const BLE_CONN_INTERVAL_MAX: u16 = 12;

/// BLE slave latency (number of connection events the peripheral can skip).
pub const BLE_SLAVE_LATENCY: u16 = 0;

/// BLE supervision timeout (in 10 ms units). 400 = 4 s.
pub const BLE_SUP_TIMEOUT: u16 = 400;

/// Preferred PHY after connection.
pub const PREFERRED_PHY: Phy = Phy::Le2M;

/// Runtime configuration for [`crate::ble::central::Central`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CentralConfig {
    pub establish_timeout_ms: u32,
    pub scan_window_ms: u32,
    pub svc_discovery_delay_ms: u32,
    /// 0 disables RSSI polling.
    pub rssi_poll_ms: u32,
    pub led_fast_ms: u32,
    pub led_slow_ms: u32,
    pub read_retries: u8,
    pub conn_params: ConnParams,
    pub phy: Phy,
    /// Local name prefix a candidate must advertise. `None` accepts any HID peripheral.
    pub target_name: Option<&'static str>,
    /// Schedule a fresh StartDevice after any fall back to idle.
    pub restart_after_abort: bool,
    pub restart_delay_ms: u32,
}

impl Default for CentralConfig {
    fn default() -> Self {
        Self {
            establish_timeout_ms: ESTABLISH_LINK_TIMEOUT_MS,
            scan_window_ms: SCAN_WINDOW_MS,
            svc_discovery_delay_ms: SVC_DISCOVERY_DELAY_MS,
            rssi_poll_ms: RSSI_POLL_MS,
            led_fast_ms: LED_FAST_MS,
            led_slow_ms: LED_SLOW_MS,
            read_retries: READ_RETRIES,
            conn_params: ConnParams {
                interval_min: BLE_CONN_INTERVAL_MIN,
                interval_max: BLE_CONN_INTERVAL_MAX,
                latency: BLE_SLAVE_LATENCY,
                supervision_timeout: BLE_SUP_TIMEOUT,
            },
            phy: PREFERRED_PHY,
            target_name: Some(TARGET_NAME_PREFIX),
            restart_after_abort: true,
            restart_delay_ms: RESTART_DELAY_MS,
        }
    }
}
