//! Xbox Wireless Controller central - firmware entry point.
//!
//! Tasks:
//! - `softdevice_task`: SoftDevice event pump.
//! - `radio_task`: scans, connects and serves GATT for the state machine.
//! - `central_task`: owns the link state machine, its timers and the LED.
//!
//! Flash with: `cargo run --release --features embedded`

#![no_std]
#![no_main]

mod board;

use defmt::{info, unwrap};
use defmt_rtt as _;
use embassy_executor::Spawner;
use embassy_futures::select::{select, Either};
use embassy_nrf::gpio::{Level, Output, OutputDrive};
use embassy_nrf::interrupt::Priority;
use embassy_time::{Instant, Timer};
use nrf_softdevice::{raw, Softdevice};
use panic_probe as _;

use board::{BoardPlatform, SoftdeviceLink, RADIO_EVENTS};
use xbox_central::{decode, render, Central, CentralConfig};

type XboxCentral = Central<SoftdeviceLink, BoardPlatform>;

#[embassy_executor::task]
async fn softdevice_task(sd: &'static Softdevice) -> ! {
    sd.run().await
}

#[embassy_executor::task]
async fn central_task(mut central: XboxCentral) -> ! {
    central.register_input_callback(on_input_report);
    central.init();

    loop {
        central.run_pending();

        let deadline = central.platform().next_deadline();
        let timer = async {
            match deadline {
                Some(at) => Timer::at(at).await,
                None => core::future::pending::<()>().await,
            }
        };

        match select(RADIO_EVENTS.receive(), timer).await {
            Either::First(event) => central.on_link_event(event.as_link_event()),
            Either::Second(()) => {
                let due = central.platform_mut().take_expired(Instant::now());
                central.post(due);
            }
        }
    }
}

fn on_input_report(data: &[u8]) {
    match decode(data) {
        Ok(state) => {
            let text = render(&state);
            defmt::debug!("{}", state);
            info!("\n{}", text.as_str());
        }
        Err(e) => defmt::warn!("undecodable input report: {}", e),
    }
}

fn softdevice_config() -> nrf_softdevice::Config {
    nrf_softdevice::Config {
        clock: Some(raw::nrf_clock_lf_cfg_t {
            source: raw::NRF_CLOCK_LF_SRC_RC as u8,
            rc_ctiv: 16,
            rc_temp_ctiv: 2,
            accuracy: raw::NRF_CLOCK_LF_ACCURACY_500_PPM as u8,
        }),
        conn_gap: Some(raw::ble_gap_conn_cfg_t {
            conn_count: 1,
            event_length: 24,
        }),
        conn_gatt: Some(raw::ble_gatt_conn_cfg_t { att_mtu: 128 }),
        gap_role_count: Some(raw::ble_gap_cfg_role_count_t {
            adv_set_count: 1,
            periph_role_count: 0,
            central_role_count: 1,
            central_sec_count: 1,
            _bitfield_1: raw::ble_gap_cfg_role_count_t::new_bitfield_1(0),
        }),
        ..Default::default()
    }
}

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("xbox-central starting");

    // The SoftDevice owns interrupt priorities 0, 1 and 4.
    let mut config = embassy_nrf::config::Config::default();
    config.gpiote_interrupt_priority = Priority::P2;
    config.time_interrupt_priority = Priority::P2;
    let p = embassy_nrf::init(config);

    // LED1 on the nRF52840-DK, active low.
    let led = Output::new(p.P0_13, Level::High, OutputDrive::Standard);

    let sd = Softdevice::enable(&softdevice_config());
    unwrap!(spawner.spawn(softdevice_task(sd)));
    unwrap!(spawner.spawn(board::radio::radio_task(sd)));

    let central = Central::new(
        SoftdeviceLink,
        BoardPlatform::new(led),
        CentralConfig::default(),
    );
    unwrap!(spawner.spawn(central_task(central)));
}
