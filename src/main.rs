//! CX Motor Controller: main entry point
//!
//! BLE peripheral exposing the CX endpoint service; byte 0 of every RECV
//! write sets the motor speed, the applied speed is notified back on SEND.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    Adapters (outer ring)                     │
//! │                                                              │
//! │  BleServer / GattRouter          HalPwm<LedcDriver × 2>      │
//! │  (Bluedroid GATTS callbacks)     (PwmDevice, "PWM_0")        │
//! │                                                              │
//! │  ─────────────── Port Trait Boundary ───────────────────     │
//! │                                                              │
//! │  EndpointServer ──▶ SERVER_EVENTS ──▶ MotorLinkService       │
//! │                                       (MotorController)      │
//! └──────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use anyhow::Result;
use esp_idf_hal::delay::FreeRtos;
use esp_idf_hal::gpio::AnyOutputPin;
use esp_idf_hal::ledc::config::TimerConfig;
use esp_idf_hal::ledc::{LedcDriver, LedcTimerDriver, Resolution};
use esp_idf_hal::peripherals::Peripherals;
use esp_idf_hal::units::FromValueType;
use log::{error, info, warn};

use cx_endpoint::adapters::ble::{BleNotifier, BleServer, GATT_STATE};
use cx_endpoint::adapters::hal_pwm::{HalPwm, NamedPwm};
use cx_endpoint::adapters::nvs::NvsConfigStore;
use cx_endpoint::app::ports::ConfigStore;
use cx_endpoint::app::channels::{ServerEventForwarder, SERVER_EVENTS};
use cx_endpoint::app::service::MotorLinkService;
use cx_endpoint::config::SystemConfig;
use cx_endpoint::endpoint::EndpointServer;

/// Peripheral-side endpoint, shared with the Bluedroid callback context.
static SERVER: EndpointServer<BleNotifier<'static>> = EndpointServer::new(BleNotifier::new(&GATT_STATE));

/// App loop poll interval.
const LOOP_DELAY_MS: u32 = 10;

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("CX motor controller v{}", env!("CARGO_PKG_VERSION"));

    let store = NvsConfigStore::new()?;
    let config = store.load().unwrap_or_else(|e| {
        warn!("config load failed: {}, using defaults", e);
        SystemConfig::default()
    });
    config.validate()?;

    // ── 2. PWM: one LEDC timer, one channel per bridge input ──
    let peripherals = Peripherals::take()?;
    let timer = LedcTimerDriver::new(
        peripherals.ledc.timer0,
        &TimerConfig::new()
            .frequency((1_000_000 / config.motor.period_us).Hz())
            .resolution(Resolution::Bits13),
    )?;
    // SAFETY: pin numbers come from the board pin map and are not used elsewhere.
    let (fwd_pin, rev_pin) = unsafe {
        (
            AnyOutputPin::new(config.motor.forward_pin as i32),
            AnyOutputPin::new(config.motor.reverse_pin as i32),
        )
    };
    let forward = LedcDriver::new(peripherals.ledc.channel0, &timer, fwd_pin)?;
    let reverse = LedcDriver::new(peripherals.ledc.channel1, &timer, rev_pin)?;
    let mut registry = NamedPwm::new(
        config.motor.pwm_device.clone(),
        HalPwm::new(config.motor.forward_pin, forward, config.motor.reverse_pin, reverse),
    );

    // ── 3. Motor ──────────────────────────────────────────────
    let mut service = MotorLinkService::new(config.clone());
    if let Err(e) = service.start(&mut registry) {
        // Without a stopped motor there is nothing safe to do.
        error!("motor init failed: {}, halting", e);
        loop {
            FreeRtos::delay_ms(1_000);
        }
    }

    // ── 4. BLE endpoint ───────────────────────────────────────
    SERVER.register(ServerEventForwarder::new(&SERVER_EVENTS));
    let mut ble = BleServer::new(config.device_name.clone());
    ble.start(&SERVER, ServerEventForwarder::new(&SERVER_EVENTS))?;

    // ── 5. App loop ───────────────────────────────────────────
    loop {
        service.drain(&SERVER_EVENTS, &SERVER);
        FreeRtos::delay_ms(LOOP_DELAY_MS);
    }
}
